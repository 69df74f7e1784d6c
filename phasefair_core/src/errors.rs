//! Error type for the typed lock's non-blocking acquisitions

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AcquireError {
    /// The lock could not be taken without blocking.
    WouldBlock,
    /// The deadline passed before the lock could be taken.
    TimedOut,
}

impl AcquireError {
    pub fn as_str(self) -> &'static str {
        match self {
            AcquireError::WouldBlock => "Lock would block",
            AcquireError::TimedOut => "Lock acquisition timed out",
        }
    }
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for AcquireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_as_str() {
        for e in [AcquireError::WouldBlock, AcquireError::TimedOut] {
            assert_eq!(e.to_string(), e.as_str());
        }
    }
}
