//! Command-line configuration: `<prog> iterations concurrency`

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    /// Write-locked increments per thread.
    pub iterations: u64,
    /// Number of writer threads.
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchError {
    Usage { program: String },
    InvalidNumber { name: &'static str, value: String },
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Usage { program } => write!(f, "usage: {program} iterations concurrency"),
            BenchError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a positive integer, got {value:?}")
            }
        }
    }
}

impl std::error::Error for BenchError {}

fn positive<T>(name: &'static str, raw: &str) -> Result<T, BenchError>
where
    T: std::str::FromStr + PartialEq + From<u8>,
{
    match raw.trim().parse::<T>() {
        Ok(n) if n != T::from(0) => Ok(n),
        _ => Err(BenchError::InvalidNumber {
            name,
            value: raw.to_owned(),
        }),
    }
}

impl BenchConfig {
    /// Parse from the full argument list, program name first. Extra arguments are ignored.
    pub fn from_args<I>(args: I) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let program = args.next().unwrap_or_else(|| "phasefair_bench".to_owned());
        let (Some(iterations), Some(concurrency)) = (args.next(), args.next()) else {
            return Err(BenchError::Usage { program });
        };
        Ok(Self {
            iterations: positive("iterations", &iterations)?,
            concurrency: positive("concurrency", &concurrency)?,
        })
    }

    /// Progress is printed every this many iterations (twenty reports per thread).
    pub fn report_every(&self) -> u64 {
        (self.iterations / 20).max(1)
    }
}
