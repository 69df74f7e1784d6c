//! Constants for the phase-fair lock

// Metric names (see `telemetry`)
pub const METRIC_READ_CONTENDED: &str = "phasefair_read_contended";
pub const METRIC_WRITE_CONTENDED: &str = "phasefair_write_contended";
pub const METRIC_WRITER_HANDOFFS: &str = "phasefair_writer_handoffs";
pub const METRIC_READER_BATCHES: &str = "phasefair_reader_batches";
pub const METRIC_ACQUIRE_TIMEOUTS: &str = "phasefair_acquire_timeouts";
pub const METRIC_POOLED_NODES: &str = "phasefair_pooled_nodes";
/// Label on per-lock metrics; the value is the lock's instance id.
pub const METRIC_LABEL_LOCK: &str = "lock";

/// Initial capacity of the wait-node pool; grows on demand.
pub const INITIAL_POOL_CAPACITY: usize = 4;
