//! Domain checks applied to an uploaded batch before anything is stored

use crate::types::{Measurement, Timestamp};

/// Smallest accepted batch
pub const MIN_BATCH_LEN: usize = 1;

/// Largest accepted batch
pub const MAX_BATCH_LEN: usize = 10_000;

/// 2000-01-01T00:00:00Z as Unix seconds, the earliest accepted timestamp
pub const EARLIEST_TIMESTAMP_SECS: i64 = 946_684_800;

/// The first rule a batch violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Number of values must be between 1 and 10000.")]
    CountOutOfRange,

    #[error("Date must be between 2000-01-01 and now.")]
    TimestampOutOfRange,

    #[error("ExecutionTime must not be negative.")]
    ExecutionTimeNegative,

    #[error("Value must not be negative.")]
    ValueNegative,
}

/// Outcome of validating a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Verdict::Accepted => Ok(()),
            Verdict::Rejected(reason) => Err(reason),
        }
    }
}

/// Validate a batch against the current time.
///
/// Stops at the first violation: batch size first, then each record in
/// order (timestamp, execution time, value). Boundary values are accepted.
pub fn validate_batch(batch: &[Measurement], now: Timestamp) -> Verdict {
    if !(MIN_BATCH_LEN..=MAX_BATCH_LEN).contains(&batch.len()) {
        return Verdict::Rejected(Rejection::CountOutOfRange);
    }

    for m in batch {
        if let Err(reason) = check_record(m, now) {
            return Verdict::Rejected(reason);
        }
    }

    Verdict::Accepted
}

fn check_record(m: &Measurement, now: Timestamp) -> Result<(), Rejection> {
    if m.timestamp.timestamp() < EARLIEST_TIMESTAMP_SECS || m.timestamp > now {
        return Err(Rejection::TimestampOutOfRange);
    }
    if m.execution_time < 0.0 {
        return Err(Rejection::ExecutionTimeNegative);
    }
    if m.value < 0.0 {
        return Err(Rejection::ValueNegative);
    }
    Ok(())
}
