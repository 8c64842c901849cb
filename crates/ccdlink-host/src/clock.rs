use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in unix seconds.
pub type Clock = fn() -> i64;

/// Current system time in unix seconds. Times before the epoch read as 0.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
