use chrono::{Duration, Utc};
use tokio::time::Instant;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Current UTC time in milliseconds, the unit the Smappee API expects for ranges.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// UTC milliseconds `offset` away from now (negative offsets point into the past).
pub fn millis_from_now(offset: Duration) -> i64 {
    (Utc::now() + offset).timestamp_millis()
}

pub fn get_instant() -> Instant {
    Instant::now()
}
