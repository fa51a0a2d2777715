//! Tiny helper shared by every component that stamps an `Operation`,
//! `PendingTask`, or `TRANSFER` message with the current time.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

pub fn mod_time_secs(metadata: &std::fs::Metadata) -> i64 {
	metadata.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()).map(|d| d.as_secs() as i64).unwrap_or(0)
}
