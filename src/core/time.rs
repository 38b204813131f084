//! Timestamp and event-id helpers shared by the journal and persistence layer.

use ulid::Ulid;

/// Unix-epoch seconds with a `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

/// Fresh sortable identifier for journal events and backup files.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
