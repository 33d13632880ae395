//! Fixture records in the API's JSON shape.

use serde_json::{json, Value};

#[must_use]
pub fn event_json(id: &str, attendee_count: u64) -> Value {
    json!({
        "id": id,
        "name": format!("Event {id}"),
        "date": "2026-05-01T10:00:00Z",
        "attendeeCount": attendee_count,
        "location": { "city": "Oslo" }
    })
}

#[must_use]
pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "username": format!("user_{id}"),
        "displayName": format!("User {id}"),
        "avatar": format!("/v2/users/{id}/avatar")
    })
}

#[must_use]
pub fn activity_json(id: &str) -> Value {
    json!({ "id": id, "name": format!("Activity {id}"), "types": ["outdoor"] })
}

#[must_use]
pub fn notification_json(id: &str, read: bool) -> Value {
    json!({ "id": id, "message": format!("Notification {id}"), "read": read })
}

/// `count` activities with ids `prefix0`, `prefix1`, ...
#[must_use]
pub fn activities(prefix: &str, count: usize) -> Vec<Value> {
    (0..count).map(|i| activity_json(&format!("{prefix}{i}"))).collect()
}
