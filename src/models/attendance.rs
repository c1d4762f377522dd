use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub member_id: i64,
    pub event_id: i64,
}

/// One row of an event's attendance listing.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub member_id: i64,
}
