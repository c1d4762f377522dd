use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub org_id: i64,
    pub start_date: DateTime<Utc>,
}
