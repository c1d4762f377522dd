use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A member enrolled with exactly one indexed face.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub face_id: String,
    pub org_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Member fields known before the directory assigns an id.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub face_id: String,
    pub org_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewMember {
    pub fn into_member(self, id: i64) -> Member {
        Member {
            id,
            face_id: self.face_id,
            org_id: self.org_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}
