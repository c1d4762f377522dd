use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};
use crate::models::{AttendanceEntry, AttendanceRecord, Event, Member, NewMember, Organization};

const MEMBER_COLUMNS: &str = "id, face_id, org_id, email, first_name, last_name";
const EVENT_COLUMNS: &str = "id, name, org_id, start_date";
const ORG_COLUMNS: &str = "id, name, email, password_hash";

/// Read/write access to organizations, members, events and attendance.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Fails with `Validation` when the email is already registered.
    async fn create_org(&self, name: &str, email: &str, password_hash: &str)
        -> AppResult<Organization>;

    async fn delete_org(&self, org_id: i64) -> AppResult<()>;

    async fn find_org(&self, org_id: i64) -> AppResult<Option<Organization>>;

    async fn find_org_by_email(&self, email: &str) -> AppResult<Option<Organization>>;

    async fn list_org_ids(&self) -> AppResult<Vec<i64>>;

    /// Fails with `Validation` when the organization does not exist.
    async fn create_event(
        &self,
        name: &str,
        org_id: i64,
        start_date: DateTime<Utc>,
    ) -> AppResult<Event>;

    async fn find_event(&self, event_id: i64) -> AppResult<Option<Event>>;

    async fn list_events(&self, org_id: i64) -> AppResult<Vec<Event>>;

    async fn create_member(&self, member: NewMember) -> AppResult<Member>;

    async fn find_member(&self, member_id: i64) -> AppResult<Option<Member>>;

    /// Members of `org_id` whose face is one of `face_ids`, in no particular order.
    async fn find_members_by_face_ids(&self, face_ids: &[String], org_id: i64)
        -> AppResult<Vec<Member>>;

    /// Lowest-id member with this email, optionally restricted to one organization.
    async fn find_member_by_email(&self, email: &str, org_id: Option<i64>)
        -> AppResult<Option<Member>>;

    async fn insert_attendance(&self, member_id: i64, event_id: i64) -> AppResult<AttendanceRecord>;

    async fn list_attendance_for_event(
        &self,
        event_id: i64,
        org_id: i64,
    ) -> AppResult<Vec<AttendanceEntry>>;
}

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds the candidate lookup with one bound placeholder per face id.
pub fn face_id_query(face_ids: &[String], org_id: i64) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM members WHERE face_id IN (",
        MEMBER_COLUMNS
    ));
    let mut separated = builder.separated(", ");
    for face_id in face_ids {
        separated.push_bind(face_id.as_str());
    }
    separated.push_unseparated(") AND org_id = ");
    builder.push_bind(org_id);
    builder
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl MemberDirectory for PgDirectory {
    async fn create_org(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<Organization> {
        sqlx::query_as::<_, Organization>(&format!(
            "INSERT INTO organizations (name, email, password_hash) VALUES ($1, $2, $3)
             RETURNING {}",
            ORG_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("An organization with that email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn delete_org(&self, org_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_org(&self, org_id: i64) -> AppResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {} FROM organizations WHERE id = $1",
            ORG_COLUMNS
        ))
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    async fn find_org_by_email(&self, email: &str) -> AppResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {} FROM organizations WHERE email = $1",
            ORG_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    async fn list_org_ids(&self) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM organizations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn create_event(
        &self,
        name: &str,
        org_id: i64,
        start_date: DateTime<Utc>,
    ) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (name, org_id, start_date) VALUES ($1, $2, $3) RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(name)
        .bind(org_id)
        .bind(start_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Validation("No organization found with that id".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_event(&self, event_id: i64) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn list_events(&self, org_id: i64) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE org_id = $1 ORDER BY start_date, id",
            EVENT_COLUMNS
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn create_member(&self, member: NewMember) -> AppResult<Member> {
        let created = sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (face_id, org_id, email, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(&member.face_id)
        .bind(member.org_id)
        .bind(&member.email)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_member(&self, member_id: i64) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_members_by_face_ids(
        &self,
        face_ids: &[String],
        org_id: i64,
    ) -> AppResult<Vec<Member>> {
        if face_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = face_id_query(face_ids, org_id);
        let members = query
            .build_query_as::<Member>()
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn find_member_by_email(
        &self,
        email: &str,
        org_id: Option<i64>,
    ) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members
             WHERE email = $1 AND ($2::BIGINT IS NULL OR org_id = $2)
             ORDER BY id
             LIMIT 1",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn insert_attendance(&self, member_id: i64, event_id: i64) -> AppResult<AttendanceRecord> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            "INSERT INTO attendance (member_id, event_id) VALUES ($1, $2)
             RETURNING id, member_id, event_id",
        )
        .bind(member_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_attendance_for_event(
        &self,
        event_id: i64,
        org_id: i64,
    ) -> AppResult<Vec<AttendanceEntry>> {
        let entries = sqlx::query_as::<_, AttendanceEntry>(
            "SELECT m.email, m.first_name, m.last_name, a.member_id
             FROM attendance a
             JOIN members m ON m.id = a.member_id
             WHERE a.event_id = $1 AND m.org_id = $2
             ORDER BY a.id",
        )
        .bind(event_id)
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
