use crate::error::{AppError, AppResult};
use crate::models::{AttendanceEntry, AttendanceRecord, EventAttendanceRequest, MarkAttendanceRequest};

use super::{require, Backends};

pub const NO_EVENT: &str = "Sorry, no event was found with that id";
pub const NO_MEMBER_WITH_ID: &str = "Sorry, no member was found with that id";
pub const NO_MEMBER_WITH_EMAIL: &str = "Sorry, no member was found with that email address";

/// A supplied member id takes precedence over an email.
enum MemberLookup {
    Id(i64),
    Email(String),
}

pub struct AttendanceService {
    backends: Backends,
}

impl AttendanceService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Records one attendance row. Repeated calls record repeated rows.
    pub async fn record(&self, req: MarkAttendanceRequest) -> AppResult<AttendanceRecord> {
        let event_id = require(req.event_id, "eventId")?;
        let email = req
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let lookup = match (req.member_id, email) {
            (Some(member_id), _) => MemberLookup::Id(member_id),
            (None, Some(email)) => MemberLookup::Email(email),
            (None, None) => {
                return Err(AppError::Validation(
                    "memberId or email is required".to_string(),
                ))
            }
        };

        let directory = &self.backends.directory;
        let event = directory
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::User(NO_EVENT.to_string()))?;

        let member = match lookup {
            MemberLookup::Id(member_id) => directory
                .find_member(member_id)
                .await?
                .filter(|m| m.org_id == event.org_id)
                .ok_or_else(|| AppError::User(NO_MEMBER_WITH_ID.to_string()))?,
            MemberLookup::Email(email) => directory
                .find_member_by_email(&email, Some(event.org_id))
                .await?
                .ok_or_else(|| AppError::User(NO_MEMBER_WITH_EMAIL.to_string()))?,
        };

        let record = directory.insert_attendance(member.id, event.id).await?;
        tracing::info!(
            "Attendance recorded: attendance_id={}, event_id={}, member_id={}",
            record.id,
            event.id,
            member.id
        );
        Ok(record)
    }

    pub async fn list(&self, req: EventAttendanceRequest) -> AppResult<Vec<AttendanceEntry>> {
        let event_id = require(req.event_id, "eventId")?;
        let org_id = require(req.org_id, "orgId")?;
        self.backends
            .directory
            .list_attendance_for_event(event_id, org_id)
            .await
    }
}
