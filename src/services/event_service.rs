use chrono::DateTime;

use crate::error::{AppError, AppResult};
use crate::models::{CreateEventRequest, Event, OrgScopedRequest};

use super::{require, require_text, Backends};

pub struct EventService {
    backends: Backends,
}

impl EventService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub async fn create(&self, req: CreateEventRequest) -> AppResult<Event> {
        let name = require_text(req.name, "name")?;
        let org_id = require(req.org_id, "orgId")?;
        let start_secs = require(req.start_date, "startDate")?;
        let start_date = DateTime::from_timestamp(start_secs, 0)
            .ok_or_else(|| AppError::Validation("startDate is out of range".to_string()))?;

        let event = self
            .backends
            .directory
            .create_event(&name, org_id, start_date)
            .await?;
        tracing::info!("Event created: event_id={}, org_id={}", event.id, org_id);
        Ok(event)
    }

    pub async fn list(&self, req: OrgScopedRequest) -> AppResult<Vec<Event>> {
        let org_id = require(req.org_id, "orgId")?;
        self.backends.directory.list_events(org_id).await
    }
}
