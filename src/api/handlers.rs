use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    AttendanceEntry, AttendanceRecord, CreateCollectionRequest, CreateEventRequest,
    CreateOrgRequest, Event, EventAttendanceRequest, MarkAttendanceRequest, Member,
    OrgLoginRequest, OrgScopedRequest, Organization,
};

use super::multipart::FaceForm;
use super::AppState;

type Payload<T> = Result<Json<T>, JsonRejection>;

fn body<T>(payload: Payload<T>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[derive(Serialize)]
pub struct CollectionsCreated {
    pub created: Vec<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Body is optional: without `orgId` every organization is backfilled.
/// A request without a JSON body counts as empty; a malformed body is rejected.
pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    payload: Payload<CreateCollectionRequest>,
) -> AppResult<Json<CollectionsCreated>> {
    let req = match payload {
        Err(JsonRejection::MissingJsonContentType(_)) => CreateCollectionRequest::default(),
        other => body(other)?,
    };
    let created = state.collections.ensure(req.org_id).await?;
    Ok(Json(CollectionsCreated { created }))
}

pub async fn create_org(
    State(state): State<Arc<AppState>>,
    payload: Payload<CreateOrgRequest>,
) -> AppResult<Json<Organization>> {
    let org = state.organizations.register(body(payload)?).await?;
    Ok(Json(org))
}

pub async fn org_login(
    State(state): State<Arc<AppState>>,
    payload: Payload<OrgLoginRequest>,
) -> AppResult<Json<Organization>> {
    let org = state.organizations.login(body(payload)?).await?;
    Ok(Json(org))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    payload: Payload<CreateEventRequest>,
) -> AppResult<Json<Event>> {
    let event = state.events.create(body(payload)?).await?;
    Ok(Json(event))
}

pub async fn get_events(
    State(state): State<Arc<AppState>>,
    payload: Payload<OrgScopedRequest>,
) -> AppResult<Json<Vec<Event>>> {
    let events = state.events.list(body(payload)?).await?;
    Ok(Json(events))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<Member>> {
    let req = FaceForm::read(multipart).await?.into_enrollment()?;
    let member = state.enrollment.enroll(req).await?;
    Ok(Json(member))
}

pub async fn check_face(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<Member>> {
    let req = FaceForm::read(multipart).await?.into_identification()?;
    let member = state.identification.identify(req).await?;
    Ok(Json(member))
}

pub async fn mark_attendance(
    State(state): State<Arc<AppState>>,
    payload: Payload<MarkAttendanceRequest>,
) -> AppResult<Json<AttendanceRecord>> {
    let record = state.attendance.record(body(payload)?).await?;
    Ok(Json(record))
}

pub async fn get_event_attendance(
    State(state): State<Arc<AppState>>,
    payload: Payload<EventAttendanceRequest>,
) -> AppResult<Json<Vec<AttendanceEntry>>> {
    let entries = state.attendance.list(body(payload)?).await?;
    Ok(Json(entries))
}
