// HTTP surface: JSON routes under /api/v1 plus the two multipart face routes

pub mod handlers;
pub mod multipart;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::services::{
    AttendanceService, Backends, CollectionService, EnrollmentService, EventService,
    IdentificationService, OrganizationService,
};

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Workflows shared by every handler.
pub struct AppState {
    pub collections: CollectionService,
    pub organizations: OrganizationService,
    pub events: EventService,
    pub enrollment: EnrollmentService,
    pub identification: IdentificationService,
    pub attendance: AttendanceService,
}

impl AppState {
    pub fn new(backends: Backends) -> Self {
        Self {
            collections: CollectionService::new(backends.clone()),
            organizations: OrganizationService::new(backends.clone()),
            events: EventService::new(backends.clone()),
            enrollment: EnrollmentService::new(backends.clone()),
            identification: IdentificationService::new(backends.clone()),
            attendance: AttendanceService::new(backends),
        }
    }
}

pub fn create_router(backends: Backends) -> Router {
    let state = Arc::new(AppState::new(backends));

    let api = Router::new()
        .route("/createCollection", post(handlers::create_collection))
        .route("/createOrg", post(handlers::create_org))
        .route("/orgLogin", post(handlers::org_login))
        .route("/createEvent", post(handlers::create_event))
        .route("/getEvents", post(handlers::get_events))
        .route("/addMember", post(handlers::add_member))
        .route("/checkFace", post(handlers::check_face))
        .route("/markAttendance", post(handlers::mark_attendance))
        .route("/getEventAttendance", post(handlers::get_event_attendance));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
