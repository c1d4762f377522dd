pub mod attendance_service;
pub mod collection_service;
pub mod enrollment_service;
pub mod event_service;
pub mod identification_service;
pub mod organization_service;

#[cfg(test)]
pub(crate) mod testing;

pub use attendance_service::AttendanceService;
pub use collection_service::CollectionService;
pub use enrollment_service::EnrollmentService;
pub use event_service::EventService;
pub use identification_service::IdentificationService;
pub use organization_service::OrganizationService;

use std::sync::Arc;

use crate::db::MemberDirectory;
use crate::error::{AppError, AppResult};
use crate::face::{CollectionNaming, FaceService};
use crate::storage::StorageBackend;

/// Shared handles to the external collaborators. Cloning is cheap.
#[derive(Clone)]
pub struct Backends {
    pub directory: Arc<dyn MemberDirectory>,
    pub storage: Arc<dyn StorageBackend>,
    pub faces: Arc<dyn FaceService>,
    pub collections: CollectionNaming,
}

pub(crate) fn require<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Trimmed, non-blank text field.
pub(crate) fn require_text(value: Option<String>, field: &str) -> AppResult<String> {
    let text = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    require(text, field)
}

/// Best-effort removal of faces from a collection. Failures are logged only.
pub(crate) async fn remove_faces(faces: &dyn FaceService, collection: &str, face_ids: &[String]) {
    match faces.delete_faces(collection, face_ids).await {
        Ok(deleted) if deleted.len() != face_ids.len() => {
            tracing::error!(
                "Didn't delete all faces: collection={}, requested={:?}, deleted={:?}",
                collection,
                face_ids,
                deleted
            );
        }
        Ok(_) => {
            tracing::info!("Deleted faces: collection={}, count={}", collection, face_ids.len());
        }
        Err(e) => {
            tracing::error!(
                "Failed to delete faces: collection={}, face_ids={:?}, error={}",
                collection,
                face_ids,
                e
            );
        }
    }
}
