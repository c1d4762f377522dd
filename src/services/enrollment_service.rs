use crate::error::{AppError, AppResult};
use crate::face::{ImageRef, IndexedFace};
use crate::models::{EnrollmentRequest, ImageUpload, Member, NewMember};
use crate::storage::{discard, generate_key};

use super::{remove_faces, require, require_text, Backends};

pub const NO_FACES: &str = "No faces detected. Please try again";

pub fn too_many_faces(count: usize) -> String {
    format!(
        "Too many faces in your picture ({} detected). Please only send one face.",
        count
    )
}

/// Upload, index exactly one face, then insert the member.
pub struct EnrollmentService {
    backends: Backends,
}

struct ValidEnrollment {
    org_id: i64,
    email: String,
    first_name: String,
    last_name: String,
    image: ImageUpload,
}

impl EnrollmentService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub async fn enroll(&self, req: EnrollmentRequest) -> AppResult<Member> {
        let req = Self::validate(req)?;

        if self.backends.directory.find_org(req.org_id).await?.is_none() {
            return Err(AppError::Validation(
                "No organization found with that id".to_string(),
            ));
        }

        let key = generate_key();
        self.backends
            .storage
            .upload(&key, &req.image.data, &req.image.content_type)
            .await?;
        let image = ImageRef {
            bucket: self.backends.storage.bucket().to_string(),
            key: key.clone(),
        };

        let result = self.index_and_insert(&image, req).await;
        if result.is_err() {
            discard(&self.backends.storage, &key).await;
        }
        result
    }

    fn validate(req: EnrollmentRequest) -> AppResult<ValidEnrollment> {
        let org_id = require(req.org_id, "orgId")?;
        let email = require_text(req.email, "email")?;
        let first_name = require_text(req.first_name, "firstName")?;
        let last_name = require_text(req.last_name, "lastName")?;
        let image = require(req.image.filter(|i| !i.data.is_empty()), "face")?;
        Ok(ValidEnrollment {
            org_id,
            email,
            first_name,
            last_name,
            image,
        })
    }

    async fn index_and_insert(&self, image: &ImageRef, req: ValidEnrollment) -> AppResult<Member> {
        let collection = self.backends.collections.for_org(req.org_id);
        let faces = self
            .backends
            .faces
            .index_faces(&collection, image)
            .await
            .map_err(AppError::surface_face_error)?;

        let face = self.single_face(&collection, faces)?;

        let new_member = NewMember {
            face_id: face.face_id.clone(),
            org_id: req.org_id,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        };

        match self.backends.directory.create_member(new_member).await {
            Ok(member) => {
                tracing::info!(
                    "Member enrolled: member_id={}, org_id={}, face_id={}",
                    member.id,
                    member.org_id,
                    member.face_id
                );
                Ok(member)
            }
            Err(e) => {
                tracing::error!(
                    "Member insert failed after indexing, removing face: org_id={}, face_id={}, error={}",
                    req.org_id,
                    face.face_id,
                    e
                );
                remove_faces(
                    self.backends.faces.as_ref(),
                    &collection,
                    std::slice::from_ref(&face.face_id),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Rejects zero or several faces. Extra faces were already persisted by the
    /// service, so their removal is started in the background.
    fn single_face(&self, collection: &str, mut faces: Vec<IndexedFace>) -> AppResult<IndexedFace> {
        match faces.len() {
            0 => Err(AppError::User(NO_FACES.to_string())),
            1 => Ok(faces.remove(0)),
            count => {
                let face_ids: Vec<String> = faces.into_iter().map(|f| f.face_id).collect();
                tracing::info!(
                    "Rejecting enrollment image with {} faces: collection={}",
                    count,
                    collection
                );
                let service = self.backends.faces.clone();
                let collection = collection.to_string();
                tokio::spawn(async move {
                    remove_faces(service.as_ref(), &collection, &face_ids).await;
                });
                Err(AppError::User(too_many_faces(count)))
            }
        }
    }
}
