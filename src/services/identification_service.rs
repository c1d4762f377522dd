use crate::error::{AppError, AppResult};
use crate::face::{rank_matches, FaceMatch, ImageRef, MATCH_THRESHOLD, MAX_MATCHES};
use crate::models::{IdentificationRequest, Member};
use crate::storage::{discard, generate_key};

use super::{require, Backends};

pub const NO_MATCH: &str = "No member found with that face in this org";

pub struct IdentificationService {
    backends: Backends,
}

impl IdentificationService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// The uploaded image is transient: it is deleted once the search finishes,
    /// whatever the outcome.
    pub async fn identify(&self, req: IdentificationRequest) -> AppResult<Member> {
        let org_id = require(req.org_id, "orgId")?;
        let upload = require(req.image.filter(|i| !i.data.is_empty()), "face")?;

        let key = generate_key();
        self.backends
            .storage
            .upload(&key, &upload.data, &upload.content_type)
            .await?;
        let image = ImageRef {
            bucket: self.backends.storage.bucket().to_string(),
            key: key.clone(),
        };

        let result = self.search(org_id, &image).await;
        discard(&self.backends.storage, &key).await;
        result
    }

    async fn search(&self, org_id: i64, image: &ImageRef) -> AppResult<Member> {
        let collection = self.backends.collections.for_org(org_id);
        let matches = self
            .backends
            .faces
            .search_faces(&collection, image, MATCH_THRESHOLD, MAX_MATCHES)
            .await
            .map_err(AppError::surface_face_error)?;

        if matches.is_empty() {
            return Err(AppError::User(NO_MATCH.to_string()));
        }

        let ranked = rank_matches(matches);
        let face_ids: Vec<String> = ranked.iter().map(|m| m.face_id.clone()).collect();
        let members = self
            .backends
            .directory
            .find_members_by_face_ids(&face_ids, org_id)
            .await?;

        let member = pick_best_match(&ranked, members, org_id)
            .ok_or_else(|| AppError::User(NO_MATCH.to_string()))?;
        tracing::info!(
            "Face identified: org_id={}, member_id={}, candidates={}",
            org_id,
            member.id,
            ranked.len()
        );
        Ok(member)
    }
}

/// The member of `org_id` owning the highest-ranked candidate face.
pub fn pick_best_match(ranked: &[FaceMatch], members: Vec<Member>, org_id: i64) -> Option<Member> {
    ranked.iter().find_map(|candidate| {
        members
            .iter()
            .find(|m| m.org_id == org_id && m.face_id == candidate.face_id)
            .cloned()
    })
}
