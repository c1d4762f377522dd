// Face recognition service abstraction

pub mod rekognition;

pub use rekognition::RekognitionFaceService;

use crate::error::AppResult;

/// Minimum similarity (percent) for a search hit.
pub const MATCH_THRESHOLD: f32 = 90.0;

/// Upper bound on search hits returned per image.
pub const MAX_MATCHES: i32 = 10;

/// An image already stored in the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

/// A face the service detected and persisted into a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFace {
    pub face_id: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub face_id: String,
    pub similarity: f32,
}

#[async_trait::async_trait]
pub trait FaceService: Send + Sync {
    /// Returns `false` when the collection already existed.
    async fn create_collection(&self, collection: &str) -> AppResult<bool>;

    /// Every detected face is added to the collection, whether or not the caller keeps it.
    async fn index_faces(&self, collection: &str, image: &ImageRef) -> AppResult<Vec<IndexedFace>>;

    /// Matches at or above `threshold`, highest similarity first, at most `max_results`.
    async fn search_faces(
        &self,
        collection: &str,
        image: &ImageRef,
        threshold: f32,
        max_results: i32,
    ) -> AppResult<Vec<FaceMatch>>;

    /// Returns the ids the service reports as deleted.
    async fn delete_faces(&self, collection: &str, face_ids: &[String]) -> AppResult<Vec<String>>;
}

/// Names the face collections, one per organization.
#[derive(Debug, Clone)]
pub struct CollectionNaming {
    prefix: String,
}

impl CollectionNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn for_org(&self, org_id: i64) -> String {
        format!("{}-org-{}", self.prefix, org_id)
    }
}

/// Highest similarity first; equal scores keep the service's order.
pub fn rank_matches(mut matches: Vec<FaceMatch>) -> Vec<FaceMatch> {
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}
