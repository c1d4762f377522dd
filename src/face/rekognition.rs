use std::time::Duration;

use aws_sdk_rekognition::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::retry::{retry, with_timeout, RetryPolicy};

use super::{FaceMatch, FaceService, ImageRef, IndexedFace};

/// Service error codes worth another attempt.
const RETRYABLE_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "InternalServerError",
    "ServiceUnavailableException",
];

/// Rejections caused by the submitted image; their message is safe to show callers.
const CALLER_FACING_CODES: &[&str] = &[
    "InvalidParameterException",
    "InvalidImageFormatException",
    "ImageTooLargeException",
];

/// Replaces the service message, which names the internal collection id.
const MISSING_COLLECTION: &str =
    "Face collection not found for this organization. Please create it first";

pub struct RekognitionFaceService {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RekognitionFaceService {
    pub fn new(client: Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            retry,
        }
    }

    /// SDK-level retries are disabled; retries happen in `retry` for idempotent calls only.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled());

        if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(aws_sdk_rekognition::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "face-attendance-config",
            ));
        }

        let sdk_config = loader.load().await;
        Self::new(
            Client::new(&sdk_config),
            config.external_timeout(),
            RetryPolicy::new(config.face_max_retries),
        )
    }
}

fn to_image(image: &ImageRef) -> Image {
    Image::builder()
        .s3_object(
            S3Object::builder()
                .bucket(image.bucket.clone())
                .name(image.key.clone())
                .build(),
        )
        .build()
}

fn is_retryable_code(code: &str) -> bool {
    RETRYABLE_CODES.contains(&code)
}

/// Transport failures are retryable; service errors are classified by code.
fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            tracing::warn!("{} transport failure: {}", operation, DisplayErrorContext(&err));
            AppError::face(true, format!("{} could not reach the face service", operation))
        }
        SdkError::ServiceError(service_err) => classify_service_error(operation, service_err.err()),
        _ => AppError::Internal(format!("{} failed: {}", operation, DisplayErrorContext(&err))),
    }
}

/// Only image rejections keep the service message. Anything else (permissions,
/// bucket access, unknown codes) may name account internals and becomes a
/// generic service error.
fn classify_service_error<E: ProvideErrorMetadata>(operation: &str, err: &E) -> AppError {
    let code = err.code().unwrap_or("Unknown");
    let message = err.message().unwrap_or(code);
    tracing::warn!("{} rejected: code={}, message={}", operation, code, message);

    if code == "ResourceNotFoundException" {
        AppError::face(false, MISSING_COLLECTION)
    } else if is_retryable_code(code) {
        AppError::face(true, format!("{} failed with {}", operation, code))
    } else if CALLER_FACING_CODES.contains(&code) {
        AppError::face(false, message)
    } else {
        AppError::Internal(format!("{} failed: code={}, message={}", operation, code, message))
    }
}

#[async_trait::async_trait]
impl FaceService for RekognitionFaceService {
    async fn create_collection(&self, collection: &str) -> AppResult<bool> {
        retry(self.retry, "CreateCollection", move || async move {
            let result = with_timeout(
                self.timeout,
                "CreateCollection",
                self.client.create_collection().collection_id(collection).send(),
            )
            .await?;

            match result {
                Ok(output) => {
                    tracing::info!(
                        "Created face collection: id={}, arn={}",
                        collection,
                        output.collection_arn().unwrap_or_default()
                    );
                    Ok(true)
                }
                Err(e)
                    if e
                        .as_service_error()
                        .map(|se| se.is_resource_already_exists_exception())
                        .unwrap_or(false) =>
                {
                    tracing::info!("Face collection already exists: id={}", collection);
                    Ok(false)
                }
                Err(e) => Err(classify("CreateCollection", e)),
            }
        })
        .await
    }

    async fn index_faces(&self, collection: &str, image: &ImageRef) -> AppResult<Vec<IndexedFace>> {
        // Not retried: a repeated call can index the same faces twice.
        let output = with_timeout(
            self.timeout,
            "IndexFaces",
            self.client
                .index_faces()
                .collection_id(collection)
                .image(to_image(image))
                .send(),
        )
        .await?
        .map_err(|e| classify("IndexFaces", e))?;

        let faces: Vec<IndexedFace> = output
            .face_records()
            .iter()
            .filter_map(|record| record.face())
            .filter_map(|face| {
                face.face_id().map(|face_id| IndexedFace {
                    face_id: face_id.to_string(),
                    confidence: face.confidence(),
                })
            })
            .collect();

        tracing::info!(
            "IndexFaces: collection={}, key={}, faces={}",
            collection,
            image.key,
            faces.len()
        );
        Ok(faces)
    }

    async fn search_faces(
        &self,
        collection: &str,
        image: &ImageRef,
        threshold: f32,
        max_results: i32,
    ) -> AppResult<Vec<FaceMatch>> {
        retry(self.retry, "SearchFacesByImage", move || async move {
            let output = with_timeout(
                self.timeout,
                "SearchFacesByImage",
                self.client
                    .search_faces_by_image()
                    .collection_id(collection)
                    .image(to_image(image))
                    .face_match_threshold(threshold)
                    .max_faces(max_results)
                    .send(),
            )
            .await?
            .map_err(|e| classify("SearchFacesByImage", e))?;

            let matches: Vec<FaceMatch> = output
                .face_matches()
                .iter()
                .filter_map(|m| {
                    let face_id = m.face().and_then(|face| face.face_id())?;
                    Some(FaceMatch {
                        face_id: face_id.to_string(),
                        similarity: m.similarity().unwrap_or_default(),
                    })
                })
                .collect();

            tracing::debug!(
                "SearchFacesByImage: collection={}, key={}, matches={}",
                collection,
                image.key,
                matches.len()
            );
            Ok(matches)
        })
        .await
    }

    async fn delete_faces(&self, collection: &str, face_ids: &[String]) -> AppResult<Vec<String>> {
        if face_ids.is_empty() {
            return Ok(Vec::new());
        }

        retry(self.retry, "DeleteFaces", move || async move {
            let output = with_timeout(
                self.timeout,
                "DeleteFaces",
                self.client
                    .delete_faces()
                    .collection_id(collection)
                    .set_face_ids(Some(face_ids.to_vec()))
                    .send(),
            )
            .await?
            .map_err(|e| classify("DeleteFaces", e))?;

            Ok(output.deleted_faces().to_vec())
        })
        .await
    }
}
