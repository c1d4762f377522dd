use std::time::Duration;

use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::error::{AppError, AppResult};
use crate::retry::with_timeout;

use super::StorageBackend;

pub struct S3Backend {
    bucket: Box<Bucket>,
    bucket_name: String,
    timeout: Duration,
}

impl S3Backend {
    /// Without explicit keys the bucket is opened anonymously and uploads will be rejected.
    pub fn new(
        bucket_name: String,
        region: &str,
        access_key: Option<&str>,
        secret_key: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let region: Region = region
            .parse()
            .map_err(|e| AppError::Storage(format!("S3 region error: {}", e)))?;

        let credentials = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Credentials::new(
                Some(access_key),
                Some(secret_key),
                None, // security token
                None, // session token
                None, // profile
            ),
            _ => Credentials::anonymous(),
        }
        .map_err(|e| AppError::Storage(format!("S3 credentials error: {}", e)))?;

        let bucket = Bucket::new(&bucket_name, region, credentials)
            .map_err(|e| AppError::Storage(format!("S3 bucket error: {}", e)))?;

        Ok(Self {
            bucket,
            bucket_name,
            timeout,
        })
    }
}

// The client is built without `fail-on-err`, so error statuses arrive as Ok responses.
fn check_status(operation: &str, status: u16) -> AppResult<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(AppError::Storage(format!("S3 {} failed: status {}", operation, status)))
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Backend {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        let response = with_timeout(
            self.timeout,
            "S3 upload",
            self.bucket.put_object_with_content_type(key, data, content_type),
        )
        .await?
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {}", e)))?;
        check_status("upload", response.status_code())?;

        tracing::info!("S3 upload: bucket={}, key={}, size={}", self.bucket_name, key, data.len());
        Ok(format!("s3://{}/{}", self.bucket_name, key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let response = with_timeout(self.timeout, "S3 delete", self.bucket.delete_object(key))
            .await?
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {}", e)))?;
        check_status("delete", response.status_code())?;

        tracing::info!("S3 delete: bucket={}, key={}", self.bucket_name, key);
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket_name
    }
}
