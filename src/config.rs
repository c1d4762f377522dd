use std::env;
use std::time::Duration;

/// Used when DATABASE_URL is absent so the server can still start.
pub const FALLBACK_DATABASE_URL: &str = "postgres://localhost:5432/face_attendance";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub s3_bucket: String,
    pub face_collection_prefix: String,
    // Key-value cache settings are accepted and reported but not used by any route.
    pub cache_url: Option<String>,
    pub cache_password: Option<String>,
    pub external_timeout_secs: u64,
    pub face_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            database_url: get("DATABASE_URL"),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: get("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "us-west-2".to_string()),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            s3_bucket: get("S3_BUCKET").unwrap_or_else(|| "cs184-faces-2".to_string()),
            face_collection_prefix: get("FACE_COLLECTION_PREFIX")
                .unwrap_or_else(|| "cs184-members".to_string()),
            cache_url: get("CACHE_URL"),
            cache_password: get("CACHE_PASSWORD"),
            external_timeout_secs: get("EXTERNAL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(10),
            face_max_retries: get("FACE_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    pub fn has_aws_credentials(&self) -> bool {
        self.aws_access_key_id.is_some() && self.aws_secret_access_key.is_some()
    }

    /// Names of the settings whose absence degrades the server.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.database_url.is_none() {
            missing.push("DATABASE_URL");
        }
        if self.aws_access_key_id.is_none() {
            missing.push("AWS_ACCESS_KEY_ID");
        }
        if self.aws_secret_access_key.is_none() {
            missing.push("AWS_SECRET_ACCESS_KEY");
        }
        if self.cache_url.is_none() {
            missing.push("CACHE_URL");
        }
        if self.cache_password.is_none() {
            missing.push("CACHE_PASSWORD");
        }
        missing
    }

    /// Missing settings are reported, never fatal.
    pub fn log_missing(&self) {
        for key in self.missing() {
            match key {
                "CACHE_URL" | "CACHE_PASSWORD" => {
                    tracing::warn!("Cache configuration incomplete: {} is not set", key)
                }
                _ => tracing::error!("Missing configuration: {} is not set", key),
            }
        }
    }
}
