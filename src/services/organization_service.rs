use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::error::{AppError, AppResult};
use crate::models::{CreateOrgRequest, OrgLoginRequest, Organization};

use super::{require_text, Backends};

pub const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub struct OrganizationService {
    backends: Backends,
}

impl OrganizationService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Registers an organization and creates its face collection.
    /// The organization row is removed again if the collection cannot be created.
    pub async fn register(&self, req: CreateOrgRequest) -> AppResult<Organization> {
        let name = require_text(req.name, "name")?;
        let email = require_text(req.email, "email")?;
        let password = require_text(req.password, "password")?;

        let password_hash = hash_password(password).await?;
        let org = self
            .backends
            .directory
            .create_org(&name, &email, &password_hash)
            .await?;

        let collection = self.backends.collections.for_org(org.id);
        if let Err(e) = self.backends.faces.create_collection(&collection).await {
            tracing::error!(
                "Failed to create face collection for new organization: org_id={}, collection={}, error={}",
                org.id,
                collection,
                e
            );
            if let Err(cleanup) = self.backends.directory.delete_org(org.id).await {
                tracing::error!(
                    "Failed to roll back organization: org_id={}, error={}",
                    org.id,
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!("Organization registered: org_id={}, collection={}", org.id, collection);
        Ok(org)
    }

    pub async fn login(&self, req: OrgLoginRequest) -> AppResult<Organization> {
        let email = require_text(req.email, "email")?;
        let password = require_text(req.password, "password")?;

        let org = self
            .backends
            .directory
            .find_org_by_email(&email)
            .await?
            .ok_or_else(|| AppError::User(BAD_CREDENTIALS.to_string()))?;

        if !verify_password(password, org.password_hash.clone()).await? {
            tracing::debug!("Rejected login: org_id={}", org.id);
            return Err(AppError::User(BAD_CREDENTIALS.to_string()));
        }
        Ok(org)
    }
}

/// Argon2 PHC string with a random salt, computed off the async workers.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hash task failed: {}", e)))?
}

/// An unparseable stored hash counts as a mismatch.
pub async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is invalid: {}", e);
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verify task failed: {}", e)))
}
