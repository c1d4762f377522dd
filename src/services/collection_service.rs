use crate::error::{AppError, AppResult};

use super::Backends;

pub struct CollectionService {
    backends: Backends,
}

impl CollectionService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Ensures the face collection of one organization, or of every organization
    /// when `org_id` is absent. Returns the names that were newly created;
    /// collections that already exist are not an error.
    pub async fn ensure(&self, org_id: Option<i64>) -> AppResult<Vec<String>> {
        let org_ids = match org_id {
            Some(org_id) => {
                if self.backends.directory.find_org(org_id).await?.is_none() {
                    return Err(AppError::Validation(
                        "No organization found with that id".to_string(),
                    ));
                }
                vec![org_id]
            }
            None => self.backends.directory.list_org_ids().await?,
        };

        let mut created = Vec::new();
        for org_id in org_ids {
            let collection = self.backends.collections.for_org(org_id);
            if self.backends.faces.create_collection(&collection).await? {
                created.push(collection);
            }
        }
        Ok(created)
    }
}
