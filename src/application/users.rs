use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::mutation::run_to_completion;
use crate::application::repos::UsersRepo;
use crate::cache::CacheInvalidator;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    invalidator: Arc<CacheInvalidator>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>, invalidator: Arc<CacheInvalidator>) -> Self {
        Self { users, invalidator }
    }

    /// Remove a user and their favorites.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let this = self.clone();
        run_to_completion("delete_user", async move {
            if !this.users.delete_user(id).await? {
                return Err(AppError::not_found("user"));
            }
            this.invalidator.user_deleted(id).await?;
            info!(user_id = %id, "User deleted");
            Ok(())
        })
        .await
    }
}
