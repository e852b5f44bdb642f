use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{
    CreateUserRepoInputWithId, DomainError, DomainResult, GetUserRepoInput,
    SetUserPermissionsRepoInput, User, UserRepository,
};

/// In-memory implementation of UserRepository using HashMap
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, input), fields(user_id = %input.id))]
    async fn create_user(&self, input: CreateUserRepoInputWithId) -> DomainResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&input.id) {
            return Err(DomainError::UserAlreadyExists(input.id));
        }

        let now = Utc::now();
        let mut permissions = input.permissions;
        permissions.retain(|_, set| !set.is_empty());

        let user = User {
            id: input.id,
            name: input.name,
            email: input.email,
            is_admin: input.is_admin,
            permissions,
            version: 1,
            created_at: Some(now),
            updated_at: Some(now),
        };
        users.insert(user.id.clone(), user.clone());

        debug!(user_id = %user.id, "User stored");
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %input.user_id))]
    async fn get_user(&self, input: GetUserRepoInput) -> DomainResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&input.user_id).cloned())
    }

    #[instrument(skip(self), fields(user_id = %input.user_id, organization_id = %input.organization_id))]
    async fn set_user_permissions(&self, input: SetUserPermissionsRepoInput) -> DomainResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&input.user_id)
            .ok_or_else(|| DomainError::UserNotFound(input.user_id.clone()))?;

        if user.version != input.expected_version {
            return Err(DomainError::Conflict {
                entity: "user",
                id: input.user_id,
                expected: input.expected_version,
                actual: user.version,
            });
        }

        if input.permissions.is_empty() {
            user.permissions.remove(&input.organization_id);
        } else {
            user.permissions.insert(input.organization_id, input.permissions);
        }
        user.version += 1;
        user.updated_at = Some(Utc::now());

        debug!(version = user.version, "User permissions replaced");
        Ok(user.clone())
    }
}
