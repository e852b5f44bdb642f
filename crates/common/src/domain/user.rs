use std::collections::HashMap;

use crate::domain::permission::{Permission, PermissionSet};
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// User domain entity.
///
/// Membership and permission are the same relation: a user belongs to an
/// organization exactly when `permissions` has a non-empty entry for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Holds every permission in every organization
    pub is_admin: bool,
    pub permissions: HashMap<String, PermissionSet>,
    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Permissions held in one organization; empty when not a member
    pub fn permissions_in(&self, organization_id: &str) -> PermissionSet {
        self.permissions
            .get(organization_id)
            .copied()
            .unwrap_or_default()
    }

    /// Union of the permissions held across every organization
    pub fn all_permissions(&self) -> PermissionSet {
        self.permissions
            .values()
            .fold(PermissionSet::empty(), |acc, set| acc.union(set))
    }

    pub fn is_member_of(&self, organization_id: &str) -> bool {
        self.is_admin || !self.permissions_in(organization_id).is_empty()
    }

    /// Whether any organization grants this user an approval-capable permission
    pub fn has_any_approval_permission(&self) -> bool {
        self.is_admin
            || self
                .all_permissions()
                .iter()
                .any(|p: Permission| p.is_approval_permission())
    }
}

/// Internal input with generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserRepoInputWithId {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub permissions: HashMap<String, PermissionSet>,
}

/// Input for getting a user by ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserRepoInput {
    pub user_id: String,
}

/// Input for replacing a user's permission set in one organization.
///
/// An empty `permissions` set removes the membership entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetUserPermissionsRepoInput {
    pub user_id: String,
    pub organization_id: String,
    pub permissions: PermissionSet,
    pub expected_version: u64,
}

/// Repository trait for user storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user (id already generated by the caller)
    async fn create_user(&self, input: CreateUserRepoInputWithId) -> DomainResult<User>;

    /// Get a user by ID
    async fn get_user(&self, input: GetUserRepoInput) -> DomainResult<Option<User>>;

    /// Replace the user's permissions for one organization if the version still matches
    async fn set_user_permissions(&self, input: SetUserPermissionsRepoInput) -> DomainResult<User>;
}
