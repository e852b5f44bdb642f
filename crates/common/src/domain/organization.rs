use crate::domain::permission::Permission;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of an organization's approval workflow.
///
/// A task's position in [`Organization::workflow`] is its order; there is no
/// separate priority field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub required_permission: Permission,
}

impl Task {
    pub fn new(required_permission: Permission) -> Self {
        Self {
            required_permission,
        }
    }
}

/// Organization domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub workflow: Vec<Task>,
    /// Revision bumped on every write, used for compare-and-swap updates
    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal input with generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrganizationRepoInputWithId {
    pub id: String,
    pub name: String,
}

/// Input for getting an organization by ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOrganizationRepoInput {
    pub organization_id: String,
}

/// Input for replacing an organization's workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateWorkflowRepoInput {
    pub organization_id: String,
    pub workflow: Vec<Task>,
    /// Version the caller read; the write fails with `Conflict` if it moved
    pub expected_version: u64,
}

/// Input for deleting an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOrganizationRepoInput {
    pub organization_id: String,
    pub expected_version: u64,
}

/// Repository trait for organization storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Create a new organization with an empty workflow
    async fn create_organization(
        &self,
        input: CreateOrganizationRepoInputWithId,
    ) -> DomainResult<Organization>;

    /// Get an organization by ID
    async fn get_organization(
        &self,
        input: GetOrganizationRepoInput,
    ) -> DomainResult<Option<Organization>>;

    /// Replace the workflow wholesale if the stored version still matches
    async fn update_workflow(&self, input: UpdateWorkflowRepoInput) -> DomainResult<Organization>;

    /// Remove an organization if the stored version still matches
    async fn delete_organization(&self, input: DeleteOrganizationRepoInput) -> DomainResult<()>;
}
