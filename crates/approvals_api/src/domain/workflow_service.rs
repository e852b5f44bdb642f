use common::auth::AuthorizationProvider;
use common::domain::{
    DomainError, DomainResult, GetOrganizationRepoInput, Organization, OrganizationRepository,
    Permission, PermissionMode, PermissionSet, Task, UpdateWorkflowRepoInput, UserRepository,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::acting_user::load_acting_user;

/// One workflow step as submitted by a caller, before catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TaskDefinition {
    #[garde(length(min = 1))]
    pub required_permission: String,
}

impl TaskDefinition {
    fn into_task(self) -> DomainResult<Task> {
        let required_permission = self.required_permission.parse::<Permission>()?;
        Ok(Task::new(required_permission))
    }
}

impl From<Task> for TaskDefinition {
    fn from(task: Task) -> Self {
        Self {
            required_permission: task.required_permission.as_str().to_string(),
        }
    }
}

/// Input to read an organization's workflow
#[derive(Debug, Clone, Validate)]
pub struct GetWorkflowInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
}

/// Input to replace an organization's workflow
#[derive(Debug, Clone, Validate)]
pub struct SetWorkflowInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(dive)]
    pub tasks: Vec<TaskDefinition>,
}

/// Domain service for reading and replacing approval workflows
pub struct WorkflowService {
    organization_repository: Arc<dyn OrganizationRepository>,
    user_repository: Arc<dyn UserRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
}

impl WorkflowService {
    pub fn new(
        organization_repository: Arc<dyn OrganizationRepository>,
        user_repository: Arc<dyn UserRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            organization_repository,
            user_repository,
            authorization_provider,
        }
    }

    /// Get the ordered workflow of an organization; any member may read it
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id))]
    pub async fn get_workflow(&self, input: GetWorkflowInput) -> DomainResult<Vec<Task>> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let organization = self.load_organization(&input.organization_id).await?;

        self.authorization_provider.require_permissions(
            &user,
            PermissionSet::all(),
            Some(&organization.id),
            PermissionMode::Any,
        )?;

        debug!(steps = organization.workflow.len(), "workflow loaded");
        Ok(organization.workflow)
    }

    /// Replace an organization's workflow wholesale.
    ///
    /// Requests already in flight keep their stored step index; an index at or
    /// past the new length reads as approved.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id, steps = input.tasks.len()))]
    pub async fn set_workflow(&self, input: SetWorkflowInput) -> DomainResult<Organization> {
        common::garde::validate_struct(&input)?;

        let workflow = input
            .tasks
            .into_iter()
            .map(TaskDefinition::into_task)
            .collect::<DomainResult<Vec<_>>>()
            .map_err(|e| match e {
                DomainError::UnknownPermission(name) => DomainError::ValidationError(format!(
                    "workflow step requires unknown permission {}",
                    name
                )),
                other => other,
            })?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let organization = self.load_organization(&input.organization_id).await?;

        self.authorization_provider.require_permissions(
            &user,
            Permission::EditWorkflow.into(),
            Some(&organization.id),
            PermissionMode::All,
        )?;

        let updated = self
            .organization_repository
            .update_workflow(UpdateWorkflowRepoInput {
                organization_id: organization.id,
                workflow,
                expected_version: organization.version,
            })
            .await?;

        info!(
            previous_steps = organization.workflow.len(),
            steps = updated.workflow.len(),
            version = updated.version,
            "workflow replaced"
        );
        Ok(updated)
    }

    async fn load_organization(&self, organization_id: &str) -> DomainResult<Organization> {
        self.organization_repository
            .get_organization(GetOrganizationRepoInput {
                organization_id: organization_id.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::OrganizationNotFound(organization_id.to_string()))
    }
}
