use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{
    CreateOrganizationRepoInputWithId, DeleteOrganizationRepoInput, DomainError, DomainResult,
    GetOrganizationRepoInput, Organization, OrganizationRepository, UpdateWorkflowRepoInput,
};

/// In-memory implementation of OrganizationRepository using HashMap
#[derive(Clone, Default)]
pub struct InMemoryOrganizationRepository {
    organizations: Arc<RwLock<HashMap<String, Organization>>>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    #[instrument(skip(self), fields(organization_id = %input.id))]
    async fn create_organization(
        &self,
        input: CreateOrganizationRepoInputWithId,
    ) -> DomainResult<Organization> {
        let mut organizations = self.organizations.write().await;
        if organizations.contains_key(&input.id) {
            return Err(DomainError::OrganizationAlreadyExists(input.id));
        }

        let now = Utc::now();
        let organization = Organization {
            id: input.id,
            name: input.name,
            workflow: Vec::new(),
            version: 1,
            created_at: Some(now),
            updated_at: Some(now),
        };
        organizations.insert(organization.id.clone(), organization.clone());

        debug!(organization_id = %organization.id, "Organization stored");
        Ok(organization)
    }

    #[instrument(skip(self), fields(organization_id = %input.organization_id))]
    async fn get_organization(
        &self,
        input: GetOrganizationRepoInput,
    ) -> DomainResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(&input.organization_id).cloned())
    }

    #[instrument(skip(self), fields(organization_id = %input.organization_id, expected_version = input.expected_version))]
    async fn update_workflow(&self, input: UpdateWorkflowRepoInput) -> DomainResult<Organization> {
        let mut organizations = self.organizations.write().await;
        let organization = organizations
            .get_mut(&input.organization_id)
            .ok_or_else(|| DomainError::OrganizationNotFound(input.organization_id.clone()))?;

        if organization.version != input.expected_version {
            return Err(DomainError::Conflict {
                entity: "organization",
                id: input.organization_id,
                expected: input.expected_version,
                actual: organization.version,
            });
        }

        organization.workflow = input.workflow;
        organization.version += 1;
        organization.updated_at = Some(Utc::now());

        debug!(
            steps = organization.workflow.len(),
            version = organization.version,
            "Workflow replaced"
        );
        Ok(organization.clone())
    }

    #[instrument(skip(self), fields(organization_id = %input.organization_id, expected_version = input.expected_version))]
    async fn delete_organization(&self, input: DeleteOrganizationRepoInput) -> DomainResult<()> {
        let mut organizations = self.organizations.write().await;
        let organization = organizations
            .get(&input.organization_id)
            .ok_or_else(|| DomainError::OrganizationNotFound(input.organization_id.clone()))?;

        if organization.version != input.expected_version {
            return Err(DomainError::Conflict {
                entity: "organization",
                id: input.organization_id,
                expected: input.expected_version,
                actual: organization.version,
            });
        }

        organizations.remove(&input.organization_id);
        debug!(organization_id = %input.organization_id, "Organization deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Permission, Task};

    async fn seeded() -> InMemoryOrganizationRepository {
        let repo = InMemoryOrganizationRepository::new();
        repo.create_organization(CreateOrganizationRepoInputWithId {
            id: "org-1".to_string(),
            name: "North Gate".to_string(),
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_create_organization_starts_with_empty_workflow() {
        let repo = seeded().await;
        let org = repo
            .get_organization(GetOrganizationRepoInput {
                organization_id: "org-1".to_string(),
            })
            .await
            .unwrap()
            .unwrap();

        assert!(org.workflow.is_empty());
        assert_eq!(org.version, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_organization() {
        let repo = seeded().await;
        let result = repo
            .create_organization(CreateOrganizationRepoInputWithId {
                id: "org-1".to_string(),
                name: "Again".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(DomainError::OrganizationAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_update_workflow_bumps_version() {
        let repo = seeded().await;
        let org = repo
            .update_workflow(UpdateWorkflowRepoInput {
                organization_id: "org-1".to_string(),
                workflow: vec![Task::new(Permission::ApproveCar)],
                expected_version: 1,
            })
            .await
            .unwrap();

        assert_eq!(org.version, 2);
        assert_eq!(org.workflow, vec![Task::new(Permission::ApproveCar)]);
    }

    #[tokio::test]
    async fn test_update_workflow_stale_version_conflicts() {
        let repo = seeded().await;
        repo.update_workflow(UpdateWorkflowRepoInput {
            organization_id: "org-1".to_string(),
            workflow: vec![Task::new(Permission::ApproveCar)],
            expected_version: 1,
        })
        .await
        .unwrap();

        let result = repo
            .update_workflow(UpdateWorkflowRepoInput {
                organization_id: "org-1".to_string(),
                workflow: vec![],
                expected_version: 1,
            })
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Conflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_workflow_unknown_organization() {
        let repo = InMemoryOrganizationRepository::new();
        let result = repo
            .update_workflow(UpdateWorkflowRepoInput {
                organization_id: "missing".to_string(),
                workflow: vec![],
                expected_version: 1,
            })
            .await;

        assert!(matches!(result, Err(DomainError::OrganizationNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_organization_checks_version() {
        let repo = seeded().await;
        repo.update_workflow(UpdateWorkflowRepoInput {
            organization_id: "org-1".to_string(),
            workflow: vec![Task::new(Permission::ApproveCar)],
            expected_version: 1,
        })
        .await
        .unwrap();

        let stale = repo
            .delete_organization(DeleteOrganizationRepoInput {
                organization_id: "org-1".to_string(),
                expected_version: 1,
            })
            .await;
        assert!(matches!(stale, Err(DomainError::Conflict { .. })));

        repo.delete_organization(DeleteOrganizationRepoInput {
            organization_id: "org-1".to_string(),
            expected_version: 2,
        })
        .await
        .unwrap();

        let gone = repo
            .get_organization(GetOrganizationRepoInput {
                organization_id: "org-1".to_string(),
            })
            .await
            .unwrap();
        assert!(gone.is_none());
    }
}
