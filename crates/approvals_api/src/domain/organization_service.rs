use common::auth::AuthorizationProvider;
use common::domain::{
    CreateOrganizationRepoInputWithId, DeleteOrganizationRepoInput, DomainError, DomainResult,
    GetOrganizationRepoInput, Organization, OrganizationRepository, Permission, PermissionMode,
    PermissionSet, SetUserPermissionsRepoInput, UserRepository,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::domain::acting_user::load_acting_user;

/// Input to create an organization
#[derive(Debug, Clone, Validate)]
pub struct CreateOrganizationInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub name: String,
}

/// Input to get an organization by ID
#[derive(Debug, Clone, Validate)]
pub struct GetOrganizationInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
}

/// Domain service for organization business logic
pub struct OrganizationService {
    repository: Arc<dyn OrganizationRepository>,
    user_repository: Arc<dyn UserRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
}

impl OrganizationService {
    pub fn new(
        repository: Arc<dyn OrganizationRepository>,
        user_repository: Arc<dyn UserRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            authorization_provider,
        }
    }

    /// Create a new organization with an empty workflow.
    ///
    /// The creator is granted `EDIT_WORKFLOW` and `EDIT_USER_PERMISSIONS` in it
    /// so the organization can be configured. If the grant fails the
    /// organization is removed again and the grant error is returned.
    #[instrument(skip(self, input), fields(name = %input.name, user_id = %input.user_id))]
    pub async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> DomainResult<Organization> {
        common::garde::validate_struct(&input)?;

        let creator = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;

        debug!(name = %input.name, "creating organization");

        let organization = self
            .repository
            .create_organization(CreateOrganizationRepoInputWithId {
                id: xid::new().to_string(),
                name: input.name,
            })
            .await?;

        let mut permissions = creator.permissions_in(&organization.id);
        permissions.extend([Permission::EditWorkflow, Permission::EditUserPermissions]);

        let granted = self
            .user_repository
            .set_user_permissions(SetUserPermissionsRepoInput {
                user_id: creator.id,
                organization_id: organization.id.clone(),
                permissions,
                expected_version: creator.version,
            })
            .await;

        if let Err(e) = granted {
            warn!(
                error = %e,
                organization_id = %organization.id,
                "creator grant failed, removing organization"
            );
            if let Err(rollback) = self
                .repository
                .delete_organization(DeleteOrganizationRepoInput {
                    organization_id: organization.id.clone(),
                    expected_version: organization.version,
                })
                .await
            {
                error!(
                    error = %rollback,
                    organization_id = %organization.id,
                    "failed to remove organization"
                );
            }
            return Err(e);
        }

        debug!(organization_id = %organization.id, "organization created successfully");
        Ok(organization)
    }

    /// Get organization by ID; any member may read it
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id))]
    pub async fn get_organization(&self, input: GetOrganizationInput) -> DomainResult<Organization> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;

        let organization = self
            .repository
            .get_organization(GetOrganizationRepoInput {
                organization_id: input.organization_id.clone(),
            })
            .await?
            .ok_or_else(|| DomainError::OrganizationNotFound(input.organization_id.clone()))?;

        self.authorization_provider.require_permissions(
            &user,
            PermissionSet::all(),
            Some(&organization.id),
            PermissionMode::Any,
        )?;

        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::auth::PermissionResolver;
    use common::domain::{GetUserRepoInput, MockOrganizationRepository, MockUserRepository, User};
    use std::collections::HashMap;

    const TEST_USER_ID: &str = "user-123";

    fn test_user() -> User {
        User {
            id: TEST_USER_ID.to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            is_admin: false,
            permissions: HashMap::new(),
            version: 1,
            created_at: None,
            updated_at: None,
        }
    }

    fn service(
        repo: MockOrganizationRepository,
        users: MockUserRepository,
    ) -> OrganizationService {
        OrganizationService::new(
            Arc::new(repo),
            Arc::new(users),
            Arc::new(PermissionResolver::new()),
        )
    }

    #[tokio::test]
    async fn test_create_organization_grants_creator_admin_permissions() {
        let mut mock_repo = MockOrganizationRepository::new();
        mock_repo
            .expect_create_organization()
            .withf(|input: &CreateOrganizationRepoInputWithId| {
                !input.id.is_empty() && input.name == "Test Org"
            })
            .times(1)
            .returning(|input| {
                Ok(Organization {
                    id: input.id,
                    name: input.name,
                    workflow: vec![],
                    version: 1,
                    created_at: Some(chrono::Utc::now()),
                    updated_at: Some(chrono::Utc::now()),
                })
            });

        let mut users = MockUserRepository::new();
        users
            .expect_get_user()
            .withf(|input: &GetUserRepoInput| input.user_id == TEST_USER_ID)
            .returning(|_| Ok(Some(test_user())));
        users
            .expect_set_user_permissions()
            .withf(|input: &SetUserPermissionsRepoInput| {
                input.user_id == TEST_USER_ID
                    && input.expected_version == 1
                    && input.permissions
                        == PermissionSet::from([
                            Permission::EditWorkflow,
                            Permission::EditUserPermissions,
                        ])
            })
            .times(1)
            .returning(|_| Ok(test_user()));

        let result = service(mock_repo, users)
            .create_organization(CreateOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                name: "Test Org".to_string(),
            })
            .await;

        assert!(result.is_ok());
        let org = result.unwrap();
        assert_eq!(org.name, "Test Org");
        assert!(org.workflow.is_empty());
    }

    #[tokio::test]
    async fn test_create_organization_removed_when_grant_conflicts() {
        let mut mock_repo = MockOrganizationRepository::new();
        mock_repo.expect_create_organization().times(1).returning(|input| {
            Ok(Organization {
                id: input.id,
                name: input.name,
                workflow: vec![],
                version: 1,
                created_at: None,
                updated_at: None,
            })
        });
        mock_repo
            .expect_delete_organization()
            .withf(|input: &DeleteOrganizationRepoInput| {
                !input.organization_id.is_empty() && input.expected_version == 1
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|_| Ok(Some(test_user())));
        users.expect_set_user_permissions().times(1).returning(|input| {
            Err(DomainError::Conflict {
                entity: "user",
                id: input.user_id,
                expected: input.expected_version,
                actual: 2,
            })
        });

        let result = service(mock_repo, users)
            .create_organization(CreateOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                name: "Test Org".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_organization_grant_conflict_leaves_store_empty() {
        use common::memory::InMemoryOrganizationRepository;
        use std::sync::Mutex;

        let organizations = InMemoryOrganizationRepository::new();
        let attempted_org = Arc::new(Mutex::new(None::<String>));

        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|_| Ok(Some(test_user())));
        let seen = attempted_org.clone();
        users.expect_set_user_permissions().returning(move |input| {
            *seen.lock().unwrap() = Some(input.organization_id.clone());
            Err(DomainError::Conflict {
                entity: "user",
                id: input.user_id,
                expected: input.expected_version,
                actual: input.expected_version + 1,
            })
        });

        let result = OrganizationService::new(
            Arc::new(organizations.clone()),
            Arc::new(users),
            Arc::new(PermissionResolver::new()),
        )
        .create_organization(CreateOrganizationInput {
            user_id: TEST_USER_ID.to_string(),
            name: "Test Org".to_string(),
        })
        .await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        let organization_id = attempted_org.lock().unwrap().clone().unwrap();
        let stored = organizations
            .get_organization(GetOrganizationRepoInput { organization_id })
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_create_organization_empty_name() {
        let result = service(MockOrganizationRepository::new(), MockUserRepository::new())
            .create_organization(CreateOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                name: "".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_organization_without_user_is_unauthorized() {
        let result = service(MockOrganizationRepository::new(), MockUserRepository::new())
            .create_organization(CreateOrganizationInput {
                user_id: "".to_string(),
                name: "Test Org".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_get_organization_not_found() {
        let mut mock_repo = MockOrganizationRepository::new();
        mock_repo
            .expect_get_organization()
            .times(1)
            .return_once(|_| Ok(None));
        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|_| Ok(Some(test_user())));

        let result = service(mock_repo, users)
            .get_organization(GetOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                organization_id: "nonexistent".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::OrganizationNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_organization_non_member_is_denied() {
        let mut mock_repo = MockOrganizationRepository::new();
        mock_repo.expect_get_organization().return_once(|_| {
            Ok(Some(Organization {
                id: "org-1".to_string(),
                name: "Closed".to_string(),
                workflow: vec![],
                version: 1,
                created_at: None,
                updated_at: None,
            }))
        });
        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|_| Ok(Some(test_user())));

        let result = service(mock_repo, users)
            .get_organization(GetOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                organization_id: "org-1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_get_organization_empty_id() {
        let result = service(MockOrganizationRepository::new(), MockUserRepository::new())
            .get_organization(GetOrganizationInput {
                user_id: TEST_USER_ID.to_string(),
                organization_id: "".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
