use std::collections::BTreeSet;
use std::sync::Arc;

use common::auth::AuthorizationProvider;
use common::domain::{
    DomainError, DomainResult, GetOrganizationRepoInput, GetUserRepoInput, OrganizationRepository,
    Permission, PermissionMode, PermissionSet, SetUserPermissionsRepoInput, User, UserRepository,
};
use garde::Validate;
use tracing::{debug, info, instrument};

use crate::domain::acting_user::load_acting_user;
use crate::domain::navigation::{permitted_routes, Route};

// ============================================================================
// Service Input Types
// ============================================================================

/// Check the caller's permissions across every organization
#[derive(Debug, Clone, Validate)]
pub struct CheckPermissionsInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(inner(length(min = 1)))]
    pub permissions: Vec<String>,
    #[garde(skip)]
    pub mode: PermissionMode,
}

/// Check the caller's permissions within one organization
#[derive(Debug, Clone, Validate)]
pub struct CheckOrganizationPermissionsInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(inner(length(min = 1)))]
    pub permissions: Vec<String>,
    #[garde(skip)]
    pub mode: PermissionMode,
}

/// Read the caller's own permission set
#[derive(Debug, Clone, Validate)]
pub struct GetUserPermissionsInput {
    #[garde(skip)]
    pub user_id: String,
    /// `None` returns the union across organizations
    #[garde(skip)]
    pub organization_id: Option<String>,
}

/// Replace another user's permissions in one organization
#[derive(Debug, Clone, Validate)]
pub struct SetUserPermissionsInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub target_user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(inner(length(min = 1)))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct GetPermittedRoutesInput {
    #[garde(skip)]
    pub user_id: String,
}

/// Domain service for permission queries and grants
pub struct PermissionService {
    user_repository: Arc<dyn UserRepository>,
    organization_repository: Arc<dyn OrganizationRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
}

impl PermissionService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        organization_repository: Arc<dyn OrganizationRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            user_repository,
            organization_repository,
            authorization_provider,
        }
    }

    /// Check permissions against the union of every organization the user belongs to
    #[instrument(skip(self, input), fields(user_id = %input.user_id, mode = ?input.mode))]
    pub async fn check_permissions(&self, input: CheckPermissionsInput) -> DomainResult<bool> {
        common::garde::validate_struct(&input)?;

        let required = PermissionSet::parse(&input.permissions)?;
        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;

        let allowed = self
            .authorization_provider
            .check_permissions(&user, required, None, input.mode);

        debug!(?required, allowed, "checked global permissions");
        Ok(allowed)
    }

    /// Check permissions held in one specific organization
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id, mode = ?input.mode))]
    pub async fn check_permissions_for_organization(
        &self,
        input: CheckOrganizationPermissionsInput,
    ) -> DomainResult<bool> {
        common::garde::validate_struct(&input)?;

        let required = PermissionSet::parse(&input.permissions)?;
        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        self.ensure_organization_exists(&input.organization_id).await?;

        let allowed = self.authorization_provider.check_permissions(
            &user,
            required,
            Some(&input.organization_id),
            input.mode,
        );

        debug!(?required, allowed, "checked organization permissions");
        Ok(allowed)
    }

    /// Get the caller's permission set
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn get_user_permissions(
        &self,
        input: GetUserPermissionsInput,
    ) -> DomainResult<PermissionSet> {
        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;

        let held = match (&input.organization_id, user.is_admin) {
            (_, true) => PermissionSet::all(),
            (Some(org_id), false) => user.permissions_in(org_id),
            (None, false) => user.all_permissions(),
        };
        Ok(held)
    }

    /// Replace a user's permission set within an organization.
    ///
    /// Requires `EDIT_USER_PERMISSIONS` in that organization. An empty set
    /// removes the target from the organization.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, target_user_id = %input.target_user_id, organization_id = %input.organization_id))]
    pub async fn set_user_permissions(&self, input: SetUserPermissionsInput) -> DomainResult<User> {
        common::garde::validate_struct(&input)?;

        let permissions = PermissionSet::parse(&input.permissions)?;
        let acting_user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        self.ensure_organization_exists(&input.organization_id).await?;

        self.authorization_provider.require_permissions(
            &acting_user,
            Permission::EditUserPermissions.into(),
            Some(&input.organization_id),
            PermissionMode::All,
        )?;

        let target = self
            .user_repository
            .get_user(GetUserRepoInput {
                user_id: input.target_user_id.clone(),
            })
            .await?
            .ok_or_else(|| DomainError::UserNotFound(input.target_user_id.clone()))?;

        let updated = self
            .user_repository
            .set_user_permissions(SetUserPermissionsRepoInput {
                user_id: target.id,
                organization_id: input.organization_id,
                permissions,
                expected_version: target.version,
            })
            .await?;

        info!(target_user_id = %updated.id, ?permissions, "user permissions replaced");
        Ok(updated)
    }

    /// Routes the caller's client should expose
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn get_permitted_routes(
        &self,
        input: GetPermittedRoutesInput,
    ) -> DomainResult<BTreeSet<Route>> {
        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        Ok(permitted_routes(&user))
    }

    async fn ensure_organization_exists(&self, organization_id: &str) -> DomainResult<()> {
        self.organization_repository
            .get_organization(GetOrganizationRepoInput {
                organization_id: organization_id.to_string(),
            })
            .await?
            .map(|_| ())
            .ok_or_else(|| DomainError::OrganizationNotFound(organization_id.to_string()))
    }
}
