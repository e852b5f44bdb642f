use std::sync::Arc;

use common::auth::{AuthorizationProvider, PermissionResolver};
use common::domain::{OrganizationRepository, RequestRepository, UserRepository};
use tracing::debug;

use crate::domain::{OrganizationService, PermissionService, RequestService, WorkflowService};

/// Storage backends the services run against
#[derive(Clone)]
pub struct ApprovalsRepositories {
    pub organizations: Arc<dyn OrganizationRepository>,
    pub users: Arc<dyn UserRepository>,
    pub requests: Arc<dyn RequestRepository>,
}

/// Every domain service wired to one set of repositories and one
/// authorization provider
pub struct ApprovalsApi {
    pub organizations: Arc<OrganizationService>,
    pub permissions: Arc<PermissionService>,
    pub workflows: Arc<WorkflowService>,
    pub requests: Arc<RequestService>,
}

impl ApprovalsApi {
    pub fn new(
        repositories: ApprovalsRepositories,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        debug!("Initializing approvals API module");

        let ApprovalsRepositories {
            organizations,
            users,
            requests,
        } = repositories;

        Self {
            organizations: Arc::new(OrganizationService::new(
                organizations.clone(),
                users.clone(),
                authorization_provider.clone(),
            )),
            permissions: Arc::new(PermissionService::new(
                users.clone(),
                organizations.clone(),
                authorization_provider.clone(),
            )),
            workflows: Arc::new(WorkflowService::new(
                organizations.clone(),
                users.clone(),
                authorization_provider.clone(),
            )),
            requests: Arc::new(RequestService::new(
                requests,
                organizations,
                users,
                authorization_provider,
            )),
        }
    }

    /// Wire the services with the bitmask permission resolver
    pub fn with_default_authorization(repositories: ApprovalsRepositories) -> Self {
        Self::new(repositories, Arc::new(PermissionResolver::new()))
    }
}
