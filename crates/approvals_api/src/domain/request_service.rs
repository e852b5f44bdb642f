use chrono::Utc;
use common::auth::{assert_owner, AuthorizationProvider};
use common::domain::{
    ApprovalAction, ApprovalStateMachine, CreateRequestRepoInputWithId, Decision,
    DeleteRequestRepoInput, DomainError, DomainResult, GetOrganizationRepoInput,
    GetRequestRepoInput, ListRequestsRepoInput, Organization, OrganizationRepository,
    PermissionMode, PermissionSet, Request, RequestKind, RequestRepository, RequestStatus,
    UpdateRequestDetailsRepoInput, UpdateRequestStatusRepoInput, User, UserRepository,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::acting_user::load_acting_user;

// ============================================================================
// Service Input Types
// ============================================================================
// Every input embeds the acting user's id; the identity layer has already
// verified it.

/// Input to file a new request against an organization's workflow
#[derive(Debug, Clone, Validate)]
pub struct CreateRequestInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(skip)]
    pub kind: RequestKind,
    #[garde(skip)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Validate)]
pub struct GetRequestInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub request_id: String,
}

/// Input to list the requests the caller can act on right now
#[derive(Debug, Clone, Validate)]
pub struct ListActionableRequestsInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub organization_id: String,
}

/// Input to approve or reject the current step of a request
#[derive(Debug, Clone, Validate)]
pub struct DecideRequestInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub request_id: String,
    #[garde(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct EditRequestInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub request_id: String,
    #[garde(skip)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Validate)]
pub struct DeleteRequestInput {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub request_id: String,
}

/// Domain service driving requests through their organization's workflow
pub struct RequestService {
    request_repository: Arc<dyn RequestRepository>,
    organization_repository: Arc<dyn OrganizationRepository>,
    user_repository: Arc<dyn UserRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
    state_machine: ApprovalStateMachine,
}

impl RequestService {
    pub fn new(
        request_repository: Arc<dyn RequestRepository>,
        organization_repository: Arc<dyn OrganizationRepository>,
        user_repository: Arc<dyn UserRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            request_repository,
            organization_repository,
            user_repository,
            state_machine: ApprovalStateMachine::new(authorization_provider.clone()),
            authorization_provider,
        }
    }

    /// File a request; it starts at the first workflow step, or approved when
    /// the organization has no steps
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id, kind = ?input.kind))]
    pub async fn create_request(&self, input: CreateRequestInput) -> DomainResult<Request> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let organization = self.load_organization(&input.organization_id).await?;
        self.require_membership(&user, &organization)?;

        let status = RequestStatus::initial(&organization.workflow);

        let request = self
            .request_repository
            .create_request(CreateRequestRepoInputWithId {
                id: xid::new().to_string(),
                organization_id: organization.id,
                requestor_id: user.id,
                kind: input.kind,
                details: input.details,
                status,
            })
            .await?;

        info!(request_id = %request.id, %status, "request created");
        Ok(request)
    }

    /// Get a request with its status read against the current workflow.
    ///
    /// Readable by its requestor and by members of its organization.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_id = %input.request_id))]
    pub async fn get_request(&self, input: GetRequestInput) -> DomainResult<Request> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let mut request = self.load_request(&input.request_id).await?;
        let organization = self.load_organization(&request.organization_id).await?;

        if request.requestor_id.as_deref() != Some(user.id.as_str()) {
            self.require_membership(&user, &organization)?;
        }

        request.status = request.status.normalize(organization.workflow.len());
        Ok(request)
    }

    /// List in-progress requests whose current step the caller may decide
    #[instrument(skip(self, input), fields(user_id = %input.user_id, organization_id = %input.organization_id))]
    pub async fn list_actionable_requests(
        &self,
        input: ListActionableRequestsInput,
    ) -> DomainResult<Vec<Request>> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let organization = self.load_organization(&input.organization_id).await?;

        let requests = self
            .request_repository
            .list_requests(ListRequestsRepoInput {
                organization_id: organization.id.clone(),
            })
            .await?;

        let actionable: Vec<Request> = requests
            .into_iter()
            .filter_map(|mut request| {
                request.status = request.status.normalize(organization.workflow.len());
                match request.status {
                    RequestStatus::InProgress { step_index } => {
                        let task = organization.workflow.get(step_index)?;
                        self.authorization_provider
                            .check_permissions(
                                &user,
                                task.required_permission.into(),
                                Some(&organization.id),
                                PermissionMode::All,
                            )
                            .then_some(request)
                    }
                    RequestStatus::Approved | RequestStatus::Rejected => None,
                }
            })
            .collect();

        debug!(count = actionable.len(), "listed actionable requests");
        Ok(actionable)
    }

    /// Approve the request's current step
    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_id = %input.request_id))]
    pub async fn approve_request(&self, input: DecideRequestInput) -> DomainResult<Request> {
        self.decide(input, ApprovalAction::Approve).await
    }

    /// Reject the request at its current step; rejection is terminal
    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_id = %input.request_id))]
    pub async fn reject_request(&self, input: DecideRequestInput) -> DomainResult<Request> {
        self.decide(input, ApprovalAction::Reject).await
    }

    /// Replace a request's details; only its requestor may, and only while in progress
    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_id = %input.request_id))]
    pub async fn edit_request(&self, input: EditRequestInput) -> DomainResult<Request> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let request = self.load_request(&input.request_id).await?;
        assert_owner(&request, &user)?;

        let organization = self.load_organization(&request.organization_id).await?;
        let status = request.status.normalize(organization.workflow.len());
        if status.is_terminal() {
            return Err(DomainError::InvalidRequestState(format!(
                "Request {} is {} and can no longer be edited",
                request.id, status
            )));
        }

        let mut updated = self
            .request_repository
            .update_request_details(UpdateRequestDetailsRepoInput {
                request_id: request.id,
                details: input.details,
                expected_version: request.version,
            })
            .await
            .inspect_err(|e| warn_on_conflict(e, "edit"))?;

        updated.status = updated.status.normalize(organization.workflow.len());
        debug!(version = updated.version, "request edited");
        Ok(updated)
    }

    /// Withdraw a request; only its requestor may
    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_id = %input.request_id))]
    pub async fn delete_request(&self, input: DeleteRequestInput) -> DomainResult<()> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let request = self.load_request(&input.request_id).await?;
        assert_owner(&request, &user)?;

        self.request_repository
            .delete_request(DeleteRequestRepoInput {
                request_id: request.id.clone(),
                expected_version: request.version,
            })
            .await
            .inspect_err(|e| warn_on_conflict(e, "delete"))?;

        info!(request_id = %request.id, "request withdrawn");
        Ok(())
    }

    async fn decide(
        &self,
        input: DecideRequestInput,
        action: ApprovalAction,
    ) -> DomainResult<Request> {
        common::garde::validate_struct(&input)?;

        let user = load_acting_user(self.user_repository.as_ref(), &input.user_id).await?;
        let request = self.load_request(&input.request_id).await?;
        let organization = self.load_organization(&request.organization_id).await?;

        let transition = self
            .state_machine
            .evaluate(&user, &request, &organization, action)
            .inspect_err(|e| {
                warn!(error = %e, action = action.as_str(), "approval action refused")
            })?;

        // The write only lands if nobody moved the request since it was read,
        // so the permission check above stays valid for the stored state.
        let mut updated = self
            .request_repository
            .update_request_status(UpdateRequestStatusRepoInput {
                request_id: request.id,
                status: transition.next_status,
                decision: Decision {
                    step_index: transition.step_index,
                    user_id: user.id,
                    action,
                    comment: input.comment,
                    decided_at: Utc::now(),
                },
                expected_version: request.version,
            })
            .await
            .inspect_err(|e| warn_on_conflict(e, action.as_str()))?;

        updated.status = updated.status.normalize(organization.workflow.len());
        info!(
            action = action.as_str(),
            step_index = transition.step_index,
            status = %updated.status,
            "request decided"
        );
        Ok(updated)
    }

    fn require_membership(&self, user: &User, organization: &Organization) -> DomainResult<()> {
        self.authorization_provider.require_permissions(
            user,
            PermissionSet::all(),
            Some(&organization.id),
            PermissionMode::Any,
        )
    }

    async fn load_request(&self, request_id: &str) -> DomainResult<Request> {
        self.request_repository
            .get_request(GetRequestRepoInput {
                request_id: request_id.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::RequestNotFound(request_id.to_string()))
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

fn warn_on_conflict(error: &DomainError, operation: &str) {
    if let DomainError::Conflict { .. } = error {
        warn!(error = %error, operation, "concurrent modification detected");
    }
}
