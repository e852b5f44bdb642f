use std::sync::Arc;

use tracing::{debug, instrument};

use crate::auth::AuthorizationProvider;
use crate::domain::organization::Organization;
use crate::domain::permission::{Permission, PermissionMode};
use crate::domain::request::{ApprovalAction, Request, RequestStatus};
use crate::domain::result::{DomainError, DomainResult};
use crate::domain::user::User;

/// Outcome of a legal approve/reject on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Step the decision was taken on
    pub step_index: usize,
    pub required_permission: Permission,
    pub next_status: RequestStatus,
}

/// Decides whether an approval action is legal and what state it produces.
///
/// Evaluation is side-effect free; the caller persists the resulting status
/// with the request version it evaluated against.
pub struct ApprovalStateMachine {
    authorization_provider: Arc<dyn AuthorizationProvider>,
}

impl ApprovalStateMachine {
    pub fn new(authorization_provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self {
            authorization_provider,
        }
    }

    #[instrument(
        skip(self, user, request, organization),
        fields(user_id = %user.id, request_id = %request.id, action = action.as_str())
    )]
    pub fn evaluate(
        &self,
        user: &User,
        request: &Request,
        organization: &Organization,
        action: ApprovalAction,
    ) -> DomainResult<Transition> {
        if request.organization_id != organization.id {
            return Err(DomainError::ValidationError(format!(
                "Request {} belongs to organization {}, not {}",
                request.id, request.organization_id, organization.id
            )));
        }

        let workflow = &organization.workflow;
        let step_index = match request.status.normalize(workflow.len()) {
            RequestStatus::InProgress { step_index } => step_index,
            terminal => {
                return Err(DomainError::InvalidRequestState(format!(
                    "Request {} is {} and accepts no further actions",
                    request.id, terminal
                )));
            }
        };

        let required_permission = workflow[step_index].required_permission;
        self.authorization_provider.require_permissions(
            user,
            required_permission.into(),
            Some(&organization.id),
            PermissionMode::All,
        )?;

        let next_status = match action {
            ApprovalAction::Approve if step_index + 1 == workflow.len() => RequestStatus::Approved,
            ApprovalAction::Approve => RequestStatus::InProgress {
                step_index: step_index + 1,
            },
            ApprovalAction::Reject => RequestStatus::Rejected,
        };

        debug!(step_index, %next_status, "transition allowed");
        Ok(Transition {
            step_index,
            required_permission,
            next_status,
        })
    }
}
