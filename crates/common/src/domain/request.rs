use std::fmt;

use crate::domain::organization::Task;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a request asks to admit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Civilian,
    Soldier,
    Car,
}

/// Lifecycle state of a request against its organization's workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    InProgress { step_index: usize },
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Starting state for a request submitted against `workflow`
    pub fn initial(workflow: &[Task]) -> Self {
        if workflow.is_empty() {
            RequestStatus::Approved
        } else {
            RequestStatus::InProgress { step_index: 0 }
        }
    }

    /// Reads the stored status against the current workflow length.
    ///
    /// A step index at or past the end (the workflow shrank after the request
    /// was filed) is treated as approved.
    pub fn normalize(self, workflow_len: usize) -> Self {
        match self {
            RequestStatus::InProgress { step_index } if step_index >= workflow_len => {
                RequestStatus::Approved
            }
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::InProgress { step_index } => write!(f, "IN_PROGRESS({})", step_index),
            RequestStatus::Approved => f.write_str("APPROVED"),
            RequestStatus::Rejected => f.write_str("REJECTED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }
}

/// Record of one approve/reject decision taken on a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub step_index: usize,
    pub user_id: String,
    pub action: ApprovalAction,
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Request domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub organization_id: String,
    /// Set at creation and never reassigned
    pub requestor_id: Option<String>,
    pub kind: RequestKind,
    pub details: serde_json::Value,
    pub status: RequestStatus,
    pub decisions: Vec<Decision>,
    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal input with generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequestRepoInputWithId {
    pub id: String,
    pub organization_id: String,
    pub requestor_id: String,
    pub kind: RequestKind,
    pub details: serde_json::Value,
    pub status: RequestStatus,
}

/// Input for getting a request by ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequestRepoInput {
    pub request_id: String,
}

/// Input for listing the requests filed against an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequestsRepoInput {
    pub organization_id: String,
}

/// Input for recording a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequestStatusRepoInput {
    pub request_id: String,
    pub status: RequestStatus,
    pub decision: Decision,
    pub expected_version: u64,
}

/// Input for replacing a request's details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequestDetailsRepoInput {
    pub request_id: String,
    pub details: serde_json::Value,
    pub expected_version: u64,
}

/// Input for deleting a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequestRepoInput {
    pub request_id: String,
    pub expected_version: u64,
}

/// Repository trait for request storage operations.
///
/// Every mutating call carries the version the caller read and must fail with
/// `DomainError::Conflict` without writing anything when the stored version differs.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create_request(&self, input: CreateRequestRepoInputWithId) -> DomainResult<Request>;

    async fn get_request(&self, input: GetRequestRepoInput) -> DomainResult<Option<Request>>;

    async fn list_requests(&self, input: ListRequestsRepoInput) -> DomainResult<Vec<Request>>;

    /// Store a new status and append the decision that produced it
    async fn update_request_status(
        &self,
        input: UpdateRequestStatusRepoInput,
    ) -> DomainResult<Request>;

    async fn update_request_details(
        &self,
        input: UpdateRequestDetailsRepoInput,
    ) -> DomainResult<Request>;

    async fn delete_request(&self, input: DeleteRequestRepoInput) -> DomainResult<()>;
}
