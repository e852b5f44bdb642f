use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{
    CreateRequestRepoInputWithId, DeleteRequestRepoInput, DomainError, DomainResult,
    GetRequestRepoInput, ListRequestsRepoInput, Request, RequestRepository,
    UpdateRequestDetailsRepoInput, UpdateRequestStatusRepoInput,
};

/// In-memory implementation of RequestRepository using HashMap.
///
/// Version check and write happen under one write lock, so a stale writer
/// always observes `Conflict`.
#[derive(Clone, Default)]
pub struct InMemoryRequestRepository {
    requests: Arc<RwLock<HashMap<String, Request>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(request: &Request, expected_version: u64) -> DomainResult<()> {
    if request.version != expected_version {
        return Err(DomainError::Conflict {
            entity: "request",
            id: request.id.clone(),
            expected: expected_version,
            actual: request.version,
        });
    }
    Ok(())
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    #[instrument(skip(self, input), fields(request_id = %input.id, organization_id = %input.organization_id))]
    async fn create_request(&self, input: CreateRequestRepoInputWithId) -> DomainResult<Request> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&input.id) {
            return Err(DomainError::RequestAlreadyExists(input.id));
        }

        let now = Utc::now();
        let request = Request {
            id: input.id,
            organization_id: input.organization_id,
            requestor_id: Some(input.requestor_id),
            kind: input.kind,
            details: input.details,
            status: input.status,
            decisions: Vec::new(),
            version: 1,
            created_at: Some(now),
            updated_at: Some(now),
        };
        requests.insert(request.id.clone(), request.clone());

        debug!(request_id = %request.id, status = %request.status, "Request stored");
        Ok(request)
    }

    #[instrument(skip(self), fields(request_id = %input.request_id))]
    async fn get_request(&self, input: GetRequestRepoInput) -> DomainResult<Option<Request>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&input.request_id).cloned())
    }

    #[instrument(skip(self), fields(organization_id = %input.organization_id))]
    async fn list_requests(&self, input: ListRequestsRepoInput) -> DomainResult<Vec<Request>> {
        let requests = self.requests.read().await;
        let mut matching: Vec<Request> = requests
            .values()
            .filter(|r| r.organization_id == input.organization_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    #[instrument(skip(self, input), fields(request_id = %input.request_id, expected_version = input.expected_version))]
    async fn update_request_status(
        &self,
        input: UpdateRequestStatusRepoInput,
    ) -> DomainResult<Request> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&input.request_id)
            .ok_or_else(|| DomainError::RequestNotFound(input.request_id.clone()))?;
        check_version(request, input.expected_version)?;

        request.status = input.status;
        request.decisions.push(input.decision);
        request.version += 1;
        request.updated_at = Some(Utc::now());

        debug!(status = %request.status, version = request.version, "Request status updated");
        Ok(request.clone())
    }

    #[instrument(skip(self, input), fields(request_id = %input.request_id, expected_version = input.expected_version))]
    async fn update_request_details(
        &self,
        input: UpdateRequestDetailsRepoInput,
    ) -> DomainResult<Request> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&input.request_id)
            .ok_or_else(|| DomainError::RequestNotFound(input.request_id.clone()))?;
        check_version(request, input.expected_version)?;

        request.details = input.details;
        request.version += 1;
        request.updated_at = Some(Utc::now());

        debug!(version = request.version, "Request details updated");
        Ok(request.clone())
    }

    #[instrument(skip(self), fields(request_id = %input.request_id))]
    async fn delete_request(&self, input: DeleteRequestRepoInput) -> DomainResult<()> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get(&input.request_id)
            .ok_or_else(|| DomainError::RequestNotFound(input.request_id.clone()))?;
        check_version(request, input.expected_version)?;

        requests.remove(&input.request_id);
        debug!(request_id = %input.request_id, "Request deleted");
        Ok(())
    }
}
