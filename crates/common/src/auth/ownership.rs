use crate::domain::{DomainError, DomainResult, Request, User};

/// Allow a mutation only when `acting_user` filed `request`.
///
/// Guards editing and withdrawing a request. Approving and rejecting are
/// governed by workflow permissions instead.
pub fn assert_owner(request: &Request, acting_user: &User) -> DomainResult<()> {
    match request.requestor_id.as_deref() {
        None => Err(DomainError::Unauthorized(format!(
            "Request {} has no requestor",
            request.id
        ))),
        Some(requestor_id) if requestor_id != acting_user.id => {
            Err(DomainError::Unauthorized(format!(
                "User {} is not the requestor of request {}",
                acting_user.id, request.id
            )))
        }
        Some(_) => Ok(()),
    }
}
