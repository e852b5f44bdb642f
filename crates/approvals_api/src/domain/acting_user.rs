use common::domain::{DomainError, DomainResult, GetUserRepoInput, User, UserRepository};
use tracing::debug;

/// Resolve the already-authenticated caller into a full [`User`].
///
/// An empty id means the identity layer supplied no caller.
pub(crate) async fn load_acting_user(
    repository: &dyn UserRepository,
    user_id: &str,
) -> DomainResult<User> {
    if user_id.is_empty() {
        return Err(DomainError::Unauthorized(
            "No acting user supplied".to_string(),
        ));
    }

    debug!(user_id = %user_id, "loading acting user");

    repository
        .get_user(GetUserRepoInput {
            user_id: user_id.to_string(),
        })
        .await?
        .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
}
