use crate::domain::{DomainError, DomainResult, PermissionMode, PermissionSet, User};

/// Trait for permission checks.
///
/// Implementations must be pure over their inputs so checks can run
/// concurrently without coordination.
pub trait AuthorizationProvider: Send + Sync {
    /// Check whether `user` holds `required` under `mode`.
    ///
    /// With `organization_id` set, only the permissions held in that
    /// organization count; without it, the union across all organizations does.
    fn check_permissions(
        &self,
        user: &User,
        required: PermissionSet,
        organization_id: Option<&str>,
        mode: PermissionMode,
    ) -> bool;

    /// Check permissions and return PermissionDenied error if not allowed
    fn require_permissions(
        &self,
        user: &User,
        required: PermissionSet,
        organization_id: Option<&str>,
        mode: PermissionMode,
    ) -> DomainResult<()> {
        if self.check_permissions(user, required, organization_id, mode) {
            return Ok(());
        }

        let scope = organization_id
            .map(|org| format!("in org {}", org))
            .unwrap_or_else(|| "in any organization".to_string());
        Err(DomainError::PermissionDenied(format!(
            "User {} lacks {:?} of {:?} {}",
            user.id, mode, required, scope
        )))
    }
}
