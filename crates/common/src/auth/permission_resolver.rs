use tracing::{instrument, trace};

use crate::auth::AuthorizationProvider;
use crate::domain::{PermissionMode, PermissionSet, User};

/// Resolves permission checks against the sets stored on a [`User`].
///
/// Stateless: every decision is derived from the arguments alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionResolver;

impl PermissionResolver {
    pub fn new() -> Self {
        Self
    }
}

impl AuthorizationProvider for PermissionResolver {
    #[instrument(level = "trace", skip(self, user), fields(user_id = %user.id))]
    fn check_permissions(
        &self,
        user: &User,
        required: PermissionSet,
        organization_id: Option<&str>,
        mode: PermissionMode,
    ) -> bool {
        if required.is_empty() || user.is_admin {
            return true;
        }

        let held = match organization_id {
            Some(org_id) => user.permissions_in(org_id),
            None => user.all_permissions(),
        };

        let allowed = match mode {
            PermissionMode::All => held.is_superset(&required),
            PermissionMode::Any => held.intersects(&required),
        };

        trace!(?held, allowed, "resolved permission check");
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Permission};
    use std::collections::HashMap;

    const ORG_A: &str = "org-a";
    const ORG_B: &str = "org-b";

    fn user(permissions: Vec<(&str, PermissionSet)>) -> User {
        User {
            id: "user-123".to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            is_admin: false,
            permissions: permissions
                .into_iter()
                .map(|(org, set)| (org.to_string(), set))
                .collect::<HashMap<_, _>>(),
            version: 1,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_requirement_is_always_allowed() {
        let resolver = PermissionResolver::new();
        let nobody = user(vec![]);

        for mode in [PermissionMode::All, PermissionMode::Any] {
            assert!(resolver.check_permissions(&nobody, PermissionSet::empty(), None, mode));
            assert!(resolver.check_permissions(
                &nobody,
                PermissionSet::empty(),
                Some(ORG_A),
                mode
            ));
        }
    }

    #[test]
    fn test_all_mode_requires_subset() {
        let resolver = PermissionResolver::new();
        let u = user(vec![(
            ORG_A,
            PermissionSet::from([Permission::ApproveCar, Permission::NormalUser]),
        )]);

        assert!(resolver.check_permissions(
            &u,
            PermissionSet::from([Permission::ApproveCar, Permission::NormalUser]),
            Some(ORG_A),
            PermissionMode::All,
        ));
        assert!(!resolver.check_permissions(
            &u,
            PermissionSet::from([Permission::ApproveCar, Permission::EditWorkflow]),
            Some(ORG_A),
            PermissionMode::All,
        ));
    }

    #[test]
    fn test_any_mode_requires_intersection() {
        let resolver = PermissionResolver::new();
        let u = user(vec![(ORG_A, Permission::ApproveCar.into())]);

        assert!(resolver.check_permissions(
            &u,
            PermissionSet::from([Permission::ApproveCar, Permission::EditWorkflow]),
            Some(ORG_A),
            PermissionMode::Any,
        ));
        assert!(!resolver.check_permissions(
            &u,
            PermissionSet::from([Permission::ApproveSoldier, Permission::EditWorkflow]),
            Some(ORG_A),
            PermissionMode::Any,
        ));
    }

    #[test]
    fn test_org_scoped_check_ignores_other_orgs() {
        let resolver = PermissionResolver::new();
        let u = user(vec![(ORG_A, Permission::ApproveCar.into())]);

        assert!(resolver.check_permissions(
            &u,
            Permission::ApproveCar.into(),
            Some(ORG_A),
            PermissionMode::All
        ));
        assert!(!resolver.check_permissions(
            &u,
            Permission::ApproveCar.into(),
            Some(ORG_B),
            PermissionMode::All
        ));
    }

    #[test]
    fn test_global_check_uses_union() {
        let resolver = PermissionResolver::new();
        let u = user(vec![
            (ORG_A, Permission::ApproveCar.into()),
            (ORG_B, Permission::EditWorkflow.into()),
        ]);

        let required = PermissionSet::from([Permission::ApproveCar, Permission::EditWorkflow]);
        assert!(resolver.check_permissions(&u, required, None, PermissionMode::All));
        assert!(!resolver.check_permissions(&u, required, Some(ORG_A), PermissionMode::All));
    }

    #[test]
    fn test_admin_bypasses_every_check() {
        let resolver = PermissionResolver::new();
        let mut admin = user(vec![]);
        admin.is_admin = true;

        assert!(resolver.check_permissions(
            &admin,
            PermissionSet::all(),
            Some(ORG_B),
            PermissionMode::All
        ));
    }

    #[test]
    fn test_require_permissions_returns_permission_denied() {
        let resolver = PermissionResolver::new();
        let u = user(vec![(ORG_A, Permission::NormalUser.into())]);

        let result = resolver.require_permissions(
            &u,
            Permission::EditWorkflow.into(),
            Some(ORG_A),
            PermissionMode::default(),
        );
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }
}
