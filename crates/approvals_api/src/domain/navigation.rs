use std::collections::BTreeSet;

use common::domain::{Permission, User};
use serde::{Deserialize, Serialize};

/// Sections of a client application a user may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Requests,
    Approvals,
    Workflow,
    UserPermissions,
}

/// Read-only projection of a user's permissions onto routes.
///
/// This is presentation policy only; every operation still performs its own
/// permission check.
pub fn permitted_routes(user: &User) -> BTreeSet<Route> {
    if user.is_admin {
        return [
            Route::Requests,
            Route::Approvals,
            Route::Workflow,
            Route::UserPermissions,
        ]
        .into_iter()
        .collect();
    }

    let held = user.all_permissions();
    let mut routes = BTreeSet::new();

    if !held.is_empty() {
        routes.insert(Route::Requests);
    }
    if held.iter().any(|p| p.is_approval_permission()) {
        routes.insert(Route::Approvals);
    }
    if held.contains(Permission::EditWorkflow) {
        routes.insert(Route::Workflow);
    }
    if held.contains(Permission::EditUserPermissions) {
        routes.insert(Route::UserPermissions);
    }
    routes
}
