use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use common::domain::{
    CreateOrganizationRepoInputWithId, CreateUserRepoInputWithId, OrganizationRepository,
    Permission, PermissionSet, Task, UpdateWorkflowRepoInput, UserRepository,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Organizations and users to preload into empty stores
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub organizations: Vec<SeedOrganization>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOrganization {
    pub id: String,
    pub name: String,
    /// Ordered required permission per step
    #[serde(default)]
    pub workflow: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Organization id to held permission names
    #[serde(default)]
    pub permissions: HashMap<String, PermissionSet>,
}

impl SeedData {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))
    }

    /// Write every organization (with its workflow) and user into the stores
    #[instrument(skip_all, fields(organizations = self.organizations.len(), users = self.users.len()))]
    pub async fn apply(
        self,
        organizations: &dyn OrganizationRepository,
        users: &dyn UserRepository,
    ) -> anyhow::Result<()> {
        for seed in self.organizations {
            let created = organizations
                .create_organization(CreateOrganizationRepoInputWithId {
                    id: seed.id.clone(),
                    name: seed.name,
                })
                .await
                .with_context(|| format!("failed to seed organization {}", seed.id))?;

            if !seed.workflow.is_empty() {
                organizations
                    .update_workflow(UpdateWorkflowRepoInput {
                        organization_id: created.id.clone(),
                        workflow: seed.workflow.into_iter().map(Task::new).collect(),
                        expected_version: created.version,
                    })
                    .await
                    .with_context(|| format!("failed to seed workflow of {}", created.id))?;
            }
            debug!(organization_id = %created.id, "seeded organization");
        }

        for seed in self.users {
            let user = users
                .create_user(CreateUserRepoInputWithId {
                    id: seed.id.clone(),
                    name: seed.name,
                    email: seed.email,
                    is_admin: seed.is_admin,
                    permissions: seed.permissions,
                })
                .await
                .with_context(|| format!("failed to seed user {}", seed.id))?;
            debug!(user_id = %user.id, is_admin = user.is_admin, "seeded user");
        }

        info!("seed data applied");
        Ok(())
    }
}
