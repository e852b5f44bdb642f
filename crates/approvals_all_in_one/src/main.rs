mod config;
mod seed;

use std::sync::Arc;

use approvals_api::{ApprovalsApi, ApprovalsRepositories};
use common::memory::{
    InMemoryOrganizationRepository, InMemoryRequestRepository, InMemoryUserRepository,
};
use common::telemetry::init_telemetry;
use config::ServiceConfig;
use seed::SeedData;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.telemetry()) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(service_name = %config.service_name, "Starting approvals-all-in-one service");
    debug!("Configuration: {:?}", config);

    let organizations = InMemoryOrganizationRepository::new();
    let users = InMemoryUserRepository::new();
    let requests = InMemoryRequestRepository::new();

    if let Some(path) = &config.seed_file {
        info!(seed_file = %path, "Loading seed data...");
        let seeded = match SeedData::from_file(path) {
            Ok(seed) => seed.apply(&organizations, &users).await,
            Err(e) => Err(e),
        };
        if let Err(e) = seeded {
            error!("Failed to seed stores: {:#}", e);
            std::process::exit(1);
        }
    }

    let api = ApprovalsApi::with_default_authorization(ApprovalsRepositories {
        organizations: Arc::new(organizations),
        users: Arc::new(users),
        requests: Arc::new(requests),
    });

    info!("Approval services ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    drop(api);
}
