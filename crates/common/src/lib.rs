pub mod auth;
pub mod domain;
pub mod garde;
pub mod memory;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockOrganizationRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockRequestRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockUserRepository;
