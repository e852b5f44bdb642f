pub mod approvals_api;
pub mod domain;

pub use approvals_api::*;
pub use domain::*;
