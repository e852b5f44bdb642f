mod authorization_service;
mod ownership;
mod permission_resolver;

pub use authorization_service::*;
pub use ownership::*;
pub use permission_resolver::*;
