mod acting_user;
mod navigation;
mod organization_service;
mod permission_service;
mod request_service;
mod workflow_service;

pub use navigation::*;
pub use organization_service::*;
pub use permission_service::*;
pub use request_service::*;
pub use workflow_service::*;
