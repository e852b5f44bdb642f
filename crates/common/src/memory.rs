mod organization_repository;
mod request_repository;
mod user_repository;

pub use organization_repository::*;
pub use request_repository::*;
pub use user_repository::*;
