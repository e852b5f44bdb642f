mod approval_state_machine;
mod organization;
mod permission;
mod request;
mod result;
mod user;

pub use approval_state_machine::*;
pub use organization::*;
pub use permission::*;
pub use request::*;
pub use result::*;
pub use user::*;
