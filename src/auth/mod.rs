//! Authorization module for filegate.
//!
//! Identity arrives as a bearer token (see `web::middleware::auth`); this
//! module holds the roles and the predicates deciding what a caller may do.

pub mod permission;
mod role;

pub use permission::{can_access_record, check_permission, require_admin, PermissionError};
pub use role::{Caller, Role};
