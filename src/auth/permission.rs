//! Permission checking for filegate.
//!
//! Role-based checks for the file API plus the record ownership predicate
//! shared by every per-file endpoint.

use thiserror::Error;

use super::{Caller, Role};

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Caller does not have sufficient permission.
    #[error("Access prohibited: {0} role required")]
    InsufficientRole(String),

    /// Caller is not authenticated.
    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Check if a caller has the required permission level.
///
/// # Examples
///
/// ```
/// use filegate::auth::{check_permission, Caller, PermissionError, Role};
///
/// let user = Caller::new("u1", Role::User);
/// assert!(check_permission(Some(&user), Role::User).is_ok());
///
/// assert!(matches!(
///     check_permission(None, Role::User),
///     Err(PermissionError::NotAuthenticated)
/// ));
/// ```
pub fn check_permission(caller: Option<&Caller>, required: Role) -> Result<(), PermissionError> {
    let caller = caller.ok_or(PermissionError::NotAuthenticated)?;

    if !caller.role.can_access(required) {
        return Err(PermissionError::InsufficientRole(required.to_string()));
    }

    Ok(())
}

/// Require the admin role.
pub fn require_admin(caller: Option<&Caller>) -> Result<(), PermissionError> {
    check_permission(caller, Role::Admin)
}

/// Whether `caller` may read or modify a record owned by `owner_id`.
///
/// Owners always may; admins may act on anyone's records.
pub fn can_access_record(owner_id: &str, caller: &Caller) -> bool {
    caller.id == owner_id || caller.role == Role::Admin
}
