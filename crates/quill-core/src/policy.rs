//! Role-based authorization checks, run before any write begins.

use uuid::Uuid;

use crate::domain::Role;
use crate::error::DomainError;

/// Operations guarded by a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, rename or delete tags.
    ManageTags,
    /// Create posts.
    WritePosts,
}

/// Check that `role` may perform `action`.
pub fn authorize(role: Role, action: Action) -> Result<(), DomainError> {
    match (action, role) {
        (Action::ManageTags, Role::Admin) => Ok(()),
        (Action::ManageTags, Role::Author) => Err(DomainError::Forbidden(
            "Access denied! You are not an admin".to_string(),
        )),
        (Action::WritePosts, _) => Ok(()),
    }
}

/// Check that the principal may modify a post owned by `owner_id`.
pub fn authorize_owner(principal: Uuid, role: Role, owner_id: Uuid) -> Result<(), DomainError> {
    if role == Role::Admin || principal == owner_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Access denied! This post belongs to another author".to_string(),
        ))
    }
}
