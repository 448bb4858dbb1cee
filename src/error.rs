//! Service Errors
//!
//! Everything a facade call can reject with. Only [`ServiceError::Transient`]
//! is worth retrying: it is injected before the operation runs, so repeating
//! the call converges. Domain errors fail the same way every time.
//! `NotInitialized` is a wiring bug, and `Cancelled` only happens when the
//! runtime goes away mid-call.

use crate::store::StoreError;
use crate::unreliable::TransientFailure;

/// Facade errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transient(#[from] TransientFailure),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("service not initialized")]
    NotInitialized,

    /// The task running the call was torn down, e.g. at runtime shutdown
    #[error("operation cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Whether repeating the call can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Shorthand for an unknown role
    pub fn role_not_found(role_id: impl Into<String>) -> Self {
        Self::Store(StoreError::RoleNotFound(role_id.into()))
    }
}
