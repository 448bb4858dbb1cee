//! Role Service
//!
//! TigerStyle: Typed async access to roles and permissions.
//!
//! `MockRoleService` sends every store call through the [`Unreliable`]
//! wrapper. Whether it has a store at all is checked first, synchronously,
//! so a miswired facade fails without latency or a random draw.

use crate::error::ServiceError;
use crate::store::SharedResourceStore;
use crate::types::{Permission, Role};
use crate::unreliable::Unreliable;
use async_trait::async_trait;
use std::sync::Arc;

/// Role and permission operations
#[async_trait]
pub trait RoleService: Send + Sync {
    /// All roles
    async fn get_roles(&self) -> Result<Vec<Role>, ServiceError>;

    /// The permission catalog
    async fn get_permissions(&self) -> Result<Vec<Permission>, ServiceError>;

    /// Replace a role's permissions, returning the updated role
    async fn set_permissions_for_role(
        &self,
        role_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<Role, ServiceError>;
}

/// In-memory role service with injected latency and failures
#[derive(Debug)]
pub struct MockRoleService {
    store: Option<SharedResourceStore>,
    unreliable: Arc<Unreliable>,
}

impl MockRoleService {
    /// Create a service over `store`
    pub fn new(store: SharedResourceStore, unreliable: Arc<Unreliable>) -> Self {
        Self {
            store: Some(store),
            unreliable,
        }
    }

    /// A service with no store; every call fails with `NotInitialized`
    pub fn detached(unreliable: Arc<Unreliable>) -> Self {
        Self {
            store: None,
            unreliable,
        }
    }

    fn store(&self) -> Result<&SharedResourceStore, ServiceError> {
        self.store.as_ref().ok_or(ServiceError::NotInitialized)
    }
}

#[async_trait]
impl RoleService for MockRoleService {
    async fn get_roles(&self) -> Result<Vec<Role>, ServiceError> {
        let store = self.store()?;
        self.unreliable
            .run("get_roles", move || async move {
                let roles = store.read().await.list_roles();
                Ok(roles)
            })
            .await
    }

    async fn get_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        let store = self.store()?;
        self.unreliable
            .run("get_permissions", move || async move {
                let permissions = store.read().await.list_permissions();
                Ok(permissions)
            })
            .await
    }

    async fn set_permissions_for_role(
        &self,
        role_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<Role, ServiceError> {
        let store = self.store()?;
        self.unreliable
            .run("set_permissions_for_role", move || async move {
                let mut guard = store.write().await;
                guard
                    .assign_permissions(role_id, &permissions)
                    .map_err(ServiceError::from)
            })
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================
