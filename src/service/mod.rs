//! Service Facades
//!
//! TigerStyle: Typed async operations over the simulated backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 MockBackend                   │
//! ├──────────────────────┬───────────────────────┤
//! │   MockRoleService    │    MockAuthService    │
//! ├──────────────────────┴───────────────────────┤
//! │        Unreliable (latency + failures)        │
//! ├──────────────────────────────────────────────┤
//! │   ResourceStore      │   current user slot    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is global. Build one [`MockBackend`] and hand its services
//! to whoever needs them.

mod auth;
mod role;

pub use auth::{AuthService, MockAuthService, DEMO_CREDENTIALS};
pub use role::{MockRoleService, RoleService};

use crate::config::UnreliableConfig;
use crate::random::RandomSource;
use crate::store::{new_shared_store, SharedResourceStore};
use crate::unreliable::Unreliable;
use std::sync::Arc;

/// Composition root for the simulated backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Canonical role/permission state
    pub store: SharedResourceStore,
    /// Role facade
    pub roles: Arc<MockRoleService>,
    /// Auth facade
    pub auth: Arc<MockAuthService>,
}

impl MockBackend {
    /// Seeded store and both facades sharing one wrapper
    pub fn new(config: UnreliableConfig, source: Arc<dyn RandomSource>) -> Self {
        let store = new_shared_store();
        let unreliable = Arc::new(Unreliable::new(config, source));

        tracing::debug!(
            latency_ms_min = config.latency_ms_min,
            latency_ms_max = config.latency_ms_max,
            failure_threshold = config.failure_threshold,
            "Built mock backend"
        );

        Self {
            roles: Arc::new(MockRoleService::new(store.clone(), unreliable.clone())),
            auth: Arc::new(MockAuthService::new(unreliable)),
            store,
        }
    }

    /// Role facade as a trait object
    pub fn role_service(&self) -> Arc<dyn RoleService> {
        self.roles.clone()
    }

    /// Auth facade as a trait object
    pub fn auth_service(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    #[tokio::test]
    async fn test_backend_shares_one_store() {
        let backend = MockBackend::new(
            UnreliableConfig::reliable(),
            Arc::new(ScriptedRandom::constant(0.0)),
        );
        let catalog = backend.roles.get_permissions().await.unwrap();
        let role = backend
            .role_service()
            .set_permissions_for_role("346a3cce-49d4-4e3c-bade-a16ed44b98bb", catalog.clone())
            .await
            .unwrap();

        let stored = backend.store.read().await.role(&role.id).unwrap();
        assert_eq!(stored.permissions, catalog);
    }
}
