//! roledesk - Role/Permission Administration over a Simulated Backend
//!
//! TigerStyle: The backend is in memory but behaves like a network service.
//! Every call is delayed by a random latency and may fail at random, so the
//! client side has to cope with loading states, failures and results that
//! arrive out of order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  RoleSync        │ loading/success/error    │
//! ├─────────────────────────────────────────────┤
//! │  RoleService     │ AuthService              │
//! ├─────────────────────────────────────────────┤
//! │  Unreliable      │ latency + failures       │
//! ├─────────────────────────────────────────────┤
//! │  ResourceStore   │ canonical roles/perms    │
//! └─────────────────────────────────────────────┘
//!          RetryPolicy: opt-in, above any layer
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use roledesk::{MockBackend, RetryPolicy, RoleSync, SeededRandom, UnreliableConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), roledesk::ServiceError> {
//! let backend = MockBackend::new(UnreliableConfig::default(), Arc::new(SeededRandom::new(42)));
//! let sync = RoleSync::new(backend.role_service());
//!
//! let retry = RetryPolicy::default();
//! retry.execute_transient(|| sync.fetch_roles()).await?;
//! println!("{:?}", sync.state().roles.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod random;
pub mod retry;
pub mod service;
pub mod store;
pub mod sync;
pub mod types;
pub mod unreliable;

// Re-export common types
pub use config::{ConfigError, UnreliableConfig};
pub use error::ServiceError;
pub use random::{RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
pub use retry::{Backoff, RetryPolicy};
pub use service::{AuthService, MockAuthService, MockBackend, MockRoleService, RoleService};
pub use store::{ResourceStore, SharedResourceStore, StoreError};
pub use sync::{LoadStatus, RoleSync, RolesState, Tracked};
pub use types::{Permission, PermissionId, Role, RoleId, User};
pub use unreliable::{TransientFailure, Unreliable};
