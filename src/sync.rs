//! Client State Synchronizer
//!
//! TigerStyle: Explicit per-resource state machines over an unreliable backend.
//!
//! Each tracked collection moves through:
//!
//! ```text
//!            fetch                 settle(ok)
//! Idle ─────────────┐      ┌──────────────────▶ Succeeded
//! Succeeded ────────┼─────▶ Loading
//! Failed ───────────┘      └──────────────────▶ Failed
//!                                settle(err)
//! ```
//!
//! Saving a role's permissions has the same shape. Results are applied only
//! after the backend confirms them: a successful save replaces the one cached
//! role with the returned id, a failed one leaves the cache as it was.
//!
//! Errors are reduced to their message. Nothing here retries; wrap a dispatch
//! in a [`RetryPolicy`](crate::retry::RetryPolicy) if that is wanted.
//!
//! A dispatch runs to completion even when its caller stops waiting, so
//! `pending` always drains back to zero.
//!
//! Fetches can complete out of order. Every fetch takes a ticket and only
//! the most recently issued fetch of a collection may settle it; older
//! results are still returned to their caller but leave the state alone.

use crate::error::ServiceError;
use crate::service::RoleService;
use crate::types::{Permission, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

// =============================================================================
// Types
// =============================================================================

/// Status of a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Never requested
    #[default]
    Idle,
    /// Waiting on a request
    Loading,
    /// Last settled request succeeded
    Succeeded,
    /// Last settled request failed
    Failed,
}

/// A cached value plus the state of the requests feeding it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    /// Current status
    pub status: LoadStatus,
    /// Cached value
    pub data: T,
    /// Message of the last failure, cleared when a new request starts
    pub error: Option<String>,
    /// Requests in flight
    pub pending: usize,
    /// When a request last settled this resource
    pub settled_at: Option<DateTime<Utc>>,
    /// Most recently issued ticket
    #[serde(skip)]
    ticket: u64,
}

impl<T: Default> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            data: T::default(),
            error: None,
            pending: 0,
            settled_at: None,
            ticket: 0,
        }
    }
}

impl<T> Tracked<T> {
    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// Enter `Loading`, clear the error, hand out a ticket
    fn begin(&mut self) -> u64 {
        self.ticket += 1;
        self.pending += 1;
        self.status = LoadStatus::Loading;
        self.error = None;
        self.ticket
    }

    /// Record the outcome of one request; `apply` runs only on success
    ///
    /// Stays `Loading` while other requests are still in flight.
    fn settle<R, F>(&mut self, result: &Result<R, ServiceError>, apply: F)
    where
        F: FnOnce(&mut T, &R),
    {
        self.record(result, apply);
        if self.pending > 0 {
            self.status = LoadStatus::Loading;
        }
    }

    /// Settle only if `ticket` is the latest one issued
    ///
    /// A superseded ticket just releases its pending slot. The latest ticket
    /// settles the resource even if older requests are still out, since
    /// their results will be discarded.
    fn settle_latest<R, F>(&mut self, ticket: u64, result: &Result<R, ServiceError>, apply: F) -> bool
    where
        F: FnOnce(&mut T, &R),
    {
        if ticket != self.ticket {
            self.release();
            return false;
        }
        self.record(result, apply);
        true
    }

    fn record<R, F>(&mut self, result: &Result<R, ServiceError>, apply: F)
    where
        F: FnOnce(&mut T, &R),
    {
        self.release();
        self.settled_at = Some(Utc::now());
        match result {
            Ok(value) => {
                apply(&mut self.data, value);
                self.error = None;
                self.status = LoadStatus::Succeeded;
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.status = LoadStatus::Failed;
            }
        }
    }

    fn release(&mut self) {
        assert!(self.pending > 0, "settle without a matching begin");
        self.pending -= 1;
    }
}

/// Everything the synchronizer tracks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RolesState {
    /// Cached roles
    pub roles: Tracked<Vec<Role>>,
    /// Cached permission catalog
    pub permissions: Tracked<Vec<Permission>>,
    /// Permission saves; `data` is the last role the backend confirmed
    pub save: Tracked<Option<Role>>,
}

// =============================================================================
// Role Sync
// =============================================================================

/// Tracks roles and permissions fetched through a [`RoleService`]
///
/// Every dispatch runs on its own spawned task, which settles the state when
/// the service answers. Dropping the returned future only stops waiting for
/// the result: the call still completes and still settles.
pub struct RoleSync {
    service: Option<Arc<dyn RoleService>>,
    state: Arc<watch::Sender<RolesState>>,
}

impl std::fmt::Debug for RoleSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSync")
            .field("attached", &self.service.is_some())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl RoleSync {
    /// Create a synchronizer over `service`
    pub fn new(service: Arc<dyn RoleService>) -> Self {
        Self::build(Some(service))
    }

    /// A synchronizer with no service; every dispatch settles as failed
    pub fn detached() -> Self {
        Self::build(None)
    }

    fn build(service: Option<Arc<dyn RoleService>>) -> Self {
        let (state, _) = watch::channel(RolesState::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RolesState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<RolesState> {
        self.state.subscribe()
    }

    /// Fetch all roles into the cache
    pub async fn fetch_roles(&self) -> Result<Vec<Role>, ServiceError> {
        self.dispatch(
            |s| s.roles.begin(),
            |service| async move { service.get_roles().await },
            |s, ticket, result| {
                let applied = s.roles.settle_latest(ticket, result, |cached, roles| {
                    cached.clone_from(roles);
                });
                log_settle("roles", ticket, applied, result);
            },
        )
        .await
    }

    /// Fetch the permission catalog into the cache
    pub async fn fetch_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        self.dispatch(
            |s| s.permissions.begin(),
            |service| async move { service.get_permissions().await },
            |s, ticket, result| {
                let applied = s.permissions.settle_latest(ticket, result, |cached, permissions| {
                    cached.clone_from(permissions);
                });
                log_settle("permissions", ticket, applied, result);
            },
        )
        .await
    }

    /// Replace a role's permissions, then reconcile that one cached role
    pub async fn save_permissions(
        &self,
        role_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<Role, ServiceError> {
        tracing::debug!(role_id, count = permissions.len(), "Saving permissions");
        let role_id = role_id.to_string();
        let target = role_id.clone();

        self.dispatch(
            |s| s.save.begin(),
            move |service| async move {
                service.set_permissions_for_role(&target, permissions).await
            },
            move |s, _, result| {
                s.save.settle(result, |last, role| *last = Some(role.clone()));
                match result {
                    Ok(role) => {
                        for cached in s.roles.data.iter_mut().filter(|r| r.id == role.id) {
                            *cached = role.clone();
                        }
                        tracing::info!(role_id = %role.id, "Saved permissions");
                    }
                    Err(e) => {
                        tracing::warn!(role_id = %role_id, error = %e, "Saving permissions failed")
                    }
                }
            },
        )
        .await
    }

    /// Begin a request, run `call` on a spawned task, settle from that task
    ///
    /// The ticket is taken before spawning, so tickets follow call order.
    async fn dispatch<T, B, C, Fut, S>(&self, begin: B, call: C, settle: S) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        B: FnOnce(&mut RolesState) -> u64,
        C: FnOnce(Arc<dyn RoleService>) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
        S: FnOnce(&mut RolesState, u64, &Result<T, ServiceError>) + Send + 'static,
    {
        let mut ticket = 0;
        self.state.send_modify(|s| ticket = begin(s));
        tracing::debug!(ticket, "Dispatching request");

        let work = self.service.clone().map(call);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let result = match work {
                Some(work) => work.await,
                None => Err(ServiceError::NotInitialized),
            };
            state.send_modify(|s| settle(s, ticket, &result));
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => match e.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                Err(_) => Err(ServiceError::Cancelled),
            },
        }
    }
}

fn log_settle<T>(resource: &str, ticket: u64, applied: bool, result: &Result<T, ServiceError>) {
    if !applied {
        tracing::debug!(resource, ticket, "Discarded stale fetch result");
        return;
    }
    match result {
        Ok(_) => tracing::debug!(resource, ticket, "Fetch succeeded"),
        Err(e) => tracing::warn!(resource, ticket, error = %e, "Fetch failed"),
    }
}

// =============================================================================
// Tests
// =============================================================================
