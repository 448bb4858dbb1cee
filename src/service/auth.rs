//! Auth Service
//!
//! TigerStyle: One current user, held in local memory.
//!
//! Logging in replaces whoever was logged in before; there are no
//! sessions. `is_authenticated` reads the local slot directly and never
//! goes through the wrapper.

use crate::error::ServiceError;
use crate::types::User;
use crate::unreliable::Unreliable;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Demo credentials: (username, password, role id)
pub const DEMO_CREDENTIALS: [(&str, &str, &str); 3] = [
    ("admin", "admin123", "346a3cce-49d4-4e3c-bade-a16ed44b98bb"),
    ("user", "user123", "9faaf9ba-464e-4c68-a901-630fc4de123bb"),
    ("auditor", "audit123", "6f25f789-72f3-41e2-9561-b30ca19aa225"),
];

// =============================================================================
// Auth Service
// =============================================================================

/// Login state operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and make the user current
    async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError>;

    /// Clear the current user; a no-op when nobody is logged in
    async fn logout(&self) -> Result<(), ServiceError>;

    /// The current user, if any
    async fn current_user(&self) -> Result<Option<User>, ServiceError>;

    /// Whether someone is logged in, without any latency
    fn is_authenticated(&self) -> bool;
}

/// A single credential entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct Credential {
    username: String,
    password: String,
    role: String,
}

/// In-memory auth service with injected latency and failures
#[derive(Debug)]
pub struct MockAuthService {
    credentials: Vec<Credential>,
    current: Arc<RwLock<Option<User>>>,
    unreliable: Arc<Unreliable>,
}

impl MockAuthService {
    /// Create a service with the demo credentials
    pub fn new(unreliable: Arc<Unreliable>) -> Self {
        Self::with_credentials(
            DEMO_CREDENTIALS
                .iter()
                .map(|(username, password, role)| (*username, *password, *role)),
            unreliable,
        )
    }

    /// Create a service with an explicit credential table
    pub fn with_credentials<'a>(
        credentials: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
        unreliable: Arc<Unreliable>,
    ) -> Self {
        let credentials = credentials
            .into_iter()
            .map(|(username, password, role)| Credential {
                username: username.to_string(),
                password: password.to_string(),
                role: role.to_string(),
            })
            .collect();
        Self {
            credentials,
            current: Arc::new(RwLock::new(None)),
            unreliable,
        }
    }

    fn set_current(&self, user: Option<User>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn get_current(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        self.unreliable
            .run("login", move || async move {
                let Some(credential) = self
                    .credentials
                    .iter()
                    .find(|c| c.username == username && c.password == password)
                else {
                    tracing::debug!(username, "Rejected credentials");
                    return Err(ServiceError::InvalidCredentials);
                };

                let user = User {
                    username: credential.username.clone(),
                    role: credential.role.clone(),
                };
                if let Some(previous) = self.get_current() {
                    tracing::debug!(previous = %previous.username, "Replacing current user");
                }
                self.set_current(Some(user.clone()));
                tracing::info!(username = %user.username, role = %user.role, "Logged in");
                Ok(user)
            })
            .await
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        self.unreliable.delay("logout").await;
        if let Some(user) = self.get_current() {
            tracing::info!(username = %user.username, "Logged out");
        }
        self.set_current(None);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, ServiceError> {
        self.unreliable
            .run("current_user", move || async move { Ok(self.get_current()) })
            .await
    }

    fn is_authenticated(&self) -> bool {
        self.get_current().is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnreliableConfig;
    use crate::random::ScriptedRandom;

    fn reliable_auth() -> MockAuthService {
        let unreliable = Arc::new(Unreliable::new(
            UnreliableConfig::default(),
            Arc::new(ScriptedRandom::constant(0.0)),
        ));
        MockAuthService::new(unreliable)
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_success() {
        let auth = reliable_auth();
        assert!(!auth.is_authenticated());

        let user = auth.login("admin", "admin123").await.unwrap();
        assert_eq!(
            user,
            User {
                username: "admin".to_string(),
                role: "346a3cce-49d4-4e3c-bade-a16ed44b98bb".to_string(),
            }
        );
        assert!(auth.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_rejects_bad_credentials() {
        let auth = reliable_auth();

        assert_eq!(
            auth.login("admin", "wrongpassword").await,
            Err(ServiceError::InvalidCredentials)
        );
        assert_eq!(
            auth.login("nonexistent", "password").await,
            Err(ServiceError::InvalidCredentials)
        );
        assert!(!auth.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_login_replaces_first() {
        let auth = reliable_auth();
        auth.login("admin", "admin123").await.unwrap();
        auth.login("auditor", "audit123").await.unwrap();

        let current = auth.current_user().await.unwrap().unwrap();
        assert_eq!(current.username, "auditor");
        assert_eq!(current.role, "6f25f789-72f3-41e2-9561-b30ca19aa225");
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_user_for_user_account() {
        let auth = reliable_auth();
        assert_eq!(auth.current_user().await.unwrap(), None);

        auth.login("user", "user123").await.unwrap();
        assert_eq!(
            auth.current_user().await.unwrap(),
            Some(User {
                username: "user".to_string(),
                role: "9faaf9ba-464e-4c68-a901-630fc4de123bb".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_idempotent() {
        let auth = reliable_auth();
        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());

        auth.login("auditor", "audit123").await.unwrap();
        auth.logout().await.unwrap();
        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.current_user().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_ignores_failure_draws() {
        let unreliable = Arc::new(Unreliable::new(
            UnreliableConfig::default(),
            Arc::new(ScriptedRandom::constant(0.99)),
        ));
        let auth = MockAuthService::new(unreliable);
        assert!(auth.logout().await.is_ok());
        assert!(auth.login("admin", "admin123").await.unwrap_err().is_transient());
    }
}
