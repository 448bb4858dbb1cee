//! roledesk - Demo Driver
//!
//! Walks one admin session against the simulated backend:
//! log in, load roles and permissions, grant every permission to the
//! logged-in user's role, print the synchronizer state, log out.
//!
//! Every backend call may be slow or fail; transient failures are retried,
//! anything else aborts the run.

use clap::Parser;
use roledesk::retry::RETRY_ATTEMPTS_MAX;
use roledesk::{
    Backoff, MockBackend, RandomSource, RetryPolicy, RoleSync, SeededRandom, ThreadRandom,
    UnreliableConfig,
};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "roledesk";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default retry attempts per backend call
pub const MAX_ATTEMPTS_DEFAULT: u32 = 10;

/// Wait between retries
pub const RETRY_BACKOFF_MS: u64 = 50;

// =============================================================================
// CLI
// =============================================================================

/// Role/permission administration over a simulated, unreliable backend
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Role/permission administration over a simulated, unreliable backend")]
#[command(version)]
struct Cli {
    /// Username to log in with
    #[arg(short, long, default_value = "admin")]
    username: String,

    /// Password to log in with
    #[arg(short, long, default_value = "admin123")]
    password: String,

    /// Seed for reproducible latency and failures
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum injected latency in ms (overrides ROLEDESK_LATENCY_MS_MIN)
    #[arg(long)]
    latency_min_ms: Option<u64>,

    /// Maximum injected latency in ms (overrides ROLEDESK_LATENCY_MS_MAX)
    #[arg(long)]
    latency_max_ms: Option<u64>,

    /// Failure threshold in [0, 1] (overrides ROLEDESK_FAILURE_THRESHOLD)
    #[arg(long)]
    failure_threshold: Option<f64>,

    /// Attempts per backend call before giving up
    #[arg(long, default_value_t = MAX_ATTEMPTS_DEFAULT)]
    max_attempts: u32,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> anyhow::Result<UnreliableConfig> {
        let mut config = UnreliableConfig::from_env()?;
        if let Some(min) = self.latency_min_ms {
            config.latency_ms_min = min;
        }
        if let Some(max) = self.latency_max_ms {
            config.latency_ms_max = max;
        }
        if let Some(threshold) = self.failure_threshold {
            config.failure_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }

    fn retry_policy(&self) -> anyhow::Result<RetryPolicy> {
        if !(1..=RETRY_ATTEMPTS_MAX).contains(&self.max_attempts) {
            anyhow::bail!(
                "--max-attempts must be between 1 and {}, got {}",
                RETRY_ATTEMPTS_MAX,
                self.max_attempts
            );
        }
        Ok(RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .backoff(Backoff::Constant(Duration::from_millis(RETRY_BACKOFF_MS)))
            .build())
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("{} v{}", APP_NAME, APP_VERSION);

    let config = cli.config()?;
    let source: Arc<dyn RandomSource> = match cli.seed {
        Some(seed) => {
            tracing::info!(seed, "Using seeded random source");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(ThreadRandom),
    };
    let retry = cli.retry_policy()?;

    let backend = MockBackend::new(config, source);
    let auth = backend.auth_service();
    let sync = RoleSync::new(backend.role_service());

    // Log in
    let user = retry
        .execute_transient(|| auth.login(&cli.username, &cli.password))
        .await?;
    tracing::info!(username = %user.username, role = %user.role, "Session started");

    // Load both collections concurrently
    futures::try_join!(
        retry.execute_transient(|| sync.fetch_roles()),
        retry.execute_transient(|| sync.fetch_permissions()),
    )?;

    // Grant the whole catalog to the user's role
    let state = sync.state();
    if state.roles.data.iter().any(|r| r.id == user.role) {
        let catalog = state.permissions.data.clone();
        let role = retry
            .execute_transient(|| sync.save_permissions(&user.role, catalog.clone()))
            .await?;
        tracing::info!(role = %role.name, count = role.permissions.len(), "Granted permissions");
    } else {
        tracing::warn!(role = %user.role, "Logged-in user's role is not in the catalog");
    }

    println!("{}", serde_json::to_string_pretty(&sync.state())?);

    auth.logout().await?;
    debug_assert!(!auth.is_authenticated());
    tracing::info!("Session ended");

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once(APP_NAME).chain(args.iter().copied()))
    }

    #[test]
    fn test_max_attempts_default() {
        let policy = cli(&[]).retry_policy().unwrap();
        assert_eq!(policy.max_attempts(), MAX_ATTEMPTS_DEFAULT);
    }

    #[test]
    fn test_max_attempts_out_of_range_is_an_error() {
        let err = cli(&["--max-attempts", "0"]).retry_policy().unwrap_err();
        assert!(err.to_string().contains("got 0"));

        let too_many = (RETRY_ATTEMPTS_MAX + 1).to_string();
        let err = cli(&["--max-attempts", too_many.as_str()]).retry_policy().unwrap_err();
        assert!(err.to_string().contains(&format!("got {}", too_many)));

        let max = RETRY_ATTEMPTS_MAX.to_string();
        assert_eq!(
            cli(&["--max-attempts", max.as_str()]).retry_policy().unwrap().max_attempts(),
            RETRY_ATTEMPTS_MAX
        );
    }
}
