#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::delivery::LogResetTokenSender;
use crate::adapters::memory::{MemoryCredentialRepository, MemoryTokenStore};
use crate::api::client_context::ClientIpResolver;
use crate::api::cookies::CookieSettings;
use crate::api::{AppState, MgmtState};
use crate::config::Config;
use crate::core::credentials::CredentialRepository;
use crate::core::reset_delivery::ResetTokenSender;
use crate::core::token_store::TokenStore;
use crate::services::account_service::AccountService;
use crate::services::health_service::HealthService;
use crate::services::session_service::SessionService;
use crate::workers::TokenCleanupWorker;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fully wired application: router state plus the background workers.
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub mgmt_state: MgmtState,
    pub workers: Workers,
}

#[derive(Debug)]
pub struct Workers {
    token_cleanup: TokenCleanupWorker,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.token_cleanup.run(shutdown_rx))]
    }
}

/// Wires services over the chosen adapters. Missing storage adapters default to the in-memory ones
/// and reset tokens are only logged unless a sender is supplied.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    token_store: Option<Arc<dyn TokenStore>>,
    credentials: Option<Arc<dyn CredentialRepository>>,
    reset_sender: Option<Arc<dyn ResetTokenSender>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, token_store: None, credentials: None, reset_sender: None }
    }

    #[must_use]
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialRepository>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_reset_sender(mut self, sender: Arc<dyn ResetTokenSender>) -> Self {
        self.reset_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn build(self) -> App {
        let config = self.config;
        let token_store = self.token_store.unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let credentials = self.credentials.unwrap_or_else(|| Arc::new(MemoryCredentialRepository::new()));

        let sessions = SessionService::new(&config.auth, Arc::clone(&token_store));
        let reset_sender = self.reset_sender.unwrap_or_else(|| Arc::new(LogResetTokenSender));
        let accounts = AccountService::new(sessions.clone(), credentials, reset_sender);
        let health_service = HealthService::new(Arc::clone(&token_store), config.auth.store_timeout());
        let token_cleanup = TokenCleanupWorker::new(token_store, config.cleanup.token_cleanup_interval_secs);

        let state = AppState {
            sessions,
            accounts,
            cookies: CookieSettings {
                secure: config.auth.cookie_secure,
                max_age_secs: config.auth.refresh_token_ttl().whole_seconds(),
            },
            client_ip: ClientIpResolver::new(config.server.trusted_proxies.clone()),
        };

        App { state, mgmt_state: MgmtState { health_service }, workers: Workers { token_cleanup } }
    }
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, draining connections...");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        tracing::error!(panic = %info, %location, "Process panicked");
    }));
}
