//! Runtime orchestration: configuration, storage connection, command serving
//! and shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ballot_runtime::BallotRuntime;
//!
//! // Loads ballot.toml from the current directory, falls back to defaults.
//! let runtime = BallotRuntime::new();
//! runtime.start().await?;
//! runtime.attach_notifier(my_connector)?;
//!
//! let reply = runtime.handle_command(&cmd).await?;
//!
//! runtime.shutdown().await?;
//! ```
//!
//! A connector with its own event loop uses [`BallotRuntime::run_until`] instead,
//! which starts the runtime, awaits the given future and shuts down.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ballot_core::{BoxedNotifier, OpContext};
use ballot_framework::{Command, CommandSpec, PollService, Router};
use ballot_storage::{PollStore, StorageConfig, TuplePollStore};
use tokio::signal;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::config::{BallotConfig, ConfigLoader, ConfigResult};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Everything built by [`BallotRuntime::start`].
struct Components {
    store: Arc<TuplePollStore>,
    service: Arc<PollService>,
    router: Router,
}

/// The Ballot runtime.
///
/// Owns the storage handle for the lifetime of the process. All methods take
/// `&self`, so the runtime can be shared behind an `Arc` by connectors that
/// serve commands concurrently.
pub struct BallotRuntime {
    config: BallotConfig,
    /// Parent of every command context; cancelled on shutdown.
    root: OpContext,
    components: OnceCell<Components>,
    closed: AtomicBool,
}

impl BallotRuntime {
    /// Creates a runtime from `ballot.toml` in the current directory.
    ///
    /// If the configuration cannot be loaded, defaults are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                BallotConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration and initializes logging.
    pub fn from_config(config: &BallotConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            backend = ?config.storage.backend,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            root: OpContext::background(),
            components: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BallotConfig {
        &self.config
    }

    /// Returns `true` between a successful [`start`](Self::start) and [`shutdown`](Self::shutdown).
    pub fn is_running(&self) -> bool {
        self.components.initialized() && !self.closed.load(Ordering::Acquire)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connects to storage and builds the service and router.
    ///
    /// Connection failures are retried `storage.connect_attempts` times with a
    /// fixed `storage.retry_delay_ms` pause. Calling `start` again after a
    /// success is a no-op.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RuntimeError::ShutDown);
        }

        if self.components.initialized() {
            warn!("Runtime is already running");
            return Ok(());
        }

        self.components
            .get_or_try_init(|| async {
                let store = Arc::new(connect_with_retry(&self.config.storage).await?);
                let service = Arc::new(PollService::new(store.clone()));
                let router = Router::new(service.clone());
                Ok::<_, RuntimeError>(Components {
                    store,
                    service,
                    router,
                })
            })
            .await?;

        info!(
            commands = self.commands().len(),
            timeout_ms = self.config.commands.timeout_ms,
            "Ballot runtime started"
        );
        Ok(())
    }

    /// Cancels in-flight commands and closes the store.
    ///
    /// Only the first call does any work.
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Runtime already shut down");
            return Ok(());
        }

        info!("Stopping Ballot runtime");
        self.root.cancel();

        if let Some(components) = self.components.get() {
            components.store.close().await?;
        }

        info!("Runtime stopped");
        Ok(())
    }

    /// Starts, waits for `shutdown` to resolve, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.shutdown().await
    }

    /// Starts and runs until Ctrl+C or SIGTERM.
    pub async fn run_until_signal(&self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Ballot runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.shutdown().await
    }

    // =========================================================================
    // Serving
    // =========================================================================

    fn components(&self) -> RuntimeResult<&Components> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RuntimeError::ShutDown);
        }
        self.components.get().ok_or(RuntimeError::NotStarted)
    }

    /// The poll service built by [`start`](Self::start).
    pub fn service(&self) -> RuntimeResult<Arc<PollService>> {
        Ok(self.components()?.service.clone())
    }

    /// The command router built by [`start`](Self::start).
    pub fn router(&self) -> RuntimeResult<Router> {
        Ok(self.components()?.router.clone())
    }

    /// The static command table, for connector registration.
    pub fn commands(&self) -> &'static [CommandSpec] {
        &ballot_framework::COMMANDS
    }

    /// Installs the outbound notifier. Call before serving traffic.
    pub fn attach_notifier(&self, notifier: BoxedNotifier) -> RuntimeResult<()> {
        self.components()?.service.attach_notifier(notifier);
        debug!("Notifier attached");
        Ok(())
    }

    /// A fresh context for one command: child of the shutdown context,
    /// bounded by `commands.timeout_ms`.
    pub fn command_context(&self) -> OpContext {
        self.root
            .child()
            .with_timeout(self.config.commands.timeout())
    }

    /// Handles one command and returns the reply text.
    pub async fn handle_command(&self, cmd: &Command) -> RuntimeResult<String> {
        let router = &self.components()?.router;
        Ok(router.handle(&self.command_context(), cmd).await)
    }

    /// Handles one command and posts the reply to its channel.
    pub async fn handle_and_post(&self, cmd: &Command) -> RuntimeResult<String> {
        let router = &self.components()?.router;
        Ok(router.handle_and_post(&self.command_context(), cmd).await)
    }
}

impl Default for BallotRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens the store, retrying with a fixed delay.
async fn connect_with_retry(config: &StorageConfig) -> RuntimeResult<TuplePollStore> {
    let attempts = config.connect_attempts.max(1);
    let delay = Duration::from_millis(config.retry_delay_ms);

    let mut attempt = 1;
    loop {
        match TuplePollStore::connect(config).await {
            Ok(store) => {
                info!(attempt, space = %config.space, "Connected to storage");
                return Ok(store);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    retry_in_ms = config.retry_delay_ms,
                    error = %e,
                    "Storage connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempts, error = %e, "Giving up on storage connection");
                return Err(RuntimeError::StorageUnavailable {
                    attempts,
                    source: e,
                });
            }
        }
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`BallotRuntime`] with custom configuration sources.
///
/// ```rust,ignore
/// let runtime = BallotRuntime::builder()
///     .config_file("config/ballot.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration below files and environment variables.
    pub fn merge(mut self, config: BallotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<BallotRuntime> {
        let config = self.config_loader.load()?;
        Ok(BallotRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
