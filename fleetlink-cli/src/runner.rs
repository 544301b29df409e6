//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, the fallback store
//! and the async runtime so command handlers stay small.

use std::future::Future;

use fleetlink::alerts::FallbackStore;
use fleetlink::config::ConfigFile;
use fleetlink::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// Log output goes to the configured file only; stdout belongs to the
    /// command's own output.
    pub fn new() -> Result<Self, CliError> {
        Self::with_debug(false)
    }

    /// Create a new CLI runner with optional debug logging.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, defaults to debug-level logging if RUST_LOG is unset
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ".".into());
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| fleetlink::logging::default_log_file().to_string());

        let logging_guard = init_logging(&log_dir, &log_file, false, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Get the loaded configuration for modification by command-line overrides.
    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("FleetLink v{}", fleetlink::VERSION);
        info!("FleetLink CLI: {} command", command);
    }

    /// Open the file-backed fallback store from the configured directory.
    pub fn store(&self) -> FallbackStore {
        info!(directory = %self.config.store.directory.display(), "Using fallback store");
        FallbackStore::open(&self.config.store.directory)
    }

    /// Run a future to completion on a fresh multi-threaded runtime.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;
        Ok(runtime.block_on(future))
    }
}
