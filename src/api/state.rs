//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::api::error::ApiError;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::provider::ProviderClient;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Full service configuration
    pub config: Arc<Config>,
    /// Chat-completion provider
    pub provider: Arc<ProviderClient>,
    /// Study backend that owns all records
    pub backend: Arc<BackendClient>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Build clients from configuration
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let provider = ProviderClient::new(config.provider.clone())
            .map_err(|e| ApiError::Internal(format!("Failed to create provider client: {}", e)))?;
        let backend = BackendClient::new(config.backend.clone())
            .map_err(|e| ApiError::Internal(format!("Failed to create backend client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            backend: Arc::new(backend),
            start_time: Instant::now(),
        })
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
