//! Configuration for the live connection.

use std::time::Duration;

/// Endpoint used in development.
pub const DEFAULT_DEVELOPMENT_URL: &str = "ws://127.0.0.1:8000/ws";

/// Endpoint used in production.
pub const DEFAULT_PRODUCTION_URL: &str = "wss://your-production-server.com/ws";

/// Fixed delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Maximum time a single connection attempt may take.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Advisory surfaced when the connection fails.
pub const CONNECTION_ADVISORY: &str = "Failed to connect to the server. Using mock data instead.";

/// Deployment environment, selecting which endpoint to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name (case-insensitive). `dev` and `prod` are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Configuration for the live link.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Whether to connect at all.
    pub enabled: bool,

    /// Which endpoint to use.
    pub environment: Environment,

    /// Development endpoint.
    pub development_url: String,

    /// Production endpoint.
    pub production_url: String,

    /// Vehicle to subscribe to; `None` subscribes to all vehicles.
    pub vehicle_id: Option<String>,

    /// Delay before reconnecting after a close.
    pub reconnect_delay: Duration,

    /// Timeout for one connection attempt.
    pub connect_timeout: Duration,
}

impl LiveConfig {
    /// The endpoint for the configured environment.
    pub fn url(&self) -> &str {
        match self.environment {
            Environment::Development => &self.development_url,
            Environment::Production => &self.production_url,
        }
    }

    /// Builder-style setter for the subscribed vehicle.
    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: Environment::default(),
            development_url: DEFAULT_DEVELOPMENT_URL.to_string(),
            production_url: DEFAULT_PRODUCTION_URL.to_string(),
            vehicle_id: None,
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}
