//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Webhook ingestion settings (signing secret, tolerance, retries)
    pub webhook: WebhookSettings,

    /// Session tracking settings (retention, cleanup cadence)
    pub session: SessionSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Webhook ingestion configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Shared signing secret issued by the webhook provider
    /// (`whsec_`-prefixed base64). Empty means unconfigured; every
    /// delivery is then rejected at the verification step.
    pub signing_secret: String,

    /// Maximum allowed clock skew for the signed timestamp, in seconds
    pub tolerance_secs: i64,

    /// Maximum number of retry attempts for a failed event
    pub max_retries: i32,
}

/// Session tracking configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Sessions older than this many days are purged regardless of state
    pub retention_days: i64,

    /// Interval between background cleanup sweeps, in seconds
    pub cleanup_interval_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if retention/tolerance values are out of range.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("webhook.signing_secret", "")?
            .set_default("webhook.tolerance_secs", 300)?
            .set_default("webhook.max_retries", 3)?
            .set_default("session.retention_days", 30)?
            .set_default("session.cleanup_interval_secs", 3600)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option(
                "server.host",
                std::env::var("SERVER_HOST").ok(),
            )?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT").ok(),
            )?
            .set_override_option(
                "database.url",
                std::env::var("DATABASE_URL").ok(),
            )?
            .set_override_option(
                "webhook.signing_secret",
                std::env::var("CLERK_WEBHOOK_SECRET").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                if settings.webhook.tolerance_secs <= 0 {
                    return Err(ConfigError::Message(format!(
                        "Webhook tolerance must be positive, got {}",
                        settings.webhook.tolerance_secs
                    )));
                }
                if settings.webhook.max_retries < 0 {
                    return Err(ConfigError::Message(format!(
                        "Webhook max_retries must not be negative, got {}",
                        settings.webhook.max_retries
                    )));
                }
                if settings.session.retention_days < 1 {
                    return Err(ConfigError::Message(format!(
                        "Session retention must be at least one day, got {}",
                        settings.session.retention_days
                    )));
                }
                Ok(settings)
            })
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid server address configuration")
    }
}

impl DatabaseSettings {
    /// Get the connection URL.
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}

impl WebhookSettings {
    /// Whether a signing secret has been provided.
    pub fn has_signing_secret(&self) -> bool {
        !self.signing_secret.trim().is_empty()
    }
}
