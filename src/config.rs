use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub cleanup: CleanupConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "TASKBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API
    #[arg(long, env = "TASKBOARD_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the health endpoints
    #[arg(long, env = "TASKBOARD_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "TASKBOARD_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,

    /// Seconds to wait for background workers after a shutdown signal
    #[arg(long, env = "TASKBOARD_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL. Without it tokens are kept in process memory.
    #[arg(long = "database-url", env = "TASKBOARD_DATABASE_URL")]
    pub url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long, env = "TASKBOARD_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle pooled connections
    #[arg(long, env = "TASKBOARD_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    #[arg(long, env = "TASKBOARD_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for access token signing
    #[arg(long, env = "TASKBOARD_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token time-to-live in seconds
    #[arg(long, env = "TASKBOARD_ACCESS_TOKEN_TTL_SECS", default_value_t = 900)]
    pub access_token_ttl_secs: u64,

    /// Refresh token time-to-live in days
    #[arg(
        long,
        env = "TASKBOARD_REFRESH_TOKEN_TTL_DAYS",
        default_value_t = 30,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub refresh_token_ttl_days: i64,

    /// Password reset token time-to-live in seconds
    #[arg(
        long,
        env = "TASKBOARD_RESET_TOKEN_TTL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub reset_token_ttl_secs: i64,

    /// Deadline for a single token store operation in milliseconds
    #[arg(long, env = "TASKBOARD_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Mark the refresh cookie `Secure` (disable only for plain-HTTP local development)
    #[arg(long, env = "TASKBOARD_COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
    pub cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> time::Duration {
        time::Duration::days(self.refresh_token_ttl_days)
    }

    #[must_use]
    pub fn reset_token_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.reset_token_ttl_secs)
    }
}

#[derive(Clone, Debug, Args)]
pub struct CleanupConfig {
    /// How often to sweep expired tokens (0 disables the sweeper)
    #[arg(long, env = "TASKBOARD_TOKEN_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    pub token_cleanup_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "TASKBOARD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint for traces and metrics
    #[arg(long, env = "TASKBOARD_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
