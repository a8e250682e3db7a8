use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the authenticating gateway attaches to every request
    pub gateway_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions shorter than this are rejected at End
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: i64,
    /// Points credited per completed session
    #[serde(default = "default_points_per_session")]
    pub points_per_session: i64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
    #[serde(default = "default_max_leaderboard_limit")]
    pub max_leaderboard_limit: usize,
    /// Open sessions older than this are ended by the reaper
    #[serde(default = "default_auto_end_after_secs")]
    pub auto_end_after_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_payment_endpoint")]
    pub endpoint: String,
    /// Provider secret; empty means the payment path is not configured
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Interval of the background maintenance task (reaper + limiter cleanup)
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[allow(dead_code)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_max_connections() -> usize {
    10000
}

fn default_min_duration_secs() -> i64 {
    300 // 5 minutes
}

fn default_points_per_session() -> i64 {
    1
}

fn default_leaderboard_limit() -> usize {
    10
}

fn default_max_leaderboard_limit() -> usize {
    100
}

fn default_auto_end_after_secs() -> i64 {
    43200 // 12 hours
}

fn default_payment_endpoint() -> String {
    "https://api.paystack.co".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_payment_timeout() -> u64 {
    10
}

fn default_max_requests_per_minute() -> u32 {
    120
}

fn default_maintenance_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: default_min_duration_secs(),
            points_per_session: default_points_per_session(),
            leaderboard_limit: default_leaderboard_limit(),
            max_leaderboard_limit: default_max_leaderboard_limit(),
            auto_end_after_secs: default_auto_end_after_secs(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_payment_endpoint(),
            secret_key: String::new(),
            currency: default_currency(),
            timeout_secs: default_payment_timeout(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            maintenance_interval: default_maintenance_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            path: None,
            console: false,
        }
    }
}

impl SessionConfig {
    pub fn min_duration_millis(&self) -> i64 {
        self.min_duration_secs * 1000
    }

    pub fn auto_end_after_millis(&self) -> i64 {
        self.auto_end_after_secs * 1000
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.server.max_connections == 0 {
            bail!("max_connections must be greater than 0");
        }

        if self.auth.gateway_key.is_empty() {
            bail!("gateway_key must not be empty");
        }

        if self.session.min_duration_secs < 0 {
            bail!("min_duration_secs must be non-negative");
        }

        if self.session.points_per_session < 0 {
            bail!("points_per_session must be non-negative");
        }

        if self.session.leaderboard_limit == 0 {
            bail!("leaderboard_limit must be greater than 0");
        }

        if self.session.leaderboard_limit > self.session.max_leaderboard_limit {
            bail!(
                "leaderboard_limit ({}) must not exceed max_leaderboard_limit ({})",
                self.session.leaderboard_limit,
                self.session.max_leaderboard_limit
            );
        }

        // The reaper must never race the minimum-duration gate
        if self.session.auto_end_after_secs <= self.session.min_duration_secs {
            bail!(
                "auto_end_after_secs ({}) must be greater than min_duration_secs ({})",
                self.session.auto_end_after_secs,
                self.session.min_duration_secs
            );
        }

        if !self.payment.secret_key.is_empty() && self.payment.endpoint.is_empty() {
            bail!("payment endpoint must not be empty when a secret_key is set");
        }

        if self.payment.timeout_secs == 0 {
            bail!("payment timeout_secs must be greater than 0");
        }

        if self.performance.max_requests_per_minute == 0 {
            bail!("max_requests_per_minute must be greater than 0");
        }

        if self.performance.maintenance_interval == 0 {
            bail!("maintenance_interval must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
