use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub sending: SendingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_public_url")]
    pub public_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Basic Auth credentials for the private API. Both fields are required;
/// an empty password aborts startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendingConfig {
    /// Maximum recipient sends per second within one campaign.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Retries per recipient after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Sleep between retries, in seconds.
    #[serde(default = "default_retry_delay", alias = "retry_delay")]
    pub retry_delay_secs: u64,

    /// Recipient count between counter flushes to the store.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl SendingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for SendingConfig {
    fn default() -> Self {
        SendingConfig {
            rate_limit: default_rate_limit(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_database_path() -> String {
    "./data/tinylist.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_rate_limit() -> u32 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    5
}
fn default_batch_size() -> u32 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TINYLIST").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.username.is_empty() {
            return Err(config::ConfigError::Message(
                "auth.username must not be empty".to_string(),
            ));
        }
        if self.auth.password.is_empty() {
            return Err(config::ConfigError::Message(
                "auth.password must not be empty".to_string(),
            ));
        }
        if self.sending.rate_limit < 1 {
            return Err(config::ConfigError::Message(
                "sending.rate_limit must be at least 1".to_string(),
            ));
        }
        if self.sending.batch_size < 1 {
            return Err(config::ConfigError::Message(
                "sending.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }
}
