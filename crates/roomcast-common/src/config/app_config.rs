//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::str::FromStr;

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub storage: StorageBackend,
    /// Present when `storage` is `Postgres`
    pub database: Option<DatabaseConfig>,
    pub bus: BusBackend,
    /// Present when `bus` is `Redis`
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub chat: ChatConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(other.to_string()),
        }
    }
}

/// Listening address
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where rooms, messages, and presence are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local maps, for development and tests
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(other.to_string()),
        }
    }
}

/// How events reach sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusBackend {
    /// Redis pub/sub, shared between gateway processes
    #[default]
    Redis,
    /// In-process only
    Local,
}

impl FromStr for BusBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "local" => Ok(Self::Local),
            other => Err(other.to_string()),
        }
    }
}

/// What the bus does when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the event for that subscriber only
    DropEvent,
    /// Evict the subscriber; its session is closed
    #[default]
    Disconnect,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" | "drop_event" => Ok(Self::DropEvent),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(other.to_string()),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens minted by `JwtService::issue_token`
    pub token_expiry: i64,
}

/// Real-time chat behaviour
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Bound of each session's inbound event queue
    pub event_queue_size: usize,
    pub overflow_policy: OverflowPolicy,
    /// 0 disables keep-alive pings
    pub ping_interval_secs: u64,
    /// 0 disables the idle timeout
    pub idle_timeout_secs: u64,
    /// Messages replayed to a newly joined room session (0 disables)
    pub history_on_join: i64,
    /// Send rejection frames to the sender on empty or oversized content
    pub notify_rejections: bool,
    /// Largest inbound WebSocket message or frame accepted
    pub max_frame_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            event_queue_size: default_event_queue_size(),
            overflow_policy: OverflowPolicy::default(),
            ping_interval_secs: default_ping_interval(),
            idle_timeout_secs: 0,
            history_on_join: 0,
            notify_rejections: false,
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

// Default value functions
fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_app_name() -> String {
    "roomcast".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_event_queue_size() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let storage = vars.parsed("STORAGE_BACKEND")?.unwrap_or_default();
        let bus = vars.parsed("BUS_BACKEND")?.unwrap_or_default();

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars
                    .parsed("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: vars
                    .parsed("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
                run_migrations: vars.parsed("DATABASE_RUN_MIGRATIONS")?.unwrap_or(true),
            }),
            StorageBackend::Memory => None,
        };

        let redis = match bus {
            BusBackend::Redis => Some(RedisConfig {
                url: vars.required("REDIS_URL")?,
                max_connections: vars
                    .parsed("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            }),
            BusBackend::Local => None,
        };

        let event_queue_size = vars
            .parsed("GATEWAY_EVENT_QUEUE_SIZE")?
            .unwrap_or_else(default_event_queue_size);
        if event_queue_size == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_EVENT_QUEUE_SIZE",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: vars.parsed("APP_ENV")?.unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: vars.get("GATEWAY_HOST").unwrap_or_else(default_host),
                port: vars.parsed("GATEWAY_PORT")?.unwrap_or_else(default_port),
            },
            storage,
            database,
            bus,
            redis,
            jwt: JwtConfig {
                secret: vars.required("JWT_SECRET")?,
                token_expiry: vars
                    .parsed("JWT_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_token_expiry),
            },
            chat: ChatConfig {
                event_queue_size,
                overflow_policy: vars.parsed("GATEWAY_OVERFLOW_POLICY")?.unwrap_or_default(),
                ping_interval_secs: vars
                    .parsed("GATEWAY_PING_INTERVAL_SECS")?
                    .unwrap_or_else(default_ping_interval),
                idle_timeout_secs: vars.parsed("GATEWAY_IDLE_TIMEOUT_SECS")?.unwrap_or(0),
                history_on_join: vars.parsed("GATEWAY_HISTORY_ON_JOIN")?.unwrap_or(0),
                notify_rejections: vars.parsed("GATEWAY_NOTIFY_REJECTIONS")?.unwrap_or(false),
                max_frame_bytes: vars
                    .parsed("GATEWAY_MAX_FRAME_BYTES")?
                    .unwrap_or_else(default_max_frame_bytes),
            },
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingVar(key))
    }

    fn parsed<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
            })
            .transpose()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
