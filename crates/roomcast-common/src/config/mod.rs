//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BusBackend, ChatConfig, ConfigError, DatabaseConfig, Environment,
    JwtConfig, OverflowPolicy, RedisConfig, ServerConfig, StorageBackend,
};
