//! Gateway server setup
//!
//! Routes, backend wiring, and the serve loop.

mod handler;
mod state;

pub use handler::{room_handler, status_handler, ConnectParams};
pub use state::GatewayState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use roomcast_cache::{FanoutBus, LocalBus, RedisBus, RedisPool, SubscriberConfig};
use roomcast_common::{AppConfig, AppError, BusBackend, JwtService, StorageBackend};
use roomcast_db::{
    MemoryStore, PgMessageRepository, PgPresenceRepository, PgRoomRepository, PgUserRepository,
    PoolConfig,
};
use roomcast_service::{ServiceContext, ServiceContextBuilder};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::handlers::JwtAuthenticator;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/chat/:room", get(room_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_bus(config: &AppConfig) -> Result<Arc<dyn FanoutBus>, AppError> {
    let policy = config.chat.overflow_policy;

    match config.bus {
        BusBackend::Local => {
            tracing::info!(?policy, "Using in-process event bus");
            Ok(Arc::new(LocalBus::new(policy)))
        }
        BusBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .ok_or_else(|| AppError::Config("REDIS_URL is required for the redis bus".to_string()))?;

            tracing::info!("Connecting to Redis...");
            let pool = RedisPool::connect(redis)
                .await
                .map_err(|e| AppError::Cache(e.to_string()))?;

            let subscriber = SubscriberConfig {
                redis_url: redis.url.clone(),
                ..SubscriberConfig::default()
            };
            let bus: Arc<dyn FanoutBus> = RedisBus::spawn(pool, subscriber, policy);
            Ok(bus)
        }
    }
}

async fn create_service_context(
    config: &AppConfig,
    bus: Arc<dyn FanoutBus>,
) -> Result<ServiceContext, AppError> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            Ok(ServiceContext::from_store(Arc::new(MemoryStore::new()), bus))
        }
        StorageBackend::Postgres => {
            let db = config.database.as_ref().ok_or_else(|| {
                AppError::Config("DATABASE_URL is required for postgres storage".to_string())
            })?;

            tracing::info!("Connecting to PostgreSQL...");
            let pool = roomcast_db::create_pool(&PoolConfig::from(db))
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");

            if db.run_migrations {
                roomcast_db::run_migrations(&pool)
                    .await
                    .map_err(|e| AppError::Database(format!("Migration failed: {e}")))?;
            }

            ServiceContextBuilder::new()
                .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
                .room_repo(Arc::new(PgRoomRepository::new(pool.clone())))
                .message_repo(Arc::new(PgMessageRepository::new(pool.clone())))
                .presence_repo(Arc::new(PgPresenceRepository::new(pool)))
                .bus(bus)
                .build()
                .map_err(|e| AppError::Config(e.to_string()))
        }
    }
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let bus = create_bus(&config).await?;
    let service_context = Arc::new(create_service_context(&config, bus).await?);

    let jwt_service = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.token_expiry));
    let authenticator = Arc::new(JwtAuthenticator::new(jwt_service, service_context.clone()));

    Ok(GatewayState::new(service_context, authenticator, config))
}

/// Run the gateway server until ctrl-c
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/chat/{{room}}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn memory_config() -> AppConfig {
        let vars: HashMap<&str, &str> = [
            ("STORAGE_BACKEND", "memory"),
            ("BUS_BACKEND", "local"),
            ("JWT_SECRET", "test-secret"),
        ]
        .into_iter()
        .collect();
        AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_memory_backends_build_state() {
        let state = create_gateway_state(memory_config()).await.unwrap();
        assert_eq!(state.connection_manager().session_count(), 0);
        let _app = create_app(state);
    }

    #[tokio::test]
    async fn test_redis_bus_requires_url() {
        let mut config = memory_config();
        config.bus = BusBackend::Redis;
        config.redis = None;

        let err = create_gateway_state(config).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }
}
