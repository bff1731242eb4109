//! Gateway state
//!
//! Application state for the gateway server.

use std::sync::Arc;

use roomcast_common::AppConfig;
use roomcast_service::ServiceContext;

use crate::connection::ConnectionManager;
use crate::handlers::Authenticator;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Service context with repositories and the bus
    service_context: Arc<ServiceContext>,
    /// Live sessions of this process
    connection_manager: Arc<ConnectionManager>,
    /// Resolves identities from tokens
    authenticator: Arc<dyn Authenticator>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        authenticator: Arc<dyn Authenticator>,
        config: AppConfig,
    ) -> Self {
        let connection_manager =
            ConnectionManager::new_shared(service_context.clone(), config.chat.clone());

        Self {
            service_context,
            connection_manager,
            authenticator,
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    pub(crate) fn connection_manager_arc(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}
