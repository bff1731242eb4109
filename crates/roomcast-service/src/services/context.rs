//! Service context - dependency container for services
//!
//! Holds the repository ports and the fan-out bus.

use std::sync::Arc;

use roomcast_cache::FanoutBus;
use roomcast_core::traits::{
    MessageRepository, PresenceRepository, RoomRepository, UserRepository,
};

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
    presence_repo: Arc<dyn PresenceRepository>,

    // Fan-out
    bus: Arc<dyn FanoutBus>,
}

impl ServiceContext {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
        presence_repo: Arc<dyn PresenceRepository>,
        bus: Arc<dyn FanoutBus>,
    ) -> Self {
        Self {
            user_repo,
            room_repo,
            message_repo,
            presence_repo,
            bus,
        }
    }

    /// Build a context where one store backs every repository port
    pub fn from_store<S>(store: Arc<S>, bus: Arc<dyn FanoutBus>) -> Self
    where
        S: UserRepository + RoomRepository + MessageRepository + PresenceRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, bus)
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    pub fn presence_repo(&self) -> &dyn PresenceRepository {
        self.presence_repo.as_ref()
    }

    // === Fan-out ===

    pub fn bus(&self) -> &dyn FanoutBus {
        self.bus.as_ref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("bus", &"FanoutBus")
            .finish()
    }
}

/// Builder for creating `ServiceContext`
#[derive(Default)]
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    room_repo: Option<Arc<dyn RoomRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    presence_repo: Option<Arc<dyn PresenceRepository>>,
    bus: Option<Arc<dyn FanoutBus>>,
}

impl ServiceContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn room_repo(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.room_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn presence_repo(mut self, repo: Arc<dyn PresenceRepository>) -> Self {
        self.presence_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn bus(mut self, bus: Arc<dyn FanoutBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Build the `ServiceContext`
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.user_repo.ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            self.room_repo.ok_or_else(|| ServiceError::validation("room_repo is required"))?,
            self.message_repo.ok_or_else(|| ServiceError::validation("message_repo is required"))?,
            self.presence_repo.ok_or_else(|| ServiceError::validation("presence_repo is required"))?,
            self.bus.ok_or_else(|| ServiceError::validation("bus is required"))?,
        ))
    }
}

impl std::fmt::Debug for ServiceContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContextBuilder")
            .field("bus", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}

/// In-memory wiring shared by the service tests
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use roomcast_cache::{LocalBus, OverflowPolicy};
    use roomcast_core::{User, UserId, UserRepository};
    use roomcast_db::MemoryStore;

    use super::ServiceContext;

    pub(crate) struct Harness {
        pub ctx: ServiceContext,
        pub store: Arc<MemoryStore>,
        pub bus: Arc<LocalBus>,
    }

    pub(crate) async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(LocalBus::new(OverflowPolicy::Disconnect));
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            store
                .upsert(&User {
                    id: UserId::new(id),
                    username: name.to_string(),
                })
                .await
                .unwrap();
        }
        let ctx = ServiceContext::from_store(store.clone(), bus.clone());
        Harness { ctx, store, bus }
    }
}
