//! Connection manager
//!
//! Owns the live sessions of this process and implements the session
//! lifecycle: connect, receive, deliver, disconnect.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use roomcast_cache::{PubSubChannel, SessionHandle};
use roomcast_common::ChatConfig;
use roomcast_core::{Identity, Room, RoomEvent, RoomId, RoomMessageEvent, RoomName, UserId};
use roomcast_service::{MessageStore, PresenceTracker, RoomRegistry, ServiceContext};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, instrument, warn};

use super::locks::KeyedLocks;
use super::session::{Session, SessionScope, SessionState};
use super::transport::{Transport, TransportError};
use crate::handlers::{HandlerError, HandlerResult};
use crate::protocol::{encode_event, InboundMessage};

/// What a connection asks to be bound to
#[derive(Debug, Clone)]
pub enum ConnectScope {
    Room(RoomName),
    Presence,
}

/// A session that reached `Joined`, with the ends its tasks drive
#[derive(Debug)]
pub struct Connected {
    pub session: Arc<Session>,
    /// Bus events for this session, bounded by `GATEWAY_EVENT_QUEUE_SIZE`
    pub events: mpsc::Receiver<RoomEvent>,
    /// Fires when the bus evicts the session as a slow consumer
    pub eviction: Arc<Notify>,
    /// Recent room messages to push before live events, oldest first
    pub history: Vec<RoomEvent>,
}

/// Manages all sessions of this gateway process
pub struct ConnectionManager {
    ctx: Arc<ServiceContext>,
    chat: ChatConfig,

    /// Live sessions by session ID
    sessions: DashMap<Arc<str>, Arc<Session>>,

    /// Live session count per user, guarded by `user_locks`
    online: DashMap<UserId, usize>,

    /// Orders persist-then-publish per room
    room_locks: KeyedLocks<RoomId>,

    /// Orders presence transitions per user
    user_locks: KeyedLocks<UserId>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, chat: ChatConfig) -> Self {
        Self {
            ctx,
            chat,
            sessions: DashMap::new(),
            online: DashMap::new(),
            room_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
        }
    }

    #[must_use]
    pub fn new_shared(ctx: Arc<ServiceContext>, chat: ChatConfig) -> Arc<Self> {
        Arc::new(Self::new(ctx, chat))
    }

    #[must_use]
    pub fn service_context(&self) -> &ServiceContext {
        &self.ctx
    }

    #[must_use]
    pub fn chat_config(&self) -> &ChatConfig {
        &self.chat
    }

    /// Authenticate, authorize, and subscribe a new session.
    ///
    /// On error nothing is subscribed and the connection must not be accepted.
    #[instrument(skip(self, identity), fields(user_id))]
    pub async fn connect(
        &self,
        scope: ConnectScope,
        identity: Option<Identity>,
    ) -> HandlerResult<Connected> {
        let Some(identity) = identity else {
            info!("Connection refused: unauthenticated");
            return Err(HandlerError::Unauthenticated);
        };
        let user_id = identity.user_id;
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let scope = match scope {
            ConnectScope::Room(name) => SessionScope::Room(self.authorize(&name, user_id).await?),
            ConnectScope::Presence => SessionScope::Presence,
        };

        let session = Session::new(identity, scope);
        session.advance(SessionState::Connecting, SessionState::Authorizing);

        let (handle, events) =
            SessionHandle::channel(session.shared_id(), self.chat.event_queue_size);
        let eviction = handle.eviction();

        let mut channels = Vec::with_capacity(2);
        if let Some(room) = session.room() {
            channels.push(PubSubChannel::room(room.id));
        }
        channels.push(PubSubChannel::presence());

        for channel in channels {
            if let Err(e) = self.ctx.bus().subscribe(&channel, handle.clone()).await {
                warn!(session_id = session.id(), channel = %channel, error = %e, "Subscribe failed");
                self.release_subscriptions(&session).await;
                session.mark_closed();
                return Err(e.into());
            }
            session.add_subscription(channel);
        }

        let history = self.history(&session).await;

        session.advance(SessionState::Authorizing, SessionState::Joined);
        self.sessions.insert(session.shared_id(), session.clone());
        self.session_opened(user_id).await;

        info!(
            session_id = session.id(),
            room_id = ?session.room().map(|r| r.id),
            "Session joined"
        );

        Ok(Connected {
            session,
            events,
            eviction,
            history,
        })
    }

    /// Resolve the room, creating it for the requester if it does not exist.
    /// An existing room admits members only.
    async fn authorize(&self, name: &RoomName, user_id: UserId) -> HandlerResult<Room> {
        let registry = RoomRegistry::new(&self.ctx);
        let (room, created) = registry.get_or_create(name, user_id).await?;

        if !created && !registry.is_member(room.id, user_id).await? {
            info!(room_id = %room.id, "Connection refused: not a room member");
            return Err(HandlerError::AccessDenied);
        }

        Ok(room)
    }

    async fn history(&self, session: &Session) -> Vec<RoomEvent> {
        let limit = self.chat.history_on_join;
        let Some(room) = session.room().filter(|_| limit > 0) else {
            return Vec::new();
        };

        let messages = match MessageStore::new(&self.ctx).list_recent(room.id, limit).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(session_id = session.id(), room_id = %room.id, error = %e, "History unavailable");
                return Vec::new();
            }
        };

        let mut authors: Vec<UserId> = messages.iter().map(|m| m.author_id).collect();
        authors.sort_unstable();
        authors.dedup();

        let names: HashMap<UserId, String> = match self.ctx.user_repo().find_many(&authors).await {
            Ok(users) => users.into_iter().map(|u| (u.id, u.username)).collect(),
            Err(e) => {
                warn!(session_id = session.id(), error = %e, "History author lookup failed");
                HashMap::new()
            }
        };

        messages
            .iter()
            .map(|message| {
                let author = Identity {
                    user_id: message.author_id,
                    display_name: names
                        .get(&message.author_id)
                        .cloned()
                        .unwrap_or_else(|| message.author_id.to_string()),
                };
                RoomEvent::RoomMessage(RoomMessageEvent::from_message(message, &author))
            })
            .collect()
    }

    /// Persist an inbound frame and publish it to the session's room.
    ///
    /// Every error is per-message; the session stays joined.
    #[instrument(skip(self, session, raw), fields(session_id = session.id()))]
    pub async fn receive(&self, session: &Session, raw: &str) -> HandlerResult<RoomMessageEvent> {
        session
            .begin_receive()
            .map_err(|state| HandlerError::InvalidState(state.as_str()))?;
        let result = self.persist_and_publish(session, raw).await;
        session.end_receive();
        result
    }

    async fn persist_and_publish(
        &self,
        session: &Session,
        raw: &str,
    ) -> HandlerResult<RoomMessageEvent> {
        let room = session.room().ok_or(HandlerError::NoRoom)?;
        let inbound = InboundMessage::parse(raw)
            .ok_or(HandlerError::MalformedPayload("expected {\"message\": <non-empty string>}"))?;

        let _guard = self.room_locks.lock(room.id).await;

        let message = MessageStore::new(&self.ctx)
            .append(room.id, session.identity().user_id, &inbound.message)
            .await
            .map_err(HandlerError::from_append)?;

        let event = RoomMessageEvent::from_message(&message, session.identity());
        let reached = self
            .ctx
            .bus()
            .publish(&PubSubChannel::room(room.id), &RoomEvent::RoomMessage(event.clone()))
            .await?;

        debug!(room_id = %room.id, message_id = %message.id, reached, "Message published");
        Ok(event)
    }

    /// Push one event to the client
    pub async fn on_room_event<T>(
        &self,
        session: &Session,
        event: &RoomEvent,
        transport: &mut T,
    ) -> Result<(), TransportError>
    where
        T: Transport + ?Sized,
    {
        if !session.state().is_open() {
            return Err(TransportError::Closed);
        }

        tracing::trace!(session_id = session.id(), event_type = event.event_type(), "Delivering event");
        transport.send_text(encode_event(event)).await
    }

    /// Unsubscribe everything and close the session.
    ///
    /// Returns `false` when the session was already closing or closed.
    #[instrument(skip(self, session), fields(session_id = session.id()))]
    pub async fn disconnect(&self, session: &Session) -> bool {
        if !session.begin_close() {
            return false;
        }

        self.release_subscriptions(session).await;

        if self.sessions.remove(session.id()).is_some() {
            self.session_closed(session.identity().user_id).await;
        }

        session.mark_closed();
        self.room_locks.prune();
        self.user_locks.prune();

        info!(
            user_id = %session.identity().user_id,
            duration_ms = u64::try_from(session.age().as_millis()).unwrap_or(u64::MAX),
            "Session closed"
        );
        true
    }

    async fn release_subscriptions(&self, session: &Session) {
        for channel in session.take_subscriptions() {
            if let Err(e) = self.ctx.bus().unsubscribe(&channel, session.id()).await {
                warn!(session_id = session.id(), channel = %channel, error = %e, "Unsubscribe failed");
            }
        }
    }

    /// First live session of a user announces them online
    async fn session_opened(&self, user_id: UserId) {
        let _guard = self.user_locks.lock(user_id).await;

        let count = {
            let mut count = self.online.entry(user_id).or_insert(0);
            *count += 1;
            *count
        };

        if count == 1 {
            if let Err(e) = PresenceTracker::new(&self.ctx).set_and_announce(user_id, true).await {
                warn!(user_id = %user_id, error = %e, "Failed to mark user online");
            }
        }
    }

    /// Last live session of a user announces them offline
    async fn session_closed(&self, user_id: UserId) {
        let _guard = self.user_locks.lock(user_id).await;

        let remaining = match self.online.get_mut(&user_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };

        if remaining == 0 {
            self.online.remove_if(&user_id, |_, count| *count == 0);
            // Counted on this node only; sessions elsewhere are not consulted
            debug!(user_id = %user_id, node_sessions = remaining, "Last local session closed, announcing offline");
            if let Err(e) = PresenceTracker::new(&self.ctx).set_and_announce(user_id, false).await {
                warn!(user_id = %user_id, error = %e, "Failed to mark user offline");
            }
        }
    }

    /// Get a live session by ID
    #[must_use]
    pub fn get_session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Live sessions of a user on this process
    #[must_use]
    pub fn user_session_count(&self, user_id: UserId) -> usize {
        self.online.get(&user_id).map_or(0, |c| *c)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("sessions", &self.sessions.len())
            .field("online_users", &self.online.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use roomcast_cache::{FanoutBus, LocalBus, OverflowPolicy};
    use roomcast_core::{
        DomainError, MessageRepository, PresenceChangeEvent, PresenceRepository, User,
        UserRepository,
    };
    use roomcast_db::MemoryStore;
    use serde_json::{json, Value};

    use super::*;
    use crate::connection::transport::recording::RecordingTransport;

    struct Fixture {
        manager: ConnectionManager,
        store: Arc<MemoryStore>,
        bus: Arc<LocalBus>,
    }

    async fn fixture_with(chat: ChatConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            store
                .upsert(&User {
                    id: UserId::new(id),
                    username: name.to_string(),
                })
                .await
                .unwrap();
        }
        let bus = Arc::new(LocalBus::new(OverflowPolicy::Disconnect));
        let ctx = Arc::new(ServiceContext::from_store(store.clone(), bus.clone()));
        Fixture {
            manager: ConnectionManager::new(ctx, chat),
            store,
            bus,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(ChatConfig::default()).await
    }

    fn identity(id: i64, name: &str) -> Option<Identity> {
        Some(Identity {
            user_id: UserId::new(id),
            display_name: name.to_string(),
        })
    }

    fn room(name: &str) -> ConnectScope {
        ConnectScope::Room(RoomName::parse(name).unwrap())
    }

    /// Next room message, skipping presence traffic
    async fn next_message(events: &mut mpsc::Receiver<RoomEvent>) -> RoomMessageEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("timed out waiting for a room message")
                .expect("event queue closed");
            if let RoomEvent::RoomMessage(msg) = event {
                return msg;
            }
        }
    }

    /// Next presence change for `user`, skipping everything else
    async fn next_presence(events: &mut mpsc::Receiver<RoomEvent>, user: i64) -> PresenceChangeEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("timed out waiting for presence")
                .expect("event queue closed");
            if let RoomEvent::PresenceChange(change) = event {
                if change.user_id == UserId::new(user) {
                    return change;
                }
            }
        }
    }

    fn no_room_messages(events: &mut mpsc::Receiver<RoomEvent>) -> bool {
        while let Ok(event) = events.try_recv() {
            if matches!(event, RoomEvent::RoomMessage(_)) {
                return false;
            }
        }
        true
    }

    /// Alice creates "general" and Bob is added as a member
    async fn general_with_two_members(f: &Fixture) -> (Connected, Connected) {
        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let room_id = a.session.room().unwrap().id;
        RoomRegistry::new(f.manager.service_context())
            .add_members(room_id, &[UserId::new(2)])
            .await
            .unwrap();
        let b = f.manager.connect(room("general"), identity(2, "bob")).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_message_reaches_every_member() {
        let f = fixture().await;
        let (mut a, mut b) = general_with_two_members(&f).await;
        let mut elsewhere = f.manager.connect(room("random"), identity(3, "carol")).await.unwrap();
        let room_id = a.session.room().unwrap().id;

        let sent = f.manager.receive(&a.session, r#"{"message":"hi"}"#).await.unwrap();
        assert_eq!(sent.content, "hi");

        let stored = f.store.list_recent(room_id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].author_id, UserId::new(1));
        assert_eq!(stored[0].content, "hi");
        assert!(!stored[0].is_read);

        for events in [&mut a.events, &mut b.events] {
            let msg = next_message(events).await;
            let wire: Value =
                serde_json::from_str(&encode_event(&RoomEvent::RoomMessage(msg))).unwrap();
            assert_eq!(wire, json!({"message": "hi", "username": "alice", "user_id": 1}));
        }

        assert!(no_room_messages(&mut elsewhere.events));
    }

    #[tokio::test]
    async fn test_non_member_is_refused_before_subscribing() {
        let f = fixture().await;
        let (a, _b) = general_with_two_members(&f).await;
        let channel = PubSubChannel::room(a.session.room().unwrap().id);
        assert_eq!(f.bus.subscriber_count(&channel), 2);

        let err = f.manager.connect(room("general"), identity(3, "carol")).await.unwrap_err();
        assert!(matches!(err, HandlerError::AccessDenied));
        assert_eq!(err.status_code(), 403);
        assert_eq!(f.bus.subscriber_count(&channel), 2);
        assert_eq!(f.manager.user_session_count(UserId::new(3)), 0);

        f.manager.receive(&a.session, r#"{"message":"secret"}"#).await.unwrap();
        assert_eq!(f.bus.subscriber_count(&channel), 2);
    }

    #[tokio::test]
    async fn test_unauthenticated_is_refused() {
        let f = fixture().await;

        let err = f.manager.connect(room("general"), None).await.unwrap_err();
        assert!(matches!(err, HandlerError::Unauthenticated));
        assert_eq!(err.status_code(), 401);
        assert_eq!(f.bus.subscriber_count(&PubSubChannel::presence()), 0);
        assert_eq!(f.manager.session_count(), 0);

        let err = f.manager.connect(ConnectScope::Presence, None).await.unwrap_err();
        assert!(matches!(err, HandlerError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_store_outage_at_connect_is_unavailable() {
        let f = fixture().await;
        f.store.set_unavailable(true);

        let err = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(f.bus.subscriber_count(&PubSubChannel::presence()), 0);
    }

    #[tokio::test]
    async fn test_presence_is_announced_on_connect_and_disconnect() {
        let f = fixture().await;
        let mut watcher = f.manager.connect(ConnectScope::Presence, identity(2, "bob")).await.unwrap();

        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let online = next_presence(&mut watcher.events, 1).await;
        assert!(online.online);
        assert!(online.last_seen.is_none());
        assert!(f.store.get(UserId::new(1)).await.unwrap().unwrap().last_seen.is_none());

        assert!(f.manager.disconnect(&a.session).await);
        let offline = next_presence(&mut watcher.events, 1).await;
        assert!(!offline.online);
        assert!(offline.last_seen.is_some());

        let wire: Value =
            serde_json::from_str(&encode_event(&RoomEvent::PresenceChange(offline))).unwrap();
        assert_eq!(wire, json!({"type": "user_status", "user_id": 1, "status": false}));
    }

    #[tokio::test]
    async fn test_user_stays_online_until_last_session_closes() {
        let f = fixture().await;
        let first = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let second = f.manager.connect(ConnectScope::Presence, identity(1, "alice")).await.unwrap();
        assert_eq!(f.manager.user_session_count(UserId::new(1)), 2);

        f.manager.disconnect(&first.session).await;
        assert!(f.store.get(UserId::new(1)).await.unwrap().unwrap().online);

        f.manager.disconnect(&second.session).await;
        assert!(!f.store.get(UserId::new(1)).await.unwrap().unwrap().online);
        assert_eq!(f.manager.user_session_count(UserId::new(1)), 0);
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_idempotent() {
        let f = fixture().await;
        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let channel = PubSubChannel::room(a.session.room().unwrap().id);

        assert!(f.manager.disconnect(&a.session).await);
        assert!(!f.manager.disconnect(&a.session).await);

        assert_eq!(a.session.state(), SessionState::Closed);
        assert!(a.session.subscriptions().is_empty());
        assert_eq!(f.bus.subscriber_count(&channel), 0);
        assert_eq!(f.bus.subscriber_count(&PubSubChannel::presence()), 0);
        assert_eq!(f.manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_session_joined() {
        let f = fixture().await;
        let mut a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let room_id = a.session.room().unwrap().id;

        let err = f.manager.receive(&a.session, "not json").await.unwrap_err();
        assert!(matches!(err, HandlerError::MalformedPayload(_)));
        let err = f.manager.receive(&a.session, r#"{"message":""}"#).await.unwrap_err();
        assert!(matches!(err, HandlerError::MalformedPayload(_)));

        assert_eq!(a.session.state(), SessionState::Joined);
        assert!(f.store.latest(room_id).await.unwrap().is_none());
        assert!(no_room_messages(&mut a.events));

        f.manager.receive(&a.session, r#"{"message":"second try"}"#).await.unwrap();
        assert_eq!(next_message(&mut a.events).await.content, "second try");
    }

    #[tokio::test]
    async fn test_blank_and_oversized_content_are_rejected() {
        let f = fixture().await;
        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();

        let err = f.manager.receive(&a.session, r#"{"message":"   "}"#).await.unwrap_err();
        assert!(matches!(err.rejection(), Some(DomainError::EmptyContent)));

        let long = json!({ "message": "x".repeat(roomcast_core::MAX_CONTENT_LENGTH + 1) }).to_string();
        let err = f.manager.receive(&a.session, &long).await.unwrap_err();
        assert!(matches!(err.rejection(), Some(DomainError::ContentTooLong { .. })));

        assert_eq!(a.session.state(), SessionState::Joined);
    }

    #[tokio::test]
    async fn test_store_outage_mid_session_drops_message() {
        let f = fixture().await;
        let mut a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();

        f.store.set_unavailable(true);
        let err = f.manager.receive(&a.session, r#"{"message":"hi"}"#).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.rejection().is_none());
        assert_eq!(a.session.state(), SessionState::Joined);
        assert!(no_room_messages(&mut a.events));
    }

    #[tokio::test]
    async fn test_presence_session_has_no_room() {
        let f = fixture().await;
        let watcher = f.manager.connect(ConnectScope::Presence, identity(1, "alice")).await.unwrap();

        let err = f.manager.receive(&watcher.session, r#"{"message":"hi"}"#).await.unwrap_err();
        assert!(matches!(err, HandlerError::NoRoom));
        assert_eq!(watcher.session.subscriptions(), vec![PubSubChannel::presence()]);
    }

    #[tokio::test]
    async fn test_closed_session_cannot_receive() {
        let f = fixture().await;
        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        f.manager.disconnect(&a.session).await;

        let err = f.manager.receive(&a.session, r#"{"message":"late"}"#).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidState("closed")));
    }

    #[tokio::test]
    async fn test_concurrent_senders_are_seen_in_store_order() {
        let f = Arc::new(fixture().await);
        let (mut a, b) = general_with_two_members(&f).await;
        let room_id = a.session.room().unwrap().id;
        let b_session = b.session.clone();
        let a_session = a.session.clone();

        let mut tasks = Vec::new();
        for (session, tag) in [(a_session, "a"), (b_session, "b")] {
            let f = f.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..10 {
                    let body = json!({ "message": format!("{tag}{i}") }).to_string();
                    f.manager.receive(&session, &body).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored: Vec<String> = f
            .store
            .list_recent(room_id, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        let mut delivered = Vec::new();
        for _ in 0..20 {
            delivered.push(next_message(&mut a.events).await.content);
        }
        assert_eq!(delivered, stored);
    }

    #[tokio::test]
    async fn test_history_on_join() {
        let f = fixture_with(ChatConfig {
            history_on_join: 2,
            ..ChatConfig::default()
        })
        .await;
        let (a, b) = general_with_two_members(&f).await;
        assert!(a.history.is_empty());

        for body in ["one", "two", "three"] {
            let raw = json!({ "message": body }).to_string();
            f.manager.receive(&a.session, &raw).await.unwrap();
        }
        f.manager.disconnect(&b.session).await;

        let rejoined = f.manager.connect(room("general"), identity(2, "bob")).await.unwrap();
        let replayed: Vec<(String, String)> = rejoined
            .history
            .iter()
            .map(|e| match e {
                RoomEvent::RoomMessage(m) => (m.username.clone(), m.content.clone()),
                RoomEvent::PresenceChange(_) => panic!("presence in history"),
            })
            .collect();
        assert_eq!(
            replayed,
            vec![
                ("alice".to_string(), "two".to_string()),
                ("alice".to_string(), "three".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_on_room_event_writes_envelope() {
        let f = fixture().await;
        let a = f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        let mut transport = RecordingTransport::default();

        let event = RoomEvent::PresenceChange(PresenceChangeEvent {
            user_id: UserId::new(2),
            online: true,
            last_seen: None,
        });
        f.manager.on_room_event(&a.session, &event, &mut transport).await.unwrap();
        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        let wire: Value = serde_json::from_str(&texts[0]).unwrap();
        assert_eq!(wire, json!({"type": "user_status", "user_id": 2, "status": "online"}));

        f.manager.disconnect(&a.session).await;
        assert!(f.manager.on_room_event(&a.session, &event, &mut transport).await.is_err());
    }

    #[tokio::test]
    async fn test_presence_repo_untouched_by_refused_connect() {
        let f = fixture().await;
        f.manager.connect(room("general"), identity(1, "alice")).await.unwrap();
        f.manager.connect(room("general"), identity(3, "carol")).await.unwrap_err();

        assert!(PresenceRepository::get(f.store.as_ref(), UserId::new(3)).await.unwrap().is_none());
    }
}
