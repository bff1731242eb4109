//! In-memory implementation of every repository trait
//!
//! Used by the `memory` storage backend and by tests. All state sits behind
//! one mutex, so every operation is atomic with respect to the others and
//! no lock is held across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use roomcast_core::entities::{Message, Presence, Room, User};
use roomcast_core::error::DomainError;
use roomcast_core::traits::{
    MessageRepository, PresenceRepository, RepoResult, RoomRepository, UserRepository,
};
use roomcast_core::value_objects::{MessageId, RoomId, RoomName, UserId};

#[derive(Debug)]
struct RoomRow {
    room: Room,
    members: HashSet<UserId>,
    messages: Vec<Message>,
    last_message_at: Option<DateTime<Utc>>,
}

impl RoomRow {
    fn new(room: Room, creator: UserId) -> Self {
        Self {
            room,
            members: HashSet::from([creator]),
            messages: Vec::new(),
            last_message_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    rooms: HashMap<RoomId, RoomRow>,
    names: HashMap<RoomName, RoomId>,
    presence: HashMap<UserId, Presence>,
    next_room_id: i64,
    next_message_id: i64,
}

impl State {
    fn insert_room(&mut self, name: &RoomName, creator: UserId) -> Room {
        self.next_room_id += 1;
        let room = Room::new(RoomId::new(self.next_room_id), name.clone());
        self.names.insert(name.clone(), room.id);
        self.rooms.insert(room.id, RoomRow::new(room.clone(), creator));
        room
    }

    fn row_mut(&mut self, room_id: RoomId) -> RepoResult<&mut RoomRow> {
        self.rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    fn row(&self, room_id: RoomId) -> RepoResult<&RoomRow> {
        self.rooms
            .get(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable` (or recover)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DomainError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.check()?;
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> RepoResult<Vec<User>> {
        self.check()?;
        let state = self.state.lock();
        let mut users: Vec<User> = ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn upsert(&self, user: &User) -> RepoResult<()> {
        self.check()?;
        self.state.lock().users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn get_or_create(&self, name: &RoomName, creator: UserId) -> RepoResult<(Room, bool)> {
        self.check()?;
        let mut state = self.state.lock();

        if let Some(id) = state.names.get(name).copied() {
            return Ok((state.row(id)?.room.clone(), false));
        }

        Ok((state.insert_room(name, creator), true))
    }

    async fn create_with_members(
        &self,
        name: &RoomName,
        creator: UserId,
        members: &[UserId],
    ) -> RepoResult<Room> {
        self.check()?;
        let mut state = self.state.lock();

        if state.names.contains_key(name) {
            return Err(DomainError::RoomAlreadyExists(name.to_string()));
        }

        let room = state.insert_room(name, creator);
        state.row_mut(room.id)?.members.extend(members.iter().copied());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> RepoResult<Option<Room>> {
        self.check()?;
        Ok(self.state.lock().rooms.get(&id).map(|row| row.room.clone()))
    }

    async fn find_by_name(&self, name: &RoomName) -> RepoResult<Option<Room>> {
        self.check()?;
        let state = self.state.lock();
        Ok(state
            .names
            .get(name)
            .and_then(|id| state.rooms.get(id))
            .map(|row| row.room.clone()))
    }

    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepoResult<bool> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .rooms
            .get(&room_id)
            .is_some_and(|row| row.members.contains(&user_id)))
    }

    async fn add_members(&self, room_id: RoomId, user_ids: &[UserId]) -> RepoResult<u64> {
        self.check()?;
        let mut state = self.state.lock();
        let row = state.row_mut(room_id)?;

        let added = user_ids
            .iter()
            .filter(|id| row.members.insert(**id))
            .count() as u64;

        if added > 0 {
            row.room.updated_at = Utc::now().max(row.room.updated_at);
        }
        Ok(added)
    }

    async fn members(&self, room_id: RoomId) -> RepoResult<Vec<UserId>> {
        self.check()?;
        let state = self.state.lock();
        let mut ids: Vec<UserId> = state.row(room_id)?.members.iter().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Room>> {
        self.check()?;
        let state = self.state.lock();
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|row| row.members.contains(&user_id))
            .map(|row| row.room.clone())
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(rooms)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn append(
        &self,
        room_id: RoomId,
        author_id: UserId,
        content: &str,
    ) -> RepoResult<Message> {
        self.check()?;
        if content.trim().is_empty() {
            return Err(DomainError::EmptyContent);
        }

        let mut state = self.state.lock();
        state.next_message_id += 1;
        let id = MessageId::new(state.next_message_id);
        let row = state.row_mut(room_id)?;

        let now = Utc::now();
        let created_at = row.last_message_at.map_or(now, |last| now.max(last));
        let seq = row.messages.last().map_or(1, |m| m.seq + 1);

        let message = Message {
            id,
            room_id,
            author_id,
            content: content.to_string(),
            created_at,
            seq,
            is_read: false,
        };

        row.messages.push(message.clone());
        row.last_message_at = Some(created_at);
        row.room.updated_at = row.room.updated_at.max(created_at);

        Ok(message)
    }

    async fn list_recent(&self, room_id: RoomId, limit: i64) -> RepoResult<Vec<Message>> {
        self.check()?;
        let limit = limit.clamp(1, 100) as usize;
        let state = self.state.lock();
        let messages = &state.row(room_id)?.messages;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn mark_read(&self, room_id: RoomId, exclude_author_id: UserId) -> RepoResult<u64> {
        self.check()?;
        let mut state = self.state.lock();
        let row = state.row_mut(room_id)?;

        let mut affected = 0;
        for message in row
            .messages
            .iter_mut()
            .filter(|m| m.author_id != exclude_author_id && !m.is_read)
        {
            message.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn latest(&self, room_id: RoomId) -> RepoResult<Option<Message>> {
        self.check()?;
        let state = self.state.lock();
        Ok(state
            .rooms
            .get(&room_id)
            .and_then(|row| row.messages.last().cloned()))
    }
}

#[async_trait]
impl PresenceRepository for MemoryStore {
    async fn set_online(&self, user_id: UserId, online: bool) -> RepoResult<(Presence, bool)> {
        self.check()?;
        let mut state = self.state.lock();
        let presence = state
            .presence
            .entry(user_id)
            .or_insert_with(|| Presence::offline(user_id));
        let changed = presence.transition(online, Utc::now());
        Ok((presence.clone(), changed))
    }

    async fn get(&self, user_id: UserId) -> RepoResult<Option<Presence>> {
        self.check()?;
        Ok(self.state.lock().presence.get(&user_id).cloned())
    }
}
