//! Room registry
//!
//! Resolves rooms by name, creates them on first use, and answers
//! membership questions.

use roomcast_core::{DomainError, Room, RoomId, RoomName, RoomSummary, UserId};
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Room registry service
pub struct RoomRegistry<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomRegistry<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Resolve a room by name, creating it with `requester` as its first
    /// member if it does not exist. Returns the room and whether it was created.
    #[instrument(skip(self), fields(room = %name))]
    pub async fn get_or_create(
        &self,
        name: &RoomName,
        requester: UserId,
    ) -> ServiceResult<(Room, bool)> {
        let (room, created) = self.ctx.room_repo().get_or_create(name, requester).await?;

        if created {
            info!(room_id = %room.id, creator = %requester, "Room created");
        }

        Ok((room, created))
    }

    /// Create a room with an explicit member list. Fails if the name is taken.
    #[instrument(skip(self, members), fields(room = %name, members = members.len()))]
    pub async fn create_room(
        &self,
        name: &RoomName,
        creator: UserId,
        members: &[UserId],
    ) -> ServiceResult<Room> {
        let room = self
            .ctx
            .room_repo()
            .create_with_members(name, creator, members)
            .await?;

        info!(room_id = %room.id, creator = %creator, "Room created with members");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn is_member(&self, room_id: RoomId, user_id: UserId) -> ServiceResult<bool> {
        Ok(self.ctx.room_repo().is_member(room_id, user_id).await?)
    }

    /// Union `user_ids` into the member set, returning how many were new
    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    pub async fn add_members(&self, room_id: RoomId, user_ids: &[UserId]) -> ServiceResult<u64> {
        let added = self.ctx.room_repo().add_members(room_id, user_ids).await?;

        if added > 0 {
            info!(room_id = %room_id, added, "Room members added");
        }

        Ok(added)
    }

    #[instrument(skip(self))]
    pub async fn members(&self, room_id: RoomId) -> ServiceResult<Vec<UserId>> {
        Ok(self.ctx.room_repo().members(room_id).await?)
    }

    /// Get a room by id
    #[instrument(skip(self))]
    pub async fn find(&self, room_id: RoomId) -> ServiceResult<Room> {
        self.ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| DomainError::RoomNotFound(room_id).into())
    }

    #[instrument(skip(self), fields(room = %name))]
    pub async fn find_by_name(&self, name: &RoomName) -> ServiceResult<Option<Room>> {
        Ok(self.ctx.room_repo().find_by_name(name).await?)
    }

    /// Rooms the user belongs to, most recently active first, each with its
    /// last message
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> ServiceResult<Vec<RoomSummary>> {
        let rooms = self.ctx.room_repo().list_for_user(user_id).await?;

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let last_message = self.ctx.message_repo().latest(room.id).await?;
            summaries.push(RoomSummary { room, last_message });
        }

        Ok(summaries)
    }
}
