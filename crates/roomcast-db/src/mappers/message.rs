//! Message model -> entity mapper

use roomcast_core::entities::Message;
use roomcast_core::value_objects::{MessageId, RoomId, UserId};

use crate::models::MessageModel;

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Message {
            id: MessageId::new(model.id),
            room_id: RoomId::new(model.room_id),
            author_id: UserId::new(model.author_id),
            content: model.content,
            created_at: model.created_at,
            seq: model.seq,
            is_read: model.is_read,
        }
    }
}
