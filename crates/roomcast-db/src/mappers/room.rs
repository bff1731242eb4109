//! Room model -> entity mapper

use roomcast_core::entities::Room;
use roomcast_core::error::DomainError;
use roomcast_core::value_objects::{RoomId, RoomName};

use crate::models::RoomModel;

/// Names are validated on the way in; a failure here means the row was written elsewhere
impl TryFrom<RoomModel> for Room {
    type Error = DomainError;

    fn try_from(model: RoomModel) -> Result<Self, Self::Error> {
        let name = RoomName::parse(&model.name).map_err(|e| {
            DomainError::InternalError(format!("stored room {} has bad name: {e}", model.id))
        })?;

        Ok(Room {
            id: RoomId::new(model.id),
            name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
