//! Presence model -> entity mapper

use roomcast_core::entities::Presence;
use roomcast_core::value_objects::UserId;

use crate::models::PresenceModel;

impl From<PresenceModel> for Presence {
    fn from(model: PresenceModel) -> Self {
        Presence {
            user_id: UserId::new(model.user_id),
            online: model.online,
            last_seen: model.last_seen,
            updated_at: model.updated_at,
        }
    }
}
