//! User model -> entity mapper

use roomcast_core::entities::User;
use roomcast_core::value_objects::UserId;

use crate::models::UserModel;

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: UserId::new(model.id),
            username: model.username,
        }
    }
}
