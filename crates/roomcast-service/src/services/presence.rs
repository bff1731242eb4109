//! Presence tracker
//!
//! Persists the online flag and announces transitions on the global
//! presence channel.

use roomcast_cache::PubSubChannel;
use roomcast_core::{Presence, PresenceChangeEvent, RoomEvent, UserId};
use tracing::{info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Presence tracker service
pub struct PresenceTracker<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PresenceTracker<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Set the online flag. Returns the record and whether it changed;
    /// `last_seen` moves only on an online to offline transition.
    #[instrument(skip(self))]
    pub async fn set_online(&self, user_id: UserId, online: bool) -> ServiceResult<(Presence, bool)> {
        let (presence, changed) = self.ctx.presence_repo().set_online(user_id, online).await?;

        if changed {
            info!(user_id = %user_id, online, "Presence changed");
        }

        Ok((presence, changed))
    }

    /// Emit a presence change on the global channel, returning how many
    /// subscribers it reached
    #[instrument(skip(self))]
    pub async fn broadcast_change(&self, user_id: UserId, online: bool) -> ServiceResult<usize> {
        let last_seen = if online {
            None
        } else {
            self.ctx
                .presence_repo()
                .get(user_id)
                .await?
                .and_then(|p| p.last_seen)
        };

        let event = RoomEvent::PresenceChange(PresenceChangeEvent {
            user_id,
            online,
            last_seen,
        });

        Ok(self.ctx.bus().publish(&PubSubChannel::presence(), &event).await?)
    }

    /// Set the flag and broadcast only when it actually changed.
    ///
    /// A failed broadcast is logged; the stored state stands.
    #[instrument(skip(self))]
    pub async fn set_and_announce(&self, user_id: UserId, online: bool) -> ServiceResult<Presence> {
        let (presence, changed) = self.set_online(user_id, online).await?;

        if changed {
            let event = RoomEvent::PresenceChange(PresenceChangeEvent::from(&presence));
            if let Err(e) = self.ctx.bus().publish(&PubSubChannel::presence(), &event).await {
                warn!(user_id = %user_id, error = %e, "Presence broadcast failed");
            }
        }

        Ok(presence)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: UserId) -> ServiceResult<Option<Presence>> {
        Ok(self.ctx.presence_repo().get(user_id).await?)
    }
}
