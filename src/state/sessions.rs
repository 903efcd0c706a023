use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, UserId};
use std::sync::Arc;
use tracing::debug;

/// Users with a registration in flight (user -> ephemeral channel, once created)
#[derive(Clone, Default)]
pub struct ActiveSessions {
    inner: Arc<DashMap<UserId, Option<ChannelId>>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `user_id`. Returns `None` if the user already has one.
    pub fn try_begin(&self, user_id: UserId) -> Option<SessionGuard> {
        match self.inner.entry(user_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(None);
                debug!("Registration session opened for {}", user_id);
                Some(SessionGuard {
                    sessions: self.clone(),
                    user_id,
                })
            }
        }
    }

    /// Ephemeral channel of the user's running session, if one was created
    pub fn channel_of(&self, user_id: UserId) -> Option<ChannelId> {
        self.inner.get(&user_id).and_then(|entry| *entry)
    }
}

/// Holds a user's session slot; dropping it releases the slot.
pub struct SessionGuard {
    sessions: ActiveSessions,
    user_id: UserId,
}

impl SessionGuard {
    pub fn attach_channel(&self, channel_id: ChannelId) {
        if let Some(mut entry) = self.sessions.inner.get_mut(&self.user_id) {
            *entry = Some(channel_id);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.inner.remove(&self.user_id);
        debug!("Registration session closed for {}", self.user_id);
    }
}
