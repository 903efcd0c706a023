use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, GuildId, Http, Permissions, RoleId, ShardMessenger, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::managers::registration_manager::AccountDetails;
use crate::messages;

/// Discord operations the registration workflow drives.
#[async_trait]
pub trait RegistrationChannels: Send + Sync {
    /// Create a text channel only `member` (and the bot) can see
    async fn create_private_channel(
        &self,
        guild_id: GuildId,
        member: UserId,
        name: &str,
    ) -> Result<ChannelId>;

    /// Post a plain message in a channel
    async fn say(&self, channel_id: ChannelId, content: &str) -> Result<()>;

    /// Wait for the next non-empty message `author` posts in `channel_id`.
    /// Returns `None` if the event stream ends. Callers bound the wait.
    async fn next_reply(&self, channel_id: ChannelId, author: UserId) -> Result<Option<String>>;

    /// DM the account summary to a user
    async fn send_account_details(&self, user_id: UserId, account: &AccountDetails) -> Result<()>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()>;
}

/// Deterministic channel name for a user's registration channel
pub fn registration_channel_name(display_name: &str) -> String {
    let slug: String = display_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(80)
        .collect();

    if slug.is_empty() {
        "registration-user".to_string()
    } else {
        format!("registration-{}", slug)
    }
}

/// Overwrites that hide a channel from `@everyone` and show it to one member and the bot
pub fn private_channel_overwrites(
    guild_id: GuildId,
    member: UserId,
    bot_user_id: UserId,
) -> Vec<serenity::PermissionOverwrite> {
    // @everyone shares the guild's ID
    let everyone = RoleId::new(guild_id.get());

    vec![
        serenity::PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: serenity::PermissionOverwriteType::Role(everyone),
        },
        serenity::PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(member),
        },
        serenity::PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL
                | Permissions::SEND_MESSAGES
                | Permissions::MANAGE_CHANNELS,
            deny: Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(bot_user_id),
        },
    ]
}

/// Serenity-backed channel operations for one command invocation
pub struct SerenityChannels {
    http: Arc<Http>,
    shard: ShardMessenger,
    bot_user_id: UserId,
}

impl SerenityChannels {
    pub fn new(http: Arc<Http>, shard: ShardMessenger, bot_user_id: UserId) -> Self {
        Self {
            http,
            shard,
            bot_user_id,
        }
    }
}

#[async_trait]
impl RegistrationChannels for SerenityChannels {
    async fn create_private_channel(
        &self,
        guild_id: GuildId,
        member: UserId,
        name: &str,
    ) -> Result<ChannelId> {
        let http: &Http = &self.http;
        let channel = guild_id
            .create_channel(
                http,
                serenity::CreateChannel::new(name)
                    .kind(serenity::ChannelType::Text)
                    .topic("Account registration. Only you can see this channel.")
                    .permissions(private_channel_overwrites(guild_id, member, self.bot_user_id)),
            )
            .await?;

        info!("Created registration channel {} ({}) for {}", name, channel.id, member);
        Ok(channel.id)
    }

    async fn say(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        let http: &Http = &self.http;
        channel_id.say(http, content).await?;
        Ok(())
    }

    async fn next_reply(&self, channel_id: ChannelId, author: UserId) -> Result<Option<String>> {
        let message = serenity::MessageCollector::new(self.shard.clone())
            .channel_id(channel_id)
            .author_id(author)
            .filter(|m| !m.content.trim().is_empty())
            .next()
            .await;

        debug!(
            "Collected reply from {} in {}: {}",
            author,
            channel_id,
            message.is_some()
        );
        Ok(message.map(|m| m.content))
    }

    async fn send_account_details(&self, user_id: UserId, account: &AccountDetails) -> Result<()> {
        let http: &Http = &self.http;
        user_id
            .direct_message(
                http,
                serenity::CreateMessage::new().embed(messages::account_details_embed(account)),
            )
            .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()> {
        let http: &Http = &self.http;
        channel_id.delete(http).await?;
        info!("Deleted registration channel {}", channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_is_deterministic() {
        assert_eq!(registration_channel_name("Alice"), "registration-alice");
        assert_eq!(
            registration_channel_name("Big Bob 42"),
            "registration-big-bob-42"
        );
        assert_eq!(registration_channel_name("!!!"), "registration-user");
        assert_eq!(
            registration_channel_name("Alice"),
            registration_channel_name("Alice")
        );
    }

    #[test]
    fn test_overwrites_hide_channel_from_everyone() {
        let guild = GuildId::new(1000);
        let member = UserId::new(7);
        let bot = UserId::new(9);

        let overwrites = private_channel_overwrites(guild, member, bot);

        let everyone = overwrites
            .iter()
            .find(|ow| ow.kind == serenity::PermissionOverwriteType::Role(RoleId::new(1000)))
            .unwrap();
        assert!(everyone.deny.contains(Permissions::VIEW_CHANNEL));
        assert!(!everyone.allow.contains(Permissions::VIEW_CHANNEL));

        let invoker = overwrites
            .iter()
            .find(|ow| ow.kind == serenity::PermissionOverwriteType::Member(member))
            .unwrap();
        assert!(invoker.allow.contains(Permissions::VIEW_CHANNEL));

        let members_with_view: Vec<_> = overwrites
            .iter()
            .filter(|ow| ow.allow.contains(Permissions::VIEW_CHANNEL))
            .map(|ow| ow.kind.clone())
            .collect();
        assert_eq!(
            members_with_view,
            vec![
                serenity::PermissionOverwriteType::Member(member),
                serenity::PermissionOverwriteType::Member(bot)
            ]
        );
    }
}
