use std::sync::Arc;
use tracing::{error, info};

use crate::managers::private_channels::SerenityChannels;
use crate::managers::registration_manager::{
    RegistrationManager, RegistrationOutcome, RegistrationRequest,
};
use crate::messages;
use crate::{Context, Error};

/// First argument is the email; anything after it is ignored
fn email_argument(args: &[String]) -> Option<String> {
    args.first()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// Create a panel account
///
/// Opens a private channel and asks for your email and username there.
/// Your login details are sent to you by DM.
#[poise::command(prefix_command, guild_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Email address for the panel account"] args: Vec<String>,
) -> Result<(), Error> {
    let data = ctx.data();

    let Some(email) = email_argument(&args) else {
        ctx.reply(messages::register_usage(&data.config.prefix)).await?;
        return Ok(());
    };

    let Some(guild_id) = ctx.guild_id() else {
        ctx.reply(messages::GUILD_ONLY).await?;
        return Ok(());
    };

    let serenity_ctx = ctx.serenity_context();
    let channels = Arc::new(SerenityChannels::new(
        serenity_ctx.http.clone(),
        serenity_ctx.shard.clone(),
        ctx.framework().bot_id,
    ));
    let manager = RegistrationManager::new(
        data.panel.clone(),
        channels,
        data.sessions.clone(),
        data.registration_settings(),
    );

    let request = RegistrationRequest {
        user_id: ctx.author().id,
        guild_id,
        display_name: ctx.author().name.clone(),
        email,
    };

    match manager.register(request).await {
        Ok(RegistrationOutcome::AlreadyInProgress) => {
            let reply = match data.sessions.channel_of(ctx.author().id) {
                Some(channel_id) => format!("{} <#{}>", messages::ALREADY_REGISTERING, channel_id),
                None => messages::ALREADY_REGISTERING.to_string(),
            };
            ctx.reply(reply).await?;
        }
        Ok(RegistrationOutcome::EmailTaken) => {
            ctx.reply(messages::EMAIL_TAKEN).await?;
        }
        Ok(RegistrationOutcome::LookupFailed) => {
            ctx.reply(messages::LOOKUP_FAILED).await?;
        }
        // The rest of the conversation happened in the private channel
        Ok(outcome) => {
            info!("Registration by {} ended: {:?}", ctx.author().name, outcome);
        }
        Err(e) => {
            error!("Registration by {} failed: {}", ctx.author().name, e);
            ctx.reply(messages::UNEXPECTED_ERROR).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_email_argument_ignores_trailing_tokens() {
        assert_eq!(
            email_argument(&args(&["a@b.com", "extra", "words"])),
            Some("a@b.com".to_string())
        );
        assert_eq!(email_argument(&args(&["a@b.com"])), Some("a@b.com".to_string()));
        assert_eq!(email_argument(&args(&[])), None);
    }
}
