use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::managers::deploy_manager::DeployArgs;
use crate::messages;
use crate::{Context, Error};

/// Deploy a new instance
///
/// Usage: deploy <memory> <cpu> <imageName> <name> [var=value ...]
#[poise::command(prefix_command)]
pub async fn deploy(ctx: Context<'_>, args: Vec<String>) -> Result<(), Error> {
    let data = ctx.data();

    let parsed = match DeployArgs::parse(&args, &data.config.prefix) {
        Ok(parsed) => parsed,
        Err(e) => {
            ctx.reply(e.user_message()).await?;
            return Ok(());
        }
    };

    match data.deploy_manager.deploy(&parsed, ctx.author().id).await {
        Ok(instance) => {
            if let Err(e) = ctx
                .author()
                .id
                .direct_message(
                    ctx.http(),
                    serenity::CreateMessage::new()
                        .embed(messages::instance_created_embed(&instance)),
                )
                .await
            {
                warn!("Failed to DM instance details to {}: {}", ctx.author().name, e);
            }
            info!(
                "Instance {} for {} listens on port {}",
                instance.volume_id,
                ctx.author().name,
                instance.port
            );
            ctx.reply(messages::INSTANCE_CREATED).await?;
        }
        Err(e) if e.is_user_error() => {
            ctx.reply(e.user_message()).await?;
        }
        Err(e) => {
            error!("Deploy by {} failed: {}", ctx.author().name, e);
            ctx.reply(messages::DEPLOY_FAILED).await?;
        }
    }

    Ok(())
}
