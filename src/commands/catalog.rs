use tracing::error;

use crate::error::BotError;
use crate::messages;
use crate::state::CatalogKind;
use crate::{Context, Error};

/// Refresh the local image catalog from the panel (Admin)
#[poise::command(prefix_command, slash_command)]
pub async fn fetchimages(ctx: Context<'_>) -> Result<(), Error> {
    refresh_catalog(ctx, CatalogKind::Images).await
}

/// Refresh the local node catalog from the panel (Admin)
#[poise::command(prefix_command, slash_command)]
pub async fn fetchnodes(ctx: Context<'_>) -> Result<(), Error> {
    refresh_catalog(ctx, CatalogKind::Nodes).await
}

async fn refresh_catalog(ctx: Context<'_>, kind: CatalogKind) -> Result<(), Error> {
    if let poise::Context::Application(_) = ctx {
        ctx.defer_ephemeral().await?;
    }

    let reply = match ctx
        .data()
        .catalog_manager
        .refresh(kind, ctx.author().id)
        .await
    {
        Ok(_) => messages::catalog_saved(kind.label()),
        Err(e @ BotError::PermissionDenied { .. }) => e.user_message(),
        Err(e) => {
            error!("Failed to fetch {}: {}", kind.label(), e);
            messages::catalog_fetch_failed(kind.label())
        }
    };

    ctx.send(poise::CreateReply::default()
        .content(reply)
        .reply(true)
        .ephemeral(true))
        .await?;
    Ok(())
}
