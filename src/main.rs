use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that registers panel accounts and deploys instances
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Load configuration from a JSON file instead of environment variables
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod managers;
mod messages;
mod panel;
mod state;

use commands::{deploy, fetchimages, fetchnodes, help, ping, register};
use config::BotConfig;
use managers::{
    create_shared_catalog_manager, create_shared_deploy_manager, RegistrationSettings,
    SharedCatalogManager, SharedDeployManager,
};
use panel::{PanelClient, SharedPanel};
use state::{create_shared_catalog_store, ActiveSessions};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub panel: SharedPanel,
    pub sessions: ActiveSessions,
    pub catalog_manager: SharedCatalogManager,
    pub deploy_manager: SharedDeployManager,
}

impl Data {
    pub fn registration_settings(&self) -> RegistrationSettings {
        RegistrationSettings {
            prompt_timeout: self.config.prompt_timeout(),
            cleanup_delay: self.config.cleanup_delay(),
        }
    }
}

fn log_bot_id(token: &str) {
    // The first token segment is the application ID, base64 encoded
    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };

    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));

    if let Ok(Ok(id_str)) = decoded.map(String::from_utf8) {
        info!("Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)", id_str, id_str);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}...", path);
            BotConfig::load_from_file(path)?
        }
        None => {
            info!("Loading configuration from environment...");
            BotConfig::from_env()?
        }
    };
    let config = Arc::new(config);

    log_bot_id(&config.token);

    if config.admin_users.is_empty() {
        warn!("No admin users configured; fetchimages and fetchnodes will be refused for everyone");
    }

    // Ensure storage directory exists
    if let Err(e) = tokio::fs::create_dir_all(&config.storage_path).await {
        warn!("Could not create storage directory {}: {}", config.storage_path, e);
    }

    let panel: SharedPanel = Arc::new(PanelClient::new(
        config.url.clone(),
        &config.key,
        config.request_timeout(),
    )?);
    let catalog_store = create_shared_catalog_store(&config.storage_path);

    let catalog_manager =
        create_shared_catalog_manager(config.clone(), panel.clone(), catalog_store.clone());
    let deploy_manager =
        create_shared_deploy_manager(config.clone(), panel.clone(), catalog_store);
    let sessions = ActiveSessions::new();

    info!(
        "Panel at {}, catalogs in {}, prompt timeout {:?}, cleanup delay {:?}",
        config.url,
        config.storage_path,
        config.prompt_timeout(),
        config.cleanup_delay()
    );

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let token = config.token.clone();
    let prefix = config.prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                help(),
                register(),
                fetchimages(),
                fetchnodes(),
                deploy(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                mention_as_prefix: true,
                ignore_bots: true,
                case_insensitive_commands: true,
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(messages::UNEXPECTED_ERROR).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                            let prefix = &ctx.data().config.prefix;
                            let usage = match ctx.command().name.as_str() {
                                "register" => messages::register_usage(prefix),
                                "deploy" => messages::deploy_usage(prefix),
                                _ => format!("Invalid arguments. Try {}help", prefix),
                            };
                            let _ = ctx.say(usage).await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            warn!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                            let _ = ctx.say(messages::GUILD_ONLY).await;
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = config.clone();
            let panel = panel.clone();
            let sessions = sessions.clone();
            let catalog_manager = catalog_manager.clone();
            let deploy_manager = deploy_manager.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                if ready.guilds.is_empty() {
                    warn!("Bot is not in any guilds - registration needs a server to create channels in");
                }

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                Ok(Data {
                    config,
                    panel,
                    sessions,
                    catalog_manager,
                    deploy_manager,
                })
            })
        })
        .build();

    // Registration replies and prefix commands are read from message content
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Requesting privileged intents: [\"MESSAGE_CONTENT\"]");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("MESSAGE_CONTENT needs to be enabled in the Discord Developer Portal");
            error!("Go to https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable MESSAGE_CONTENT in Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
