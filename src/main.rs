//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: Discord service and gateway handler
//! - Application: Router, Polls, Reaction Roles, Supervisor, Logging
//! - Interface: Text and Slash Command Handlers
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use serenity::all::{ActivityData, OnlineStatus};
use serenity::http::Http;
use serenity::prelude::Client;
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::commands::CommandRegistry;
use crate::application::interactions::InteractionRegistry;
use crate::application::logging;
use crate::application::polls::PollManager;
use crate::application::reaction_roles::ReactionRoleStore;
use crate::application::router::CommandRouter;
use crate::application::supervisor::Supervisor;
use crate::domain::config::{AppConfig, DEFAULT_CONFIG_PATH, Overrides};
use crate::infrastructure::discord::DiscordService;
use crate::infrastructure::gateway::{self, GatewayHandler};
use crate::interface::{commands, slash};

/// Discord bot with prefix commands, slash commands, polls and reaction roles.
#[derive(Parser, Debug)]
#[command(name = "herald", version)]
struct Cli {
    /// Bot token; overrides `bot.token` from the configuration file.
    token: Option<String>,
    /// Register slash commands to this guild only.
    guild_id: Option<u64>,
    /// Path to the configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn text_commands() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(commands::PingCommand);
    registry.register(commands::EchoCommand);
    registry.register(commands::HelpCommand);
    registry
}

fn slash_commands(
    config: &AppConfig,
    polls: Arc<PollManager>,
    reaction_roles: Arc<ReactionRoleStore>,
) -> InteractionRegistry {
    let mut registry = InteractionRegistry::new();
    registry.register(slash::PingSlashCommand);
    registry.register(slash::EchoSlashCommand);
    registry.register(slash::UserInfoCommand);
    registry.register(slash::ServerInfoCommand);
    registry.register(slash::PollCommand::new(
        polls,
        config.polls.default_duration_minutes,
    ));
    registry.register(slash::ModerationCommand);
    registry.register(slash::ReactionRoleCommand::new(reaction_roles));
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Configuration
    let cli = Cli::parse();
    let config = AppConfig::load(
        &cli.config,
        Overrides {
            token: cli.token,
            guild_id: cli.guild_id,
        },
    )
    .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    // 2. Logging Setup
    let _log_guard = logging::init(&config.logging)?;
    tracing::info!(
        prefix = %config.bot.prefix,
        token_len = config.bot.token.len(),
        guild_id = ?config.bot.guild_id,
        "Starting Herald..."
    );

    // 3. Initialize Application Components
    let supervisor = Arc::new(Supervisor::new());
    let platform = Arc::new(DiscordService::new(Arc::new(Http::new(&config.bot.token))));
    let polls = Arc::new(PollManager::new(platform.clone(), supervisor.clone()));
    let reaction_roles = Arc::new(ReactionRoleStore::new());

    let commands = Arc::new(text_commands());
    let interactions = Arc::new(slash_commands(
        &config,
        polls.clone(),
        reaction_roles.clone(),
    ));
    tracing::info!(
        text = commands.len(),
        slash = interactions.len(),
        "Command registries ready"
    );

    let router = Arc::new(CommandRouter::new(
        config.bot.prefix.clone(),
        platform.clone(),
        commands,
        interactions,
        polls.clone(),
        reaction_roles,
    ));

    // 4. Discord Client
    let mut client = Client::builder(&config.bot.token, gateway::intents())
        .event_handler(GatewayHandler::new(router, config.bot.guild_id))
        .activity(ActivityData::playing(config.bot.activity.clone()))
        .status(OnlineStatus::Online)
        .await
        .context("Failed to create Discord client")?;

    platform.attach_shards(client.shard_manager.clone());
    let shard_manager = client.shard_manager.clone();

    // 5. Run the gateway until Ctrl-C or disconnect
    let (gateway_done, gateway_stopped) = tokio::sync::oneshot::channel::<()>();
    supervisor.launch("gateway", async move {
        let result = client.start().await;
        let _ = gateway_done.send(());
        result.context("Discord gateway stopped")
    })?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Received Ctrl-C, shutting down");
        }
        _ = gateway_stopped => {
            tracing::warn!("Gateway exited, shutting down");
        }
    }

    // 6. Shutdown
    tracing::info!(
        active_polls = polls.active_count().await,
        tasks = supervisor.active_count(),
        "Stopping gateway"
    );
    shard_manager.shutdown_all().await;
    let outcome = supervisor.shutdown(config.shutdown.timeout()).await;
    tracing::info!(?outcome, "Herald stopped");
    Ok(())
}
