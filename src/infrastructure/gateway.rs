//! # Gateway Event Handler
//!
//! Receives serenity gateway events, converts them into the router's
//! platform-neutral inputs and hands them over. Slash commands are exported
//! to Discord when the connection becomes ready.

use serenity::all::{
    Command as DiscordCommand, CommandInteraction, CommandOptionType, ComponentInteraction,
    CreateCommand, CreateCommandOption, GatewayIntents, GuildId as DiscordGuildId, Interaction,
    Member as DiscordMember, Message, Permissions as DiscordPermissions, Reaction, Ready,
    ResolvedValue, User,
};
use serenity::async_trait;
use serenity::prelude::*;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

use crate::application::interactions::{
    InteractionContext, OptionKind, OptionSpec, OptionValue, SlashCommand,
};
use crate::application::reaction_roles::{ReactionChange, ReactionEvent};
use crate::application::router::{CommandRouter, IncomingMessage};
use crate::domain::types::{GuildId, RoleRef};
use crate::infrastructure::discord::{
    DiscordResponder, emoji_view, permission_bits, permissions_view, snowflake, user_profile,
};

/// Events the bot subscribes to. Message content, members and presences are privileged intents.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_PRESENCES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
}

pub struct GatewayHandler {
    router: Arc<CommandRouter>,
    /// Register slash commands to this guild instead of globally.
    command_guild: Option<GuildId>,
    /// Bot user id, set from the Ready event.
    bot_user_id: OnceLock<u64>,
}

impl GatewayHandler {
    pub fn new(router: Arc<CommandRouter>, command_guild: Option<GuildId>) -> Self {
        Self {
            router,
            command_guild,
            bot_user_id: OnceLock::new(),
        }
    }

    async fn register_commands(&self, ctx: &Context) {
        let commands: Vec<CreateCommand> = self
            .router
            .interactions()
            .list()
            .map(command_builder)
            .collect();
        let count = commands.len();

        let result = match self.command_guild {
            Some(guild) => match snowflake::<DiscordGuildId>(guild) {
                Ok(guild_id) => guild_id.set_commands(&ctx.http, commands).await,
                Err(e) => {
                    error!(guild_id = guild, error = %e, "Invalid guild id for command registration");
                    return;
                }
            },
            None => DiscordCommand::set_global_commands(&ctx.http, commands).await,
        };

        match result {
            Ok(_) => info!(
                count,
                scope = if self.command_guild.is_some() { "guild" } else { "global" },
                "Registered slash commands"
            ),
            Err(e) => error!(error = %e, "Failed to register slash commands"),
        }
    }

    fn is_self(&self, user: u64) -> bool {
        self.bot_user_id.get() == Some(&user)
    }

    async fn reaction(&self, reaction: Reaction, change: ReactionChange) {
        let Some(user_id) = reaction.user_id else {
            return;
        };
        let Some(emoji) = emoji_view(&reaction.emoji) else {
            debug!(message_id = %reaction.message_id, "Ignoring unsupported reaction type");
            return;
        };
        let user_is_bot = self.is_self(user_id.get())
            || reaction.member.as_ref().is_some_and(|member| member.user.bot);
        let event = ReactionEvent {
            guild: reaction.guild_id.map(|guild| guild.get()),
            message: reaction.message_id.get(),
            user: user_id.get(),
            user_is_bot,
            emoji,
        };
        self.router.route_reaction(&event, change).await;
    }

    async fn slash_command(&self, ctx: &Context, command: CommandInteraction) {
        let interaction = interaction_context(&self.router, ctx, command);
        self.router.route_interaction(interaction).await;
    }

    async fn component(&self, ctx: &Context, component: ComponentInteraction) {
        let user = user_profile(&component.user);
        let custom_id = component.data.custom_id.clone();
        let responder = DiscordResponder::for_component(ctx.http.clone(), component);
        self.router
            .route_component(&custom_id, &user, &responder)
            .await;
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let _ = self.bot_user_id.set(ready.user.id.get());
        info!(
            user = %ready.user.name,
            user_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Discord bot connected"
        );
        self.register_commands(&ctx).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let incoming = IncomingMessage {
            channel: msg.channel_id.get(),
            guild: msg.guild_id.map(|guild| guild.get()),
            message_id: msg.id.get(),
            author: user_profile(&msg.author),
            content: msg.content,
        };
        self.router.route_message(&incoming).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.slash_command(&ctx, command).await,
            Interaction::Component(component) => self.component(&ctx, component).await,
            _ => {}
        }
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        self.reaction(reaction, ReactionChange::Added).await;
    }

    async fn reaction_remove(&self, _ctx: Context, reaction: Reaction) {
        self.reaction(reaction, ReactionChange::Removed).await;
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: DiscordMember) {
        if new_member.user.bot {
            return;
        }
        let user = user_profile(&new_member.user);
        self.router
            .member_joined(new_member.guild_id.get(), &user)
            .await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: DiscordGuildId,
        user: User,
        _member: Option<DiscordMember>,
    ) {
        if user.bot {
            return;
        }
        self.router
            .member_left(guild_id.get(), &user_profile(&user))
            .await;
    }
}

fn option_type(kind: OptionKind) -> CommandOptionType {
    match kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::User => CommandOptionType::User,
        OptionKind::Role => CommandOptionType::Role,
    }
}

fn option_builder(option: &OptionSpec) -> CreateCommandOption {
    CreateCommandOption::new(option_type(option.kind), &option.name, &option.description)
        .required(option.required)
}

/// Exports a registered slash command in Discord's registration format.
fn command_builder(command: &dyn SlashCommand) -> CreateCommand {
    let mut builder = CreateCommand::new(command.name()).description(command.description());
    for option in command.options() {
        builder = builder.add_option(option_builder(&option));
    }
    for subcommand in command.subcommands() {
        let nested = subcommand.options.iter().fold(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                &subcommand.name,
                &subcommand.description,
            ),
            |nested, option| nested.add_sub_option(option_builder(option)),
        );
        builder = builder.add_option(nested);
    }
    if command.guild_only() {
        builder = builder.dm_permission(false);
    }
    let permissions = command.default_permissions();
    if !permissions.is_empty() {
        let bits = permissions
            .into_iter()
            .fold(DiscordPermissions::empty(), |bits, permission| {
                bits | permission_bits(permission)
            });
        builder = builder.default_member_permissions(bits);
    }
    builder
}

fn option_value(value: &ResolvedValue<'_>) -> Option<OptionValue> {
    match value {
        ResolvedValue::String(text) => Some(OptionValue::String(text.to_string())),
        ResolvedValue::Integer(number) => Some(OptionValue::Integer(*number)),
        ResolvedValue::Boolean(flag) => Some(OptionValue::Boolean(*flag)),
        ResolvedValue::User(user, _) => Some(OptionValue::User(user_profile(user))),
        ResolvedValue::Role(role) => Some(OptionValue::Role(RoleRef {
            id: role.id.get(),
            name: role.name.clone(),
        })),
        _ => None,
    }
}

fn interaction_context(
    router: &CommandRouter,
    ctx: &Context,
    command: CommandInteraction,
) -> InteractionContext {
    let mut interaction = InteractionContext::new(
        command.data.name.clone(),
        user_profile(&command.user),
        command.channel_id.get(),
        router.platform(),
        Arc::new(DiscordResponder::for_command(ctx.http.clone(), command.clone())),
    );

    if let Some(guild) = command.guild_id {
        let permissions = command
            .member
            .as_ref()
            .and_then(|member| member.permissions)
            .map(permissions_view)
            .unwrap_or_default();
        interaction = interaction.in_guild(guild.get(), permissions);
    }

    for option in command.data.options() {
        match option.value {
            ResolvedValue::SubCommand(nested) => {
                interaction = interaction.with_subcommand(option.name);
                for inner in nested {
                    if let Some(value) = option_value(&inner.value) {
                        interaction = interaction.with_option(inner.name, value);
                    }
                }
            }
            value => match option_value(&value) {
                Some(value) => interaction = interaction.with_option(option.name, value),
                None => warn!(option = option.name, "Ignoring unsupported option type"),
            },
        }
    }
    interaction
}
