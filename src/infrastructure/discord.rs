//! # Discord Service Adapter
//!
//! Implements `PlatformClient` and `InteractionResponder` on top of serenity's HTTP client.
//! This module is the bridge between the platform-neutral types used by the
//! command handlers and serenity's builders and models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ButtonStyle, ChannelId as DiscordChannelId, ChannelType, CommandInteraction,
    ComponentInteraction, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, EditMember, EditMessage, EmojiId,
    GetMessages, GuildId as DiscordGuildId, Member as DiscordMember, Message,
    MessageId as DiscordMessageId, PartialGuild, Permissions as DiscordPermissions, PremiumTier,
    ReactionType, Role, RoleId as DiscordRoleId, Timestamp, User, UserId as DiscordUserId,
};
use serenity::gateway::ShardManager;
use serenity::http::{Http, HttpError};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::domain::error::PlatformError;
use crate::domain::message::{Button, Embed, OutgoingMessage};
use crate::domain::traits::{InteractionResponder, PlatformClient};
use crate::domain::types::{
    ChannelId, ChannelRef, Emoji, GuildId, GuildOverview, Member, MessageHandle, MessageId,
    MessageSummary, Permission, Permissions, RoleId, RoleRef, UserId, UserProfile,
};

/// Buttons per action row accepted by Discord.
const BUTTONS_PER_ROW: usize = 5;

impl From<serenity::Error> for PlatformError {
    fn from(e: serenity::Error) -> Self {
        PlatformError::Request(e.to_string())
    }
}

fn is_not_found(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

/// Converts a raw id into a serenity id type. Zero is not a valid snowflake.
pub(crate) fn snowflake<T: From<u64>>(id: u64) -> Result<T, PlatformError> {
    if id == 0 {
        return Err(PlatformError::InvalidId("snowflake 0".to_string()));
    }
    Ok(T::from(id))
}

fn to_utc(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0)
}

pub(crate) fn user_profile(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.get(),
        name: user.name.clone(),
        global_name: user.global_name.clone(),
        avatar_url: user.avatar_url(),
        bot: user.bot,
    }
}

pub(crate) fn permissions_view(bits: DiscordPermissions) -> Permissions {
    Permissions {
        administrator: bits.administrator(),
        kick_members: bits.kick_members(),
        ban_members: bits.ban_members(),
        moderate_members: bits.moderate_members(),
        manage_roles: bits.manage_roles(),
        manage_messages: bits.manage_messages(),
        mention_everyone: bits.mention_everyone(),
    }
}

pub(crate) fn permission_bits(permission: Permission) -> DiscordPermissions {
    match permission {
        Permission::KickMembers => DiscordPermissions::KICK_MEMBERS,
        Permission::BanMembers => DiscordPermissions::BAN_MEMBERS,
        Permission::ModerateMembers => DiscordPermissions::MODERATE_MEMBERS,
        Permission::ManageRoles => DiscordPermissions::MANAGE_ROLES,
        Permission::ManageMessages => DiscordPermissions::MANAGE_MESSAGES,
        Permission::MentionEveryone => DiscordPermissions::MENTION_EVERYONE,
    }
}

pub(crate) fn emoji_view(reaction: &ReactionType) -> Option<Emoji> {
    match reaction {
        ReactionType::Custom { animated, id, name } => Some(Emoji::Custom {
            name: name.clone().unwrap_or_default(),
            id: id.get(),
            animated: *animated,
        }),
        ReactionType::Unicode(text) => Some(Emoji::Unicode(text.clone())),
        _ => None,
    }
}

fn reaction_type(emoji: &Emoji) -> Result<ReactionType, PlatformError> {
    Ok(match emoji {
        Emoji::Custom { name, id, animated } => ReactionType::Custom {
            animated: *animated,
            id: snowflake::<EmojiId>(*id)?,
            name: Some(name.clone()),
        },
        Emoji::Unicode(text) => ReactionType::Unicode(text.clone()),
    })
}

/// Resolves hierarchy position, permissions and role names against the guild's role table.
fn member_view(guild: &PartialGuild, member: &DiscordMember) -> Member {
    let roles: Vec<&Role> = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .collect();

    // @everyone shares its id with the guild.
    let mut bits = guild
        .roles
        .get(&DiscordRoleId::new(guild.id.get()))
        .map(|everyone| everyone.permissions)
        .unwrap_or_else(DiscordPermissions::empty);
    for role in &roles {
        bits |= role.permissions;
    }

    Member {
        user: user_profile(&member.user),
        nick: member.nick.clone(),
        roles: roles
            .iter()
            .map(|role| RoleRef {
                id: role.id.get(),
                name: role.name.clone(),
            })
            .collect(),
        top_role_position: roles.iter().map(|role| role.position).max().unwrap_or(0),
        is_owner: member.user.id == guild.owner_id,
        joined_at: member.joined_at.and_then(to_utc),
        permissions: permissions_view(bits),
    }
}

fn embed_builder(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(url) = &embed.thumbnail {
        builder = builder.thumbnail(url);
    }
    if embed.timestamp {
        builder = builder.timestamp(Timestamp::now());
    }
    builder
}

fn action_rows(buttons: &[Button]) -> Vec<CreateActionRow> {
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|button| {
                        CreateButton::new(&button.custom_id)
                            .label(&button.label)
                            .style(ButtonStyle::Primary)
                    })
                    .collect(),
            )
        })
        .collect()
}

fn handle_of(message: &Message) -> MessageHandle {
    MessageHandle::new(message.channel_id.get(), message.id.get())
}

fn premium_tier(tier: PremiumTier) -> u8 {
    match tier {
        PremiumTier::Tier1 => 1,
        PremiumTier::Tier2 => 2,
        PremiumTier::Tier3 => 3,
        _ => 0,
    }
}

pub struct DiscordService {
    http: Arc<Http>,
    shard_manager: OnceLock<Arc<ShardManager>>,
}

impl DiscordService {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            shard_manager: OnceLock::new(),
        }
    }

    /// Gives access to gateway heartbeat latency once the client exists.
    pub fn attach_shards(&self, manager: Arc<ShardManager>) {
        if self.shard_manager.set(manager).is_err() {
            tracing::warn!("Shard manager was already attached");
        }
    }

    async fn fetch_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError> {
        let guild_id: DiscordGuildId = snowflake(guild)?;
        let user_id: DiscordUserId = snowflake(user)?;
        let member = match guild_id.member(&self.http, user_id).await {
            Ok(member) => member,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let partial = guild_id.to_partial_guild(&self.http).await?;
        Ok(Some(member_view(&partial, &member)))
    }
}

#[async_trait]
impl PlatformClient for DiscordService {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, PlatformError> {
        let channel_id: DiscordChannelId = snowflake(channel)?;
        let mut builder = CreateMessage::new();
        if let Some(content) = &message.content {
            builder = builder.content(content);
        }
        if let Some(embed) = &message.embed {
            builder = builder.embed(embed_builder(embed));
        }
        if !message.buttons.is_empty() {
            builder = builder.components(action_rows(&message.buttons));
        }

        let sent = channel_id.send_message(&self.http, builder).await?;
        tracing::debug!(channel_id = channel, message_id = %sent.id, "Sent message");
        Ok(handle_of(&sent))
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError> {
        let channel_id: DiscordChannelId = snowflake(handle.channel_id)?;
        let message_id: DiscordMessageId = snowflake(handle.message_id)?;
        let mut builder = EditMessage::new()
            .content(message.content.clone().unwrap_or_default())
            .components(action_rows(&message.buttons));
        if let Some(embed) = &message.embed {
            builder = builder.embed(embed_builder(embed));
        }
        channel_id
            .edit_message(&self.http, message_id, builder)
            .await?;
        Ok(())
    }

    async fn add_reaction(&self, handle: &MessageHandle, emoji: &Emoji) -> Result<(), PlatformError> {
        let channel_id: DiscordChannelId = snowflake(handle.channel_id)?;
        let message_id: DiscordMessageId = snowflake(handle.message_id)?;
        channel_id
            .create_reaction(&self.http, message_id, reaction_type(emoji)?)
            .await?;
        Ok(())
    }

    async fn assign_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(snowflake(guild)?, snowflake(user)?, snowflake(role)?, None)
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.http
            .remove_member_role(snowflake(guild)?, snowflake(user)?, snowflake(role)?, None)
            .await?;
        Ok(())
    }

    async fn retrieve_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError> {
        self.fetch_member(guild, user).await
    }

    async fn current_member(&self, guild: GuildId) -> Result<Member, PlatformError> {
        let me = self.http.get_current_user().await?;
        self.fetch_member(guild, me.id.get())
            .await?
            .ok_or_else(|| PlatformError::NotFound(format!("bot member in guild {guild}")))
    }

    async fn guild_overview(&self, guild: GuildId) -> Result<GuildOverview, PlatformError> {
        let guild_id: DiscordGuildId = snowflake(guild)?;
        let partial = guild_id.to_partial_guild_with_counts(&self.http).await?;
        let mut channels: Vec<_> = guild_id
            .channels(&self.http)
            .await?
            .into_values()
            .collect();
        channels.sort_by_key(|channel| channel.position);

        let mut text_channels = Vec::new();
        let (mut voice_channels, mut categories) = (0, 0);
        for channel in channels {
            match channel.kind {
                ChannelType::Text | ChannelType::News => text_channels.push(ChannelRef {
                    id: channel.id.get(),
                    name: channel.name,
                }),
                ChannelType::Voice | ChannelType::Stage => voice_channels += 1,
                ChannelType::Category => categories += 1,
                _ => {}
            }
        }

        let owner_name = match partial.owner_id.to_user(&self.http).await {
            Ok(owner) => Some(owner.name),
            Err(e) => {
                tracing::warn!(guild_id = guild, error = %e, "Failed to fetch guild owner");
                None
            }
        };

        Ok(GuildOverview {
            id: guild,
            name: partial.name.clone(),
            owner_name,
            icon_url: partial.icon_url(),
            member_count: partial.approximate_member_count.unwrap_or(0),
            online_count: partial.approximate_presence_count.unwrap_or(0),
            text_channels,
            voice_channels,
            categories,
            system_channel: partial.system_channel_id.map(|channel| channel.get()),
            role_count: partial.roles.len(),
            emoji_count: partial.emojis.len(),
            boost_tier: premium_tier(partial.premium_tier),
            boost_count: partial.premium_subscription_count.unwrap_or(0),
            features: partial.features.clone(),
            verification_level: format!("{:?}", partial.verification_level),
        })
    }

    async fn kick(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError> {
        let guild_id: DiscordGuildId = snowflake(guild)?;
        let user_id: DiscordUserId = snowflake(user)?;
        guild_id.kick_with_reason(&self.http, user_id, reason).await?;
        Ok(())
    }

    async fn ban(
        &self,
        guild: GuildId,
        user: UserId,
        delete_days: u8,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let guild_id: DiscordGuildId = snowflake(guild)?;
        let user_id: DiscordUserId = snowflake(user)?;
        guild_id
            .ban_with_reason(&self.http, user_id, delete_days, reason)
            .await?;
        Ok(())
    }

    async fn set_timeout(
        &self,
        guild: GuildId,
        user: UserId,
        until: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<(), PlatformError> {
        let guild_id: DiscordGuildId = snowflake(guild)?;
        let user_id: DiscordUserId = snowflake(user)?;
        let mut builder = match until {
            Some(until) => EditMember::new().disable_communication_until(until.to_rfc3339()),
            None => EditMember::new().enable_communication(),
        };
        if let Some(reason) = reason {
            builder = builder.audit_log_reason(reason);
        }
        guild_id.edit_member(&self.http, user_id, builder).await?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageSummary>, PlatformError> {
        let channel_id: DiscordChannelId = snowflake(channel)?;
        let messages = channel_id
            .messages(&self.http, GetMessages::new().limit(limit))
            .await?;
        Ok(messages
            .iter()
            .map(|message| MessageSummary {
                id: message.id.get(),
                author_id: message.author.id.get(),
            })
            .collect())
    }

    async fn delete_messages(
        &self,
        channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), PlatformError> {
        let channel_id: DiscordChannelId = snowflake(channel)?;
        let ids = messages
            .iter()
            .map(|id| snowflake::<DiscordMessageId>(*id))
            .collect::<Result<Vec<_>, _>>()?;
        // Bulk delete needs at least two messages.
        match ids.as_slice() {
            [] => {}
            [single] => channel_id.delete_message(&self.http, *single).await?,
            _ => channel_id.delete_messages(&self.http, &ids).await?,
        }
        Ok(())
    }

    async fn gateway_latency(&self) -> Option<Duration> {
        let manager = self.shard_manager.get()?;
        let runners = manager.runners.lock().await;
        runners.values().find_map(|runner| runner.latency)
    }
}

enum InteractionKind {
    Command(Box<CommandInteraction>),
    Component(Box<ComponentInteraction>),
}

/// Responds to a single slash command or button interaction.
pub struct DiscordResponder {
    http: Arc<Http>,
    interaction: InteractionKind,
}

impl DiscordResponder {
    pub fn for_command(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self {
            http,
            interaction: InteractionKind::Command(Box::new(interaction)),
        }
    }

    pub fn for_component(http: Arc<Http>, interaction: ComponentInteraction) -> Self {
        Self {
            http,
            interaction: InteractionKind::Component(Box::new(interaction)),
        }
    }

    async fn create_response(&self, response: CreateInteractionResponse) -> Result<(), PlatformError> {
        match &self.interaction {
            InteractionKind::Command(i) => i.create_response(&self.http, response).await?,
            InteractionKind::Component(i) => i.create_response(&self.http, response).await?,
        }
        Ok(())
    }
}

fn response_message(message: &OutgoingMessage) -> CreateInteractionResponseMessage {
    let mut builder = CreateInteractionResponseMessage::new().ephemeral(message.ephemeral);
    if let Some(content) = &message.content {
        builder = builder.content(content);
    }
    if let Some(embed) = &message.embed {
        builder = builder.embed(embed_builder(embed));
    }
    if !message.buttons.is_empty() {
        builder = builder.components(action_rows(&message.buttons));
    }
    builder
}

fn followup_message(message: &OutgoingMessage) -> CreateInteractionResponseFollowup {
    let mut builder = CreateInteractionResponseFollowup::new().ephemeral(message.ephemeral);
    if let Some(content) = &message.content {
        builder = builder.content(content);
    }
    if let Some(embed) = &message.embed {
        builder = builder.embed(embed_builder(embed));
    }
    if !message.buttons.is_empty() {
        builder = builder.components(action_rows(&message.buttons));
    }
    builder
}

#[async_trait]
impl InteractionResponder for DiscordResponder {
    async fn reply(&self, message: OutgoingMessage) -> Result<(), PlatformError> {
        self.create_response(CreateInteractionResponse::Message(response_message(&message)))
            .await
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        self.create_response(CreateInteractionResponse::Defer(
            CreateInteractionResponseMessage::new().ephemeral(ephemeral),
        ))
        .await
    }

    async fn follow_up(&self, message: OutgoingMessage) -> Result<MessageHandle, PlatformError> {
        let builder = followup_message(&message);
        let sent = match &self.interaction {
            InteractionKind::Command(i) => i.create_followup(&self.http, builder).await?,
            InteractionKind::Component(i) => i.create_followup(&self.http, builder).await?,
        };
        Ok(handle_of(&sent))
    }

    async fn original_message(&self) -> Result<MessageHandle, PlatformError> {
        let message = match &self.interaction {
            InteractionKind::Command(i) => i.get_response(&self.http).await?,
            InteractionKind::Component(i) => i.get_response(&self.http).await?,
        };
        Ok(handle_of(&message))
    }
}
