//! # Domain Traits
//!
//! Abstract interfaces for the chat platform.
//! The Discord adapter in the Infrastructure layer implements them; tests use an in-memory recorder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::error::PlatformError;
use crate::domain::message::OutgoingMessage;
use crate::domain::types::{
    ChannelId, Emoji, GuildId, GuildOverview, Member, MessageHandle, MessageId, MessageSummary,
    RoleId, UserId,
};

/// Channel- and guild-level operations of the chat platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Send a message to a channel
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, PlatformError>;

    /// Replace the content of a previously sent message
    async fn edit_message(
        &self,
        handle: &MessageHandle,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError>;

    async fn add_reaction(&self, handle: &MessageHandle, emoji: &Emoji) -> Result<(), PlatformError>;

    async fn assign_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError>;

    /// Look up a guild member; `Ok(None)` when the user is not in the guild.
    async fn retrieve_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError>;

    /// The bot's own membership in a guild.
    async fn current_member(&self, guild: GuildId) -> Result<Member, PlatformError>;

    async fn guild_overview(&self, guild: GuildId) -> Result<GuildOverview, PlatformError>;

    async fn kick(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError>;

    async fn ban(
        &self,
        guild: GuildId,
        user: UserId,
        delete_days: u8,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Time a member out until `until`, or lift the timeout with `None`.
    async fn set_timeout(
        &self,
        guild: GuildId,
        user: UserId,
        until: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<(), PlatformError>;

    /// Most recent messages in a channel, newest first.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageSummary>, PlatformError>;

    async fn delete_messages(
        &self,
        channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), PlatformError>;

    /// Heartbeat latency of the gateway connection, once known.
    async fn gateway_latency(&self) -> Option<Duration>;
}

/// Responds to one interaction. The platform accepts exactly one initial
/// response (reply or defer); everything after that is a follow-up.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn reply(&self, message: OutgoingMessage) -> Result<(), PlatformError>;

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError>;

    async fn follow_up(&self, message: OutgoingMessage) -> Result<MessageHandle, PlatformError>;

    /// The message created by the initial reply.
    async fn original_message(&self) -> Result<MessageHandle, PlatformError>;
}
