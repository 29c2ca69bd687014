//! In-memory stand-ins for the Discord adapter. They record every outbound
//! call so tests can assert on exactly what the bot would have sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::error::PlatformError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::{InteractionResponder, PlatformClient};
use crate::domain::types::{
    ChannelId, Emoji, GuildId, GuildOverview, Member, MessageHandle, MessageId, MessageSummary,
    Permissions, RoleId, RoleRef, UserId, UserProfile,
};

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Send {
        channel: ChannelId,
        message: OutgoingMessage,
    },
    Edit {
        handle: MessageHandle,
        message: OutgoingMessage,
    },
    React {
        handle: MessageHandle,
        emoji: Emoji,
    },
    AssignRole {
        guild: GuildId,
        user: UserId,
        role: RoleId,
    },
    RemoveRole {
        guild: GuildId,
        user: UserId,
        role: RoleId,
    },
    Kick {
        guild: GuildId,
        user: UserId,
        reason: String,
    },
    Ban {
        guild: GuildId,
        user: UserId,
        delete_days: u8,
        reason: String,
    },
    Timeout {
        guild: GuildId,
        user: UserId,
        until: Option<DateTime<Utc>>,
        reason: Option<String>,
    },
    Delete {
        channel: ChannelId,
        messages: Vec<MessageId>,
    },
}

/// Scripted platform: members, guilds and channel history are seeded up front,
/// every call is appended to a log.
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    next_message: AtomicU64,
    members: Mutex<HashMap<(GuildId, UserId), Member>>,
    bot: Mutex<Option<Member>>,
    guilds: Mutex<HashMap<GuildId, GuildOverview>>,
    history: Mutex<HashMap<ChannelId, Vec<MessageSummary>>>,
    failing: AtomicBool,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message: AtomicU64::new(1000),
            members: Mutex::new(HashMap::new()),
            bot: Mutex::new(None),
            guilds: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_member(mut self, guild: GuildId, member: Member) -> Self {
        self.members
            .get_mut()
            .insert((guild, member.user.id), member);
        self
    }

    pub fn with_bot_member(mut self, member: Member) -> Self {
        *self.bot.get_mut() = Some(member);
        self
    }

    pub fn with_guild(mut self, guild: GuildOverview) -> Self {
        self.guilds.get_mut().insert(guild.id, guild);
        self
    }

    pub fn with_history(mut self, channel: ChannelId, messages: Vec<MessageSummary>) -> Self {
        self.history.get_mut().insert(channel, messages);
        self
    }

    /// Makes every subsequent mutating request fail.
    pub fn fail_requests(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().await.clone()
    }

    pub async fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Send { channel, message } => Some((*channel, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub async fn edits(&self) -> Vec<(MessageHandle, OutgoingMessage)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Edit { handle, message } => Some((*handle, message.clone())),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("scripted failure".to_string()));
        }
        self.calls.lock().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for RecordingPlatform {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, PlatformError> {
        self.record(PlatformCall::Send { channel, message }).await?;
        let id = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MessageHandle::new(channel, id))
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Edit {
            handle: *handle,
            message,
        })
        .await
    }

    async fn add_reaction(&self, handle: &MessageHandle, emoji: &Emoji) -> Result<(), PlatformError> {
        self.record(PlatformCall::React {
            handle: *handle,
            emoji: emoji.clone(),
        })
        .await
    }

    async fn assign_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::AssignRole { guild, user, role })
            .await?;
        if let Some(member) = self.members.lock().await.get_mut(&(guild, user)) {
            member.roles.push(RoleRef {
                id: role,
                name: format!("role-{role}"),
            });
        }
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::RemoveRole { guild, user, role })
            .await?;
        if let Some(member) = self.members.lock().await.get_mut(&(guild, user)) {
            member.roles.retain(|r| r.id != role);
        }
        Ok(())
    }

    async fn retrieve_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError> {
        Ok(self.members.lock().await.get(&(guild, user)).cloned())
    }

    async fn current_member(&self, _guild: GuildId) -> Result<Member, PlatformError> {
        self.bot
            .lock()
            .await
            .clone()
            .ok_or_else(|| PlatformError::NotFound("bot member".to_string()))
    }

    async fn guild_overview(&self, guild: GuildId) -> Result<GuildOverview, PlatformError> {
        self.guilds
            .lock()
            .await
            .get(&guild)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("guild {guild}")))
    }

    async fn kick(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::Kick {
            guild,
            user,
            reason: reason.to_string(),
        })
        .await
    }

    async fn ban(
        &self,
        guild: GuildId,
        user: UserId,
        delete_days: u8,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Ban {
            guild,
            user,
            delete_days,
            reason: reason.to_string(),
        })
        .await
    }

    async fn set_timeout(
        &self,
        guild: GuildId,
        user: UserId,
        until: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Timeout {
            guild,
            user,
            until,
            reason: reason.map(str::to_string),
        })
        .await
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<MessageSummary>, PlatformError> {
        Ok(self
            .history
            .lock()
            .await
            .get(&channel)
            .map(|messages| messages.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_messages(
        &self,
        channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Delete {
            channel,
            messages: messages.to_vec(),
        })
        .await
    }

    async fn gateway_latency(&self) -> Option<Duration> {
        Some(Duration::from_millis(42))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponderCall {
    Reply(OutgoingMessage),
    Defer { ephemeral: bool },
    FollowUp(OutgoingMessage),
}

/// Interaction responder that enforces the acknowledge-once protocol like the real API.
pub struct RecordingResponder {
    calls: Mutex<Vec<ResponderCall>>,
    acknowledged: AtomicBool,
    original: MessageHandle,
    next_message: AtomicU64,
}

impl RecordingResponder {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            acknowledged: AtomicBool::new(false),
            original: MessageHandle::new(channel, 900),
            next_message: AtomicU64::new(901),
        }
    }

    pub async fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().await.clone()
    }

    /// Every message shown to the user, initial reply and follow-ups alike.
    pub async fn messages(&self) -> Vec<OutgoingMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ResponderCall::Reply(m) | ResponderCall::FollowUp(m) => Some(m.clone()),
                ResponderCall::Defer { .. } => None,
            })
            .collect()
    }

    fn acknowledge(&self) -> Result<(), PlatformError> {
        if self.acknowledged.swap(true, Ordering::SeqCst) {
            return Err(PlatformError::Request(
                "interaction has already been acknowledged".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn reply(&self, message: OutgoingMessage) -> Result<(), PlatformError> {
        self.acknowledge()?;
        self.calls.lock().await.push(ResponderCall::Reply(message));
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        self.acknowledge()?;
        self.calls
            .lock()
            .await
            .push(ResponderCall::Defer { ephemeral });
        Ok(())
    }

    async fn follow_up(&self, message: OutgoingMessage) -> Result<MessageHandle, PlatformError> {
        if !self.acknowledged.load(Ordering::SeqCst) {
            return Err(PlatformError::Request(
                "follow-up before acknowledgement".to_string(),
            ));
        }
        self.calls.lock().await.push(ResponderCall::FollowUp(message));
        let id = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MessageHandle::new(self.original.channel_id, id))
    }

    async fn original_message(&self) -> Result<MessageHandle, PlatformError> {
        if !self.acknowledged.load(Ordering::SeqCst) {
            return Err(PlatformError::NotFound("original response".to_string()));
        }
        Ok(self.original)
    }
}

pub fn user(id: UserId, name: &str) -> UserProfile {
    UserProfile {
        id,
        name: name.to_string(),
        global_name: None,
        avatar_url: None,
        bot: false,
    }
}

pub fn member(id: UserId, name: &str, top_role_position: u16) -> Member {
    Member {
        user: user(id, name),
        nick: None,
        roles: Vec::new(),
        top_role_position,
        is_owner: false,
        joined_at: None,
        permissions: Permissions::default(),
    }
}
