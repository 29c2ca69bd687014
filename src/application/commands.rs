//! # Text Commands
//!
//! Registry and parsing for prefix commands such as `!ping`.
//! Names are case-insensitive: they are lowercased on registration and lookup.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::registry::{Entry, Registry};
use crate::domain::error::BotError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::PlatformClient;
use crate::domain::types::{ChannelId, GuildId, MessageHandle, MessageId, UserProfile};

/// A prefix command. Implementations live in `interface::commands`.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn usage(&self) -> &str;

    async fn execute(&self, args: &[String], ctx: &CommandContext<'_>) -> Result<(), BotError>;
}

/// Everything a text command may touch while it runs.
pub struct CommandContext<'a> {
    pub platform: &'a dyn PlatformClient,
    pub registry: &'a CommandRegistry,
    pub channel: ChannelId,
    pub guild: Option<GuildId>,
    pub message: MessageId,
    pub author: &'a UserProfile,
    pub prefix: &'a str,
}

impl CommandContext<'_> {
    pub async fn send(&self, message: OutgoingMessage) -> Result<MessageHandle, BotError> {
        Ok(self.platform.send_message(self.channel, message).await?)
    }

    pub async fn say(&self, text: impl Into<String>) -> Result<MessageHandle, BotError> {
        self.send(OutgoingMessage::text(text)).await
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    inner: Registry<dyn Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: impl Command + 'static) {
        self.register_arc(Arc::new(command));
    }

    pub fn register_arc(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_lowercase();
        if self.inner.insert(name.clone(), command) {
            tracing::warn!(command = %name, "Replaced existing command registration");
        } else {
            tracing::info!(command = %name, "Registered command");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Entry<dyn Command>> {
        self.inner.get(&name.to_lowercase())
    }

    /// Commands in registration order.
    pub fn list(&self) -> impl Iterator<Item = &dyn Command> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// Splits `body` into a command name and positional arguments.
/// Returns `None` unless the body starts with `prefix` and names a command.
pub fn parse_invocation(body: &str, prefix: &str) -> Option<Invocation> {
    let rest = body.strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_lowercase();
    Some(Invocation {
        name,
        args: parts.map(str::to_string).collect(),
    })
}
