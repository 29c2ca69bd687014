//! # Ping Command
//!
//! Sends a placeholder and edits it with the measured round trip.

use async_trait::async_trait;
use std::time::Instant;

use crate::application::commands::{Command, CommandContext};
use crate::domain::error::BotError;
use crate::domain::message::OutgoingMessage;
use crate::strings::messages;

pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Checks the bot's response time"
    }

    fn usage(&self) -> &str {
        "ping"
    }

    async fn execute(&self, _args: &[String], ctx: &CommandContext<'_>) -> Result<(), BotError> {
        let started = Instant::now();
        let placeholder = ctx.say(messages::PINGING).await?;
        let elapsed = started.elapsed().as_millis();
        ctx.platform
            .edit_message(&placeholder, OutgoingMessage::text(messages::pong(elapsed)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::CommandRegistry;
    use crate::testing::{PlatformCall, RecordingPlatform, user};

    #[tokio::test]
    async fn edits_placeholder_with_latency() {
        let platform = RecordingPlatform::new();
        let registry = CommandRegistry::new();
        let author = user(1, "alice");
        let ctx = CommandContext {
            platform: &platform,
            registry: &registry,
            channel: 10,
            guild: None,
            message: 1,
            author: &author,
            prefix: "!",
        };

        PingCommand.execute(&[], &ctx).await.unwrap();

        let calls = platform.calls().await;
        assert_eq!(
            calls[0],
            PlatformCall::Send {
                channel: 10,
                message: OutgoingMessage::text("Pinging...")
            }
        );
        let PlatformCall::Edit { message, .. } = &calls[1] else {
            panic!("expected an edit, got {:?}", calls[1]);
        };
        assert!(message.content.as_deref().unwrap().starts_with("Pong! Response time: "));
    }
}
