//! # Echo Command
//!
//! Repeats the arguments back, joined with single spaces.

use async_trait::async_trait;

use crate::application::commands::{Command, CommandContext};
use crate::domain::error::BotError;
use crate::strings::messages;

pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeats what you say"
    }

    fn usage(&self) -> &str {
        "echo [message]"
    }

    async fn execute(&self, args: &[String], ctx: &CommandContext<'_>) -> Result<(), BotError> {
        if args.is_empty() {
            return Err(BotError::invalid_input(messages::ECHO_EMPTY));
        }
        ctx.say(args.join(" ")).await?;
        Ok(())
    }
}
