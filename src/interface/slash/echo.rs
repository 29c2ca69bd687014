//! # /echo
//!
//! Repeats the message option. Mass mentions need the mention-everyone permission.

use async_trait::async_trait;

use crate::application::interactions::{InteractionContext, OptionKind, OptionSpec, SlashCommand};
use crate::domain::error::BotError;
use crate::domain::message::OutgoingMessage;
use crate::domain::types::Permission;
use crate::strings::messages;

pub struct EchoSlashCommand;

fn has_mass_mention(text: &str) -> bool {
    text.contains("@everyone") || text.contains("@here")
}

#[async_trait]
impl SlashCommand for EchoSlashCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeats what you say"
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::required(
            "message",
            "The message to echo",
            OptionKind::String,
        )]
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let text = ctx.required_str("message")?;
        if has_mass_mention(text) && !ctx.permissions.allows(Permission::MentionEveryone) {
            return Err(BotError::permission_denied(
                messages::ECHO_MASS_MENTION,
                format!("user {} lacks mention_everyone", ctx.user.id),
            ));
        }
        ctx.reply(OutgoingMessage::text(text)).await
    }
}
