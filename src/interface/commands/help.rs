//! # Help Command
//!
//! Lists every text command in registration order, or shows the details of one.

use async_trait::async_trait;

use crate::application::commands::{Command, CommandContext};
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::strings::help;

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "Shows a list of all commands"
    }

    fn usage(&self) -> &str {
        "help [command]"
    }

    async fn execute(&self, args: &[String], ctx: &CommandContext<'_>) -> Result<(), BotError> {
        let mut embed = Embed::new()
            .title(help::TITLE)
            .color(colors::BLUE)
            .timestamped();

        match args.first() {
            None => {
                for command in ctx.registry.list() {
                    embed = embed.field(command.name(), command.description(), false);
                }
                embed = embed.footer(help::footer(ctx.prefix));
            }
            Some(requested) => {
                let requested = requested.to_lowercase();
                match ctx.registry.lookup(&requested) {
                    Some(entry) => {
                        let command = entry.handler();
                        embed = embed
                            .field(help::FIELD_COMMAND, command.name(), false)
                            .field(help::FIELD_DESCRIPTION, command.description(), false)
                            .field(
                                help::FIELD_USAGE,
                                format!("{}{}", ctx.prefix, command.usage()),
                                false,
                            );
                    }
                    None => {
                        embed = embed
                            .title(help::UNKNOWN_TITLE)
                            .description(help::unknown_command(&requested))
                            .color(colors::RED);
                    }
                }
            }
        }

        ctx.send(OutgoingMessage::embed(embed)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::commands::{EchoCommand, PingCommand};
    use crate::testing::{RecordingPlatform, user};

    async fn run_help(args: &[&str]) -> Embed {
        let platform = RecordingPlatform::new();
        let mut registry = crate::application::commands::CommandRegistry::new();
        registry.register(PingCommand);
        registry.register(EchoCommand);
        registry.register(HelpCommand);
        let author = user(1, "alice");
        let ctx = CommandContext {
            platform: &platform,
            registry: &registry,
            channel: 10,
            guild: None,
            message: 1,
            author: &author,
            prefix: "?",
        };
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        HelpCommand.execute(&args, &ctx).await.unwrap();
        let sent = platform.sent().await;
        sent[0].1.embed.clone().unwrap()
    }

    #[tokio::test]
    async fn lists_commands_in_registration_order() {
        let embed = run_help(&[]).await;
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["ping", "echo", "help"]);
        assert_eq!(
            embed.footer.as_deref(),
            Some("Type ?help [command] for detailed usage information")
        );
    }

    #[tokio::test]
    async fn shows_details_for_one_command() {
        let embed = run_help(&["ECHO"]).await;
        assert_eq!(embed.fields[0].value, "echo");
        assert_eq!(embed.fields[2].value, "?echo [message]");
    }

    #[tokio::test]
    async fn unknown_command_is_reported_in_red() {
        let embed = run_help(&["nope"]).await;
        assert_eq!(embed.color, Some(colors::RED));
        assert_eq!(
            embed.description.as_deref(),
            Some("The command `nope` does not exist.")
        );
    }
}
