//! # /userinfo
//!
//! Shows account details for a user, plus guild membership details when available.

use async_trait::async_trait;

use crate::application::interactions::{InteractionContext, OptionKind, OptionSpec, SlashCommand};
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::domain::types::{Member, UserProfile};
use crate::strings::messages;

pub struct UserInfoCommand;

fn user_embed(user: &UserProfile, member: Option<&Member>) -> Embed {
    let display_name = member
        .map(Member::effective_name)
        .unwrap_or_else(|| user.display_name());

    let mut embed = Embed::new()
        .title(messages::USER_INFO_TITLE)
        .color(colors::BLUE)
        .thumbnail(user.avatar_url.clone())
        .field("Username", &user.name, true)
        .field("Display Name", display_name, true)
        .field("User ID", user.id.to_string(), true)
        .field("Account Created", messages::timestamp(user.created_at()), false);

    if let Some(member) = member {
        let joined = member
            .joined_at
            .map(messages::timestamp)
            .unwrap_or_else(|| "Unknown".to_string());
        let roles = if member.roles.is_empty() {
            "None".to_string()
        } else {
            member
                .roles
                .iter()
                .map(|role| role.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        embed = embed
            .field("Joined Server", joined, false)
            .field("Roles", roles, false);
    }

    embed.timestamped()
}

#[async_trait]
impl SlashCommand for UserInfoCommand {
    fn name(&self) -> &str {
        "userinfo"
    }

    fn description(&self) -> &str {
        "Displays information about a user"
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::optional(
            "user",
            "The user to get info about",
            OptionKind::User,
        )]
    }

    fn guild_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let target = ctx.option_user("user").unwrap_or(&ctx.user);
        let member = match ctx.guild {
            Some(guild) => ctx.platform().retrieve_member(guild, target.id).await?,
            None => None,
        };
        ctx.reply(OutgoingMessage::embed(user_embed(target, member.as_ref())))
            .await
    }
}
