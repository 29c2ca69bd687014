//! # /reactionrole
//!
//! Posts an embed listing up to five roles and reacts with the matching emoji.
//! Members then pick roles by reacting; see [`ReactionRoleStore`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::interactions::{InteractionContext, OptionKind, OptionSpec, SlashCommand};
use crate::application::reaction_roles::ReactionRoleStore;
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::domain::types::{Emoji, Permission, RoleRef};
use crate::strings::messages;

const MAX_PAIRS: usize = 5;

pub struct ReactionRoleCommand {
    store: Arc<ReactionRoleStore>,
}

impl ReactionRoleCommand {
    pub fn new(store: Arc<ReactionRoleStore>) -> Self {
        Self { store }
    }
}

/// Role/emoji pairs in option order. Pairs missing a half are skipped, as are
/// emoji that do not parse.
fn collect_pairs(ctx: &InteractionContext) -> Vec<(RoleRef, Emoji)> {
    let mut pairs = Vec::with_capacity(MAX_PAIRS);
    for position in 1..=MAX_PAIRS {
        let (Some(role), Some(raw)) = (
            ctx.option_role(&format!("role{position}")),
            ctx.option_str(&format!("emoji{position}")),
        ) else {
            continue;
        };
        match Emoji::parse(raw) {
            Some(emoji) => pairs.push((role.clone(), emoji)),
            None => tracing::warn!(emoji = raw, role = %role.name, "Skipping unparseable emoji"),
        }
    }
    pairs
}

#[async_trait]
impl SlashCommand for ReactionRoleCommand {
    fn name(&self) -> &str {
        "reactionrole"
    }

    fn description(&self) -> &str {
        "Create a message members can react to for roles"
    }

    fn options(&self) -> Vec<OptionSpec> {
        let mut specs = vec![
            OptionSpec::required("title", "Title of the reaction role message", OptionKind::String),
            OptionSpec::required(
                "description",
                "Description of the reaction role message",
                OptionKind::String,
            ),
        ];
        for position in 1..=MAX_PAIRS {
            let role = format!("role{position}");
            let emoji = format!("emoji{position}");
            if position == 1 {
                specs.push(OptionSpec::required(role, "Role to assign", OptionKind::Role));
                specs.push(OptionSpec::required(emoji, "Emoji for the role", OptionKind::String));
            } else {
                specs.push(OptionSpec::optional(role, format!("Role {position}"), OptionKind::Role));
                specs.push(OptionSpec::optional(
                    emoji,
                    format!("Emoji for role {position}"),
                    OptionKind::String,
                ));
            }
        }
        specs
    }

    fn guild_only(&self) -> bool {
        true
    }

    fn default_permissions(&self) -> Vec<Permission> {
        vec![Permission::ManageRoles]
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let guild = ctx.require_guild()?;
        let title = ctx.required_str("title")?;
        let description = ctx.required_str("description")?;

        let platform = ctx.platform();
        let bot = platform.current_member(guild).await?;
        if !bot.permissions.allows(Permission::ManageRoles) {
            return Err(BotError::permission_denied(
                messages::BOT_CANNOT_MANAGE_ROLES,
                format!("bot lacks Manage Roles in guild {guild}"),
            ));
        }

        let pairs = collect_pairs(ctx);
        if pairs.is_empty() {
            return Err(BotError::invalid_input(messages::REACTION_ROLES_EMPTY));
        }

        let embed = pairs.iter().fold(
            Embed::new()
                .title(title)
                .description(description)
                .color(colors::BLUE),
            |embed, (role, emoji)| {
                embed.field(
                    role.name.as_str(),
                    messages::reaction_role_line(&emoji.to_string(), &role.name),
                    false,
                )
            },
        );

        ctx.reply(OutgoingMessage::text(messages::REACTION_ROLES_CREATING).ephemeral())
            .await?;
        let handle = platform
            .send_message(ctx.channel, OutgoingMessage::embed(embed))
            .await?;

        let mut bound = 0;
        for (role, emoji) in &pairs {
            match platform.add_reaction(&handle, emoji).await {
                Ok(()) => {
                    self.store.bind(handle.message_id, emoji, role.id).await;
                    bound += 1;
                }
                Err(e) => {
                    tracing::error!(emoji = %emoji, role = %role.name, error = %e, "Failed to add reaction")
                }
            }
        }

        tracing::info!(
            message_id = handle.message_id,
            bound,
            user_id = ctx.user.id,
            "Reaction role message created"
        );
        Ok(())
    }
}
