//! # /serverinfo
//!
//! Guild statistics: owner, creation date, member and channel counts, boosts, features.

use async_trait::async_trait;

use crate::application::interactions::{InteractionContext, SlashCommand};
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::domain::types::GuildOverview;
use crate::strings::messages;

pub struct ServerInfoCommand;

fn server_embed(guild: &GuildOverview) -> Embed {
    let features = guild
        .features
        .iter()
        .map(|feature| feature.replace('_', " ").to_lowercase())
        .collect::<Vec<_>>()
        .join(", ");

    let mut embed = Embed::new()
        .title(messages::server_info_title(&guild.name))
        .thumbnail(guild.icon_url.clone())
        .color(colors::BLUE)
        .field(
            "Owner",
            guild.owner_name.as_deref().unwrap_or("Unknown"),
            true,
        )
        .field("Server ID", guild.id.to_string(), true)
        .field("Created On", messages::date(guild.created_at()), true)
        .field("Members", format!("Total: {}", guild.member_count), false)
        .field(
            "Member Status",
            messages::member_status(guild.online_count, guild.member_count),
            true,
        )
        .field(
            "Channels",
            messages::channel_counts(
                guild.text_channels.len(),
                guild.voice_channels,
                guild.categories,
            ),
            true,
        )
        .field("Roles", guild.role_count.to_string(), true)
        .field("Emojis", guild.emoji_count.to_string(), true)
        .field("Boost Tier", format!("Level {}", guild.boost_tier), true)
        .field("Boost Count", guild.boost_count.to_string(), true);

    if !features.is_empty() {
        embed = embed.field("Server Features", features, false);
    }
    embed.field("Verification Level", &guild.verification_level, true)
}

#[async_trait]
impl SlashCommand for ServerInfoCommand {
    fn name(&self) -> &str {
        "serverinfo"
    }

    fn description(&self) -> &str {
        "Displays information about this Discord server"
    }

    fn guild_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let guild = ctx.require_guild()?;
        ctx.defer(false).await?;
        let overview = ctx.platform().guild_overview(guild).await?;
        ctx.follow_up(OutgoingMessage::embed(server_embed(&overview)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChannelRef, Permissions};
    use crate::testing::{RecordingPlatform, RecordingResponder, ResponderCall, user};
    use std::sync::Arc;

    #[tokio::test]
    async fn defers_and_reports_statistics() {
        let overview = GuildOverview {
            id: 175_928_847_299_117_063,
            name: "Rustaceans".into(),
            member_count: 10,
            online_count: 4,
            text_channels: vec![ChannelRef { id: 1, name: "general".into() }],
            voice_channels: 2,
            categories: 1,
            features: vec!["ANIMATED_ICON".into()],
            verification_level: "Medium".into(),
            ..GuildOverview::default()
        };
        let platform = Arc::new(RecordingPlatform::new().with_guild(overview));
        let responder = Arc::new(RecordingResponder::new(10));
        let ctx = InteractionContext::new("serverinfo", user(1, "alice"), 10, platform, responder.clone())
            .in_guild(175_928_847_299_117_063, Permissions::default());

        ServerInfoCommand.execute(&ctx).await.unwrap();

        let calls = responder.calls().await;
        assert_eq!(calls[0], ResponderCall::Defer { ephemeral: false });
        let ResponderCall::FollowUp(message) = &calls[1] else {
            panic!("expected follow-up, got {:?}", calls[1]);
        };
        let embed = message.embed.as_ref().unwrap();
        let field = |name: &str| embed.fields.iter().find(|f| f.name == name).map(|f| f.value.clone());
        assert_eq!(field("Created On").as_deref(), Some("April 30, 2016"));
        assert_eq!(field("Member Status").as_deref(), Some("🟢 Online: 4\n⚫ Offline: 6"));
        assert_eq!(field("Server Features").as_deref(), Some("animated icon"));
        assert!(field("Channels").unwrap().ends_with("📊 Total: 4"));
    }

    #[tokio::test]
    async fn outside_a_guild_is_invalid_input() {
        let ctx = InteractionContext::new(
            "serverinfo",
            user(1, "alice"),
            10,
            Arc::new(RecordingPlatform::new()),
            Arc::new(RecordingResponder::new(10)),
        );
        assert!(matches!(
            ServerInfoCommand.execute(&ctx).await,
            Err(BotError::InvalidInput { .. })
        ));
    }
}
