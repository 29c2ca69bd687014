//! # Membership Events
//!
//! Welcome and farewell embeds posted when members join or leave a guild.

use crate::domain::error::PlatformError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::domain::traits::PlatformClient;
use crate::domain::types::{ChannelId, GuildId, GuildOverview, UserProfile};
use crate::strings::messages;

const WELCOME_NAMES: [&str; 2] = ["welcome", "greetings"];
const FALLBACK_NAMES: [&str; 3] = ["general", "chat", "main"];

/// Picks the channel for welcome and farewell posts: a dedicated welcome
/// channel, then the system channel, then a general chat channel.
pub fn find_welcome_channel(guild: &GuildOverview) -> Option<ChannelId> {
    let named = |names: &[&str]| {
        guild
            .text_channels
            .iter()
            .find(|channel| names.iter().any(|n| channel.name.eq_ignore_ascii_case(n)))
            .map(|channel| channel.id)
    };
    named(&WELCOME_NAMES[..])
        .or(guild.system_channel)
        .or_else(|| named(&FALLBACK_NAMES[..]))
}

/// Posts a welcome embed. Returns false when the guild has no suitable channel.
pub async fn welcome(
    platform: &dyn PlatformClient,
    guild: GuildId,
    user: &UserProfile,
) -> Result<bool, PlatformError> {
    let overview = platform.guild_overview(guild).await?;
    tracing::info!(user = %user.name, user_id = user.id, guild = %overview.name, "Member joined");
    let Some(channel) = find_welcome_channel(&overview) else {
        return Ok(false);
    };

    let embed = Embed::new()
        .title(messages::welcome_title(&overview.name))
        .description(messages::welcome_description(&user.mention()))
        .thumbnail(user.avatar_url.clone())
        .color(colors::GREEN)
        .field(
            "Member Count",
            messages::welcome_member_count(overview.member_count),
            false,
        )
        .field("Account Created", messages::timestamp(user.created_at()), false)
        .footer(messages::user_id_footer(user.id))
        .timestamped();
    platform
        .send_message(channel, OutgoingMessage::embed(embed))
        .await?;
    Ok(true)
}

/// Posts a farewell embed to the same channel welcomes go to.
pub async fn farewell(
    platform: &dyn PlatformClient,
    guild: GuildId,
    user: &UserProfile,
) -> Result<bool, PlatformError> {
    let overview = platform.guild_overview(guild).await?;
    tracing::info!(user = %user.name, user_id = user.id, guild = %overview.name, "Member left");
    let Some(channel) = find_welcome_channel(&overview) else {
        return Ok(false);
    };

    let embed = Embed::new()
        .title(messages::FAREWELL_TITLE)
        .description(messages::farewell_description(&user.mention()))
        .thumbnail(user.avatar_url.clone())
        .color(colors::RED)
        .field(
            "Member Count",
            messages::farewell_member_count(overview.member_count),
            false,
        )
        .footer(messages::user_id_footer(user.id))
        .timestamped();
    platform
        .send_message(channel, OutgoingMessage::embed(embed))
        .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChannelRef;
    use crate::testing::{RecordingPlatform, user};

    fn channel(id: ChannelId, name: &str) -> ChannelRef {
        ChannelRef {
            id,
            name: name.to_string(),
        }
    }

    fn guild(channels: Vec<ChannelRef>, system: Option<ChannelId>) -> GuildOverview {
        GuildOverview {
            id: 1,
            name: "Rustaceans".into(),
            member_count: 12,
            text_channels: channels,
            system_channel: system,
            ..GuildOverview::default()
        }
    }

    #[test]
    fn welcome_channel_preference_order() {
        let all = guild(
            vec![channel(1, "general"), channel(2, "Greetings")],
            Some(3),
        );
        assert_eq!(find_welcome_channel(&all), Some(2));

        let system = guild(vec![channel(1, "general")], Some(3));
        assert_eq!(find_welcome_channel(&system), Some(3));

        let fallback = guild(vec![channel(4, "random"), channel(5, "CHAT")], None);
        assert_eq!(find_welcome_channel(&fallback), Some(5));

        assert_eq!(find_welcome_channel(&guild(vec![channel(6, "memes")], None)), None);
    }

    #[tokio::test]
    async fn welcome_posts_embed_to_selected_channel() {
        let platform =
            RecordingPlatform::new().with_guild(guild(vec![channel(9, "welcome")], None));
        assert!(welcome(&platform, 1, &user(5, "carol")).await.unwrap());

        let sent = platform.sent().await;
        assert_eq!(sent.len(), 1);
        let (target, message) = &sent[0];
        assert_eq!(*target, 9);
        let embed = message.embed.as_ref().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Welcome to Rustaceans!"));
        assert_eq!(embed.fields[0].value, "You are member #12");
    }

    #[tokio::test]
    async fn farewell_without_channel_sends_nothing() {
        let platform = RecordingPlatform::new().with_guild(guild(Vec::new(), None));
        assert!(!farewell(&platform, 1, &user(5, "carol")).await.unwrap());
        assert!(platform.sent().await.is_empty());
    }
}
