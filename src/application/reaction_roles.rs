//! # Reaction Roles
//!
//! Bindings from (message, emoji) to a role, and the add/remove handling that
//! grants or revokes the role when members react. Bindings live in memory only.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::error::PlatformError;
use crate::domain::traits::PlatformClient;
use crate::domain::types::{Emoji, EmojiKey, GuildId, MessageId, RoleId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// A reaction event as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild: Option<GuildId>,
    pub message: MessageId,
    pub user: UserId,
    pub user_is_bot: bool,
    pub emoji: Emoji,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    Granted(RoleId),
    Revoked(RoleId),
    /// Bound, but the member already was in the requested state.
    Unchanged(RoleId),
    /// Not a bound reaction, a bot, or the member is gone.
    Ignored,
}

#[derive(Default)]
pub struct ReactionRoleStore {
    bindings: RwLock<HashMap<MessageId, HashMap<EmojiKey, RoleId>>>,
}

impl ReactionRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bind(&self, message: MessageId, emoji: &Emoji, role: RoleId) {
        self.bindings
            .write()
            .await
            .entry(message)
            .or_default()
            .insert(emoji.key(), role);
        tracing::info!(message_id = message, emoji = %emoji, role_id = role, "Registered reaction role");
    }

    pub async fn role_for(&self, message: MessageId, emoji: &Emoji) -> Option<RoleId> {
        self.bindings
            .read()
            .await
            .get(&message)
            .and_then(|roles| roles.get(&emoji.key()))
            .copied()
    }

    /// Grants or revokes the bound role for a reaction event.
    pub async fn apply(
        &self,
        platform: &dyn PlatformClient,
        event: &ReactionEvent,
        change: ReactionChange,
    ) -> Result<RoleOutcome, PlatformError> {
        if event.user_is_bot {
            return Ok(RoleOutcome::Ignored);
        }
        let Some(guild) = event.guild else {
            return Ok(RoleOutcome::Ignored);
        };
        let Some(role) = self.role_for(event.message, &event.emoji).await else {
            return Ok(RoleOutcome::Ignored);
        };
        let Some(member) = platform.retrieve_member(guild, event.user).await? else {
            return Ok(RoleOutcome::Ignored);
        };

        let outcome = match (change, member.has_role(role)) {
            (ReactionChange::Added, false) => {
                platform.assign_role(guild, event.user, role).await?;
                RoleOutcome::Granted(role)
            }
            (ReactionChange::Removed, true) => {
                platform.remove_role(guild, event.user, role).await?;
                RoleOutcome::Revoked(role)
            }
            _ => RoleOutcome::Unchanged(role),
        };

        match outcome {
            RoleOutcome::Granted(_) => {
                tracing::info!(role_id = role, member = member.effective_name(), "Added reaction role")
            }
            RoleOutcome::Revoked(_) => {
                tracing::info!(role_id = role, member = member.effective_name(), "Removed reaction role")
            }
            _ => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PlatformCall, RecordingPlatform, member};

    const GUILD: GuildId = 1;
    const MESSAGE: MessageId = 50;
    const ROLE: RoleId = 77;

    fn event(emoji: Emoji) -> ReactionEvent {
        ReactionEvent {
            guild: Some(GUILD),
            message: MESSAGE,
            user: 5,
            user_is_bot: false,
            emoji,
        }
    }

    fn unicode(text: &str) -> Emoji {
        Emoji::Unicode(text.to_string())
    }

    #[tokio::test]
    async fn grants_then_revokes_bound_role() {
        let platform = RecordingPlatform::new().with_member(GUILD, member(5, "bob", 1));
        let store = ReactionRoleStore::new();
        store.bind(MESSAGE, &unicode("🎮"), ROLE).await;

        let added = store
            .apply(&platform, &event(unicode("🎮")), ReactionChange::Added)
            .await
            .unwrap();
        assert_eq!(added, RoleOutcome::Granted(ROLE));

        let again = store
            .apply(&platform, &event(unicode("🎮")), ReactionChange::Added)
            .await
            .unwrap();
        assert_eq!(again, RoleOutcome::Unchanged(ROLE));

        let removed = store
            .apply(&platform, &event(unicode("🎮")), ReactionChange::Removed)
            .await
            .unwrap();
        assert_eq!(removed, RoleOutcome::Revoked(ROLE));

        assert_eq!(
            platform.calls().await,
            vec![
                PlatformCall::AssignRole { guild: GUILD, user: 5, role: ROLE },
                PlatformCall::RemoveRole { guild: GUILD, user: 5, role: ROLE },
            ]
        );
    }

    #[tokio::test]
    async fn custom_emoji_match_by_id() {
        let platform = RecordingPlatform::new().with_member(GUILD, member(5, "bob", 1));
        let store = ReactionRoleStore::new();
        let bound = Emoji::parse("<:party:123>").unwrap();
        store.bind(MESSAGE, &bound, ROLE).await;

        // Same id, name changed since binding.
        let renamed = Emoji::Custom {
            name: "celebrate".into(),
            id: 123,
            animated: false,
        };
        let outcome = store
            .apply(&platform, &event(renamed), ReactionChange::Added)
            .await
            .unwrap();
        assert_eq!(outcome, RoleOutcome::Granted(ROLE));
    }

    #[tokio::test]
    async fn ignores_bots_and_unbound_reactions() {
        let platform = RecordingPlatform::new().with_member(GUILD, member(5, "bob", 1));
        let store = ReactionRoleStore::new();
        store.bind(MESSAGE, &unicode("🎮"), ROLE).await;

        let mut from_bot = event(unicode("🎮"));
        from_bot.user_is_bot = true;
        assert_eq!(
            store.apply(&platform, &from_bot, ReactionChange::Added).await.unwrap(),
            RoleOutcome::Ignored
        );
        assert_eq!(
            store
                .apply(&platform, &event(unicode("🎲")), ReactionChange::Added)
                .await
                .unwrap(),
            RoleOutcome::Ignored
        );
        assert!(platform.calls().await.is_empty());
    }
}
