//! # Domain Types
//!
//! Platform-neutral identifiers and records passed between the router, the command
//! handlers and the platform adapter.

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub type UserId = u64;
pub type ChannelId = u64;
pub type MessageId = u64;
pub type GuildId = u64;
pub type RoleId = u64;

/// Milliseconds between the Unix epoch and the platform's snowflake epoch (2015-01-01).
const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake identifier.
pub fn snowflake_created_at(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22) as i64 + SNOWFLAKE_EPOCH_MS;
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Identifies a message that can later be edited or reacted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageHandle {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

/// A user as seen in an event or a resolved command option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub global_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bot: bool,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.name)
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        snowflake_created_at(self.id)
    }
}

/// A role referenced by a command option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

/// Guild membership of a user, including what is needed for hierarchy checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user: UserProfile,
    pub nick: Option<String>,
    pub roles: Vec<RoleRef>,
    pub top_role_position: u16,
    pub is_owner: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub permissions: Permissions,
}

impl Member {
    pub fn effective_name(&self) -> &str {
        self.nick
            .as_deref()
            .unwrap_or_else(|| self.user.display_name())
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.iter().any(|r| r.id == role)
    }

    /// Whether this member may act on `target` under the role hierarchy.
    /// The owner outranks everyone; nobody outranks the owner; otherwise the
    /// highest role must be strictly higher.
    pub fn can_interact(&self, target: &Member) -> bool {
        if self.is_owner {
            return true;
        }
        if target.is_owner {
            return false;
        }
        self.top_role_position > target.top_role_position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    KickMembers,
    BanMembers,
    ModerateMembers,
    ManageRoles,
    ManageMessages,
    MentionEveryone,
}

impl Permission {
    pub fn label(&self) -> &'static str {
        match self {
            Self::KickMembers => "Kick Members",
            Self::BanMembers => "Ban Members",
            Self::ModerateMembers => "Moderate Members",
            Self::ManageRoles => "Manage Roles",
            Self::ManageMessages => "Manage Messages",
            Self::MentionEveryone => "Mention Everyone",
        }
    }
}

/// Capabilities resolved for a member in the channel an event came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub administrator: bool,
    pub kick_members: bool,
    pub ban_members: bool,
    pub moderate_members: bool,
    pub manage_roles: bool,
    pub manage_messages: bool,
    pub mention_everyone: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            administrator: true,
            ..Self::default()
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        if self.administrator {
            return true;
        }
        match permission {
            Permission::KickMembers => self.kick_members,
            Permission::BanMembers => self.ban_members,
            Permission::ModerateMembers => self.moderate_members,
            Permission::ManageRoles => self.manage_roles,
            Permission::ManageMessages => self.manage_messages,
            Permission::MentionEveryone => self.mention_everyone,
        }
    }
}

static CUSTOM_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(a?):(\w+):(\d+)>$").expect("valid custom emoji regex"));

/// An emoji decided once, when it is first seen, rather than sniffed per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emoji {
    Custom { name: String, id: u64, animated: bool },
    Unicode(String),
}

/// Identity used to match a reaction against a binding. Custom emoji are matched
/// by id (names can be reused across guilds), unicode emoji by their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmojiKey {
    Custom(u64),
    Unicode(String),
}

impl Emoji {
    /// Parses user input: `<:name:id>` / `<a:name:id>` for custom emoji, anything
    /// else non-blank as unicode. Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(caps) = CUSTOM_EMOJI.captures(input) {
            let id = caps.get(3)?.as_str().parse().ok()?;
            return Some(Self::Custom {
                animated: caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
                name: caps.get(2)?.as_str().to_string(),
                id,
            });
        }
        if input.starts_with('<') || input.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self::Unicode(input.to_string()))
    }

    pub fn key(&self) -> EmojiKey {
        match self {
            Self::Custom { id, .. } => EmojiKey::Custom(*id),
            Self::Unicode(text) => EmojiKey::Unicode(text.clone()),
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom {
                name,
                id,
                animated: true,
            } => write!(f, "<a:{name}:{id}>"),
            Self::Custom { name, id, .. } => write!(f, "<:{name}:{id}>"),
            Self::Unicode(text) => f.write_str(text),
        }
    }
}

/// Minimal view of a past message, used by purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: MessageId,
    pub author_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// Guild statistics shown by `serverinfo` and used to pick the welcome channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildOverview {
    pub id: GuildId,
    pub name: String,
    pub owner_name: Option<String>,
    pub icon_url: Option<String>,
    pub member_count: u64,
    pub online_count: u64,
    pub text_channels: Vec<ChannelRef>,
    pub voice_channels: usize,
    pub categories: usize,
    pub system_channel: Option<ChannelId>,
    pub role_count: usize,
    pub emoji_count: usize,
    pub boost_tier: u8,
    pub boost_count: u64,
    pub features: Vec<String>,
    pub verification_level: String,
}

impl GuildOverview {
    pub fn created_at(&self) -> DateTime<Utc> {
        snowflake_created_at(self.id)
    }
}
