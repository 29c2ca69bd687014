//! # Slash Commands
//!
//! Structured commands registered with Discord at startup.
//! Each one implements [`SlashCommand`](crate::application::interactions::SlashCommand).

pub mod echo;
pub mod moderation;
pub mod ping;
pub mod poll;
pub mod reaction_role;
pub mod serverinfo;
pub mod userinfo;

pub use echo::EchoSlashCommand;
pub use moderation::ModerationCommand;
pub use ping::PingSlashCommand;
pub use poll::PollCommand;
pub use reaction_role::ReactionRoleCommand;
pub use serverinfo::ServerInfoCommand;
pub use userinfo::UserInfoCommand;
