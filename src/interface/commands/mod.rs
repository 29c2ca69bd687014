//! # Text Commands
//!
//! Prefix commands (`!ping`, `!echo`, `!help`).
//! Each one implements [`Command`](crate::application::commands::Command) and is registered in `main`.

pub mod echo;
pub mod help;
pub mod ping;

pub use echo::EchoCommand;
pub use help::HelpCommand;
pub use ping::PingCommand;
