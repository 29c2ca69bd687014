//! # Help Text
//!
//! Wording for the text `help` command.

pub const TITLE: &str = "Bot Commands";
pub const UNKNOWN_TITLE: &str = "Unknown Command";

pub const FIELD_COMMAND: &str = "Command";
pub const FIELD_DESCRIPTION: &str = "Description";
pub const FIELD_USAGE: &str = "Usage";

pub fn footer(prefix: &str) -> String {
    format!("Type {prefix}help [command] for detailed usage information")
}

pub fn unknown_command(name: &str) -> String {
    format!("The command `{name}` does not exist.")
}
