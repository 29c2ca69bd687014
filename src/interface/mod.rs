//! # Interface Layer
//!
//! The commands users can invoke: prefix commands in `commands`, slash commands in `slash`.

pub mod commands;
pub mod slash;
