//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes command registries and routing, polls, reaction roles and task supervision.

pub mod commands;
pub mod interactions;
pub mod logging;
pub mod membership;
pub mod polls;
pub mod reaction_roles;
pub mod registry;
pub mod router;
pub mod supervisor;
