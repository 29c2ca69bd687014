//! # Strings Module
//!
//! Centralizes user-facing strings and help text.
//! Keeps chat wording in one place so handlers only deal with behaviour.

pub mod help;
pub mod messages;
