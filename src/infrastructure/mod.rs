//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (`PlatformClient`, `InteractionResponder`)
//! and feeds gateway events into the router.

pub mod discord;
pub mod gateway;
