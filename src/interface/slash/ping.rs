//! # /ping
//!
//! Defers, then reports gateway heartbeat latency and the round trip of the defer call.

use async_trait::async_trait;
use std::time::Instant;

use crate::application::interactions::{InteractionContext, SlashCommand};
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::strings::messages;

pub struct PingSlashCommand;

#[async_trait]
impl SlashCommand for PingSlashCommand {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Checks the bot's response time"
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let started = Instant::now();
        ctx.defer(false).await?;
        let rest = started.elapsed().as_millis();
        let gateway = ctx
            .platform()
            .gateway_latency()
            .await
            .map(|latency| latency.as_millis());

        let embed = Embed::new()
            .title(messages::PONG_TITLE)
            .description(messages::PONG_DESCRIPTION)
            .field("Gateway Ping", messages::latency(gateway), true)
            .field("REST API Ping", messages::latency(Some(rest)), true)
            .color(colors::GREEN)
            .timestamped();
        ctx.follow_up(OutgoingMessage::embed(embed)).await?;
        Ok(())
    }
}
