//! # /poll
//!
//! Posts a poll with one button per option and schedules its end.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::application::interactions::{InteractionContext, OptionKind, OptionSpec, SlashCommand};
use crate::application::polls::{MAX_OPTIONS, MIN_OPTIONS, PollManager, vote_buttons};
use crate::domain::error::BotError;
use crate::domain::message::{Embed, OutgoingMessage, colors};
use crate::strings::messages;

const ORDINALS: [&str; MAX_OPTIONS] = ["First", "Second", "Third", "Fourth", "Fifth"];

pub struct PollCommand {
    polls: Arc<PollManager>,
    default_minutes: u64,
}

impl PollCommand {
    pub fn new(polls: Arc<PollManager>, default_minutes: u64) -> Self {
        Self {
            polls,
            default_minutes,
        }
    }

    fn duration_minutes(&self, ctx: &InteractionContext) -> Result<u64, BotError> {
        match ctx.option_int("duration") {
            None => Ok(self.default_minutes),
            Some(minutes) if minutes >= 1 => Ok(minutes as u64),
            Some(minutes) => Err(BotError::invalid_input_with(
                messages::POLL_DURATION_INVALID,
                format!("duration {minutes} is below one minute"),
            )),
        }
    }
}

fn collect_options(ctx: &InteractionContext) -> Result<Vec<String>, BotError> {
    let mut options = Vec::with_capacity(MAX_OPTIONS);
    for position in 1..=MAX_OPTIONS {
        let name = format!("option{position}");
        let value = if position <= MIN_OPTIONS {
            Some(ctx.required_str(&name)?)
        } else {
            ctx.option_str(&name)
        };
        if let Some(value) = value {
            options.push(value.to_string());
        }
    }
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(BotError::invalid_input_with(
            messages::poll_option_count(MIN_OPTIONS, MAX_OPTIONS),
            format!("got {} options", options.len()),
        ));
    }
    Ok(options)
}

#[async_trait]
impl SlashCommand for PollCommand {
    fn name(&self) -> &str {
        "poll"
    }

    fn description(&self) -> &str {
        "Create a poll with up to 5 options"
    }

    fn options(&self) -> Vec<OptionSpec> {
        let mut specs = vec![OptionSpec::required(
            "question",
            "The poll question",
            OptionKind::String,
        )];
        for (index, ordinal) in ORDINALS.iter().enumerate() {
            let position = index + 1;
            let name = format!("option{position}");
            specs.push(if position <= MIN_OPTIONS {
                OptionSpec::required(name, format!("{ordinal} option"), OptionKind::String)
            } else {
                OptionSpec::optional(name, format!("{ordinal} option (optional)"), OptionKind::String)
            });
        }
        specs.push(OptionSpec::optional(
            "duration",
            format!(
                "Poll duration in minutes (default: {})",
                self.default_minutes
            ),
            OptionKind::Integer,
        ));
        specs
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let question = ctx.required_str("question")?;
        let options = collect_options(ctx)?;
        let minutes = self.duration_minutes(ctx)?;

        let poll_id = self.polls.next_id();
        self.polls
            .create(&poll_id, question, options.clone())
            .await
            .map_err(|e| BotError::execution("poll", e))?;

        let embed = Embed::new()
            .title(messages::poll_title(question))
            .description(messages::poll_description(minutes))
            .color(colors::CYAN)
            .footer(messages::poll_footer(ctx.user.display_name()))
            .timestamped();
        let message = OutgoingMessage::embed(embed)
            .with_content(messages::poll_created(minutes))
            .with_buttons(vote_buttons(&poll_id, &options));

        let posted = async {
            ctx.reply(message).await?;
            ctx.original_message().await
        }
        .await;
        let handle = match posted {
            Ok(handle) => handle,
            Err(e) => {
                self.polls.discard(&poll_id).await;
                return Err(e);
            }
        };

        let after = Duration::from_secs(minutes.saturating_mul(60));
        if let Err(e) = self.polls.schedule_end(&poll_id, handle, after) {
            self.polls.discard(&poll_id).await;
            return Err(BotError::execution("poll", e));
        }

        tracing::info!(poll_id = %poll_id, minutes, user_id = ctx.user.id, "Poll started");
        Ok(())
    }
}
