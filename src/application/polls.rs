//! # Poll Sessions
//!
//! Live poll table, concurrent vote recording and timed expiry.
//!
//! A session is `Active` while it sits in the table and `Ended` once removed.
//! Removal happens only in [`PollManager::end`], under the table lock, so a
//! result is published at most once per poll. Each session has its own lock
//! and a `closed` flag set during removal: a vote that looked the session up
//! before it ended, but locks it afterwards, is reported as inactive.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::application::supervisor::{LaunchError, Supervisor};
use crate::domain::error::PlatformError;
use crate::domain::message::{Button, Embed, OutgoingMessage, colors};
use crate::domain::traits::PlatformClient;
use crate::domain::types::{MessageHandle, UserId};
use crate::strings::messages;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

/// Prefix of every poll id and of every poll button's custom id.
pub const POLL_ID_PREFIX: &str = "poll-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("poll `{0}` is already active")]
    AlreadyActive(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { option: String },
    /// The poll ended or never existed.
    Inactive,
    UnknownOption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Winner { option: String, votes: usize },
    Tie { options: Vec<String>, votes: usize },
    NoVotes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub question: String,
    /// Option text and vote count, in option order.
    pub tallies: Vec<(String, usize)>,
    pub verdict: Verdict,
}

struct PollSession {
    question: String,
    options: Vec<String>,
    voters: Vec<HashSet<UserId>>,
    closed: bool,
}

impl PollSession {
    fn tally(&self) -> PollResult {
        let tallies: Vec<(String, usize)> = self
            .options
            .iter()
            .zip(&self.voters)
            .map(|(option, voters)| (option.clone(), voters.len()))
            .collect();
        let verdict = verdict(&tallies);
        PollResult {
            question: self.question.clone(),
            tallies,
            verdict,
        }
    }
}

fn verdict(tallies: &[(String, usize)]) -> Verdict {
    let max = tallies.iter().map(|(_, votes)| *votes).max().unwrap_or(0);
    if max == 0 {
        return Verdict::NoVotes;
    }
    let mut leaders: Vec<String> = tallies
        .iter()
        .filter(|(_, votes)| *votes == max)
        .map(|(option, _)| option.clone())
        .collect();
    if leaders.len() == 1 {
        Verdict::Winner {
            option: leaders.remove(0),
            votes: max,
        }
    } else {
        Verdict::Tie {
            options: leaders,
            votes: max,
        }
    }
}

pub struct PollManager {
    sessions: Mutex<HashMap<String, Arc<Mutex<PollSession>>>>,
    counter: AtomicU64,
    platform: Arc<dyn PlatformClient>,
    supervisor: Arc<Supervisor>,
}

impl PollManager {
    pub fn new(platform: Arc<dyn PlatformClient>, supervisor: Arc<Supervisor>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            platform,
            supervisor,
        }
    }

    /// A process-unique poll id.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{POLL_ID_PREFIX}{n}")
    }

    /// Registers a new active poll. Option count is validated by the caller.
    pub async fn create(
        &self,
        id: &str,
        question: impl Into<String>,
        options: Vec<String>,
    ) -> Result<(), PollError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(id) {
            return Err(PollError::AlreadyActive(id.to_string()));
        }
        let session = PollSession {
            question: question.into(),
            voters: vec![HashSet::new(); options.len()],
            options,
            closed: false,
        };
        sessions.insert(id.to_string(), Arc::new(Mutex::new(session)));
        tracing::info!(poll_id = id, "Poll created");
        Ok(())
    }

    /// Drops a poll without publishing a result. Used when its message could not be posted.
    pub async fn discard(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id);
        match removed {
            Some(session) => {
                session.lock().await.closed = true;
                true
            }
            None => false,
        }
    }

    /// Ends the poll after `after` on a supervised timer. The timer cannot be
    /// cancelled individually; it is a no-op if the poll is already gone.
    pub fn schedule_end(
        self: &Arc<Self>,
        id: &str,
        handle: MessageHandle,
        after: Duration,
    ) -> Result<(), LaunchError> {
        let manager = Arc::clone(self);
        let poll_id = id.to_string();
        self.supervisor.launch(format!("poll-expiry:{id}"), async move {
            tokio::time::sleep(after).await;
            manager.end(&poll_id, &handle).await?;
            Ok(())
        })
    }

    /// Records `voter` for the 1-based `position`, replacing any earlier vote in this poll.
    pub async fn record_vote(&self, id: &str, position: usize, voter: UserId) -> VoteOutcome {
        let session = self.sessions.lock().await.get(id).cloned();
        let Some(session) = session else {
            return VoteOutcome::Inactive;
        };

        let mut session = session.lock().await;
        if session.closed {
            return VoteOutcome::Inactive;
        }
        if position == 0 || position > session.options.len() {
            return VoteOutcome::UnknownOption;
        }
        for voters in session.voters.iter_mut() {
            voters.remove(&voter);
        }
        session.voters[position - 1].insert(voter);
        tracing::debug!(poll_id = id, position, user_id = voter, "Vote recorded");
        VoteOutcome::Recorded {
            option: session.options[position - 1].clone(),
        }
    }

    /// Ends the poll and publishes the results by editing `handle`.
    /// Returns `Ok(None)` if the poll was not active. The poll is removed even if publishing fails.
    pub async fn end(
        &self,
        id: &str,
        handle: &MessageHandle,
    ) -> Result<Option<PollResult>, PlatformError> {
        let removed = self.sessions.lock().await.remove(id);
        let Some(session) = removed else {
            tracing::debug!(poll_id = id, "Poll already ended");
            return Ok(None);
        };

        let result = {
            let mut session = session.lock().await;
            session.closed = true;
            session.tally()
        };

        self.platform
            .edit_message(handle, results_message(&result))
            .await?;
        tracing::info!(poll_id = id, verdict = ?result.verdict, "Poll ended");
        Ok(Some(result))
    }

    #[cfg(test)]
    pub async fn is_active(&self, id: &str) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Splits a button custom id of the form `poll-N:position`.
pub fn parse_vote_id(custom_id: &str) -> Option<(&str, usize)> {
    let (poll_id, position) = custom_id.rsplit_once(':')?;
    if !poll_id.starts_with(POLL_ID_PREFIX) {
        return None;
    }
    Some((poll_id, position.parse().ok()?))
}

/// One button per option, labelled with its keycap marker.
pub fn vote_buttons(poll_id: &str, options: &[String]) -> Vec<Button> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| Button {
            custom_id: format!("{poll_id}:{}", index + 1),
            label: format!("{} {option}", messages::option_marker(index + 1)),
        })
        .collect()
}

/// The edit that replaces a finished poll: results embed, buttons removed.
pub fn results_message(result: &PollResult) -> OutgoingMessage {
    let mut embed = Embed::new()
        .title(messages::poll_results_title(&result.question))
        .description(messages::POLL_RESULTS_DESCRIPTION)
        .color(colors::GREEN)
        .timestamped();

    for (index, (option, votes)) in result.tallies.iter().enumerate() {
        embed = embed.field(
            format!("{} {option}", messages::option_marker(index + 1)),
            messages::poll_votes(*votes),
            false,
        );
    }

    let summary = match &result.verdict {
        Verdict::Winner { option, votes } => messages::poll_winner(option, *votes),
        Verdict::Tie { options, votes } => messages::poll_tie(options, *votes),
        Verdict::NoVotes => messages::POLL_NO_VOTES.to_string(),
    };
    embed = embed.field(messages::POLL_RESULTS_FIELD, summary, false);

    OutgoingMessage::embed(embed).with_buttons(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPlatform;

    fn manager() -> (Arc<PollManager>, Arc<RecordingPlatform>, Arc<Supervisor>) {
        let platform = Arc::new(RecordingPlatform::new());
        let supervisor = Arc::new(Supervisor::new());
        let manager = Arc::new(PollManager::new(platform.clone(), supervisor.clone()));
        (manager, platform, supervisor)
    }

    fn options(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    const HANDLE: MessageHandle = MessageHandle {
        channel_id: 10,
        message_id: 20,
    };

    #[tokio::test]
    async fn last_vote_wins() {
        let (polls, _, _) = manager();
        polls.create("poll-1", "Lunch?", options(&["A", "B", "C"])).await.unwrap();

        polls.record_vote("poll-1", 1, 7).await;
        polls.record_vote("poll-1", 3, 7).await;
        let outcome = polls.record_vote("poll-1", 2, 7).await;
        assert_eq!(outcome, VoteOutcome::Recorded { option: "B".into() });

        let result = polls.end("poll-1", &HANDLE).await.unwrap().unwrap();
        assert_eq!(
            result.tallies,
            vec![("A".into(), 0), ("B".into(), 1), ("C".into(), 0)]
        );
        assert_eq!(result.verdict, Verdict::Winner { option: "B".into(), votes: 1 });
    }

    #[tokio::test]
    async fn ending_twice_publishes_once() {
        let (polls, platform, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();

        assert!(polls.end("poll-1", &HANDLE).await.unwrap().is_some());
        assert!(polls.end("poll-1", &HANDLE).await.unwrap().is_none());
        assert_eq!(platform.edits().await.len(), 1);
        assert!(!polls.is_active("poll-1").await);
    }

    #[tokio::test]
    async fn tie_excludes_trailing_options() {
        let (polls, platform, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B", "C"])).await.unwrap();
        for (voter, position) in [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)] {
            polls.record_vote("poll-1", position, voter).await;
        }

        let result = polls.end("poll-1", &HANDLE).await.unwrap().unwrap();
        assert_eq!(
            result.verdict,
            Verdict::Tie {
                options: vec!["A".into(), "B".into()],
                votes: 2
            }
        );

        let (_, edit) = &platform.edits().await[0];
        let embed = edit.embed.as_ref().unwrap();
        let summary = embed.fields.last().unwrap();
        assert_eq!(summary.value, "Tie between: A, B with 2 votes each");
        assert!(edit.buttons.is_empty());
    }

    #[tokio::test]
    async fn no_votes_is_not_a_tie() {
        let (polls, _, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();
        let result = polls.end("poll-1", &HANDLE).await.unwrap().unwrap();
        assert_eq!(result.verdict, Verdict::NoVotes);
        let message = results_message(&result);
        assert_eq!(
            message.embed.unwrap().fields.last().unwrap().value,
            "No votes were cast"
        );
    }

    #[tokio::test]
    async fn votes_after_end_or_out_of_range_are_ignored() {
        let (polls, _, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();

        assert_eq!(polls.record_vote("poll-1", 0, 1).await, VoteOutcome::UnknownOption);
        assert_eq!(polls.record_vote("poll-1", 3, 1).await, VoteOutcome::UnknownOption);
        assert_eq!(polls.record_vote("poll-9", 1, 1).await, VoteOutcome::Inactive);

        polls.end("poll-1", &HANDLE).await.unwrap();
        assert_eq!(polls.record_vote("poll-1", 1, 1).await, VoteOutcome::Inactive);
    }

    #[tokio::test]
    async fn duplicate_live_id_is_rejected() {
        let (polls, _, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();
        assert_eq!(
            polls.create("poll-1", "Q2", options(&["C", "D"])).await,
            Err(PollError::AlreadyActive("poll-1".into()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_are_not_lost() {
        let (polls, _, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();

        let mut handles = Vec::new();
        for voter in 0..200u64 {
            let polls = polls.clone();
            handles.push(tokio::spawn(async move {
                polls.record_vote("poll-1", (voter % 2 + 1) as usize, voter).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let result = polls.end("poll-1", &HANDLE).await.unwrap().unwrap();
        let total: usize = result.tallies.iter().map(|(_, votes)| votes).sum();
        assert_eq!(total, 200);
    }

    #[tokio::test]
    async fn scheduled_end_fires_through_supervisor() {
        let (polls, platform, _) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();
        polls
            .schedule_end("poll-1", HANDLE, Duration::from_millis(20))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!polls.is_active("poll-1").await);
        assert_eq!(platform.edits().await.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_expiry() {
        let (polls, platform, supervisor) = manager();
        polls.create("poll-1", "Q", options(&["A", "B"])).await.unwrap();
        polls
            .schedule_end("poll-1", HANDLE, Duration::from_millis(50))
            .unwrap();

        supervisor.shutdown(Duration::from_millis(100)).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(polls.is_active("poll-1").await);
        assert!(platform.edits().await.is_empty());
    }

    #[test]
    fn parses_button_ids() {
        assert_eq!(parse_vote_id("poll-12:3"), Some(("poll-12", 3)));
        assert_eq!(parse_vote_id("poll-12:x"), None);
        assert_eq!(parse_vote_id("other:1"), None);
        assert_eq!(parse_vote_id("poll-12"), None);
    }

    #[test]
    fn ids_are_unique_and_buttons_encode_positions() {
        let (polls, _, _) = manager();
        assert_ne!(polls.next_id(), polls.next_id());

        let buttons = vote_buttons("poll-4", &options(&["Yes", "No"]));
        assert_eq!(buttons[0].custom_id, "poll-4:1");
        assert_eq!(buttons[1].label, "2️⃣ No");
    }
}
