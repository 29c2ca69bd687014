//! # Task Supervisor
//!
//! Owns every background task the bot launches (poll timers, the gateway loop).
//! All tasks are children of one root cancellation scope, so shutdown can cancel
//! the whole tree at once. A failing or panicking task is logged under its name
//! and never takes its siblings down.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("supervisor is shutting down; task `{0}` was rejected")]
    ShuttingDown(String),
}

/// How a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every task finished within the timeout.
    Drained,
    /// The timeout elapsed; this many tasks were force-aborted.
    Forced { remaining: usize },
    /// Shutdown had already run.
    AlreadyStopped,
}

pub struct Supervisor {
    root: CancellationToken,
    /// `None` once shutdown has started.
    tasks: Mutex<Option<JoinSet<()>>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Starts `work` as a child of the root scope. Must be called from within a tokio runtime.
    pub fn launch<F>(&self, name: impl Into<String>, work: F) -> Result<(), LaunchError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tasks) = guard.as_mut() else {
            warn!(task = %name, "rejecting task launched after shutdown");
            return Err(LaunchError::ShuttingDown(name));
        };

        // Reap finished children so the set only tracks live work.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(supervise(name, self.root.child_token(), work));
        Ok(())
    }

    /// Number of tasks that have not finished yet.
    pub fn active_count(&self) -> usize {
        let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(tasks) => {
                while tasks.try_join_next().is_some() {}
                tasks.len()
            }
            None => 0,
        }
    }

    /// Cancels the whole task tree and waits up to `timeout` for it to wind down.
    /// Tasks still running afterwards are aborted; this never blocks past the timeout.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        info!("Shutting down supervised tasks...");
        self.root.cancel();

        let taken = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut tasks) = taken else {
            return ShutdownOutcome::AlreadyStopped;
        };

        let drained = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => {
                info!("All supervised tasks shut down successfully");
                ShutdownOutcome::Drained
            }
            Err(_) => {
                let remaining = tasks.len();
                warn!(
                    remaining,
                    timeout_ms = timeout.as_millis() as u64,
                    "Supervised task shutdown timed out; aborting the rest"
                );
                tasks.abort_all();
                // Dropping the set detaches anything that cannot be interrupted.
                drop(tasks);
                ShutdownOutcome::Forced { remaining }
            }
        }
    }
}

async fn supervise<F>(name: String, token: CancellationToken, work: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    debug!(task = %name, "Starting supervised task");
    tokio::select! {
        _ = token.cancelled() => {
            debug!(task = %name, "Supervised task was cancelled");
        }
        outcome = AssertUnwindSafe(work).catch_unwind() => match outcome {
            Ok(Ok(())) => debug!(task = %name, "Supervised task completed"),
            Ok(Err(e)) => error!(task = %name, error = ?e, "Error in supervised task"),
            Err(panic) => error!(
                task = %name,
                panic = %panic_message(panic.as_ref()),
                "Supervised task panicked"
            ),
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn failing_and_panicking_tasks_do_not_affect_siblings() {
        let supervisor = Supervisor::new();
        let (tx, rx) = oneshot::channel();

        supervisor
            .launch("fails", async { Err(anyhow::anyhow!("boom")) })
            .unwrap();
        supervisor
            .launch("panics", async { panic!("handler exploded") })
            .unwrap();
        supervisor
            .launch("healthy", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let _ = tx.send(42);
                Ok(())
            })
            .unwrap();

        let value = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("healthy task should finish")
            .expect("sender kept alive");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn shutdown_is_bounded_by_timeout() {
        let supervisor = Supervisor::new();
        supervisor
            .launch("forever", std::future::pending::<anyhow::Result<()>>())
            .unwrap();
        supervisor
            .launch("long-sleep", async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .unwrap();

        let started = Instant::now();
        let outcome = supervisor.shutdown(Duration::from_millis(200)).await;
        assert!(started.elapsed() < Duration::from_millis(200) + Duration::from_millis(500));
        assert_ne!(outcome, ShutdownOutcome::AlreadyStopped);
    }

    #[tokio::test]
    async fn cancellation_stops_pending_timers() {
        let supervisor = Supervisor::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        supervisor
            .launch("timer", async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert_eq!(
            supervisor.shutdown(Duration::from_secs(1)).await,
            ShutdownOutcome::Drained
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn launch_after_shutdown_is_rejected() {
        let supervisor = Supervisor::new();
        supervisor.shutdown(Duration::from_millis(10)).await;
        let err = supervisor.launch("late", async { Ok(()) }).unwrap_err();
        assert_eq!(err, LaunchError::ShuttingDown("late".to_string()));
        assert_eq!(
            supervisor.shutdown(Duration::from_millis(10)).await,
            ShutdownOutcome::AlreadyStopped
        );
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped() {
        let supervisor = Supervisor::new();
        supervisor.launch("quick", async { Ok(()) }).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(supervisor.active_count(), 0);
    }
}
