//! Timer-backed [`Scheduler`] and the driver that dispatches due actions.
//!
//! ```text
//! reducer ── Effect::ScheduleAt ──► TokioScheduler ── sleep ──► DueActions
//!                                                                   │
//!   Store::send ◄── retry_with_predicate ◄──────── drive ◄──────────┘
//! ```
//!
//! The scheduler only owns sleeping tasks; the decision whether a due action
//! still matters belongs to the reducer, which treats stale callbacks as
//! no-ops.

use crate::retry::{retry_with_predicate, RetryPolicy};
use crate::Store;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use waitlist_core::{
    action::Sharded,
    environment::{Clock, Scheduler},
    error::Retryable,
    reducer::Reducer,
};

/// Scheduler that sleeps on the Tokio timer and hands due actions to a
/// [`DueActions`] channel.
pub struct TokioScheduler<A> {
    sender: mpsc::UnboundedSender<A>,
    clock: Arc<dyn Clock>,
}

impl<A> TokioScheduler<A> {
    /// Create a scheduler and the receiving end its due actions arrive on.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> (Self, DueActions<A>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, clock }, DueActions { receiver })
    }
}

impl<A: Send + 'static> Scheduler<A> for TokioScheduler<A> {
    fn schedule_at(&self, at: DateTime<Utc>, action: A) {
        // Negative means already due
        let delay = (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(%at, "No Tokio runtime available, scheduled action dropped");
            return;
        };

        let sender = self.sender.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(action).is_err() {
                tracing::warn!(%at, "Scheduler driver stopped, due action dropped");
            }
        });
    }
}

/// Receiving end of a [`TokioScheduler`].
pub struct DueActions<A> {
    receiver: mpsc::UnboundedReceiver<A>,
}

impl<A> DueActions<A> {
    /// Wait for the next due action; `None` once every scheduler handle is gone.
    pub async fn recv(&mut self) -> Option<A> {
        self.receiver.recv().await
    }
}

/// Dispatch a due action, retrying while its failure is transient.
///
/// # Errors
///
/// Returns the reducer's error if it is permanent or retries are exhausted.
pub async fn dispatch_scheduled<R>(
    store: &Store<R>,
    action: R::Action,
    policy: RetryPolicy,
) -> Result<R::Output, R::Error>
where
    R: Reducer + Send + Sync,
    R::Action: Sharded + Clone + Send,
    R::State: Default + Send + Sync,
    R::Environment: Send + Sync,
    R::Error: Display + Retryable,
{
    // The closure owns the action, so only `Send` is required of it
    retry_with_predicate(
        policy,
        move || store.send(action.clone()),
        Retryable::is_retryable,
    )
    .await
}

/// Drive due actions into `store` until the scheduler side is dropped.
///
/// Each due action is dispatched on its own task so a retrying action for one
/// shard never delays another.
pub async fn drive<R>(store: Arc<Store<R>>, mut due: DueActions<R::Action>, policy: RetryPolicy)
where
    R: Reducer + Send + Sync + 'static,
    R::Action: Sharded + Clone + Send + std::fmt::Debug + 'static,
    R::State: Default + Send + Sync + 'static,
    R::Environment: Send + Sync + 'static,
    R::Output: Send + 'static,
    R::Error: Display + Retryable + Send + 'static,
{
    while let Some(action) = due.recv().await {
        metrics::counter!("store.scheduled.due").increment(1);
        let store = Arc::clone(&store);
        let policy = policy.clone();

        tokio::spawn(async move {
            let description = format!("{action:?}");
            if let Err(error) = dispatch_scheduled(&store, action, policy).await {
                metrics::counter!("store.scheduled.failed").increment(1);
                tracing::error!(action = %description, error = %error, "Scheduled action failed");
            }
        });
    }

    tracing::info!("Scheduler closed, driver stopping");
}
