//! # Waitlist Runtime
//!
//! Runtime for the ticket waiting list: the sharded [`Store`] that runs
//! reducers transactionally and executes the effects they return.
//!
//! ## Core Components
//!
//! - **Store**: one lock-guarded state per shard key; every action runs as a
//!   serializable transaction against its shard
//! - **Effect execution**: `Effect::ScheduleAt` is handed to the injected
//!   [`Scheduler`] after the transaction commits
//! - **Scheduler driver**: [`scheduler::drive`] feeds due actions back into the
//!   store, retrying transient failures
//!
//! ## Example
//!
//! ```ignore
//! use waitlist_runtime::Store;
//!
//! let store = Store::new(reducer, environment, scheduler);
//!
//! // Runs under the shard's write lock
//! let outcome = store.send(action).await?;
//!
//! // Runs under the shard's read lock
//! let count = store.read(&key, |state, _env| state.len()).await;
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;
use waitlist_core::{
    action::Sharded,
    effect::Effect,
    environment::Scheduler,
    reducer::Reducer,
    SmallVec,
};

/// Retry logic with exponential backoff
pub mod retry;

/// Timer-backed scheduler and the loop that dispatches due actions
pub mod scheduler;

/// Shard key of a reducer's actions
pub type ShardKey<R> = <<R as Reducer>::Action as Sharded>::Key;

type Shard<S> = Arc<RwLock<S>>;

/// The Store - runtime coordinator for a reducer
///
/// State is partitioned by the actions' shard key. Each shard is guarded by
/// its own `RwLock`:
///
/// - [`Store::send`] holds the shard's write lock for the whole reduce step,
///   so actions on one shard are linearizable
/// - [`Store::read`] holds the read lock, so reads never observe a
///   half-applied action
/// - shards never wait on each other
///
/// Effects are executed only after the reduce step returned `Ok`; a rejected
/// action produces no effects.
pub struct Store<R>
where
    R: Reducer,
    R::Action: Sharded,
{
    shards: RwLock<HashMap<ShardKey<R>, Shard<R::State>>>,
    reducer: R,
    environment: R::Environment,
    scheduler: Arc<dyn Scheduler<R::Action>>,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync,
    R::Action: Sharded + Send,
    R::State: Default + Send + Sync,
    R::Environment: Send + Sync,
    R::Error: Display,
{
    /// Create a new store with no shards.
    ///
    /// Shards are created lazily, starting from `R::State::default()`, the
    /// first time an action targets them.
    #[must_use]
    pub fn new(
        reducer: R,
        environment: R::Environment,
        scheduler: Arc<dyn Scheduler<R::Action>>,
    ) -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
            reducer,
            environment,
            scheduler,
        }
    }

    /// Send an action to the store.
    ///
    /// The reducer runs under the write lock of the action's shard. On success
    /// the effects are executed and the reducer's output returned.
    ///
    /// # Errors
    ///
    /// Returns the reducer's error unchanged; the shard is left as it was.
    pub async fn send(&self, action: R::Action) -> Result<R::Output, R::Error> {
        let key = action.shard_key();
        let shard = self.shard(&key).await;

        let reduction = {
            let mut state = shard.write().await;
            match self.reducer.reduce(&mut state, action, &self.environment) {
                Ok(reduction) => reduction,
                Err(error) => {
                    metrics::counter!("store.actions.failed").increment(1);
                    tracing::debug!(shard = ?key, error = %error, "Action rejected");
                    return Err(error);
                }
            }
        };

        metrics::counter!("store.actions.dispatched").increment(1);
        self.execute_effects(reduction.effects);
        Ok(reduction.output)
    }

    /// Read one shard under its read lock.
    ///
    /// A shard that has never been written is read as `R::State::default()`
    /// without being created.
    pub async fn read<T, F>(&self, key: &ShardKey<R>, f: F) -> T
    where
        F: FnOnce(&R::State, &R::Environment) -> T,
    {
        let shard = self.shards.read().await.get(key).cloned();
        match shard {
            Some(shard) => {
                let state = shard.read().await;
                f(&state, &self.environment)
            }
            None => f(&R::State::default(), &self.environment),
        }
    }

    /// Read every shard, one at a time.
    ///
    /// Each shard is read consistently; the result as a whole is not a
    /// snapshot across shards.
    pub async fn read_all<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(&R::State, &R::Environment) -> T,
    {
        let shards: Vec<Shard<R::State>> = self.shards.read().await.values().cloned().collect();

        let mut results = Vec::with_capacity(shards.len());
        for shard in shards {
            let state = shard.read().await;
            results.push(f(&state, &self.environment));
        }
        results
    }

    async fn shard(&self, key: &ShardKey<R>) -> Shard<R::State> {
        if let Some(shard) = self.shards.read().await.get(key) {
            return Arc::clone(shard);
        }

        let mut shards = self.shards.write().await;
        Arc::clone(shards.entry(key.clone()).or_default())
    }

    fn execute_effects(&self, effects: SmallVec<[Effect<R::Action>; 4]>) {
        for effect in effects {
            match effect {
                Effect::ScheduleAt { at, action } => {
                    metrics::counter!("store.effects.executed", "type" => "schedule_at")
                        .increment(1);
                    tracing::trace!(%at, "Executing Effect::ScheduleAt");
                    self.scheduler.schedule_at(at, *action);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use thiserror::Error;
    use waitlist_core::reducer::Reduction;
    use waitlist_core::smallvec;
    use waitlist_testing::ManualScheduler;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum TallyAction {
        Add { shard: &'static str, amount: u32 },
        AddLater { shard: &'static str, amount: u32 },
    }

    impl Sharded for TallyAction {
        type Key = &'static str;

        fn shard_key(&self) -> Self::Key {
            match self {
                Self::Add { shard, .. } | Self::AddLater { shard, .. } => *shard,
            }
        }
    }

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("tally would exceed {limit}")]
    struct OverLimit {
        limit: u32,
    }

    struct TallyReducer {
        limit: u32,
    }

    impl Reducer for TallyReducer {
        type State = u32;
        type Action = TallyAction;
        type Environment = ();
        type Output = u32;
        type Error = OverLimit;

        fn reduce(
            &self,
            state: &mut u32,
            action: TallyAction,
            _env: &(),
        ) -> Result<Reduction<u32, TallyAction>, OverLimit> {
            match action {
                TallyAction::Add { amount, .. } => {
                    if *state + amount > self.limit {
                        return Err(OverLimit { limit: self.limit });
                    }
                    *state += amount;
                    Ok(Reduction::new(*state))
                }
                TallyAction::AddLater { shard, amount } => Ok(Reduction::with_effects(
                    *state,
                    smallvec![Effect::schedule_at(
                        Utc::now() + Duration::seconds(5),
                        TallyAction::Add { shard, amount },
                    )],
                )),
            }
        }
    }

    fn store(limit: u32) -> (Arc<Store<TallyReducer>>, Arc<ManualScheduler<TallyAction>>) {
        let scheduler = Arc::new(ManualScheduler::<TallyAction>::new());
        let store = Store::new(TallyReducer { limit }, (), scheduler.clone());
        (Arc::new(store), scheduler)
    }

    #[tokio::test]
    async fn test_shards_are_independent() {
        let (store, _) = store(10);

        store.send(TallyAction::Add { shard: "a", amount: 3 }).await.unwrap();
        store.send(TallyAction::Add { shard: "b", amount: 9 }).await.unwrap();

        assert_eq!(store.read(&"a", |s, _| *s).await, 3);
        assert_eq!(store.read(&"b", |s, _| *s).await, 9);
        assert_eq!(store.read(&"missing", |s, _| *s).await, 0);
    }

    #[tokio::test]
    async fn test_rejected_action_leaves_state() {
        let (store, _) = store(5);

        store.send(TallyAction::Add { shard: "a", amount: 4 }).await.unwrap();
        let error = store
            .send(TallyAction::Add { shard: "a", amount: 2 })
            .await
            .unwrap_err();

        assert_eq!(error, OverLimit { limit: 5 });
        assert_eq!(store.read(&"a", |s, _| *s).await, 4);
    }

    #[tokio::test]
    async fn test_schedule_effect_reaches_scheduler() {
        let (store, scheduler) = store(10);

        store
            .send(TallyAction::AddLater { shard: "a", amount: 2 })
            .await
            .unwrap();

        assert_eq!(store.read(&"a", |s, _| *s).await, 0);
        let due = scheduler.take_due(Utc::now() + Duration::seconds(10));
        assert_eq!(due, vec![TallyAction::Add { shard: "a", amount: 2 }]);
    }

    #[tokio::test]
    async fn test_concurrent_sends_on_one_shard_are_linearized() {
        let (store, _) = store(50);

        let sends = (0..100).map(|_| {
            let store = Arc::clone(&store);
            async move { store.send(TallyAction::Add { shard: "a", amount: 1 }).await }
        });
        let results = futures::future::join_all(sends).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 50);
        assert_eq!(store.read(&"a", |s, _| *s).await, 50);
    }

    #[tokio::test]
    async fn test_read_all_visits_every_shard() {
        let (store, _) = store(10);

        store.send(TallyAction::Add { shard: "a", amount: 1 }).await.unwrap();
        store.send(TallyAction::Add { shard: "b", amount: 2 }).await.unwrap();

        let mut totals = store.read_all(|s, _| *s).await;
        totals.sort_unstable();
        assert_eq!(totals, vec![1, 2]);
    }
}
