//! # Waitlist Testing
//!
//! Testing utilities for the ticket waiting list.
//!
//! This crate provides:
//! - [`ManualClock`]: a clock that only moves when the test says so
//! - [`ManualScheduler`]: a scheduler that records actions instead of
//!   sleeping, so timer callbacks fire exactly when the test fires them
//! - [`ReducerTest`]: a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use waitlist_testing::{ManualClock, ManualScheduler};
//!
//! let clock = Arc::new(ManualClock::new(test_time()));
//! let scheduler = Arc::new(ManualScheduler::new());
//!
//! // ... an offer is made, its expiry scheduled 30 minutes out ...
//!
//! clock.advance(chrono::Duration::minutes(31));
//! for action in scheduler.take_due(clock.now()) {
//!     store.send(action).await?;
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use waitlist_core::environment::{Clock, Scheduler};

pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

// A panicking test poisons the lock; later readers still want the data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{lock, Clock, DateTime, Duration, Mutex, Scheduler, Utc};

    /// Clock that stands still until advanced.
    ///
    /// # Example
    ///
    /// ```
    /// use waitlist_testing::mocks::{test_time, ManualClock};
    /// use waitlist_core::environment::Clock;
    ///
    /// let clock = ManualClock::new(test_time());
    /// assert_eq!(clock.now(), clock.now());
    ///
    /// clock.advance(chrono::Duration::minutes(5));
    /// assert_eq!(clock.now(), test_time() + chrono::Duration::minutes(5));
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = lock(&self.time);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *lock(&self.time) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *lock(&self.time)
        }
    }

    /// Scheduler that records what it is asked to schedule.
    ///
    /// Nothing fires on its own: tests call [`ManualScheduler::take_due`]
    /// with the simulated time and dispatch the returned actions themselves.
    #[derive(Debug)]
    pub struct ManualScheduler<A> {
        pending: Mutex<Vec<(DateTime<Utc>, A)>>,
    }

    impl<A> ManualScheduler<A> {
        /// Create an empty scheduler
        #[must_use]
        pub const fn new() -> Self {
            Self {
                pending: Mutex::new(Vec::new()),
            }
        }

        /// Number of actions not yet taken
        #[must_use]
        pub fn pending_len(&self) -> usize {
            lock(&self.pending).len()
        }

        /// Remove and return every action due at or before `now`, earliest first
        #[must_use]
        pub fn take_due(&self, now: DateTime<Utc>) -> Vec<A> {
            let mut pending = lock(&self.pending);
            let (mut due, later): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|(at, _)| *at <= now);
            *pending = later;

            due.sort_by_key(|(at, _)| *at);
            due.into_iter().map(|(_, action)| action).collect()
        }
    }

    impl<A: Clone> ManualScheduler<A> {
        /// Every pending action with its due time, earliest first
        #[must_use]
        pub fn pending(&self) -> Vec<(DateTime<Utc>, A)> {
            let mut pending = lock(&self.pending).clone();
            pending.sort_by_key(|(at, _)| *at);
            pending
        }
    }

    impl<A> Default for ManualScheduler<A> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<A: Send> Scheduler<A> for ManualScheduler<A> {
        fn schedule_at(&self, at: DateTime<Utc>, action: A) {
            lock(&self.pending).push((at, action));
        }
    }

    /// Fixed starting instant for deterministic tests (2025-06-01 18:00:00 UTC)
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_748_800_800, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

pub use mocks::{test_time, ManualClock, ManualScheduler};
