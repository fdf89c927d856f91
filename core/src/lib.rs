//! # Waitlist Core
//!
//! Core traits and types for the ticket waiting list.
//!
//! The waiting list is built as a functional core with an imperative shell:
//!
//! - **State**: the per-shard ledger a reducer operates on
//! - **Action**: every input to a reducer (client commands and scheduled callbacks alike)
//! - **Reducer**: `(State, Action, Environment) → Result<(Output, Effects), Error>`
//! - **Effect**: a description of a side effect, executed by the runtime after the
//!   reducer's transaction has committed
//! - **Environment**: injected dependencies (clock, scheduler, directories)
//!
//! ## Example
//!
//! ```ignore
//! use waitlist_core::{effect::Effect, reducer::{Reducer, Reduction}};
//!
//! impl Reducer for HoldReducer {
//!     type State = HoldLedger;
//!     type Action = HoldAction;
//!     type Environment = HoldEnvironment;
//!     type Output = HoldOutcome;
//!     type Error = HoldError;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut HoldLedger,
//!         action: HoldAction,
//!         env: &HoldEnvironment,
//!     ) -> Result<Reduction<HoldOutcome, HoldAction>, HoldError> {
//!         // Validate first, then mutate
//!         Ok(Reduction::new(HoldOutcome::Noop))
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Action module - routing information carried by actions
///
/// Every action names the shard (the unit of serialization) it must run in.
/// Actions with the same shard key are linearized by the runtime; actions for
/// different keys never contend.
pub mod action {
    use std::fmt::Debug;
    use std::hash::Hash;

    /// An action that belongs to exactly one shard of state.
    pub trait Sharded {
        /// Key identifying the shard
        type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

        /// Shard this action must be reduced against
        fn shard_key(&self) -> Self::Key;
    }
}

/// Reducer module - the core trait for business logic
///
/// Reducers are the only place state changes. A reducer runs inside the
/// shard's transaction: it either returns `Ok` with its output and effects,
/// or `Err` having left the state untouched.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Result of a successful reduce step.
    #[derive(Debug)]
    pub struct Reduction<Output, Action> {
        /// Value handed back to the caller of the action
        pub output: Output,
        /// Effects to execute once the transaction has committed
        pub effects: SmallVec<[Effect<Action>; 4]>,
    }

    impl<Output, Action> Reduction<Output, Action> {
        /// A reduction without effects
        #[must_use]
        pub fn new(output: Output) -> Self {
            Self {
                output,
                effects: SmallVec::new(),
            }
        }

        /// A reduction with the given effects
        #[must_use]
        pub const fn with_effects(
            output: Output,
            effects: SmallVec<[Effect<Action>; 4]>,
        ) -> Self {
            Self { output, effects }
        }
    }

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The shard state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Output`: What a successful action returns to its caller
    /// - `Error`: Why an action was rejected
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Value returned to the caller on success
        type Output;

        /// Rejection reason
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must validate before mutating: an `Err` return
        /// guarantees `state` is unchanged.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is rejected.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Reduction<Self::Output, Self::Action>, Self::Error>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned by reducers and executed by the runtime.
pub mod effect {
    use chrono::{DateTime, Utc};

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects feed back into the store
    #[derive(Clone, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// Dispatch `action` back into the store at wall-clock time `at`.
        ///
        /// There is no cancellation: a reducer receiving a stale scheduled
        /// action must treat it as a no-op.
        ScheduleAt {
            /// When the action becomes due
            at: DateTime<Utc>,
            /// Action to dispatch when due
            action: Box<Action>,
        },
    }

    impl<Action> Effect<Action> {
        /// Schedule `action` for `at`
        #[must_use]
        pub fn schedule_at(at: DateTime<Utc>, action: Action) -> Self {
            Self::ScheduleAt {
                at,
                action: Box::new(action),
            }
        }

        /// The scheduled action, if this effect carries one
        #[must_use]
        pub fn scheduled_action(&self) -> Option<(&DateTime<Utc>, &Action)> {
            match self {
                Self::ScheduleAt { at, action } => Some((at, action)),
            }
        }
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::ScheduleAt { at, action } => f
                    .debug_struct("Effect::ScheduleAt")
                    .field("at", at)
                    .field("action", action)
                    .finish(),
            }
        }
    }
}

/// Error module - classification shared by the runtime
pub mod error {
    /// Errors that know whether repeating the action may succeed.
    ///
    /// The runtime retries scheduled actions only while this returns `true`.
    pub trait Retryable {
        /// Whether the failure is transient
        fn is_retryable(&self) -> bool;
    }
}

/// Environment module - dependency injection traits
///
/// All external collaborators are abstracted behind traits and injected
/// via the reducer's environment or the store.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use waitlist_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// One-shot scheduling capability.
    ///
    /// The core never owns a timer: it hands the action to a scheduler,
    /// which dispatches it back into the store once `at` has passed.
    /// Delivery is at-least-once.
    pub trait Scheduler<Action>: Send + Sync {
        /// Arrange for `action` to be dispatched at `at`
        fn schedule_at(&self, at: DateTime<Utc>, action: Action);
    }
}
