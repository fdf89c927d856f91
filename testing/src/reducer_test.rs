//! Ergonomic testing utilities for reducers
//!
//! A fluent Given-When-Then harness for fallible reducers. A test states
//! whether it expects the action to succeed (`then_output`, `then_effects`)
//! or to be rejected (`then_error`); state assertions run either way, which
//! makes "a rejected action leaves the state untouched" a one-liner.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use waitlist_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type OutputAssertion<O> = Box<dyn FnOnce(&O)>;
type ErrorAssertion<E> = Box<dyn FnOnce(&E)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use waitlist_testing::ReducerTest;
///
/// ReducerTest::new(WaitlistReducer::new())
///     .with_env(test_environment())
///     .given_state(EventLedger::default())
///     .when_action(WaitlistAction::Join { event_id, user_id })
///     .then_output(|outcome| assert!(outcome.is_offer()))
///     .then_effects(|effects| assert_eq!(effects.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    action: Option<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    output_assertions: Vec<OutputAssertion<R::Output>>,
    error_assertions: Vec<ErrorAssertion<R::Error>>,
    effect_assertions: Vec<EffectAssertion<R::Action>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
    R::Output: std::fmt::Debug,
    R::Error: std::fmt::Debug,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            output_assertions: Vec::new(),
            error_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Assert on the state after the action, whatever its outcome (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Expect success and assert on the output (Then)
    #[must_use]
    pub fn then_output<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::Output) + 'static,
    {
        self.output_assertions.push(Box::new(assertion));
        self
    }

    /// Expect success and assert on the effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Expect rejection and assert on the error (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::Error) + 'static,
    {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if state, action or environment is missing, if the outcome
    /// contradicts the expectations, or if any assertion fails.
    #[allow(clippy::panic, clippy::expect_used)] // Test harness
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let action = self.action.expect("Action must be set with when_action()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        match self.reducer.reduce(&mut state, action, &env) {
            Ok(reduction) => {
                assert!(
                    self.error_assertions.is_empty(),
                    "Expected the action to be rejected, but it succeeded with {:?}",
                    reduction.output
                );
                for assertion in self.output_assertions {
                    assertion(&reduction.output);
                }
                for assertion in self.effect_assertions {
                    assertion(&reduction.effects);
                }
            }
            Err(error) => {
                assert!(
                    self.output_assertions.is_empty() && self.effect_assertions.is_empty(),
                    "Expected the action to succeed, but it was rejected with {error:?}"
                );
                for assertion in self.error_assertions {
                    assertion(&error);
                }
            }
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use waitlist_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty(),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Actions scheduled by the effects, in order
    #[must_use]
    pub fn scheduled_actions<A>(effects: &[Effect<A>]) -> Vec<&A> {
        effects
            .iter()
            .filter_map(|effect| effect.scheduled_action().map(|(_, action)| action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitlist_core::reducer::Reduction;
    use waitlist_core::smallvec;

    #[derive(Clone, Debug, PartialEq)]
    enum GateAction {
        Open,
        OpenLater,
    }

    struct GateReducer;

    impl Reducer for GateReducer {
        type State = bool;
        type Action = GateAction;
        type Environment = ();
        type Output = &'static str;
        type Error = &'static str;

        fn reduce(
            &self,
            state: &mut bool,
            action: GateAction,
            _env: &(),
        ) -> Result<Reduction<&'static str, GateAction>, &'static str> {
            if *state {
                return Err("already open");
            }
            match action {
                GateAction::Open => {
                    *state = true;
                    Ok(Reduction::new("opened"))
                }
                GateAction::OpenLater => Ok(Reduction::with_effects(
                    "scheduled",
                    smallvec![Effect::schedule_at(chrono::Utc::now(), GateAction::Open)],
                )),
            }
        }
    }

    #[test]
    fn test_success_path() {
        ReducerTest::new(GateReducer)
            .with_env(())
            .given_state(false)
            .when_action(GateAction::Open)
            .then_output(|output| assert_eq!(*output, "opened"))
            .then_effects(assertions::assert_no_effects)
            .then_state(|state| assert!(*state))
            .run();
    }

    #[test]
    fn test_rejection_path() {
        ReducerTest::new(GateReducer)
            .with_env(())
            .given_state(true)
            .when_action(GateAction::Open)
            .then_error(|error| assert_eq!(*error, "already open"))
            .then_state(|state| assert!(*state))
            .run();
    }

    #[test]
    fn test_scheduled_actions() {
        ReducerTest::new(GateReducer)
            .with_env(())
            .given_state(false)
            .when_action(GateAction::OpenLater)
            .then_effects(|effects| {
                assert_eq!(assertions::scheduled_actions(effects), vec![&GateAction::Open]);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected the action to succeed")]
    fn test_unexpected_rejection_panics() {
        ReducerTest::new(GateReducer)
            .with_env(())
            .given_state(true)
            .when_action(GateAction::Open)
            .then_output(|_| {})
            .run();
    }
}
