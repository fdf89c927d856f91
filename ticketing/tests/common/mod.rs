//! Shared harness for the integration tests: a service on a manual clock
//! whose expiry callbacks fire only when the test says so.

#![allow(dead_code)] // Not every test binary uses every helper
#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Duration;
use std::sync::Arc;
use ticket_waitlist::{
    InMemoryEventCatalog, OfferPolicy, WaitlistAction, WaitlistEnvironment, WaitlistReducer,
    WaitlistService, WaitlistStore,
    types::{Availability, EventId, UserId},
};
use waitlist_core::environment::Clock;
use waitlist_testing::{ManualClock, ManualScheduler, test_time};

pub struct Harness {
    pub service: WaitlistService,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler<WaitlistAction>>,
    pub catalog: Arc<InMemoryEventCatalog>,
}

impl Harness {
    /// Harness with the production 30 minute offer window
    pub fn new() -> Self {
        Self::with_policy(OfferPolicy::default())
    }

    pub fn with_policy(offers: OfferPolicy) -> Self {
        let clock = Arc::new(ManualClock::new(test_time()));
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let scheduler = Arc::new(ManualScheduler::<WaitlistAction>::new());
        let env = WaitlistEnvironment::new(clock.clone(), catalog.clone(), offers);
        let store = WaitlistStore::new(WaitlistReducer::new(), env, scheduler.clone());

        Self {
            service: WaitlistService::new(Arc::new(store)),
            clock,
            scheduler,
            catalog,
        }
    }

    pub fn event(&self, total_tickets: u32) -> EventId {
        self.catalog.create_event(total_tickets).unwrap()
    }

    /// Dispatch every scheduled action that is due, like the scheduler
    /// driver would. Returns how many fired.
    pub async fn fire_due(&self) -> usize {
        let due = self.scheduler.take_due(self.clock.now());
        let fired = due.len();
        for action in due {
            self.service.store().send(action).await.unwrap();
        }
        fired
    }

    /// Advance the clock, then fire what became due
    pub async fn advance_and_fire(&self, by: Duration) -> usize {
        self.clock.advance(by);
        self.fire_due().await
    }

    pub async fn availability(&self, event_id: EventId) -> Availability {
        self.service.availability(event_id).await.unwrap()
    }

    pub async fn rank(&self, event_id: EventId, user: &str) -> Option<u32> {
        self.service
            .position(event_id, &UserId::new(user))
            .await
            .map(|position| position.rank)
    }
}
