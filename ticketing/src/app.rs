//! Application bootstrap: wires the catalog, the store and the timer-backed
//! scheduler together and starts the loop that feeds due expiry callbacks
//! back into the store.

use crate::config::Config;
use crate::directory::InMemoryEventCatalog;
use crate::reducer::{WaitlistAction, WaitlistEnvironment, WaitlistReducer};
use crate::service::{WaitlistService, WaitlistStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use waitlist_core::environment::{Clock, SystemClock};
use waitlist_runtime::scheduler::{drive, TokioScheduler};

/// A running waiting-list application
pub struct WaitlistApp {
    config: Config,
    catalog: Arc<InMemoryEventCatalog>,
    service: WaitlistService,
    driver: JoinHandle<()>,
}

impl WaitlistApp {
    /// Start the application on the system clock.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Start the application on a custom clock.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let environment =
            WaitlistEnvironment::new(Arc::clone(&clock), catalog.clone(), config.offer_policy());

        let (scheduler, due) = TokioScheduler::<WaitlistAction>::new(clock);
        let store: Arc<WaitlistStore> = Arc::new(WaitlistStore::new(
            WaitlistReducer::new(),
            environment,
            Arc::new(scheduler),
        ));
        let driver = tokio::spawn(drive(Arc::clone(&store), due, config.retry_policy()));

        tracing::info!(
            offer_ttl_secs = config.offers.ttl_secs,
            max_retries = config.expiry_retry.max_retries,
            "Waitlist application started"
        );

        Self {
            config,
            catalog,
            service: WaitlistService::new(store),
            driver,
        }
    }

    /// Loaded configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Event catalog (create and cancel events)
    #[must_use]
    pub const fn catalog(&self) -> &Arc<InMemoryEventCatalog> {
        &self.catalog
    }

    /// Waiting-list operations
    #[must_use]
    pub const fn service(&self) -> &WaitlistService {
        &self.service
    }

    /// Stop dispatching expiry callbacks.
    ///
    /// Offers scheduled to expire later are not expired by this instance.
    pub async fn shutdown(self) {
        self.driver.abort();
        if let Err(error) = self.driver.await {
            if !error.is_cancelled() {
                tracing::error!(%error, "Scheduler driver failed");
            }
        }
        tracing::info!("Waitlist application stopped");
    }
}
