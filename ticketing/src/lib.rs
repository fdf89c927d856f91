//! Ticket Waiting List - admission control for a fixed supply of tickets
//!
//! Sells a fixed number of tickets per event without ever overselling. When
//! nothing is free, requesters queue in FIFO order; when capacity frees up
//! (an offer lapses, is released, or is bought and capacity remains) the
//! oldest waiting requester is promoted to a time-boxed purchase offer.
//!
//! # Architecture
//!
//! ```text
//!          join / purchase / release / promote           expiry callback
//!                       │                                      ▲
//!                       ▼                                      │
//!               ┌───────────────┐   ScheduleAt effect  ┌───────────────┐
//!               │ WaitlistStore │ ───────────────────► │TokioScheduler │
//!               │ (shard/event) │ ◄─────────────────── │  + drive loop │
//!               └───────────────┘     ExpireOffer      └───────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐     ┌───────────────┐
//!               │WaitlistReducer│ ──► │ EventDirectory│ (capacity, cancelled)
//!               └───────────────┘     └───────────────┘
//!                       │
//!        availability · promotion · rank over the EventLedger
//! ```
//!
//! # Capacity invariant
//!
//! ```text
//! purchased_count + active_offers <= total_tickets
//! ```
//!
//! Every state-changing action runs under its event's write lock, reads
//! availability and writes in the same step, so two concurrent joiners can
//! never both take the last ticket.
//!
//! # Usage
//!
//! ```ignore
//! let app = WaitlistApp::start(Config::from_env());
//! let event_id = app.catalog().create_event(100)?;
//! let receipt = app.service().join_waiting_list(event_id, UserId::new("alice")).await?;
//! ```

#![forbid(unsafe_code)]

pub mod app;
pub mod availability;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod promotion;
pub mod rank;
pub mod reducer;
pub mod service;
pub mod types;

pub use app::WaitlistApp;
pub use config::Config;
pub use directory::{EventDirectory, InMemoryEventCatalog};
pub use error::{ErrorKind, WaitlistError};
pub use reducer::{OfferPolicy, WaitlistAction, WaitlistEnvironment, WaitlistOutcome, WaitlistReducer};
pub use service::{WaitlistService, WaitlistStore};
