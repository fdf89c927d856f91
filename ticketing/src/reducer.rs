//! The waiting-list reducer.
//!
//! Every state change of an event's ledger goes through [`WaitlistReducer`],
//! one action at a time under the event's shard lock:
//!
//! ```text
//! Join ──► (promote older waiters) ──► Offered | Waiting
//!                                        │
//!                       ScheduleAt(expires_at, ExpireOffer)
//!                                        │
//! ExpireOffer / Release / Purchase ──► terminal status ──► promote
//! ```
//!
//! Each arm validates before it mutates, so a rejected action leaves the
//! ledger exactly as it found it.

use crate::availability::availability;
use crate::error::WaitlistError;
use crate::directory::{CatalogError, EventDirectory};
use crate::ledger::EventLedger;
use crate::metrics;
use crate::promotion::{offer_deadline, promote};
use crate::types::{
    EntryId, EntryStatus, EventCapacity, EventId, JoinReceipt, JoinStatus, JoinedAt, Money,
    Offer, Ticket, TicketId, TicketStatus, UserId, WaitingListEntry,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use waitlist_core::{
    action::Sharded,
    effect::Effect,
    environment::Clock,
    reducer::{Reducer, Reduction},
    SmallVec,
};

// ============================================================================
// Actions
// ============================================================================

/// Inputs to the waiting list: client commands and the scheduled expiry
/// callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitlistAction {
    /// Queue for a ticket, or take an offer straight away if one is free
    Join {
        /// Event to join
        event_id: EventId,
        /// Who joins
        user_id: UserId,
    },
    /// An offer's deadline passed (scheduled callback)
    ExpireOffer {
        /// Entry holding the offer
        entry_id: EntryId,
        /// Event of the entry
        event_id: EventId,
    },
    /// The holder gives an offer back
    Release {
        /// Event of the entry
        event_id: EventId,
        /// Entry holding the offer
        entry_id: EntryId,
    },
    /// Turn an offer into a ticket after the charge succeeded
    Purchase {
        /// Event of the entry
        event_id: EventId,
        /// Caller; must own the entry
        user_id: UserId,
        /// Entry holding the offer
        entry_id: EntryId,
        /// Reference of the confirmed charge
        payment_reference: String,
        /// Amount charged
        amount: Money,
    },
    /// Hand free capacity to waiting entries
    Promote {
        /// Event to promote in
        event_id: EventId,
    },
    /// Change how many tickets an event sells
    UpdateCapacity {
        /// Event to resize
        event_id: EventId,
        /// New ticket total
        total_tickets: u32,
    },
}

impl Sharded for WaitlistAction {
    type Key = EventId;

    fn shard_key(&self) -> EventId {
        match self {
            Self::Join { event_id, .. }
            | Self::ExpireOffer { event_id, .. }
            | Self::Release { event_id, .. }
            | Self::Purchase { event_id, .. }
            | Self::Promote { event_id }
            | Self::UpdateCapacity { event_id, .. } => *event_id,
        }
    }
}

/// What a successful action produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitlistOutcome {
    /// The joiner was offered a ticket or queued
    Joined {
        /// Receipt for the joiner
        receipt: JoinReceipt,
        /// Older entries promoted before the joiner was placed
        promoted: Vec<Offer>,
    },
    /// The offer lapsed and the entry expired
    Expired {
        /// Entry that expired
        entry_id: EntryId,
        /// Entries promoted into the freed capacity
        promoted: Vec<Offer>,
    },
    /// Stale expiry callback: the entry had already moved on
    ExpiryIgnored {
        /// Entry named by the callback
        entry_id: EntryId,
    },
    /// The holder released the offer
    Released {
        /// Entry released
        entry_id: EntryId,
        /// Entries promoted into the freed capacity
        promoted: Vec<Offer>,
    },
    /// A ticket was sold
    Purchased {
        /// The new ticket
        ticket: Ticket,
        /// Entries promoted afterwards
        promoted: Vec<Offer>,
    },
    /// Result of an explicit promotion run
    Promoted(Vec<Offer>),
    /// The event's ticket total changed
    CapacityUpdated {
        /// Capacity after the change
        capacity: EventCapacity,
        /// Entries promoted into added capacity
        promoted: Vec<Offer>,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Offer lifecycle settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfferPolicy {
    ttl: Duration,
}

/// Longest offer window, in seconds (one week)
pub const MAX_OFFER_TTL_SECS: i64 = 7 * 24 * 60 * 60;

impl OfferPolicy {
    /// Policy with the given offer window, clamped to
    /// [`MAX_OFFER_TTL_SECS`]
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(Duration::seconds(MAX_OFFER_TTL_SECS)),
        }
    }

    /// How long an offer stays open
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Message shown to a joiner who got an offer
    #[must_use]
    pub fn offer_message(&self) -> String {
        let minutes = self.ttl.num_minutes();
        let window = if minutes >= 1 {
            quantity(minutes, "minute")
        } else {
            quantity(self.ttl.num_seconds(), "second")
        };
        format!("Ticket offered - you have {window} to purchase")
    }
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}

fn quantity(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

const WAITING_MESSAGE: &str =
    "Added to waiting list - you'll be notified when a ticket becomes available";

/// Strictly increasing join counter shared by every shard.
///
/// Only its order matters; gaps are fine.
#[derive(Debug, Default)]
pub struct JoinSequence(AtomicU64);

impl JoinSequence {
    /// Start counting at 1
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Next sequence number
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Dependencies injected into the reducer
#[derive(Clone)]
pub struct WaitlistEnvironment {
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Event capacity lookups
    pub directory: Arc<dyn EventDirectory>,
    /// FIFO stamps for new entries
    pub sequence: Arc<JoinSequence>,
    /// Offer window
    pub offers: OfferPolicy,
}

impl WaitlistEnvironment {
    /// Environment with a fresh join counter
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        directory: Arc<dyn EventDirectory>,
        offers: OfferPolicy,
    ) -> Self {
        Self {
            clock,
            directory,
            sequence: Arc::new(JoinSequence::new()),
            offers,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for one event's waiting list
#[derive(Clone, Debug, Default)]
pub struct WaitlistReducer;

type WaitlistReduction = Reduction<WaitlistOutcome, WaitlistAction>;

impl WaitlistReducer {
    /// Creates a new `WaitlistReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Capacity of an event that must exist and be open
    fn open_event(
        env: &WaitlistEnvironment,
        event_id: EventId,
    ) -> Result<EventCapacity, WaitlistError> {
        let capacity = env
            .directory
            .lookup(&event_id)?
            .ok_or(WaitlistError::EventNotFound(event_id))?;
        if capacity.is_cancelled {
            return Err(WaitlistError::EventClosed(event_id));
        }
        Ok(capacity)
    }

    /// Capacity to promote into after capacity was freed.
    ///
    /// `None` when the event is gone or cancelled: the transition still
    /// happens, promotion is skipped.
    fn promotable_event(
        env: &WaitlistEnvironment,
        event_id: EventId,
    ) -> Result<Option<EventCapacity>, WaitlistError> {
        match env.directory.lookup(&event_id)? {
            None => {
                tracing::warn!(%event_id, "Event missing from directory, promotion skipped");
                Ok(None)
            }
            Some(capacity) if capacity.is_cancelled => {
                tracing::debug!(%event_id, "Event cancelled, promotion skipped");
                Ok(None)
            }
            Some(capacity) => Ok(Some(capacity)),
        }
    }

    /// Entry that must currently hold an offer
    fn offered_entry<'a>(
        ledger: &'a EventLedger,
        entry_id: &EntryId,
    ) -> Result<(&'a WaitingListEntry, DateTime<Utc>), WaitlistError> {
        let entry = ledger.entry(entry_id).ok_or(WaitlistError::EntryNotFound(*entry_id))?;
        match entry.status {
            EntryStatus::Offered { expires_at } => Ok((entry, expires_at)),
            status => Err(WaitlistError::InvalidState {
                entry_id: *entry_id,
                found: status.label(),
            }),
        }
    }

    fn promote_open(
        env: &WaitlistEnvironment,
        event_id: EventId,
        capacity: Option<EventCapacity>,
        ledger: &mut EventLedger,
        now: DateTime<Utc>,
    ) -> Vec<Offer> {
        let Some(capacity) = capacity else {
            return Vec::new();
        };
        let offers = promote(event_id, &capacity, ledger, now, env.offers.ttl());
        for _ in &offers {
            metrics::record_offer("promotion");
        }
        offers
    }

    fn expiry_effects(
        event_id: EventId,
        offers: &[Offer],
    ) -> SmallVec<[Effect<WaitlistAction>; 4]> {
        offers
            .iter()
            .map(|offer| {
                Effect::schedule_at(
                    offer.expires_at,
                    WaitlistAction::ExpireOffer {
                        entry_id: offer.entry_id,
                        event_id,
                    },
                )
            })
            .collect()
    }

    // ========== Join ==========

    fn join(
        ledger: &mut EventLedger,
        event_id: EventId,
        user_id: UserId,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        if ledger.active_entry_for(&user_id).is_some() {
            return Err(WaitlistError::DuplicateEntry { event_id, user_id });
        }
        let capacity = Self::open_event(env, event_id)?;
        let now = env.clock.now();

        // Older waiters first: capacity freed by a lapsed offer whose timer
        // has not fired yet belongs to them, not to the newcomer.
        let promoted = Self::promote_open(env, event_id, Some(capacity), ledger, now);

        let snapshot = availability(event_id, &capacity, ledger, now);
        let entry_id = EntryId::new();
        let (status, receipt) = if snapshot.remaining > 0 {
            let expires_at = offer_deadline(now, env.offers.ttl());
            (
                EntryStatus::Offered { expires_at },
                JoinReceipt {
                    entry_id,
                    status: JoinStatus::Offered,
                    offer_expires_at: Some(expires_at),
                    message: env.offers.offer_message(),
                },
            )
        } else {
            (
                EntryStatus::Waiting,
                JoinReceipt {
                    entry_id,
                    status: JoinStatus::Waiting,
                    offer_expires_at: None,
                    message: WAITING_MESSAGE.to_string(),
                },
            )
        };

        ledger.insert(WaitingListEntry {
            id: entry_id,
            event_id,
            user_id: user_id.clone(),
            status,
            created: JoinedAt {
                sequence: env.sequence.issue(),
                at: now,
            },
        });

        let mut effects = Self::expiry_effects(event_id, &promoted);
        if let Some(expires_at) = receipt.offer_expires_at {
            effects.push(Effect::schedule_at(
                expires_at,
                WaitlistAction::ExpireOffer { entry_id, event_id },
            ));
            metrics::record_offer("join");
            tracing::info!(%event_id, %entry_id, %user_id, %expires_at, "Joined with offer");
        } else {
            tracing::info!(%event_id, %entry_id, %user_id, "Joined waiting list");
        }
        metrics::record_join(receipt.status);

        Ok(Reduction::with_effects(
            WaitlistOutcome::Joined { receipt, promoted },
            effects,
        ))
    }

    // ========== Expire ==========

    fn expire(
        ledger: &mut EventLedger,
        entry_id: EntryId,
        event_id: EventId,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        let is_offered = ledger
            .entry(&entry_id)
            .is_some_and(|entry| matches!(entry.status, EntryStatus::Offered { .. }));
        if !is_offered {
            tracing::debug!(%event_id, %entry_id, "Stale expiry callback ignored");
            return Ok(Reduction::new(WaitlistOutcome::ExpiryIgnored { entry_id }));
        }
        let capacity = Self::promotable_event(env, event_id)?;
        let now = env.clock.now();

        ledger.set_status(&entry_id, EntryStatus::Expired);
        metrics::record_offer_expired();
        tracing::info!(%event_id, %entry_id, "Offer expired");

        let promoted = Self::promote_open(env, event_id, capacity, ledger, now);
        let effects = Self::expiry_effects(event_id, &promoted);
        Ok(Reduction::with_effects(
            WaitlistOutcome::Expired { entry_id, promoted },
            effects,
        ))
    }

    // ========== Release ==========

    fn release(
        ledger: &mut EventLedger,
        event_id: EventId,
        entry_id: EntryId,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        match Self::offered_entry(ledger, &entry_id) {
            Ok(_) => {}
            Err(WaitlistError::EntryNotFound(_)) => {
                return Err(WaitlistError::InvalidState {
                    entry_id,
                    found: "missing",
                });
            }
            Err(error) => return Err(error),
        }
        let capacity = Self::promotable_event(env, event_id)?;
        let now = env.clock.now();

        ledger.set_status(&entry_id, EntryStatus::Expired);
        metrics::record_offer_released();
        tracing::info!(%event_id, %entry_id, "Offer released");

        let promoted = Self::promote_open(env, event_id, capacity, ledger, now);
        let effects = Self::expiry_effects(event_id, &promoted);
        Ok(Reduction::with_effects(
            WaitlistOutcome::Released { entry_id, promoted },
            effects,
        ))
    }

    // ========== Purchase ==========

    fn purchase(
        ledger: &mut EventLedger,
        action: PurchaseRequest,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        let PurchaseRequest {
            event_id,
            user_id,
            entry_id,
            payment_reference,
            amount,
        } = action;

        let (entry, expires_at) = Self::offered_entry(ledger, &entry_id)?;
        if entry.user_id != user_id {
            return Err(WaitlistError::Forbidden { entry_id, user_id });
        }
        let capacity = Self::open_event(env, event_id)?;
        let now = env.clock.now();
        if expires_at <= now {
            return Err(WaitlistError::OfferLapsed {
                entry_id,
                expired_at: expires_at,
            });
        }

        let ticket = Ticket {
            id: TicketId::new(),
            event_id,
            user_id,
            entry_id,
            status: TicketStatus::Valid,
            purchased_at: now,
            payment_reference,
            amount,
        };
        ledger.record_ticket(ticket.clone());
        ledger.set_status(&entry_id, EntryStatus::Purchased);
        metrics::record_ticket_sold(amount);
        tracing::info!(
            %event_id,
            %entry_id,
            ticket_id = %ticket.id,
            user_id = %ticket.user_id,
            %amount,
            "Ticket purchased"
        );

        let promoted = Self::promote_open(env, event_id, Some(capacity), ledger, now);
        let effects = Self::expiry_effects(event_id, &promoted);
        Ok(Reduction::with_effects(
            WaitlistOutcome::Purchased { ticket, promoted },
            effects,
        ))
    }

    // ========== Promote ==========

    fn promote_now(
        ledger: &mut EventLedger,
        event_id: EventId,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        let capacity = Self::promotable_event(env, event_id)?;
        let now = env.clock.now();

        let promoted = Self::promote_open(env, event_id, capacity, ledger, now);
        let effects = Self::expiry_effects(event_id, &promoted);
        Ok(Reduction::with_effects(WaitlistOutcome::Promoted(promoted), effects))
    }

    // ========== Update Capacity ==========

    fn update_capacity(
        ledger: &mut EventLedger,
        event_id: EventId,
        total_tickets: u32,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        if total_tickets == 0 {
            return Err(CatalogError::ZeroCapacity.into());
        }
        if env.directory.lookup(&event_id)?.is_none() {
            return Err(WaitlistError::EventNotFound(event_id));
        }
        let now = env.clock.now();

        // Live offers hold capacity just like sold tickets
        let committed = ledger
            .purchased_count()
            .saturating_add(ledger.active_offers(now));
        if total_tickets < committed {
            return Err(CatalogError::BelowCommitted {
                total_tickets,
                committed,
            }
            .into());
        }

        let capacity = env
            .directory
            .set_total_tickets(&event_id, total_tickets)?
            .ok_or(WaitlistError::EventNotFound(event_id))?;
        tracing::info!(%event_id, total_tickets, "Event capacity updated");

        let promotable = (!capacity.is_cancelled).then_some(capacity);
        let promoted = Self::promote_open(env, event_id, promotable, ledger, now);
        let effects = Self::expiry_effects(event_id, &promoted);
        Ok(Reduction::with_effects(
            WaitlistOutcome::CapacityUpdated { capacity, promoted },
            effects,
        ))
    }
}

/// Fields of [`WaitlistAction::Purchase`]
struct PurchaseRequest {
    event_id: EventId,
    user_id: UserId,
    entry_id: EntryId,
    payment_reference: String,
    amount: Money,
}

impl Reducer for WaitlistReducer {
    type State = EventLedger;
    type Action = WaitlistAction;
    type Environment = WaitlistEnvironment;
    type Output = WaitlistOutcome;
    type Error = WaitlistError;

    fn reduce(
        &self,
        state: &mut EventLedger,
        action: WaitlistAction,
        env: &WaitlistEnvironment,
    ) -> Result<WaitlistReduction, WaitlistError> {
        match action {
            WaitlistAction::Join { event_id, user_id } => Self::join(state, event_id, user_id, env),
            WaitlistAction::ExpireOffer { entry_id, event_id } => {
                Self::expire(state, entry_id, event_id, env)
            }
            WaitlistAction::Release { event_id, entry_id } => {
                Self::release(state, event_id, entry_id, env)
            }
            WaitlistAction::Purchase {
                event_id,
                user_id,
                entry_id,
                payment_reference,
                amount,
            } => Self::purchase(
                state,
                PurchaseRequest {
                    event_id,
                    user_id,
                    entry_id,
                    payment_reference,
                    amount,
                },
                env,
            ),
            WaitlistAction::Promote { event_id } => Self::promote_now(state, event_id, env),
            WaitlistAction::UpdateCapacity {
                event_id,
                total_tickets,
            } => Self::update_capacity(state, event_id, total_tickets, env),
        }
    }
}
