//! The operations the waiting list exposes to its collaborators.
//!
//! [`WaitlistService`] turns typed calls into reducer actions, runs them
//! through the sharded [`Store`], and answers reads straight from the
//! event's ledger under its read lock.

use crate::availability::availability;
use crate::error::{Result, WaitlistError};
use crate::ledger::EventLedger;
use crate::rank;
use crate::reducer::{WaitlistAction, WaitlistOutcome, WaitlistReducer};
use crate::types::{
    Availability, EntryId, EventCapacity, EventId, JoinReceipt, Money, Offer, QueuePosition,
    Ticket, TicketId, UserId, WaitingListEntry,
};
use std::sync::Arc;
use waitlist_runtime::Store;

/// Store running the waiting-list reducer
pub type WaitlistStore = Store<WaitlistReducer>;

/// Entry point for the presentation layer, the payment collaborator and
/// the scheduler
#[derive(Clone)]
pub struct WaitlistService {
    store: Arc<WaitlistStore>,
}

impl WaitlistService {
    /// Wrap a store
    #[must_use]
    pub const fn new(store: Arc<WaitlistStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &Arc<WaitlistStore> {
        &self.store
    }

    /// Join an event's waiting list.
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` while the user has a waiting or offered entry;
    /// `EventNotFound` / `EventClosed` for a missing or cancelled event.
    pub async fn join_waiting_list(&self, event_id: EventId, user_id: UserId) -> Result<JoinReceipt> {
        match self.store.send(WaitlistAction::Join { event_id, user_id }).await? {
            WaitlistOutcome::Joined { receipt, .. } => Ok(receipt),
            _ => Err(WaitlistError::UnexpectedOutcome("join")),
        }
    }

    /// Convert an offer into a ticket.
    ///
    /// Called by the payment collaborator once the charge has succeeded.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `InvalidState` when the entry holds no offer,
    /// `Forbidden` when it belongs to someone else, `OfferLapsed` past the
    /// deadline, `EventNotFound` / `EventClosed`.
    pub async fn purchase(
        &self,
        event_id: EventId,
        user_id: UserId,
        entry_id: EntryId,
        payment_reference: impl Into<String>,
        amount: Money,
    ) -> Result<TicketId> {
        let action = WaitlistAction::Purchase {
            event_id,
            user_id,
            entry_id,
            payment_reference: payment_reference.into(),
            amount,
        };
        match self.store.send(action).await? {
            WaitlistOutcome::Purchased { ticket, .. } => Ok(ticket.id),
            _ => Err(WaitlistError::UnexpectedOutcome("purchase")),
        }
    }

    /// Give an offer back; the next waiting entry is promoted.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the entry is missing or holds no offer.
    pub async fn release_ticket(&self, event_id: EventId, entry_id: EntryId) -> Result<()> {
        match self.store.send(WaitlistAction::Release { event_id, entry_id }).await? {
            WaitlistOutcome::Released { .. } => Ok(()),
            _ => Err(WaitlistError::UnexpectedOutcome("release")),
        }
    }

    /// Expire an offer; the scheduler's callback.
    ///
    /// Returns `false` when the entry had already moved on and the call was
    /// a no-op.
    ///
    /// # Errors
    ///
    /// `DirectoryUnavailable` (retryable) if the event could not be read.
    pub async fn expire_offer(&self, event_id: EventId, entry_id: EntryId) -> Result<bool> {
        match self.store.send(WaitlistAction::ExpireOffer { entry_id, event_id }).await? {
            WaitlistOutcome::Expired { .. } => Ok(true),
            WaitlistOutcome::ExpiryIgnored { .. } => Ok(false),
            _ => Err(WaitlistError::UnexpectedOutcome("expire")),
        }
    }

    /// Promote waiting entries into any free capacity.
    ///
    /// # Errors
    ///
    /// `DirectoryUnavailable` if the event could not be read.
    pub async fn promote(&self, event_id: EventId) -> Result<Vec<Offer>> {
        match self.store.send(WaitlistAction::Promote { event_id }).await? {
            WaitlistOutcome::Promoted(offers) => Ok(offers),
            _ => Err(WaitlistError::UnexpectedOutcome("promote")),
        }
    }

    /// Change an event's ticket total and hand any added capacity to
    /// waiting entries.
    ///
    /// # Errors
    ///
    /// - `Catalog(ZeroCapacity)` for a total of zero
    /// - `Catalog(BelowCommitted)` if sold tickets and live offers exceed it
    /// - `EventNotFound`, `DirectoryUnavailable`
    pub async fn update_capacity(
        &self,
        event_id: EventId,
        total_tickets: u32,
    ) -> Result<EventCapacity> {
        let action = WaitlistAction::UpdateCapacity {
            event_id,
            total_tickets,
        };
        match self.store.send(action).await? {
            WaitlistOutcome::CapacityUpdated { capacity, .. } => Ok(capacity),
            _ => Err(WaitlistError::UnexpectedOutcome("update capacity")),
        }
    }

    /// Live queue position of a user, `None` if they have no entry that
    /// has not expired.
    pub async fn position(&self, event_id: EventId, user_id: &UserId) -> Option<QueuePosition> {
        self.store
            .read(&event_id, |ledger, _| rank::position(ledger, user_id))
            .await
    }

    /// Live availability of an event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` if the event does not exist; `DirectoryUnavailable`
    /// if it could not be read.
    pub async fn availability(&self, event_id: EventId) -> Result<Availability> {
        self.store
            .read(&event_id, |ledger, env| -> Result<Availability> {
                let capacity = env
                    .directory
                    .lookup(&event_id)?
                    .ok_or(WaitlistError::EventNotFound(event_id))?;
                Ok(availability(event_id, &capacity, ledger, env.clock.now()))
            })
            .await
    }

    /// One entry, as currently stored
    pub async fn entry(&self, event_id: EventId, entry_id: EntryId) -> Option<WaitingListEntry> {
        self.store
            .read(&event_id, |ledger, _| ledger.entry(&entry_id).cloned())
            .await
    }

    /// Every ticket a user holds, newest first
    pub async fn tickets_for_user(&self, user_id: &UserId) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .store
            .read_all(|ledger: &EventLedger, _| {
                ledger
                    .tickets()
                    .iter()
                    .filter(|ticket| ticket.user_id == *user_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await
            .into_iter()
            .flatten()
            .collect();

        tickets.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        tickets
    }
}
