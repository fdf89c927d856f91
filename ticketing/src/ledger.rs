//! Per-event ledger: the waiting list and the tickets sold for one event.
//!
//! One `EventLedger` is the state of one store shard. Entries are kept in
//! join order and never removed, so the ledger doubles as the audit trail.

use crate::types::{EntryId, EntryStatus, Ticket, UserId, WaitingListEntry};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Waiting list and ticket ledger of one event
#[derive(Clone, Debug, Default)]
pub struct EventLedger {
    /// Entries by join sequence (FIFO order)
    entries: BTreeMap<u64, WaitingListEntry>,
    /// Entry id → join sequence
    index: HashMap<EntryId, u64>,
    tickets: Vec<Ticket>,
}

impl EventLedger {
    /// Look up an entry
    #[must_use]
    pub fn entry(&self, entry_id: &EntryId) -> Option<&WaitingListEntry> {
        self.index
            .get(entry_id)
            .and_then(|sequence| self.entries.get(sequence))
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &WaitingListEntry> {
        self.entries.values()
    }

    /// All tickets, in purchase order
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Entries of one user, oldest first
    pub fn entries_for<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = &'a WaitingListEntry> + 'a {
        self.entries().filter(move |entry| entry.user_id == *user_id)
    }

    /// The user's waiting or offered entry, if any
    #[must_use]
    pub fn active_entry_for(&self, user_id: &UserId) -> Option<&WaitingListEntry> {
        self.entries()
            .find(|entry| entry.user_id == *user_id && entry.status.is_active())
    }

    /// Oldest entry still waiting
    #[must_use]
    pub fn oldest_waiting(&self) -> Option<&WaitingListEntry> {
        self.entries()
            .find(|entry| entry.status == EntryStatus::Waiting)
    }

    /// Active entries that joined before `sequence`
    #[must_use]
    pub fn active_before(&self, sequence: u64) -> usize {
        self.entries
            .range(..sequence)
            .filter(|(_, entry)| entry.status.is_active())
            .count()
    }

    /// Tickets that consume capacity (`Valid` or `Used`)
    #[must_use]
    pub fn purchased_count(&self) -> u32 {
        count(self.tickets.iter().filter(|ticket| ticket.status.holds_capacity()))
    }

    /// Offers whose deadline is after `now`.
    ///
    /// Lapsed offers that the expiry job has not transitioned yet are not
    /// counted.
    #[must_use]
    pub fn active_offers(&self, now: DateTime<Utc>) -> u32 {
        count(self.entries().filter(|entry| entry.status.is_live_offer(now)))
    }

    pub(crate) fn insert(&mut self, entry: WaitingListEntry) {
        let sequence = entry.created.sequence;
        self.index.insert(entry.id, sequence);
        self.entries.insert(sequence, entry);
    }

    /// Set an entry's status, returning the previous one
    pub(crate) fn set_status(
        &mut self,
        entry_id: &EntryId,
        status: EntryStatus,
    ) -> Option<EntryStatus> {
        let sequence = self.index.get(entry_id)?;
        let entry = self.entries.get_mut(sequence)?;
        Some(std::mem::replace(&mut entry.status, status))
    }

    pub(crate) fn record_ticket(&mut self, ticket: Ticket) {
        self.tickets.push(ticket);
    }
}

fn count<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}
