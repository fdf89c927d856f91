//! Live queue rank.
//!
//! Rank is recomputed on every call and never stored.

use crate::ledger::EventLedger;
use crate::types::{EntryStatus, QueuePosition, UserId};

/// Where `user_id` stands in an event's queue.
///
/// Reports the user's active entry if there is one, else their most recent
/// purchased entry; `None` when every entry of the user has expired.
/// `rank` is one more than the number of waiting or offered entries that
/// joined earlier.
#[must_use]
pub fn position(ledger: &EventLedger, user_id: &UserId) -> Option<QueuePosition> {
    let entry = ledger.active_entry_for(user_id).or_else(|| {
        ledger
            .entries_for(user_id)
            .filter(|entry| entry.status == EntryStatus::Purchased)
            .last()
    })?;

    let ahead = ledger.active_before(entry.created.sequence);
    let rank = u32::try_from(ahead).unwrap_or(u32::MAX).saturating_add(1);

    Some(QueuePosition {
        entry: entry.clone(),
        rank,
    })
}
