//! Live availability of an event.
//!
//! ```text
//! remaining = max(0, total_tickets - purchased_count - active_offers)
//! ```
//!
//! `active_offers` is decided by each offer's deadline, not by its status
//! alone, so the numbers are correct even when an expiry callback is late.

use crate::ledger::EventLedger;
use crate::types::{Availability, EventCapacity, EventId};
use chrono::{DateTime, Utc};

/// Compute the availability snapshot of one event.
///
/// Pure: callers that act on the result must hold the event's shard for the
/// read and the following write.
#[must_use]
pub fn availability(
    event_id: EventId,
    capacity: &EventCapacity,
    ledger: &EventLedger,
    now: DateTime<Utc>,
) -> Availability {
    let purchased_count = ledger.purchased_count();
    let active_offers = ledger.active_offers(now);
    let remaining = capacity
        .total_tickets
        .saturating_sub(purchased_count)
        .saturating_sub(active_offers);

    Availability {
        event_id,
        total_tickets: capacity.total_tickets,
        remaining,
        is_sold_out: remaining == 0,
        purchased_count,
        active_offers,
    }
}
