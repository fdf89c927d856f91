//! Queue promotion: turn the oldest waiting entries into offers while
//! capacity is free.
//!
//! Remaining capacity is derived from the ledger on every call, never from a
//! caller-supplied delta, so running promotion twice in a row is harmless:
//! the second run finds nothing to do.

use crate::availability::availability;
use crate::ledger::EventLedger;
use crate::types::{EntryStatus, EventCapacity, EventId, Offer};
use chrono::{DateTime, Duration, Utc};

/// Deadline of an offer granted at `now`, saturating at the latest
/// representable instant
#[must_use]
pub fn offer_deadline(now: DateTime<Utc>, offer_ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(offer_ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Promote waiting entries of one event into offers.
///
/// Returns the offers granted, oldest entry first. The caller schedules
/// their expiry.
pub fn promote(
    event_id: EventId,
    capacity: &EventCapacity,
    ledger: &mut EventLedger,
    now: DateTime<Utc>,
    offer_ttl: Duration,
) -> Vec<Offer> {
    if capacity.is_cancelled {
        return Vec::new();
    }

    let mut remaining = availability(event_id, capacity, ledger, now).remaining;
    let mut offers = Vec::new();
    let expires_at = offer_deadline(now, offer_ttl);

    while remaining > 0 {
        let Some(next) = ledger.oldest_waiting() else {
            break;
        };
        let offer = Offer {
            entry_id: next.id,
            user_id: next.user_id.clone(),
            expires_at,
        };

        ledger.set_status(&offer.entry_id, EntryStatus::Offered { expires_at });
        tracing::info!(
            %event_id,
            entry_id = %offer.entry_id,
            user_id = %offer.user_id,
            %expires_at,
            "Waiting entry promoted to offer"
        );

        offers.push(offer);
        remaining -= 1;
    }

    offers
}
