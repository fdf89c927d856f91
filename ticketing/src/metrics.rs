//! Business metrics for the waiting list.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `waitlist_joins_total{status}` - Joins by result (offered, waiting)
//! - `waitlist_offers_total{source}` - Offers granted (join, promotion)
//! - `waitlist_offers_expired_total` - Offers that lapsed
//! - `waitlist_offers_released_total` - Offers given back by their holder
//! - `waitlist_tickets_sold_total` - Tickets sold
//! - `waitlist_revenue_cents_total` - Revenue in cents

use crate::types::{JoinStatus, Money};
use metrics::describe_counter;

/// Register all waiting-list metric descriptions.
///
/// Call once at startup, before any metric is recorded.
pub fn register_waitlist_metrics() {
    describe_counter!(
        "waitlist_joins_total",
        "Total number of waiting list joins by status (offered, waiting)"
    );
    describe_counter!(
        "waitlist_offers_total",
        "Total number of offers granted by source (join, promotion)"
    );
    describe_counter!(
        "waitlist_offers_expired_total",
        "Total number of offers that lapsed unclaimed"
    );
    describe_counter!(
        "waitlist_offers_released_total",
        "Total number of offers released by their holder"
    );
    describe_counter!(
        "waitlist_tickets_sold_total",
        "Total number of tickets sold"
    );
    describe_counter!(
        "waitlist_revenue_cents_total",
        "Total revenue from ticket sales in cents"
    );

    tracing::info!("Waitlist metrics registered");
}

/// Record a join.
pub fn record_join(status: JoinStatus) {
    let status = match status {
        JoinStatus::Offered => "offered",
        JoinStatus::Waiting => "waiting",
    };
    metrics::counter!("waitlist_joins_total", "status" => status).increment(1);
}

/// Record an offer.
///
/// # Arguments
///
/// * `source` - `"join"` when granted on join, `"promotion"` when promoted from the queue
pub fn record_offer(source: &'static str) {
    metrics::counter!("waitlist_offers_total", "source" => source).increment(1);
}

/// Record a lapsed offer.
pub fn record_offer_expired() {
    metrics::counter!("waitlist_offers_expired_total").increment(1);
}

/// Record a released offer.
pub fn record_offer_released() {
    metrics::counter!("waitlist_offers_released_total").increment(1);
}

/// Record a sale.
pub fn record_ticket_sold(amount: Money) {
    metrics::counter!("waitlist_tickets_sold_total").increment(1);
    metrics::counter!("waitlist_revenue_cents_total").increment(amount.cents());
    tracing::debug!(amount_cents = amount.cents(), "Recorded ticket_sold metric");
}
