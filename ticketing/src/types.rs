//! Domain types for the ticket waiting list.
//!
//! Identifiers, the waiting-list entry and its state machine, tickets, and
//! the read models handed back to callers (availability snapshots, queue
//! positions, join receipts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a waiting-list entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random `EntryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identity supplied by the authentication layer.
///
/// Never parsed or validated here; only compared.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identity string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Money amount in minor units (cents)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a Money value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a Money value from whole dollars
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Capacity facts about an event, as published by the event directory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCapacity {
    /// Total number of tickets the event sells
    pub total_tickets: u32,
    /// Cancelled events accept no joins, purchases or promotions
    pub is_cancelled: bool,
}

impl EventCapacity {
    /// An open event with `total_tickets` tickets
    #[must_use]
    pub const fn open(total_tickets: u32) -> Self {
        Self {
            total_tickets,
            is_cancelled: false,
        }
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Lifecycle of a purchased ticket.
///
/// Only `Valid` is ever written here; the other states belong to usage and
/// refund flows outside the waiting list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Purchased and not yet used
    Valid,
    /// Scanned at the venue
    Used,
    /// Money returned to the holder
    Refunded,
    /// Voided by the organizer
    Cancelled,
}

impl TicketStatus {
    /// Whether a ticket in this status consumes event capacity
    #[must_use]
    pub const fn holds_capacity(&self) -> bool {
        matches!(self, Self::Valid | Self::Used)
    }
}

/// A finalized purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Holder
    pub user_id: UserId,
    /// Waiting-list entry the ticket was bought through
    pub entry_id: EntryId,
    /// Current status
    pub status: TicketStatus,
    /// When the purchase committed
    pub purchased_at: DateTime<Utc>,
    /// Reference of the confirmed charge at the payment provider
    pub payment_reference: String,
    /// Amount charged
    pub amount: Money,
}

// ============================================================================
// Waiting List
// ============================================================================

/// Status of a waiting-list entry.
///
/// ```text
/// Waiting ──► Offered ──► Purchased
///    │           │
///    └───────────┴──────► Expired
/// ```
///
/// The offer deadline only exists while the entry is `Offered`. On the wire
/// it is a `status` tag with `expires_at` beside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Queued for a ticket
    Waiting,
    /// Holds an exclusive right to buy one ticket until `expires_at`
    Offered {
        /// Offer deadline
        expires_at: DateTime<Utc>,
    },
    /// Bought a ticket (terminal)
    Purchased,
    /// Offer lapsed or was released (terminal)
    Expired,
}

impl EntryStatus {
    /// `Waiting` or `Offered`
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::Offered { .. })
    }

    /// `Purchased` or `Expired`
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Offer deadline, if the entry holds an offer
    #[must_use]
    pub const fn offer_expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Offered { expires_at } => Some(*expires_at),
            _ => None,
        }
    }

    /// Offer that is still within its deadline at `now`
    #[must_use]
    pub fn is_live_offer(&self, now: DateTime<Utc>) -> bool {
        self.offer_expires_at().is_some_and(|expires_at| expires_at > now)
    }

    /// Lowercase name, as used in logs and error messages
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Offered { .. } => "offered",
            Self::Purchased => "purchased",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Creation stamp of an entry.
///
/// `sequence` comes from a strictly increasing counter and is the FIFO key;
/// `at` is wall-clock time kept for the audit trail. Ordering compares the
/// sequence first, so two entries never tie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JoinedAt {
    /// Position in the global join order
    pub sequence: u64,
    /// Wall-clock time of the join
    pub at: DateTime<Utc>,
}

/// One user's place in one event's waiting list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingListEntry {
    /// Entry identifier
    pub id: EntryId,
    /// Event the entry queues for
    pub event_id: EventId,
    /// Who joined
    pub user_id: UserId,
    /// Current status
    #[serde(flatten)]
    pub status: EntryStatus,
    /// When the entry joined (FIFO key)
    pub created: JoinedAt,
}

impl WaitingListEntry {
    /// Offer deadline, if any
    #[must_use]
    pub const fn offer_expires_at(&self) -> Option<DateTime<Utc>> {
        self.status.offer_expires_at()
    }
}

/// An offer granted to a waiting-list entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Entry now holding the offer
    pub entry_id: EntryId,
    /// Who may buy
    pub user_id: UserId,
    /// Deadline for the purchase
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Read Models
// ============================================================================

/// Live capacity snapshot of an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Event the snapshot describes
    pub event_id: EventId,
    /// Capacity published by the directory
    pub total_tickets: u32,
    /// Tickets neither sold nor held by a live offer
    pub remaining: u32,
    /// `remaining == 0`
    pub is_sold_out: bool,
    /// Tickets in `Valid` or `Used` status
    pub purchased_count: u32,
    /// Offers whose deadline is still ahead
    pub active_offers: u32,
}

/// A user's entry with its live rank in the queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    /// The reported entry
    pub entry: WaitingListEntry,
    /// 1 + number of older active entries
    pub rank: u32,
}

/// Result of joining a waiting list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    /// Capacity was free: the joiner holds an offer
    Offered,
    /// Sold out: the joiner is queued
    Waiting,
}

/// What a joiner gets back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    /// The new entry
    pub entry_id: EntryId,
    /// Offered or waiting
    pub status: JoinStatus,
    /// Offer deadline when offered
    pub offer_expires_at: Option<DateTime<Utc>>,
    /// Human-readable summary
    pub message: String,
}
