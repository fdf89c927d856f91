//! Errors returned by waiting-list operations.

use crate::directory::{CatalogError, DirectoryError};
use crate::types::{EntryId, EventId, UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;
use waitlist_core::error::Retryable;

/// Why a waiting-list operation was rejected.
///
/// A rejected operation never leaves partial writes behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitlistError {
    /// No event with this id
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// No entry with this id in the event's waiting list
    #[error("Waiting list entry not found: {0}")]
    EntryNotFound(EntryId),

    /// The user already has a waiting or offered entry for the event
    #[error("User {user_id} already has an active entry for event {event_id}")]
    DuplicateEntry {
        /// Event joined
        event_id: EventId,
        /// Who tried to join again
        user_id: UserId,
    },

    /// The entry is not in the status the operation requires
    #[error("Entry {entry_id} is {found}, expected an offer")]
    InvalidState {
        /// Entry operated on
        entry_id: EntryId,
        /// Status found (`missing` if the entry does not exist)
        found: &'static str,
    },

    /// The offer passed its deadline before the purchase arrived
    #[error("Offer for entry {entry_id} lapsed at {expired_at}")]
    OfferLapsed {
        /// Entry whose offer lapsed
        entry_id: EntryId,
        /// Offer deadline
        expired_at: DateTime<Utc>,
    },

    /// The entry belongs to someone else
    #[error("Entry {entry_id} does not belong to user {user_id}")]
    Forbidden {
        /// Entry operated on
        entry_id: EntryId,
        /// Caller
        user_id: UserId,
    },

    /// The event was cancelled
    #[error("Event {0} is cancelled")]
    EventClosed(EventId),

    /// Event capacity could not be read
    #[error(transparent)]
    DirectoryUnavailable(#[from] DirectoryError),

    /// Event catalog rejected a capacity change
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The store answered an operation with an outcome of another operation
    #[error("Unexpected outcome for {0}")]
    UnexpectedOutcome(&'static str),
}

/// Coarse classification of [`WaitlistError`] for callers that map errors
/// onto their own responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Event or entry absent
    NotFound,
    /// Re-join while active
    DuplicateEntry,
    /// Entry not in the expected status, or invalid input
    InvalidState,
    /// Ownership mismatch
    Forbidden,
    /// Cancelled event
    EventClosed,
    /// Transient failure of a collaborator
    Unavailable,
    /// Bug in the wiring, not in the request
    Internal,
}

impl WaitlistError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound(_)
            | Self::EntryNotFound(_)
            | Self::Catalog(CatalogError::EventNotFound(_)) => ErrorKind::NotFound,
            Self::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            Self::InvalidState { .. }
            | Self::OfferLapsed { .. }
            | Self::Catalog(CatalogError::ZeroCapacity | CatalogError::BelowCommitted { .. }) => {
                ErrorKind::InvalidState
            }
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::EventClosed(_) => ErrorKind::EventClosed,
            Self::DirectoryUnavailable(_) => ErrorKind::Unavailable,
            Self::UnexpectedOutcome(_) => ErrorKind::Internal,
        }
    }
}

impl Retryable for WaitlistError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable)
    }
}

/// Result alias for waiting-list operations
pub type Result<T> = std::result::Result<T, WaitlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_directory_failures_are_retryable() {
        let unavailable = WaitlistError::from(DirectoryError::Unavailable("timeout".into()));
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.kind(), ErrorKind::Unavailable);

        let duplicate = WaitlistError::DuplicateEntry {
            event_id: EventId::new(),
            user_id: UserId::new("alice"),
        };
        assert!(!duplicate.is_retryable());
    }

    #[test]
    fn test_lapsed_offer_is_an_invalid_state() {
        let error = WaitlistError::OfferLapsed {
            entry_id: EntryId::new(),
            expired_at: Utc::now(),
        };
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_catalog_errors_classified() {
        let missing = WaitlistError::from(CatalogError::EventNotFound(EventId::new()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(
            WaitlistError::from(CatalogError::ZeroCapacity).kind(),
            ErrorKind::InvalidState
        );
        let below = WaitlistError::from(CatalogError::BelowCommitted {
            total_tickets: 1,
            committed: 3,
        });
        assert_eq!(below.kind(), ErrorKind::InvalidState);
        assert_eq!(below.to_string(), "Cannot reduce total tickets below 3");
    }
}
