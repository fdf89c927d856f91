//! Event directory: where the waiting list learns an event's capacity.
//!
//! The waiting list reads capacity through [`EventDirectory`] and resizes an
//! event only from inside the event's shard, where it can check the tickets
//! already committed. [`InMemoryEventCatalog`] is the in-process
//! implementation used by the application and the tests, and also owns event
//! creation and cancellation.

use crate::types::{EventCapacity, EventId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// The directory could not answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Transient failure; the lookup may succeed if repeated
    #[error("Event directory unavailable: {0}")]
    Unavailable(String),
}

/// Access to event capacity.
///
/// Called inside a shard's transaction, so implementations must answer
/// without blocking on slow I/O.
pub trait EventDirectory: Send + Sync {
    /// Capacity of `event_id`, or `None` if the event does not exist
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the directory cannot be read.
    fn lookup(&self, event_id: &EventId) -> Result<Option<EventCapacity>, DirectoryError>;

    /// Set the ticket total of `event_id` and return the new capacity, or
    /// `None` if the event does not exist.
    ///
    /// Callers validate the new total against committed tickets first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the directory cannot be
    /// written.
    fn set_total_tickets(
        &self,
        event_id: &EventId,
        total_tickets: u32,
    ) -> Result<Option<EventCapacity>, DirectoryError>;
}

/// Errors from managing the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An event must sell at least one ticket
    #[error("Event capacity must be greater than zero")]
    ZeroCapacity,

    /// No event with this id
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Sold tickets and live offers already hold more than the new total
    #[error("Cannot reduce total tickets below {committed}")]
    BelowCommitted {
        /// Total asked for
        total_tickets: u32,
        /// Tickets sold plus live offers
        committed: u32,
    },
}

/// In-memory event catalog
#[derive(Debug, Default)]
pub struct InMemoryEventCatalog {
    events: RwLock<HashMap<EventId, EventCapacity>>,
}

impl InMemoryEventCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new open event.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ZeroCapacity`] if `total_tickets` is zero.
    pub fn create_event(&self, total_tickets: u32) -> Result<EventId, CatalogError> {
        if total_tickets == 0 {
            return Err(CatalogError::ZeroCapacity);
        }

        let event_id = EventId::new();
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_id, EventCapacity::open(total_tickets));

        tracing::info!(%event_id, total_tickets, "Event created");
        Ok(event_id)
    }

    /// Mark an event as cancelled.
    ///
    /// Existing entries and tickets are kept; the waiting list stops
    /// accepting joins, purchases and promotions for the event.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EventNotFound`] if the event does not exist.
    pub fn cancel_event(&self, event_id: &EventId) -> Result<(), CatalogError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let event = events
            .get_mut(event_id)
            .ok_or(CatalogError::EventNotFound(*event_id))?;
        event.is_cancelled = true;

        tracing::info!(%event_id, "Event cancelled");
        Ok(())
    }

    /// Current capacity of an event
    #[must_use]
    pub fn get(&self, event_id: &EventId) -> Option<EventCapacity> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_id)
            .copied()
    }

    /// Every event that is not cancelled
    #[must_use]
    pub fn open_events(&self) -> Vec<(EventId, EventCapacity)> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, capacity)| !capacity.is_cancelled)
            .map(|(event_id, capacity)| (*event_id, *capacity))
            .collect()
    }
}

impl EventDirectory for InMemoryEventCatalog {
    fn lookup(&self, event_id: &EventId) -> Result<Option<EventCapacity>, DirectoryError> {
        Ok(self.get(event_id))
    }

    fn set_total_tickets(
        &self,
        event_id: &EventId,
        total_tickets: u32,
    ) -> Result<Option<EventCapacity>, DirectoryError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        Ok(events.get_mut(event_id).map(|capacity| {
            capacity.total_tickets = total_tickets;
            *capacity
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let catalog = InMemoryEventCatalog::new();
        let event_id = catalog.create_event(3).unwrap();

        assert_eq!(catalog.lookup(&event_id), Ok(Some(EventCapacity::open(3))));
        assert_eq!(catalog.lookup(&EventId::new()), Ok(None));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let catalog = InMemoryEventCatalog::new();
        assert_eq!(catalog.create_event(0), Err(CatalogError::ZeroCapacity));
    }

    #[test]
    fn test_cancel_event() {
        let catalog = InMemoryEventCatalog::new();
        let event_id = catalog.create_event(1).unwrap();

        catalog.cancel_event(&event_id).unwrap();

        assert!(catalog.get(&event_id).is_some_and(|e| e.is_cancelled));
        let missing = EventId::new();
        assert_eq!(
            catalog.cancel_event(&missing),
            Err(CatalogError::EventNotFound(missing))
        );
    }

    #[test]
    fn test_set_total_tickets() {
        let catalog = InMemoryEventCatalog::new();
        let event_id = catalog.create_event(2).unwrap();

        assert_eq!(
            catalog.set_total_tickets(&event_id, 5),
            Ok(Some(EventCapacity::open(5)))
        );
        assert_eq!(catalog.get(&event_id), Some(EventCapacity::open(5)));
        assert_eq!(catalog.set_total_tickets(&EventId::new(), 5), Ok(None));
    }

    #[test]
    fn test_open_events_skip_cancelled() {
        let catalog = InMemoryEventCatalog::new();
        let open = catalog.create_event(1).unwrap();
        let cancelled = catalog.create_event(1).unwrap();
        catalog.cancel_event(&cancelled).unwrap();

        assert_eq!(catalog.open_events(), vec![(open, EventCapacity::open(1))]);
    }
}
