//! # Event: immutable values delivered through the bus.
//!
//! Two representations exist:
//! - [`EventRecord`] (crate-private): the type-erased form a channel
//!   stores, with the payload behind `Arc<dyn Any>`. The registry map must
//!   erase the payload type; this is the only place erasure happens.
//! - [`Event<T>`]: the typed view handed to listeners, produced by a
//!   checked downcast against the channel's recorded type identity.
//!
//! Records are sealed by the channel inside its push critical section: the
//! event id and the queue position are assigned there, and nothing is
//! mutated afterwards. Payloads are shared, never copied per listener.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::events::ids::{EventId, PublisherId};

/// Type-erased event record as stored by a channel.
///
/// Shared as `Arc<EventRecord>` between the channel's map, its queue
/// consumers, and any listener that still holds a delivered event.
pub(crate) struct EventRecord {
    pub(crate) id: EventId,
    pub(crate) type_id: TypeId,
    pub(crate) publisher: PublisherId,
    /// Logical position in the channel: stable across head reclamation.
    pub(crate) position: u64,
    pub(crate) payload: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("publisher", &self.publisher)
            .field("position", &self.position)
            .finish()
    }
}

/// An immutable event of payload type `T`.
///
/// Cheap to clone; the payload is shared behind an [`Arc`]. Consumers
/// never mutate an event after publication.
pub struct Event<T> {
    id: EventId,
    publisher: PublisherId,
    position: u64,
    data: Arc<T>,
}

impl<T: Send + Sync + 'static> Event<T> {
    /// Builds the typed view of a stored record.
    ///
    /// The record's type tag is checked before the downcast. Channels only
    /// admit payloads matching their recorded type identity, so this
    /// cannot fail for records pulled from the channel keyed by `T`.
    pub(crate) fn from_record(record: &Arc<EventRecord>) -> Option<Self> {
        if record.type_id != TypeId::of::<T>() {
            return None;
        }
        let data = Arc::clone(&record.payload).downcast::<T>().ok()?;
        Some(Self {
            id: record.id,
            publisher: record.publisher,
            position: record.position,
            data,
        })
    }
}

impl<T> Event<T> {
    /// Event id, unique and monotonic within the channel.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Id of the publisher that emitted this event, or
    /// [`PublisherId::UNSET`].
    #[must_use]
    pub fn publisher(&self) -> PublisherId {
        self.publisher
    }

    /// Logical queue position; stable across reclamation.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Borrows the payload.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the view and returns the shared payload.
    #[must_use]
    pub fn into_data(self) -> Arc<T> {
        self.data
    }
}

// Manual impl: cloning shares the payload and must not require `T: Clone`.
impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            publisher: self.publisher,
            position: self.position,
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("publisher", &self.publisher)
            .field("position", &self.position)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(payload: Arc<dyn Any + Send + Sync>, type_id: TypeId) -> Arc<EventRecord> {
        Arc::new(EventRecord {
            id: EventId(7),
            type_id,
            publisher: PublisherId(3),
            position: 12,
            payload,
        })
    }

    #[test]
    fn typed_view_carries_metadata() {
        let rec = record(Arc::new(41_i32), TypeId::of::<i32>());
        let ev = Event::<i32>::from_record(&rec).expect("payload is an i32");

        assert_eq!(ev.id(), EventId(7));
        assert_eq!(ev.publisher(), PublisherId(3));
        assert_eq!(ev.position(), 12);
        assert_eq!(*ev.data(), 41);
    }

    #[test]
    fn downcast_to_wrong_type_fails() {
        let rec = record(Arc::new(41_i32), TypeId::of::<i32>());
        assert!(Event::<String>::from_record(&rec).is_none());
    }

    #[test]
    fn clones_share_the_payload() {
        let rec = record(Arc::new(String::from("shared")), TypeId::of::<String>());
        let ev = Event::<String>::from_record(&rec).expect("payload is a String");
        let other = ev.clone();

        assert!(Arc::ptr_eq(&ev.data, &other.data));
    }

    #[test]
    fn unset_publisher_is_recognized() {
        assert!(PublisherId::UNSET.is_unset());
        assert!(!PublisherId(1).is_unset());
    }
}
