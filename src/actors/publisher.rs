//! # Publisher: typed write handle onto the bus.
//!
//! A publisher turns plain values into immutable events stamped with its
//! id and routes them through the registry to the channel matching the
//! value's type. The channel is created on first use; nothing has to be
//! declared up front.

use std::sync::Arc;

use crate::core::ChannelRegistry;
use crate::error::PublishError;
use crate::events::PublisherId;

/// Writes typed events into the bus.
///
/// Created by [`EventBus::create_publisher`](crate::EventBus::create_publisher).
/// Deliberately not `Clone`: a handle owns its identity. Share one behind
/// an `Arc` when several components publish under the same id.
pub struct Publisher {
    id: PublisherId,
    registry: Arc<ChannelRegistry>,
}

impl Publisher {
    pub(crate) fn new(id: PublisherId, registry: Arc<ChannelRegistry>) -> Self {
        Self { id, registry }
    }

    /// Publishes one value of type `T`.
    ///
    /// The value is moved into an immutable event; the event id, queue
    /// position, and this publisher's id are fixed at push time and never
    /// change afterwards.
    ///
    /// # Errors
    /// [`PublishError::Closed`] or [`PublishError::Blocked`] when the
    /// channel does not accept writes; the event is dropped and nothing
    /// else changes.
    pub fn publish<T: Send + Sync + 'static>(&self, data: T) -> Result<(), PublishError> {
        self.registry.publish(self.id, data).map(|_| ())
    }

    /// Closes and removes the channel for `T`.
    ///
    /// Unconsumed events are discarded; listeners blocked in
    /// [`wait`](crate::Listener::wait) wake up with the end-of-stream
    /// signal and listen workers terminate. Returns `false` when no
    /// channel for `T` existed.
    pub fn close_channel<T: Send + Sync + 'static>(&self) -> bool {
        self.registry.remove::<T>()
    }

    /// Blocks the channel for `T` for writing.
    ///
    /// Pushes are rejected with [`PublishError::Blocked`] until an
    /// unblock; reads and waiters are unaffected. Returns `false` when no
    /// channel for `T` exists yet.
    pub fn block_channel<T: Send + Sync + 'static>(&self) -> bool {
        self.registry.block::<T>()
    }

    /// Reopens a blocked channel for `T`. The next push is accepted
    /// normally. Returns `false` when no channel for `T` exists yet.
    pub fn unblock_channel<T: Send + Sync + 'static>(&self) -> bool {
        self.registry.unblock::<T>()
    }

    /// This publisher's id, as stamped on its events.
    #[must_use]
    pub fn id(&self) -> PublisherId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_stamps_the_publisher_id() {
        let registry = ChannelRegistry::new();
        let publisher = Publisher::new(PublisherId(9), Arc::clone(&registry));

        publisher.publish(5_i32).expect("push accepted");
        let record = registry
            .channel_of::<i32>()
            .pull_latest()
            .expect("event retained");
        assert_eq!(record.publisher, PublisherId(9));
    }

    #[test]
    fn block_rejects_pushes_until_unblock() {
        let registry = ChannelRegistry::new();
        let publisher = Publisher::new(PublisherId(2), Arc::clone(&registry));

        assert!(!publisher.block_channel::<i32>());
        publisher.publish(1_i32).expect("push accepted");

        assert!(publisher.block_channel::<i32>());
        let err = publisher.publish(2_i32).unwrap_err();
        assert_eq!(err.as_label(), "publish_blocked");

        // Reads keep working on a blocked channel.
        assert!(registry.channel_of::<i32>().pull_latest().is_some());

        assert!(publisher.unblock_channel::<i32>());
        publisher.publish(3_i32).expect("push accepted after unblock");
        assert_eq!(registry.channel_of::<i32>().event_count(), 2);
    }

    #[test]
    fn close_channel_reports_whether_a_channel_existed() {
        let registry = ChannelRegistry::new();
        let publisher = Publisher::new(PublisherId(1), registry);

        assert!(!publisher.close_channel::<i32>());
        publisher.publish(1_i32).expect("push accepted");
        assert!(publisher.close_channel::<i32>());

        // The channel is gone; publishing recreates it.
        publisher.publish(2_i32).expect("push accepted");
    }
}
