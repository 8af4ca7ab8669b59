//! # Channel registry: the type-keyed index of channels.
//!
//! The registry owns the canonical `TypeId → Channel` map. It creates
//! channels lazily, routes publishes to the channel matching the payload
//! type, aggregates load, and applies bulk reclamation.
//!
//! ## Architecture
//! ```text
//! publish::<T>(data) ──► channel_of::<T>() ──► Channel::push
//!                             │
//!                  shared-lock lookup; on miss:
//!                  drop shared, take exclusive, re-check, insert
//! ```
//!
//! ## Rules
//! - One many-reader/one-writer lock guards the map; channel-internal
//!   locks are acquired only after the map lock is released.
//! - `channel_of` never returns a missing channel (it creates one), even
//!   when the channel is blocked.
//! - Bulk reclamation snapshots the channel list first, then reclaims
//!   channel by channel without the map lock held.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::channels::Channel;
use crate::error::PublishError;
use crate::events::PublisherId;

/// Aggregate load across all channels of a bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusLoad {
    /// Number of live channels.
    pub channel_count: usize,
    /// Retained events across all channels.
    pub event_count: usize,
    /// Retained payload bytes across all channels.
    pub data_size: usize,
}

/// Type-keyed index of channels.
pub(crate) struct ChannelRegistry {
    channels: RwLock<HashMap<TypeId, Arc<Channel>>>,
}

impl ChannelRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            channels: RwLock::new(HashMap::new()),
        })
    }

    /// Routes one value to the channel keyed by `T`, creating the channel
    /// on first use. Returns the channel so callers can inspect it.
    pub(crate) fn publish<T: Send + Sync + 'static>(
        &self,
        publisher: PublisherId,
        data: T,
    ) -> Result<Arc<Channel>, PublishError> {
        let channel = self.channel_of::<T>();
        channel.push(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            publisher,
            Arc::new(data),
        )?;
        Ok(channel)
    }

    /// Returns the channel for `T`, creating it if absent.
    ///
    /// The common path is a shared-lock hit. On a miss the shared lock is
    /// dropped and existence is re-checked under the exclusive lock, so
    /// two racing creators cannot both insert.
    pub(crate) fn channel_of<T: Send + Sync + 'static>(&self) -> Arc<Channel> {
        let key = TypeId::of::<T>();
        if let Some(channel) = self.channels.read().get(&key) {
            return Arc::clone(channel);
        }
        let mut channels = self.channels.write();
        Arc::clone(channels.entry(key).or_insert_with(Channel::new::<T>))
    }

    /// Closes and erases the channel for `T`. Events not yet consumed are
    /// lost; waiters wake and observe the closed status.
    pub(crate) fn remove<T: Send + Sync + 'static>(&self) -> bool {
        let channel = self.channels.write().remove(&TypeId::of::<T>());
        match channel {
            Some(channel) => {
                channel.close();
                true
            }
            None => false,
        }
    }

    /// Blocks the channel for `T` for writing. Reads keep working.
    /// Returns `false` when no channel for `T` exists.
    pub(crate) fn block<T: Send + Sync + 'static>(&self) -> bool {
        let channel = self.channels.read().get(&TypeId::of::<T>()).map(Arc::clone);
        match channel {
            Some(channel) => {
                channel.block();
                true
            }
            None => false,
        }
    }

    /// Reopens a blocked channel for `T`. Returns `false` when no channel
    /// for `T` exists.
    pub(crate) fn unblock<T: Send + Sync + 'static>(&self) -> bool {
        let channel = self.channels.read().get(&TypeId::of::<T>()).map(Arc::clone);
        match channel {
            Some(channel) => {
                channel.unblock();
                true
            }
            None => false,
        }
    }

    /// Snapshot of the aggregate load.
    pub(crate) fn load(&self) -> BusLoad {
        let channels = self.snapshot();
        let mut load = BusLoad {
            channel_count: channels.len(),
            ..BusLoad::default()
        };
        for channel in channels {
            load.event_count += channel.event_count();
            load.data_size += channel.data_size();
        }
        load
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Retains only the newest `n_keep` events on every channel.
    pub(crate) fn free_events(&self, n_keep: usize) {
        for channel in self.snapshot() {
            channel.free_events(n_keep);
        }
    }

    /// Divides `max_bytes` evenly across existing channels and reclaims
    /// each one down to its share.
    pub(crate) fn dynamic_free(&self, max_bytes: usize) {
        let channels = self.snapshot();
        if channels.is_empty() {
            return;
        }
        let per_channel = max_bytes / channels.len();
        for channel in channels {
            // Zero-sized payloads occupy no budget; keep them all.
            let keep = match channel.payload_size() {
                0 => continue,
                size => per_channel / size,
            };
            channel.free_events(keep);
        }
    }

    fn snapshot(&self) -> Vec<Arc<Channel>> {
        self.channels.read().values().map(Arc::clone).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelStatus;

    #[test]
    fn channel_of_returns_the_same_channel_per_type() {
        let registry = ChannelRegistry::new();
        let a = registry.channel_of::<i32>();
        let b = registry.channel_of::<i32>();
        let c = registry.channel_of::<String>();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.channel_count(), 2);
    }

    #[test]
    fn publish_routes_by_payload_type() {
        let registry = ChannelRegistry::new();
        registry.publish(PublisherId::UNSET, 1_i32).expect("push accepted");
        registry
            .publish(PublisherId::UNSET, String::from("one"))
            .expect("push accepted");
        registry.publish(PublisherId::UNSET, 2_i32).expect("push accepted");

        assert_eq!(registry.channel_of::<i32>().event_count(), 2);
        assert_eq!(registry.channel_of::<String>().event_count(), 1);
    }

    #[test]
    fn remove_closes_the_channel() {
        let registry = ChannelRegistry::new();
        let channel = registry
            .publish(PublisherId::UNSET, 1_i32)
            .expect("push accepted");

        assert!(registry.remove::<i32>());
        assert_eq!(channel.status(), ChannelStatus::Closed);
        assert!(!registry.remove::<i32>());

        // A later publish creates a fresh channel under the same key.
        let fresh = registry
            .publish(PublisherId::UNSET, 2_i32)
            .expect("push accepted");
        assert!(!Arc::ptr_eq(&channel, &fresh));
        assert_eq!(fresh.event_count(), 1);
    }

    #[test]
    fn load_aggregates_over_channels() {
        let registry = ChannelRegistry::new();
        for v in 0..4_i64 {
            registry.publish(PublisherId::UNSET, v).expect("push accepted");
        }
        registry
            .publish(PublisherId::UNSET, 7_u8)
            .expect("push accepted");

        let load = registry.load();
        assert_eq!(load.channel_count, 2);
        assert_eq!(load.event_count, 5);
        assert_eq!(load.data_size, 4 * std::mem::size_of::<i64>() + 1);
    }

    #[test]
    fn dynamic_free_divides_the_budget_evenly() {
        let registry = ChannelRegistry::new();
        for i in 0..100 {
            registry.publish(PublisherId::UNSET, i as u32).expect("push");
            registry.publish(PublisherId::UNSET, i as u64).expect("push");
            registry.publish(PublisherId::UNSET, i as u128).expect("push");
        }

        // 240 / 3 channels = 80 bytes each: 20 x u32, 10 x u64, 5 x u128.
        registry.dynamic_free(240);
        assert_eq!(registry.channel_of::<u32>().event_count(), 20);
        assert_eq!(registry.channel_of::<u64>().event_count(), 10);
        assert_eq!(registry.channel_of::<u128>().event_count(), 5);

        // Re-applying the same budget is a no-op.
        registry.dynamic_free(240);
        assert_eq!(registry.channel_of::<u32>().event_count(), 20);
        assert_eq!(registry.channel_of::<u64>().event_count(), 10);
        assert_eq!(registry.channel_of::<u128>().event_count(), 5);
    }

    #[test]
    fn free_events_applies_to_every_channel() {
        let registry = ChannelRegistry::new();
        for v in 0..10_i64 {
            registry.publish(PublisherId::UNSET, v).expect("push");
            registry.publish(PublisherId::UNSET, v as i32).expect("push");
        }

        registry.free_events(0);
        let load = registry.load();
        assert_eq!(load.channel_count, 2);
        assert_eq!(load.event_count, 0);
        assert_eq!(load.data_size, 0);
    }
}
