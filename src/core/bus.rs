//! # EventBus: the user-facing entry point.
//!
//! The bus owns the channel registry and hands out [`Listener`] and
//! [`Publisher`] handles. All state is per-bus; independent buses share
//! nothing, so tests and embedded subsystems can each construct their
//! own.
//!
//! ## Architecture
//! ```text
//! EventBus
//!   ├── ChannelRegistry (TypeId → Channel)
//!   ├── create_publisher() ──► Publisher { id, registry }
//!   └── create_listener()  ──► Listener  { id, registry, cursors }
//! ```
//!
//! Handles hold a strong reference to the registry and keep it alive
//! independently of the bus value itself; the registry tracks no handles
//! in return.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::actors::{Listener, Publisher};
use crate::config::BusConfig;
use crate::core::registry::{BusLoad, ChannelRegistry};
use crate::events::{ListenerId, PublisherId};

/// An in-process, type-routed publish/subscribe bus.
///
/// Every call to [`EventBus::new`] yields a fresh, independent bus.
pub struct EventBus {
    cfg: BusConfig,
    registry: Arc<ChannelRegistry>,
    listener_seq: AtomicU64,
    publisher_seq: AtomicU64,
}

impl EventBus {
    /// Creates a bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with the given configuration.
    #[must_use]
    pub fn with_config(cfg: BusConfig) -> Self {
        Self {
            cfg,
            registry: ChannelRegistry::new(),
            // Ids start at 1: publisher id 0 is the reserved unset value,
            // and listener ids follow the same convention.
            listener_seq: AtomicU64::new(1),
            publisher_seq: AtomicU64::new(1),
        }
    }

    /// Creates a listener with a fresh id.
    #[must_use]
    pub fn create_listener(&self) -> Listener {
        let id = ListenerId(self.listener_seq.fetch_add(1, AtomicOrdering::Relaxed));
        Listener::new(id, Arc::clone(&self.registry))
    }

    /// Creates a publisher with a fresh id.
    #[must_use]
    pub fn create_publisher(&self) -> Publisher {
        let id = PublisherId(self.publisher_seq.fetch_add(1, AtomicOrdering::Relaxed));
        Publisher::new(id, Arc::clone(&self.registry))
    }

    /// Snapshot of the aggregate load across all channels.
    #[must_use]
    pub fn load(&self) -> BusLoad {
        self.registry.load()
    }

    /// Number of live channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Retains only the newest `n_keep` events on every channel.
    pub fn free_events(&self, n_keep: usize) {
        self.registry.free_events(n_keep);
    }

    /// Divides `max_bytes` evenly across channels and reclaims each one
    /// down to its share.
    pub fn dynamic_free(&self, max_bytes: usize) {
        self.registry.dynamic_free(max_bytes);
    }

    /// Applies the configured memory limit, if any.
    ///
    /// Returns `false` when no [`BusConfig::memory_limit`] is set.
    pub fn reclaim(&self) -> bool {
        match self.cfg.memory_limit {
            Some(limit) => {
                self.registry.dynamic_free(limit);
                true
            }
            None => false,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_get_distinct_monotonic_ids() {
        let bus = EventBus::new();
        let p1 = bus.create_publisher();
        let p2 = bus.create_publisher();
        let l1 = bus.create_listener();
        let l2 = bus.create_listener();

        assert!(!p1.id().is_unset());
        assert!(p1.id().value() < p2.id().value());
        assert!(l1.id().value() < l2.id().value());
    }

    #[test]
    fn buses_are_independent() {
        let a = EventBus::new();
        let b = EventBus::new();

        a.create_publisher().publish(1_i32).expect("push accepted");
        assert_eq!(a.channel_count(), 1);
        assert_eq!(b.channel_count(), 0);
    }

    #[test]
    fn reclaim_honors_the_configured_limit() {
        let bus = EventBus::with_config(BusConfig {
            memory_limit: Some(4 * std::mem::size_of::<i64>()),
        });
        let publisher = bus.create_publisher();
        for v in 0..10_i64 {
            publisher.publish(v).expect("push accepted");
        }

        assert!(bus.reclaim());
        assert_eq!(bus.load().event_count, 4);

        let unlimited = EventBus::new();
        unlimited.create_publisher().publish(1_i64).expect("push");
        assert!(!unlimited.reclaim());
        assert_eq!(unlimited.load().event_count, 1);
    }
}
