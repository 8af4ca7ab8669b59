//! # Bus configuration.
//!
//! [`BusConfig`] centralizes the tunables of a bus instance. Reclamation
//! itself stays manual (`free_events` / `dynamic_free`); the config only
//! provides the budget that [`EventBus::reclaim`](crate::EventBus::reclaim)
//! applies.
//!
//! # Example
//! ```
//! use typebus::{BusConfig, EventBus};
//!
//! let cfg = BusConfig {
//!     memory_limit: Some(64 * 1024),
//! };
//! let bus = EventBus::with_config(cfg);
//! assert_eq!(bus.channel_count(), 0);
//! ```

/// Configuration for a bus instance.
#[derive(Clone, Debug, Default)]
pub struct BusConfig {
    /// Upper bound, in payload bytes across all channels, enforced by
    /// [`EventBus::reclaim`](crate::EventBus::reclaim). The budget is
    /// divided evenly across channels. `None` (the default) disables
    /// budget-driven reclamation.
    pub memory_limit: Option<usize>,
}
