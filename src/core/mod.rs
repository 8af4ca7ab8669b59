//! Bus core: the channel registry and the user-facing facade.
//!
//! ## Files & responsibilities
//! - **bus.rs**: [`EventBus`]; owns the registry, hands out handles,
//!   exposes load snapshots and bulk reclamation.
//! - **registry.rs**: `ChannelRegistry`, the canonical `TypeId → Channel`
//!   map; lazy channel creation, publish routing, load aggregation,
//!   budgeted reclamation.
//!
//! ## Wiring (module-level flow)
//! ```text
//! Publisher::publish::<T>(data)
//!   └─► ChannelRegistry::publish
//!         ├─► channel_of::<T>()   (create on first use)
//!         └─► Channel::push       (id + position sealed, waiters woken)
//!
//! Listener::read/wait/listen::<T>()
//!   └─► ChannelRegistry::channel_of::<T>()
//!         └─► Channel::pull_next(cursor) / Notify
//! ```

mod bus;
mod registry;

pub use bus::EventBus;
pub use registry::BusLoad;

pub(crate) use registry::ChannelRegistry;
