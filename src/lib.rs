//! # typebus
//!
//! **Typebus** is an in-process, type-routed publish/subscribe bus.
//!
//! Publishers emit plain values; listeners retrieve them by data type.
//! Each type gets its own channel that preserves publication order,
//! serves any number of independent cursors, and bounds memory through
//! explicit reclamation. The crate is designed as a building block for
//! decoupling the components of a single application.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types / traits               |
//! |-------------------|--------------------------------------------------------------------|----------------------------------|
//! | **Publishing**    | Typed emit helpers; channels created on first use.                 | [`Publisher`]                    |
//! | **Consuming**     | Polling, blocking wait, and callback-driven delivery per type.     | [`Listener`], [`Handler`]        |
//! | **Events**        | Immutable, shared payloads with stable ids and positions.          | [`Event`], [`EventId`]           |
//! | **Lifecycle**     | Channel open/blocked/closed states; close as end-of-stream signal. | [`ChannelStatus`]                |
//! | **Reclamation**   | Keep-newest and byte-budget bulk reclamation.                      | [`EventBus`], [`BusConfig`]      |
//! | **Observability** | Aggregate load snapshots; `tracing` instrumentation throughout.    | [`BusLoad`]                      |
//! | **Errors**        | Typed publish rejections; absent data is `Option`, never an error. | [`PublishError`]                 |
//!
//! ## Guarantees
//! - Within one channel, every observer sees events in publication order.
//! - A listener polling [`Listener::read`] sees each retained event
//!   exactly once, with no duplicates and no re-orderings.
//! - Reclamation never moves a surviving event's logical position;
//!   cursors that fall behind resume at the retained head.
//! - Across channels, no ordering is enforced.
//!
//! ```no_run
//! use typebus::EventBus;
//!
//! #[derive(Debug)]
//! struct Tick(u64);
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus = EventBus::new();
//!     let publisher = bus.create_publisher();
//!     let listener = bus.create_listener();
//!
//!     let consumer = tokio::spawn(async move {
//!         // `wait` returns `None` once the channel closes.
//!         while let Some(event) = listener.wait::<Tick>().await {
//!             println!("tick {}", event.data().0);
//!         }
//!     });
//!
//!     for n in 0..100 {
//!         publisher.publish(Tick(n)).expect("channel open");
//!     }
//!     publisher.close_channel::<Tick>();
//!     consumer.await.expect("consumer finished");
//! }
//! ```

mod actors;
mod channels;
mod config;
mod core;
mod error;
mod events;

// ---- Public re-exports ----

pub use actors::{Handler, Listener, Publisher};
pub use channels::ChannelStatus;
pub use config::BusConfig;
pub use core::{BusLoad, EventBus};
pub use error::PublishError;
pub use events::{Event, EventId, ListenerId, PublisherId};
