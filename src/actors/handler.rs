//! # Handler: async callback for delivered events.
//!
//! [`Handler`] is the extension point for callback-mode listening via
//! [`Listener::listen`](crate::Listener::listen).
//!
//! ## Rules
//! - Handlers for one `(listener, type)` pair run on a single worker
//!   task, in registration order, one event at a time.
//! - A slow handler delays later handlers of the same type, never other
//!   types or other listeners.
//! - Panics are caught by the worker and logged; delivery continues.
//!
//! ## Example
//! ```rust,no_run
//! use async_trait::async_trait;
//! use typebus::{Event, EventBus, Handler};
//!
//! struct Counter;
//!
//! #[async_trait]
//! impl Handler<u32> for Counter {
//!     async fn on_event(&self, event: Event<u32>) {
//!         println!("saw {}", event.data());
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let listener = bus.create_listener();
//! listener.listen(Counter);
//! // Plain closures work too:
//! listener.listen(|event: typebus::Event<u32>| {
//!     println!("also saw {}", event.data());
//! });
//! # }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Asynchronous callback invoked for every delivered event of type `T`.
#[async_trait]
pub trait Handler<T>: Send + Sync + 'static {
    /// Processes one delivered event.
    ///
    /// Runs on the listen worker for `T`, never in the publisher's
    /// context. Events arrive in strict publication order.
    async fn on_event(&self, event: Event<T>);

    /// Name used in logs when the handler misbehaves.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Plain functions and closures are handlers.
#[async_trait]
impl<T, F> Handler<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(Event<T>) + Send + Sync + 'static,
{
    async fn on_event(&self, event: Event<T>) {
        self(event);
    }
}
