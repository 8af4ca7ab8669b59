//! # Listener: cursor-tracking read handle onto the bus.
//!
//! A listener consumes events of whichever types it chooses. For every
//! type it has touched, it keeps a cursor (the logical position of the
//! last delivered event) and a cached channel handle, so repeated reads
//! skip the registry.
//!
//! ## Delivery modes
//! - [`Listener::read`]: non-blocking poll for the next unread event.
//! - [`Listener::read_latest`]: snapshot of the newest event; does not
//!   move the cursor.
//! - [`Listener::wait`]: suspends until the next unread event arrives or
//!   the channel closes.
//! - [`Listener::listen`]: registers an async [`Handler`] and lets a
//!   worker task drive delivery.
//!
//! ## Architecture
//! ```text
//! read/wait::<T>() ──► cursors[TypeId] ──► Channel::pull_next(last)
//!                                               │ hit: advance cursor
//!                                               └ miss: Notify::notified
//!
//! listen::<T>(h1) ──► spawn worker ──► wait ──► h1(event)
//! listen::<T>(h2) ──►   (reused)  ──► wait ──► h1(event), h2(event)
//! ```
//!
//! ## Rules
//! - Per `(listener, type)`: every retained event is delivered once, in
//!   publication order. Across types there is no ordering.
//! - One worker task per `(listener, type)`; additional handlers join the
//!   existing worker and see events from their registration onwards.
//! - A closed channel is the end-of-stream signal: `wait` returns `None`
//!   and workers terminate. Polling reads re-resolve the type through the
//!   registry instead, so a stream recreated after `close_channel` is
//!   picked up from its start.
//! - Handler panics are caught and logged; the worker keeps running.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::actors::handler::Handler;
use crate::channels::{Channel, ChannelStatus};
use crate::core::ChannelRegistry;
use crate::events::{Event, ListenerId};

/// Per-type cursor: the cached channel plus the logical position of the
/// last event delivered through it. `None` means nothing read yet.
struct Cursor {
    channel: Arc<Channel>,
    last: Option<u64>,
}

/// State shared between the handle and its listen workers.
struct ListenerCore {
    id: ListenerId,
    registry: Arc<ChannelRegistry>,
    cursors: DashMap<TypeId, Cursor>,
    cancel: CancellationToken,
}

impl ListenerCore {
    /// First touch of a type: fetch the channel from the registry and
    /// count this listener on it.
    fn first_touch<T: Send + Sync + 'static>(&self) -> Cursor {
        let channel = self.registry.channel_of::<T>();
        channel.increase_listener_count();
        Cursor {
            channel,
            last: None,
        }
    }

    /// Returns the cached channel for `T`, touching it on first use.
    ///
    /// No healing: a closed cached channel is returned as-is, so `wait`
    /// and the listen workers observe the close as end-of-stream instead
    /// of silently resuming on a replacement stream.
    fn current_channel<T: Send + Sync + 'static>(&self) -> Arc<Channel> {
        let cursor = self
            .cursors
            .entry(TypeId::of::<T>())
            .or_insert_with(|| self.first_touch::<T>());
        Arc::clone(&cursor.channel)
    }

    /// Like [`ListenerCore::current_channel`], but when the cached
    /// channel has been closed and the registry holds a replacement
    /// (remove + later publish under the same type), the cursor migrates
    /// to the replacement and restarts from its head. Polling paths only.
    fn refreshed_channel<T: Send + Sync + 'static>(&self) -> Arc<Channel> {
        let mut cursor = self
            .cursors
            .entry(TypeId::of::<T>())
            .or_insert_with(|| self.first_touch::<T>());
        if cursor.channel.status() == ChannelStatus::Closed {
            let fresh = self.registry.channel_of::<T>();
            if !Arc::ptr_eq(&cursor.channel, &fresh) {
                // The closed channel reset its own listener count.
                fresh.increase_listener_count();
                cursor.channel = Arc::clone(&fresh);
                cursor.last = None;
            }
        }
        Arc::clone(&cursor.channel)
    }

    /// Polls `channel` for the event past this listener's cursor and
    /// advances the cursor on a hit.
    ///
    /// Returns `None` if the cursor has migrated away from `channel`:
    /// the stream the caller was following ended.
    fn poll_from<T: Send + Sync + 'static>(&self, channel: &Arc<Channel>) -> Option<Event<T>> {
        let mut cursor = self.cursors.get_mut(&TypeId::of::<T>())?;
        if !Arc::ptr_eq(&cursor.channel, channel) {
            return None;
        }
        let record = channel.pull_next(cursor.last)?;
        let event = Event::from_record(&record)?;
        cursor.last = Some(record.position);
        Some(event)
    }

    fn read_next<T: Send + Sync + 'static>(&self) -> Option<Event<T>> {
        let channel = self.refreshed_channel::<T>();
        self.poll_from::<T>(&channel)
    }

    /// Waits on one specific channel until a successor event arrives or
    /// the channel closes. Interest in the notifier is registered with
    /// `enable` *before* each predicate check; a push landing in between
    /// still wakes the waiter.
    async fn wait_on<T: Send + Sync + 'static>(&self, channel: &Arc<Channel>) -> Option<Event<T>> {
        loop {
            let mut notified = std::pin::pin!(channel.notified());
            notified.as_mut().enable();
            if let Some(event) = self.poll_from::<T>(channel) {
                return Some(event);
            }
            if channel.status() == ChannelStatus::Closed {
                return None;
            }
            notified.await;
        }
    }
}

/// Handle to the worker task driving callback delivery for one type.
struct ListenWorker {
    /// `mpsc::UnboundedSender<Arc<dyn Handler<T>>>` behind `dyn Any`;
    /// recovered by the generic [`Listener::listen`] that knows its `T`.
    register: Box<dyn Any + Send>,
    join: JoinHandle<ChannelStatus>,
}

/// Reads typed events from the bus.
///
/// Created by [`EventBus::create_listener`](crate::EventBus::create_listener).
/// Each listener owns independent cursors: two listeners on the same
/// channel both observe the full stream.
pub struct Listener {
    core: Arc<ListenerCore>,
    workers: Mutex<HashMap<TypeId, ListenWorker>>,
}

impl Listener {
    pub(crate) fn new(id: ListenerId, registry: Arc<ChannelRegistry>) -> Self {
        Self {
            core: Arc::new(ListenerCore {
                id,
                registry,
                cursors: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// This listener's id.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.core.id
    }

    /// Returns the next unread event of type `T`, advancing the cursor.
    ///
    /// `None` when no newer event exists or the channel is closed. After
    /// reclamation outran the cursor, the first retained event is
    /// delivered next; events in between are gone.
    pub fn read<T: Send + Sync + 'static>(&self) -> Option<Event<T>> {
        self.core.read_next::<T>()
    }

    /// Returns the newest retained event of type `T` without moving the
    /// cursor. Repeated calls without an intervening publish return the
    /// same event. May skip or repeat events relative to [`Listener::read`];
    /// it is a snapshot accessor.
    pub fn read_latest<T: Send + Sync + 'static>(&self) -> Option<Event<T>> {
        let channel = self.core.refreshed_channel::<T>();
        let record = channel.pull_latest()?;
        Event::from_record(&record)
    }

    /// Suspends until the next unread event of type `T` arrives.
    ///
    /// Returns `None` when the channel closes; that is the end-of-stream
    /// signal for tasks driving a `while let Some(..) = listener.wait()`
    /// loop.
    pub async fn wait<T: Send + Sync + 'static>(&self) -> Option<Event<T>> {
        let channel = self.core.current_channel::<T>();
        self.core.wait_on::<T>(&channel).await
    }

    /// Like [`Listener::wait`], giving up after `timeout`. `None` on
    /// timeout looks the same as a closed channel; poll
    /// [`Listener::has_unread`] to tell the cases apart if needed.
    pub async fn wait_timeout<T: Send + Sync + 'static>(
        &self,
        timeout: Duration,
    ) -> Option<Event<T>> {
        tokio::time::timeout(timeout, self.wait::<T>())
            .await
            .ok()
            .flatten()
    }

    /// Registers `handler` for events of type `T` and returns the channel
    /// status observed at registration.
    ///
    /// The first registration per type spawns a worker task that drives
    /// [`Listener::wait`] and invokes every registered handler per event,
    /// in registration order. Later registrations join the same worker and
    /// observe events from that point on. The worker terminates when the
    /// channel closes or the listener shuts down.
    ///
    /// Must be called within a tokio runtime.
    pub fn listen<T, H>(&self, handler: H) -> ChannelStatus
    where
        T: Send + Sync + 'static,
        H: Handler<T>,
    {
        let handler: Arc<dyn Handler<T>> = Arc::new(handler);
        let channel = self.core.current_channel::<T>();
        let status = channel.status();

        let mut workers = self.workers.lock();
        let joined = match workers.get(&TypeId::of::<T>()) {
            Some(worker) => worker
                .register
                .downcast_ref::<mpsc::UnboundedSender<Arc<dyn Handler<T>>>>()
                .is_some_and(|tx| tx.send(Arc::clone(&handler)).is_ok()),
            None => false,
        };
        if !joined {
            let (tx, rx) = mpsc::unbounded_channel();
            let join = tokio::spawn(run_worker::<T>(
                Arc::clone(&self.core),
                channel,
                handler,
                rx,
            ));
            workers.insert(
                TypeId::of::<T>(),
                ListenWorker {
                    register: Box::new(tx),
                    join,
                },
            );
        }
        status
    }

    /// True if an event of type `T` newer than the cursor is retained.
    pub fn has_unread<T: Send + Sync + 'static>(&self) -> bool {
        let channel = self.core.refreshed_channel::<T>();
        let Some(latest) = channel.latest_position() else {
            return false;
        };
        match self
            .core
            .cursors
            .get(&TypeId::of::<T>())
            .and_then(|cursor| cursor.last)
        {
            None => true,
            Some(last) => last < latest,
        }
    }

    /// Cancels every listen worker and waits for them to finish.
    pub async fn shutdown(self) {
        self.core.cancel.cancel();
        let workers: Vec<ListenWorker> = {
            let mut workers = self.workers.lock();
            workers.drain().map(|(_, worker)| worker).collect()
        };
        for worker in workers {
            let _ = worker.join.await;
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.core.cancel.cancel();
        for cursor in self.core.cursors.iter() {
            cursor.channel.decrease_listener_count();
        }
    }
}

/// Worker loop for one `(listener, type)` pair.
///
/// Waits on the channel captured at spawn time; a replacement channel
/// created after a close is a different stream and needs a new `listen`.
async fn run_worker<T: Send + Sync + 'static>(
    core: Arc<ListenerCore>,
    channel: Arc<Channel>,
    first: Arc<dyn Handler<T>>,
    mut added: mpsc::UnboundedReceiver<Arc<dyn Handler<T>>>,
) -> ChannelStatus {
    tracing::debug!(
        listener = %core.id,
        channel = channel.type_name(),
        "listen worker started"
    );

    let mut handlers = vec![first];
    loop {
        let event = tokio::select! {
            _ = core.cancel.cancelled() => break,
            event = core.wait_on::<T>(&channel) => match event {
                Some(event) => event,
                None => break,
            },
        };
        while let Ok(handler) = added.try_recv() {
            handlers.push(handler);
        }
        for handler in &handlers {
            let call = handler.on_event(event.clone());
            if let Err(panic) = std::panic::AssertUnwindSafe(call).catch_unwind().await {
                tracing::error!(
                    listener = %core.id,
                    handler = handler.name(),
                    panic = %panic_message(&*panic),
                    "handler panicked"
                );
            }
        }
    }

    let status = channel.status();
    tracing::debug!(
        listener = %core.id,
        channel = channel.type_name(),
        ?status,
        "listen worker stopped"
    );
    status
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("opaque panic payload")
    }
}
