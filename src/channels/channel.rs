//! # Channel: per-type ordered event store.
//!
//! One channel exists per payload type. It stores events in push order,
//! serves any number of independent cursors, and bounds memory through
//! explicit head reclamation.
//!
//! ## Architecture
//! ```text
//!  push ──► [status check] ──► assign id + position ──► queue/map insert
//!                                                            │
//!                                       notify_waiters() ◄───┘
//!
//!  pull_next(after) ──► index = (after + 1) - offset, clamped to head
//!  free_events(keep) ──► drop head entries, offset += removed
//! ```
//!
//! ## Rules
//! - Id and position assignment happen inside the push critical section:
//!   id order == queue order == delivery order.
//! - Logical positions (`index + offset`) never decrease, so listener
//!   cursors survive reclamation.
//! - A cursor pointing below the retained head is clamped to the first
//!   retained event, never skipped past it.
//! - Lock order is `status → store`; the listener count is atomic and
//!   participates in no lock ordering.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::error::PublishError;
use crate::events::{EventId, EventRecord, PublisherId};

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Accepting pushes and serving reads.
    Open,
    /// Terminal: retained events discarded, pushes rejected, reads empty.
    Closed,
    /// Pushes rejected, reads still served. Cleared only by `unblock`.
    Blocked,
    /// Reserved for a future drain-then-close transition; never entered.
    WaitingForClosure,
}

/// Retained events plus the bookkeeping that keeps logical positions
/// stable across reclamation.
struct EventStore {
    events: HashMap<EventId, Arc<EventRecord>>,
    queue: VecDeque<EventId>,
    /// Events reclaimed from the head so far; `queue[0]` sits at logical
    /// position `offset`.
    offset: u64,
    next_id: u64,
    data_size: usize,
}

/// Per-type ordered event store with cursor-based delivery.
pub(crate) struct Channel {
    type_id: TypeId,
    type_name: &'static str,
    payload_size: usize,
    status: RwLock<ChannelStatus>,
    store: RwLock<EventStore>,
    listeners: AtomicUsize,
    notify: Notify,
}

impl Channel {
    /// Creates an open, empty channel keyed by `T`.
    pub(crate) fn new<T: Send + Sync + 'static>() -> Arc<Self> {
        let channel = Arc::new(Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            payload_size: std::mem::size_of::<T>(),
            status: RwLock::new(ChannelStatus::Open),
            store: RwLock::new(EventStore {
                events: HashMap::new(),
                queue: VecDeque::new(),
                offset: 0,
                next_id: 0,
                data_size: 0,
            }),
            listeners: AtomicUsize::new(0),
            notify: Notify::new(),
        });
        tracing::debug!(channel = channel.type_name, "channel created");
        channel
    }

    /// Seals and stores one event, then wakes every waiter.
    ///
    /// The fresh event id and the queue position are assigned while the
    /// store lock is held, so concurrent pushes are totally ordered by
    /// that critical section. Rejections leave the channel untouched.
    pub(crate) fn push(
        &self,
        type_id: TypeId,
        payload_type: &'static str,
        publisher: PublisherId,
        payload: Arc<dyn Any + Send + Sync>,
    ) -> Result<Arc<EventRecord>, PublishError> {
        if type_id != self.type_id {
            return Err(PublishError::TypeMismatch {
                channel: self.type_name,
                expected: self.type_name,
                got: payload_type,
            });
        }

        let record = {
            let status = self.status.read();
            match *status {
                ChannelStatus::Open => {}
                ChannelStatus::Blocked => {
                    return Err(PublishError::Blocked {
                        channel: self.type_name,
                    })
                }
                // The reserved draining state rejects like Closed.
                ChannelStatus::Closed | ChannelStatus::WaitingForClosure => {
                    return Err(PublishError::Closed {
                        channel: self.type_name,
                    })
                }
            }

            let mut store = self.store.write();
            let id = EventId(store.next_id);
            store.next_id += 1;
            let position = store.offset + store.queue.len() as u64;
            let record = Arc::new(EventRecord {
                id,
                type_id,
                publisher,
                position,
                payload,
            });
            store.queue.push_back(id);
            store.events.insert(id, Arc::clone(&record));
            store.data_size += self.payload_size;
            record
        };

        self.notify.notify_waiters();
        tracing::trace!(
            channel = self.type_name,
            id = %record.id,
            position = record.position,
            "event stored"
        );
        Ok(record)
    }

    /// Peeks the newest retained event without touching any cursor.
    pub(crate) fn pull_latest(&self) -> Option<Arc<EventRecord>> {
        if self.status() == ChannelStatus::Closed {
            return None;
        }
        let store = self.store.read();
        let id = store.queue.back()?;
        store.events.get(id).cloned()
    }

    /// Returns the event whose logical position strictly follows `after`.
    ///
    /// `None` as a cursor means "from the head". A cursor whose successor
    /// was reclaimed is clamped to the first retained event. Returns
    /// `None` on a closed channel, an empty queue, or when no newer event
    /// exists yet.
    pub(crate) fn pull_next(&self, after: Option<u64>) -> Option<Arc<EventRecord>> {
        if self.status() == ChannelStatus::Closed {
            return None;
        }
        let store = self.store.read();
        if store.queue.is_empty() {
            return None;
        }
        let tail = store.offset + store.queue.len() as u64 - 1;
        let index = match after {
            None => 0,
            Some(pos) if pos >= tail => return None,
            Some(pos) => (pos + 1).saturating_sub(store.offset) as usize,
        };
        let id = store.queue.get(index)?;
        store.events.get(id).cloned()
    }

    /// Retains only the newest `n_keep` events.
    ///
    /// Reclamation proceeds from the head; `offset` advances by the
    /// number of removed events so surviving logical positions are
    /// unchanged. Keeping zero events leaves `offset` at the next-unused
    /// logical position. A no-op when nothing would be removed.
    pub(crate) fn free_events(&self, n_keep: usize) {
        let mut store = self.store.write();
        let len = store.queue.len();
        if n_keep >= len {
            return;
        }
        let removed = len - n_keep;
        if n_keep == 0 {
            store.offset += len as u64;
            store.events.clear();
            store.queue.clear();
            store.data_size = 0;
        } else {
            let store = &mut *store;
            for id in store.queue.drain(..removed) {
                store.events.remove(&id);
            }
            store.offset += removed as u64;
            store.data_size -= removed * self.payload_size;
        }
        tracing::trace!(
            channel = self.type_name,
            removed,
            kept = n_keep,
            "events reclaimed"
        );
    }

    /// Opens the channel for pushes. A blocked channel stays blocked;
    /// only [`Channel::unblock`] clears that state.
    ///
    /// Channels are born open; nothing reopens a closed one today, so
    /// this is exercised by tests only.
    #[allow(dead_code)]
    pub(crate) fn open(&self) -> ChannelStatus {
        let mut status = self.status.write();
        if *status == ChannelStatus::Blocked {
            return ChannelStatus::Blocked;
        }
        *status = ChannelStatus::Open;
        ChannelStatus::Open
    }

    /// Closes the channel: discards all retained events, resets the
    /// listener count, and wakes every waiter so they observe the end of
    /// the stream.
    pub(crate) fn close(&self) -> ChannelStatus {
        let listeners = self.listener_count();
        {
            let mut status = self.status.write();
            *status = ChannelStatus::Closed;
            self.free_events(0);
            self.listeners.store(0, AtomicOrdering::Relaxed);
        }
        self.notify.notify_waiters();
        tracing::debug!(channel = self.type_name, listeners, "channel closed");
        ChannelStatus::Closed
    }

    /// Rejects further pushes while still serving reads.
    pub(crate) fn block(&self) -> ChannelStatus {
        {
            let mut status = self.status.write();
            *status = ChannelStatus::Blocked;
        }
        self.notify.notify_waiters();
        tracing::debug!(channel = self.type_name, "channel blocked");
        ChannelStatus::Blocked
    }

    /// Reopens a blocked channel. Any other state is left as-is.
    pub(crate) fn unblock(&self) -> ChannelStatus {
        let mut status = self.status.write();
        if *status == ChannelStatus::Blocked {
            *status = ChannelStatus::Open;
        }
        *status
    }

    pub(crate) fn increase_listener_count(&self) {
        self.listeners.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Saturating decrement: `close` may have reset the count already.
    pub(crate) fn decrease_listener_count(&self) {
        let _ = self
            .listeners
            .fetch_update(AtomicOrdering::Relaxed, AtomicOrdering::Relaxed, |n| {
                n.checked_sub(1)
            });
    }

    pub(crate) fn status(&self) -> ChannelStatus {
        *self.status.read()
    }

    pub(crate) fn event_count(&self) -> usize {
        self.store.read().queue.len()
    }

    pub(crate) fn data_size(&self) -> usize {
        self.store.read().data_size
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Type identity admitted by this channel; fixed at construction.
    ///
    /// The push path compares against the field directly; the getter
    /// serves inspection.
    #[allow(dead_code)]
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Logical position of the newest retained event, if any.
    pub(crate) fn latest_position(&self) -> Option<u64> {
        let store = self.store.read();
        if store.queue.is_empty() {
            None
        } else {
            Some(store.offset + store.queue.len() as u64 - 1)
        }
    }

    /// Hook for waiters. Callers must pin and `enable` the future before
    /// re-checking their wait predicate, otherwise a push between check
    /// and await is lost: `notify_waiters` only wakes registered waiters.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
