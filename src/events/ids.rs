//! Identifier types used across the bus.
//!
//! All three ids are plain `u64` newtypes. They are assigned from
//! per-bus (or, for [`EventId`], per-channel) monotonic counters and are
//! **not** unique across independent buses.

use std::fmt;

/// Identifier of an event within its channel.
///
/// Assigned at push time from the channel's monotonic counter; id order
/// equals queue order equals delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub(crate) u64);

impl EventId {
    /// Raw numeric value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a publisher handle.
///
/// `0` is reserved: events that were not published through a handle carry
/// [`PublisherId::UNSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherId(pub(crate) u64);

impl PublisherId {
    /// Reserved "no publisher" value.
    pub const UNSET: PublisherId = PublisherId(0);

    /// Raw numeric value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// True for the reserved unset value.
    #[must_use]
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a listener handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    /// Raw numeric value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
