//! Per-type event channels.
//!
//! A channel stores events of exactly one payload type in push order and
//! serves them to independent cursors. Channels are created and owned by
//! the registry; user code only ever sees their effects through the
//! [`Listener`](crate::Listener) and [`Publisher`](crate::Publisher)
//! handles, plus the public [`ChannelStatus`].

mod channel;

pub use channel::ChannelStatus;

pub(crate) use channel::Channel;
