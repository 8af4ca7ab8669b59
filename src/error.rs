//! # Error types surfaced by the bus.
//!
//! Publish rejections are the only error-shaped outcomes in the system.
//! Absent data (no newer event, closed channel on a read path) is always
//! an empty `Option`, never an error, and there is no panicking control
//! flow anywhere in the delivery paths.

use thiserror::Error;

/// Rejection raised when a channel cannot accept an event.
///
/// Every variant leaves the channel untouched: a rejected push has no
/// side effects.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The channel was closed; it no longer accepts or serves events.
    #[error("channel '{channel}' is closed")]
    Closed {
        /// Payload type name of the rejecting channel.
        channel: &'static str,
    },

    /// The channel is blocked for writing. Reads still work; the next
    /// push after an unblock is accepted normally.
    #[error("channel '{channel}' is blocked for writing")]
    Blocked {
        /// Payload type name of the rejecting channel.
        channel: &'static str,
    },

    /// The payload's runtime type does not match the channel's type
    /// identity. Unreachable through the typed API; kept as the boundary
    /// check for type-erased call paths.
    #[error("payload type '{got}' does not match channel '{channel}' expecting '{expected}'")]
    TypeMismatch {
        /// Payload type name of the rejecting channel.
        channel: &'static str,
        /// Type the channel admits.
        expected: &'static str,
        /// Runtime type of the rejected payload.
        got: &'static str,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Closed { .. } => "publish_closed",
            PublishError::Blocked { .. } => "publish_blocked",
            PublishError::TypeMismatch { .. } => "publish_type_mismatch",
        }
    }
}
