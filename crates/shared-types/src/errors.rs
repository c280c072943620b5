//! Wire-level error types shared by the QUIC transport and cluster membership.

use thiserror::Error;

/// Errors from decoding a [`crate::wire::ClusterFrame`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WireError {
    /// Frame shorter than the 10-byte minimum (§6).
    #[error("frame too short: {len} bytes, minimum is 10")]
    FrameTooShort {
        /// Bytes actually present.
        len: usize,
    },

    /// Sender-id length field claims more bytes than the frame contains.
    #[error("truncated sender id: claims {claimed} bytes, {available} available")]
    TruncatedSenderId {
        /// Length the frame's header claims.
        claimed: usize,
        /// Bytes actually remaining in the frame.
        available: usize,
    },

    /// Sender-id bytes are not valid UTF-8.
    #[error("sender id is not valid UTF-8")]
    InvalidSenderId,

    /// Unrecognized message-type tag.
    #[error("unknown message type tag: {0}")]
    UnknownMessageType(u8),
}
