//! # Cluster Wire Frame
//!
//! The binary frame that crosses the QUIC transport between validators, and
//! the JSON payload bodies carried inside it.
//!
//! ## Frame layout
//!
//! ```text
//! +--------+----------------+----------+------------------+---------+
//! | type   | timestamp (LE) | id_len   | sender_id (utf8) | payload |
//! | 1 byte | 8 bytes        | 1 byte   | id_len bytes     | rest    |
//! +--------+----------------+----------+------------------+---------+
//! ```
//!
//! A frame shorter than 10 bytes (the fixed header) cannot be decoded.

use serde::{Deserialize, Serialize};

use crate::errors::WireError;

const HEADER_LEN: usize = 10;

/// Tag byte identifying a [`ClusterFrame`]'s payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterMessageType {
    Handshake,
    Ping,
    Pong,
    BlockAnnouncement,
    TransactionForward,
    ClusterInfo,
    Vote,
    ShredData,
}

impl ClusterMessageType {
    /// The tag byte this variant is encoded as on the wire.
    pub fn tag(self) -> u8 {
        match self {
            Self::Handshake => 0,
            Self::Ping => 1,
            Self::Pong => 2,
            Self::BlockAnnouncement => 3,
            Self::TransactionForward => 4,
            Self::ClusterInfo => 5,
            Self::Vote => 6,
            Self::ShredData => 7,
        }
    }

    /// Recovers a message type from its wire tag.
    pub fn try_from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::Ping),
            2 => Ok(Self::Pong),
            3 => Ok(Self::BlockAnnouncement),
            4 => Ok(Self::TransactionForward),
            5 => Ok(Self::ClusterInfo),
            6 => Ok(Self::Vote),
            7 => Ok(Self::ShredData),
            other => Err(WireError::UnknownMessageType(other)),
        }
    }
}

/// A decoded cluster wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterFrame {
    pub message_type: ClusterMessageType,
    pub timestamp: u64,
    pub sender_id: String,
    pub payload: Vec<u8>,
}

impl ClusterFrame {
    /// Builds a frame ready for [`ClusterFrame::encode`].
    pub fn new(
        message_type: ClusterMessageType,
        timestamp: u64,
        sender_id: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_type,
            timestamp,
            sender_id: sender_id.into(),
            payload,
        }
    }

    /// Serializes this frame to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let sender_id_bytes = self.sender_id.as_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + sender_id_bytes.len() + self.payload.len());
        out.push(self.message_type.tag());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.push(sender_id_bytes.len() as u8);
        out.extend_from_slice(sender_id_bytes);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses a frame from its wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::FrameTooShort { len: bytes.len() });
        }

        let message_type = ClusterMessageType::try_from_tag(bytes[0])?;
        let timestamp = u64::from_le_bytes(bytes[1..9].try_into().unwrap());
        let id_len = bytes[9] as usize;

        let available = bytes.len() - HEADER_LEN;
        if id_len > available {
            return Err(WireError::TruncatedSenderId {
                claimed: id_len,
                available,
            });
        }

        let sender_id = std::str::from_utf8(&bytes[HEADER_LEN..HEADER_LEN + id_len])
            .map_err(|_| WireError::InvalidSenderId)?
            .to_owned();
        let payload = bytes[HEADER_LEN + id_len..].to_vec();

        Ok(Self {
            message_type,
            timestamp,
            sender_id,
            payload,
        })
    }
}

/// Handshake payload exchanged when two validators first connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePayload {
    #[serde(rename = "type")]
    pub message_type: String,
    pub node_id: String,
    pub version: String,
}

/// Liveness probe payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: u64,
}

/// Announces a newly produced block to the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAnnouncementPayload {
    pub slot: u64,
    pub hash: String,
    pub size: u64,
}

/// A leader vote for a slot, used to update the locally tracked leader and
/// current slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotePayload {
    pub node_id: String,
    pub slot: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_frame() {
        let frame = ClusterFrame::new(
            ClusterMessageType::Ping,
            1_700_000_000,
            "node_1a2b",
            vec![9, 9, 9],
        );
        let encoded = frame.encode();
        let decoded = ClusterFrame::decode(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_frames_shorter_than_header() {
        let err = ClusterFrame::decode(&[0u8; 5]).unwrap_err();
        assert_eq!(err, WireError::FrameTooShort { len: 5 });
    }

    #[test]
    fn rejects_truncated_sender_id() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[9] = 200;
        let err = ClusterFrame::decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            WireError::TruncatedSenderId {
                claimed: 200,
                available: 0
            }
        );
    }

    #[test]
    fn rejects_unknown_message_type() {
        let err = ClusterMessageType::try_from_tag(250).unwrap_err();
        assert_eq!(err, WireError::UnknownMessageType(250));
    }

    #[test]
    fn handshake_payload_round_trips_through_json() {
        let payload = HandshakePayload {
            message_type: "handshake".into(),
            node_id: "node_1a2b".into(),
            version: "1.0.0".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: HandshakePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_id, payload.node_id);
    }
}
