//! Remote site transport.
//!
//! A LOCAL process reaches the REMOTE site's files through a small
//! request/response protocol over TCP:
//!
//! - [`SiteServer`]: runs next to the remote data directory and serves any
//!   [`SiteStorage`](crate::SiteStorage)
//! - [`RemoteStore`]: the client, itself a `SiteStorage`, so the engine
//!   cannot tell a remote table from a local one
//!
//! Every message travels in one frame:
//!
//! ```text
//! ┌────────────┬────────────┬──────────────────────┐
//! │ magic (4)  │ length (4) │ bincode payload      │
//! └────────────┴────────────┴──────────────────────┘
//! ```

mod client;
mod protocol;
mod server;

pub use client::RemoteStore;
pub use protocol::{dispatch, RemoteFailure, SiteRequest, SiteResponse};
pub use server::SiteServer;

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the remote site failed.
    #[error("connection failed to {addr}: {reason}")]
    ConnectionFailed {
        /// The target address.
        addr: String,
        /// The reason for failure.
        reason: String,
    },

    /// Message serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Message deserialization failed.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// The peer answered with an unexpected message.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Connection was closed by the peer.
    #[error("connection closed")]
    Closed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Message framing.
pub mod frame {
    use bytes::{Buf, BufMut, Bytes, BytesMut};
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    use super::{TransportError, TransportResult};

    /// Magic number for message framing.
    pub const FRAME_MAGIC: u32 = 0x5457_494E; // "TWIN"

    /// Maximum message size (64 MB).
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

    /// Header size in bytes.
    pub const HEADER_SIZE: usize = 4 + 4; // magic + len

    /// Encodes a message into a frame.
    pub fn encode<T: Serialize>(message: &T) -> TransportResult<Bytes> {
        let payload = bincode::serialize(message)
            .map_err(|e| TransportError::SerializationFailed(e.to_string()))?;

        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::SerializationFailed(format!(
                "message too large: {} bytes",
                payload.len()
            )));
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u32(FRAME_MAGIC);
        buf.put_u32(payload.len() as u32);
        buf.put_slice(&payload);

        Ok(buf.freeze())
    }

    /// Validates a frame header and returns the payload length.
    pub fn payload_len(header: &[u8]) -> TransportResult<usize> {
        if header.len() < HEADER_SIZE {
            return Err(TransportError::DeserializationFailed(
                "frame too short".to_string(),
            ));
        }

        let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if magic != FRAME_MAGIC {
            return Err(TransportError::DeserializationFailed(format!(
                "invalid magic: {magic:08x}"
            )));
        }

        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(TransportError::DeserializationFailed(format!(
                "message too large: {len} bytes"
            )));
        }

        Ok(len)
    }

    /// Decodes a frame into a message.
    pub fn decode<T: DeserializeOwned>(mut data: Bytes) -> TransportResult<T> {
        let len = payload_len(&data)?;
        data.advance(HEADER_SIZE);

        if data.len() < len {
            return Err(TransportError::DeserializationFailed(
                "incomplete frame".to_string(),
            ));
        }

        let payload = data.slice(..len);
        bincode::deserialize(&payload)
            .map_err(|e| TransportError::DeserializationFailed(e.to_string()))
    }

    /// Checks if a buffer contains a complete frame.
    ///
    /// Returns the frame size if complete, or `None` if more data is needed.
    pub fn frame_size(data: &[u8]) -> Option<usize> {
        if data.len() < HEADER_SIZE {
            return None;
        }

        let len = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let total = HEADER_SIZE + len;

        if data.len() >= total {
            Some(total)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::frame::{self, HEADER_SIZE};
    use super::*;

    #[test]
    fn test_frame_encode_decode() {
        let request = SiteRequest::ReadColumnValues {
            table: "employee".to_string(),
            column: "dept_id".to_string(),
        };

        let encoded = frame::encode(&request).unwrap();
        assert_eq!(frame::frame_size(&encoded), Some(encoded.len()));
        assert_eq!(frame::frame_size(&encoded[..HEADER_SIZE]), None);

        let decoded: SiteRequest = frame::decode(encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_frame_invalid_magic() {
        let mut data = vec![0u8; 16];
        data[0] = 0xFF;
        let result: TransportResult<SiteRequest> = frame::decode(bytes::Bytes::from(data));
        assert!(matches!(result, Err(TransportError::DeserializationFailed(_))));
    }

    #[test]
    fn test_frame_incomplete_payload() {
        let encoded = frame::encode(&SiteRequest::ReadLocalCatalog).unwrap();
        let truncated = encoded.slice(..encoded.len() - 1);
        let result: TransportResult<SiteRequest> = frame::decode(truncated);
        assert!(result.is_err());
    }
}
