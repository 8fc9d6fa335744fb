//! Area IPC Protocol
//!
//! Shared message types for communication between the window server and
//! its client applications.

pub mod update_proto;

pub use update_proto::{UpdateGeometry, UpdateReply, NULL_TOKEN, STATUS_ERROR, STATUS_OK};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding protocol data
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("view token list is missing its terminating null token")]
    MissingSentinel,

    #[error("unknown reply status {0}")]
    UnknownStatus(i32),

    #[error("malformed JSON message: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Server → Client Notifications
// ============================================================================

/// Notifications sent from the window server to the client owning a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// The window's frame moved; `x`/`y` is the new top-left corner
    WindowMoved { when_us: u64, x: i32, y: i32 },

    /// The window's frame was resized
    WindowResized { when_us: u64, width: i32, height: i32 },

    /// The window became (or stopped being) the active window
    WindowActivated { active: bool },

    /// A workspace the window lives on was switched to or away from
    WorkspaceActivated { workspace: u32, active: bool },

    /// The set of workspaces the window lives on changed
    WorkspacesChanged { old: u32, new: u32 },

    /// Parts of the window need redrawing; answer with `BeginUpdate`
    UpdateRequested,

    /// The close button was clicked
    QuitRequested,

    /// The zoom button was clicked
    ZoomRequested,

    /// The minimize button was clicked
    MinimizeRequested { minimize: bool },
}

// ============================================================================
// Client → Server Requests
// ============================================================================

/// Requests a client sends to the thread serving one of its windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Start drawing the update announced by `UpdateRequested`
    BeginUpdate,

    /// Drawing for the current update is finished
    EndUpdate,

    /// Invalidate a rectangle of a view (view-local, pixel-inclusive)
    Invalidate {
        token: i32,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
}

// ============================================================================
// Message Framing
// ============================================================================

/// A framed message with length prefix for reliable socket reads
#[derive(Debug)]
pub struct FramedMessage {
    pub data: Vec<u8>,
}

impl FramedMessage {
    /// Create a new framed message from serializable data
    pub fn new<T: Serialize>(msg: &T) -> Result<Self, ProtocolError> {
        let data = serde_json::to_vec(msg)?;
        Ok(Self { data })
    }

    /// Encode message with length prefix (4 bytes, big-endian)
    pub fn encode(&self) -> Vec<u8> {
        let len = self.data.len() as u32;
        let mut buf = Vec::with_capacity(4 + self.data.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Split one length-prefixed frame off the front of `buf`
    pub fn split_frame(buf: &[u8]) -> Result<(&[u8], &[u8]), ProtocolError> {
        if buf.len() < 4 {
            return Err(ProtocolError::Truncated {
                needed: 4,
                available: buf.len(),
            });
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let rest = &buf[4..];
        if rest.len() < len {
            return Err(ProtocolError::Truncated {
                needed: len,
                available: rest.len(),
            });
        }
        Ok(rest.split_at(len))
    }

    /// Decode a client notification from bytes
    pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Decode a client request from bytes
    pub fn decode_client_request(data: &[u8]) -> Result<ClientRequest, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
