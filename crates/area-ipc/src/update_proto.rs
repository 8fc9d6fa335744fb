//! Binary reply to `BeginUpdate`.
//!
//! # Wire format (little-endian)
//!
//! 1. `i32` status: [`STATUS_OK`] or [`STATUS_ERROR`]. An error reply ends here.
//! 2. `f32` x, `f32` y: the window frame's top-left corner
//! 3. `f32` width, `f32` height: the window frame size
//! 4. `i32` view tokens of every view intersecting the dirty region,
//!    terminated by [`NULL_TOKEN`]

use crate::ProtocolError;

pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = -1;

/// Terminates the view token list
pub const NULL_TOKEN: i32 = -1;

/// Frame geometry and views the client has to redraw
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateGeometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub tokens: Vec<i32>,
}

/// Reply the client receives after asking to begin an update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateReply {
    Error,
    Begin(UpdateGeometry),
}

impl UpdateReply {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            UpdateReply::Error => STATUS_ERROR.to_le_bytes().to_vec(),
            UpdateReply::Begin(geometry) => {
                let mut buf = Vec::with_capacity(4 * (6 + geometry.tokens.len()));
                buf.extend_from_slice(&STATUS_OK.to_le_bytes());
                buf.extend_from_slice(&geometry.left.to_le_bytes());
                buf.extend_from_slice(&geometry.top.to_le_bytes());
                buf.extend_from_slice(&geometry.width.to_le_bytes());
                buf.extend_from_slice(&geometry.height.to_le_bytes());
                for token in &geometry.tokens {
                    buf.extend_from_slice(&token.to_le_bytes());
                }
                buf.extend_from_slice(&NULL_TOKEN.to_le_bytes());
                buf
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader { data, offset: 0 };
        match reader.word()? {
            STATUS_ERROR => Ok(UpdateReply::Error),
            STATUS_OK => {
                let left = f32::from_le_bytes(reader.bytes()?);
                let top = f32::from_le_bytes(reader.bytes()?);
                let width = f32::from_le_bytes(reader.bytes()?);
                let height = f32::from_le_bytes(reader.bytes()?);
                let mut tokens = Vec::new();
                loop {
                    if reader.remaining() == 0 {
                        return Err(ProtocolError::MissingSentinel);
                    }
                    match reader.word()? {
                        NULL_TOKEN => break,
                        token => tokens.push(token),
                    }
                }
                Ok(UpdateReply::Begin(UpdateGeometry {
                    left,
                    top,
                    width,
                    height,
                    tokens,
                }))
            }
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn bytes(&mut self) -> Result<[u8; 4], ProtocolError> {
        let end = self.offset + 4;
        let slice = self
            .data
            .get(self.offset..end)
            .ok_or(ProtocolError::Truncated {
                needed: 4,
                available: self.remaining(),
            })?;
        self.offset = end;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn word(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.bytes()?))
    }
}
