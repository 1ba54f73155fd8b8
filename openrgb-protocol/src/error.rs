//! Protocol error types.

use thiserror::Error;

/// Errors produced while framing or decoding wire data.
///
/// A `Truncated` error is fatal for the decode that raised it: the cursor
/// can no longer be trusted, so the caller must discard the buffer instead
/// of resuming mid-record.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid magic bytes: expected 'ORGB', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("packet body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: u32, max: u32 },

    #[error("truncated data: need {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
}
