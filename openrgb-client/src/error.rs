//! Client error types.

use openrgb_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server did not answer protocol version negotiation")]
    ProtocolMismatch,

    #[error("no mode matches selector {0}")]
    InvalidSelector(String),

    #[error("mode update rejected: {0}")]
    ValidationFailed(String),
}
