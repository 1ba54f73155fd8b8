//! # openrgb-protocol
//!
//! Wire protocol implementation for the OpenRGB SDK server.
//!
//! This crate provides:
//! - Binary packet framing with the 16-byte "ORGB" header
//! - The fixed command-id table
//! - Little-endian primitive codec for integers, strings and colors
//! - Version-aware device descriptor decoding and mode-update encoding

pub mod command;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod frame;
pub mod version;
pub mod wire;

pub use command::Command;
pub use device::{Color, Device, Led, Matrix, Mode, ModeFlags, Segment, Zone};
pub use error::ProtocolError;
pub use frame::{Packet, HEADER_SIZE, MAGIC};
pub use version::ProtocolFeatures;
pub use wire::Reader;

/// Highest protocol version this implementation understands.
pub const PROTOCOL_VERSION: u32 = 5;

/// Default port of the OpenRGB SDK server.
pub const DEFAULT_PORT: u16 = 6742;

/// Maximum accepted packet body size (16 MiB).
pub const MAX_BODY_SIZE: u32 = 16 * 1024 * 1024;
