//! # openrgb-client
//!
//! Async TCP client for the OpenRGB SDK server.
//!
//! [`Client`] wraps a [`Connection`] with typed operations: controller
//! enumeration, LED and mode updates, zone resizing and profile
//! management. Replies are correlated to requests over a single socket,
//! so concurrent calls from multiple tasks are safe.
//!
//! ```no_run
//! use openrgb_client::{Client, ConnectionConfig};
//!
//! # async fn run() -> Result<(), openrgb_client::ClientError> {
//! let client = Client::new(ConnectionConfig::default());
//! client.connect().await?;
//! for device in client.get_all_controller_data().await? {
//!     println!("{}: {}", device.id, device.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;

pub use client::{Client, ModeOverrides, ModeSelector};
pub use connection::{Connection, ConnectionConfig, Event, SessionState};
pub use error::ClientError;

pub use openrgb_protocol as protocol;
