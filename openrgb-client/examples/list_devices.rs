//! Lists every controller the local OpenRGB SDK server exposes.
//!
//! Run with `cargo run --example list_devices` while OpenRGB is running
//! with its SDK server enabled.

use openrgb_client::{Client, ClientError, ConnectionConfig};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let client = Client::new(ConnectionConfig::default().with_client_name("list-devices"));
    client.connect().await?;
    println!("protocol version {}", client.protocol_version());

    for device in client.get_all_controller_data().await? {
        println!("[{}] {} ({} leds)", device.id, device.name, device.leds.len());
        for mode in &device.modes {
            let marker = if mode.id == device.active_mode { "*" } else { " " };
            println!("  {marker} mode {}: {}", mode.id, mode.name);
        }
        for zone in &device.zones {
            println!("    zone {}: {} ({} leds)", zone.id, zone.name, zone.leds_count);
        }
    }

    client.disconnect().await?;
    Ok(())
}
