//! High-level client API.

use crate::connection::{Connection, ConnectionConfig, Event};
use crate::error::ClientError;
use bytes::Bytes;
use openrgb_protocol::device::color_mode;
use openrgb_protocol::wire::Reader;
use openrgb_protocol::{descriptor, Color, Command, Device, Mode, ModeFlags};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Selects the mode targeted by an update.
#[derive(Debug, Clone)]
pub enum ModeSelector {
    /// Mode position as reported in the descriptor.
    Id(u32),
    /// Mode name, matched case-insensitively.
    Name(String),
}

impl std::fmt::Display for ModeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeSelector::Id(id) => write!(f, "id {id}"),
            ModeSelector::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Caller-supplied overrides applied to a freshly fetched mode snapshot.
///
/// Every field is optional; omitted ones keep the device's current
/// settings. Overrides are validated against the mode's capability flags
/// and min/max bounds before anything is sent.
#[derive(Debug, Clone, Default)]
pub struct ModeOverrides {
    pub speed: Option<u32>,
    pub brightness: Option<u32>,
    pub direction: Option<u32>,
    pub color_mode: Option<u32>,
    pub colors: Option<Vec<Color>>,
}

impl ModeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_brightness(mut self, brightness: u32) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_direction(mut self, direction: u32) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_color_mode(mut self, color_mode: u32) -> Self {
        self.color_mode = Some(color_mode);
        self
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = Some(colors);
        self
    }
}

/// High-level client for the OpenRGB SDK server.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Connects, negotiates the protocol version and announces the client
    /// name. Descriptor and update calls are permitted once this returns.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Disconnects. In-flight requests fail with `ConnectionClosed`.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// The session's negotiated protocol version; fixed until disconnect.
    pub fn protocol_version(&self) -> u32 {
        self.conn.protocol_version()
    }

    /// Subscribes to server notifications such as device-list changes.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.conn.subscribe_events()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Number of controllers the server exposes.
    pub async fn get_controller_count(&self) -> Result<u32, ClientError> {
        let reply = self
            .conn
            .request(Command::RequestControllerCount, 0, Bytes::new())
            .await?;
        Ok(Reader::new(&reply).read_u32()?)
    }

    /// Full descriptor of one controller. The result is a snapshot;
    /// re-request to observe server-side changes.
    pub async fn get_controller_data(&self, device_id: u32) -> Result<Device, ClientError> {
        let version = self.conn.protocol_version();
        let reply = self
            .conn
            .request(
                Command::RequestControllerData,
                device_id,
                descriptor::encode_version(version).freeze(),
            )
            .await?;
        Ok(descriptor::decode_device(&reply, device_id, version)?)
    }

    /// Descriptors of every controller, in id order.
    pub async fn get_all_controller_data(&self) -> Result<Vec<Device>, ClientError> {
        let count = self.get_controller_count().await?;
        let mut devices = Vec::with_capacity(count as usize);
        for device_id in 0..count {
            devices.push(self.get_controller_data(device_id).await?);
        }
        Ok(devices)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Names of the profiles stored on the server.
    pub async fn get_profile_list(&self) -> Result<Vec<String>, ClientError> {
        let reply = self
            .conn
            .request(Command::RequestProfileList, 0, Bytes::new())
            .await?;
        Ok(descriptor::decode_profile_list(&reply)?)
    }

    /// Saves the current device state as a named profile.
    pub async fn save_profile(&self, name: &str) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::SaveProfile,
                0,
                descriptor::encode_name(name).freeze(),
            )
            .await
    }

    /// Loads a stored profile.
    pub async fn load_profile(&self, name: &str) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::LoadProfile,
                0,
                descriptor::encode_name(name).freeze(),
            )
            .await
    }

    /// Deletes a stored profile.
    pub async fn delete_profile(&self, name: &str) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::DeleteProfile,
                0,
                descriptor::encode_name(name).freeze(),
            )
            .await
    }

    /// Renames this client in the server's client list.
    pub async fn set_client_name(&self, name: &str) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::SetClientName,
                0,
                descriptor::encode_name(name).freeze(),
            )
            .await
    }

    // =========================================================================
    // LED updates
    // =========================================================================

    /// Sets every LED of a device.
    pub async fn update_leds(&self, device_id: u32, colors: &[Color]) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::UpdateLeds,
                device_id,
                descriptor::encode_led_update(colors).freeze(),
            )
            .await
    }

    /// Sets every LED of one zone.
    pub async fn update_zone_leds(
        &self,
        device_id: u32,
        zone_id: u32,
        colors: &[Color],
    ) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::UpdateZoneLeds,
                device_id,
                descriptor::encode_zone_led_update(zone_id, colors).freeze(),
            )
            .await
    }

    /// Sets a single LED.
    pub async fn update_single_led(
        &self,
        device_id: u32,
        led_id: u32,
        color: Color,
    ) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::UpdateSingleLed,
                device_id,
                descriptor::encode_single_led_update(led_id, color).freeze(),
            )
            .await
    }

    /// Switches a device to its direct-control mode.
    pub async fn set_custom_mode(&self, device_id: u32) -> Result<(), ClientError> {
        self.conn
            .send(Command::SetCustomMode, device_id, Bytes::new())
            .await
    }

    /// Resizes a resizable zone.
    pub async fn resize_zone(
        &self,
        device_id: u32,
        zone_id: i32,
        new_length: i32,
    ) -> Result<(), ClientError> {
        self.conn
            .send(
                Command::ResizeZone,
                device_id,
                descriptor::encode_zone_resize(zone_id, new_length).freeze(),
            )
            .await
    }

    // =========================================================================
    // Mode updates
    // =========================================================================

    /// Activates a mode with the given overrides.
    pub async fn update_mode(
        &self,
        device_id: u32,
        selector: ModeSelector,
        overrides: ModeOverrides,
    ) -> Result<(), ClientError> {
        self.send_mode(device_id, selector, overrides, false).await
    }

    /// Activates a mode and saves it to the device.
    pub async fn save_mode(
        &self,
        device_id: u32,
        selector: ModeSelector,
        overrides: ModeOverrides,
    ) -> Result<(), ClientError> {
        self.send_mode(device_id, selector, overrides, true).await
    }

    async fn send_mode(
        &self,
        device_id: u32,
        selector: ModeSelector,
        overrides: ModeOverrides,
        save: bool,
    ) -> Result<(), ClientError> {
        let device = self.get_controller_data(device_id).await?;
        let mut mode = resolve_mode(&device, &selector)?.clone();

        if let Some(colors) = apply_overrides(&mut mode, &overrides)? {
            // Per-LED color modes take their colors through the LED
            // update path, not the mode payload.
            self.update_leds(device_id, &colors).await?;
        }

        let body = descriptor::encode_mode_update(&mode, self.conn.protocol_version());
        let command = if save {
            Command::SaveMode
        } else {
            Command::UpdateMode
        };
        self.conn.send(command, device_id, body.freeze()).await
    }
}

fn resolve_mode<'a>(device: &'a Device, selector: &ModeSelector) -> Result<&'a Mode, ClientError> {
    let found = match selector {
        ModeSelector::Id(id) => device.modes.iter().find(|m| m.id == *id),
        ModeSelector::Name(name) => device
            .modes
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name)),
    };
    found.ok_or_else(|| ClientError::InvalidSelector(selector.to_string()))
}

/// Merges overrides into the snapshot, validating each against the mode's
/// capability flags and bounds. Returns the colors to divert to the LED
/// update path when the mode takes per-LED colors.
fn apply_overrides(
    mode: &mut Mode,
    overrides: &ModeOverrides,
) -> Result<Option<Vec<Color>>, ClientError> {
    if let Some(speed) = overrides.speed {
        if !mode.flags.has_speed() {
            return Err(ClientError::ValidationFailed(format!(
                "mode {:?} has no adjustable speed",
                mode.name
            )));
        }
        if speed < mode.speed_min || speed > mode.speed_max {
            return Err(ClientError::ValidationFailed(format!(
                "speed {} outside [{}, {}]",
                speed, mode.speed_min, mode.speed_max
            )));
        }
        mode.speed = speed;
    }

    if let Some(brightness) = overrides.brightness {
        if !mode.flags.has_brightness() {
            return Err(ClientError::ValidationFailed(format!(
                "mode {:?} has no adjustable brightness",
                mode.name
            )));
        }
        match (mode.brightness_min, mode.brightness_max) {
            (Some(min), Some(max)) if (min..=max).contains(&brightness) => {
                mode.brightness = Some(brightness);
            }
            (Some(min), Some(max)) => {
                return Err(ClientError::ValidationFailed(format!(
                    "brightness {brightness} outside [{min}, {max}]"
                )));
            }
            _ => {
                return Err(ClientError::ValidationFailed(
                    "brightness requires protocol version 3".to_string(),
                ));
            }
        }
    }

    if let Some(direction) = overrides.direction {
        if !mode.flags.has_direction() {
            return Err(ClientError::ValidationFailed(format!(
                "mode {:?} has no adjustable direction",
                mode.name
            )));
        }
        // Direction values pair up per variant: 0/1 left-right, 2/3
        // up-down, 4/5 horizontal-vertical.
        let variant = match direction / 2 {
            0 => ModeFlags::DIRECTION_LR,
            1 => ModeFlags::DIRECTION_UD,
            2 => ModeFlags::DIRECTION_HV,
            _ => {
                return Err(ClientError::ValidationFailed(format!(
                    "direction {direction} out of range"
                )));
            }
        };
        if !mode.flags.has(variant) {
            return Err(ClientError::ValidationFailed(format!(
                "direction {} not supported by mode {:?}",
                direction, mode.name
            )));
        }
        mode.direction = direction;
    }

    if let Some(color_mode) = overrides.color_mode {
        mode.color_mode = color_mode;
    }

    if let Some(colors) = overrides.colors.clone() {
        if mode.color_mode == color_mode::PER_LED {
            return Ok(Some(colors));
        }
        let count = colors.len() as u32;
        if count < mode.color_min || count > mode.color_max {
            return Err(ClientError::ValidationFailed(format!(
                "color count {} outside [{}, {}]",
                count, mode.color_min, mode.color_max
            )));
        }
        mode.colors = colors;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mode() -> Mode {
        Mode {
            id: 1,
            name: "Wave".to_string(),
            value: 3,
            flags: ModeFlags::from_bits(
                ModeFlags::SPEED
                    | ModeFlags::DIRECTION_LR
                    | ModeFlags::BRIGHTNESS
                    | ModeFlags::MODE_SPECIFIC_COLOR,
            ),
            speed_min: 10,
            speed_max: 100,
            brightness_min: Some(0),
            brightness_max: Some(100),
            color_min: 1,
            color_max: 2,
            speed: 50,
            brightness: Some(100),
            direction: 0,
            color_mode: color_mode::MODE_SPECIFIC,
            colors: vec![Color::new(0, 0, 0)],
        }
    }

    fn sample_device(modes: Vec<Mode>) -> Device {
        Device {
            id: 0,
            kind: 5,
            name: "kb".to_string(),
            vendor: None,
            description: String::new(),
            version: String::new(),
            serial: String::new(),
            location: String::new(),
            active_mode: 0,
            modes,
            zones: Vec::new(),
            leds: Vec::new(),
            colors: Vec::new(),
            alternate_led_names: None,
            flags: None,
        }
    }

    #[test]
    fn test_resolve_mode_by_id_and_name() {
        let device = sample_device(vec![sample_mode()]);

        assert_eq!(
            resolve_mode(&device, &ModeSelector::Id(1)).unwrap().name,
            "Wave"
        );
        assert_eq!(
            resolve_mode(&device, &ModeSelector::Name("wAvE".to_string()))
                .unwrap()
                .id,
            1
        );

        let err = resolve_mode(&device, &ModeSelector::Id(9));
        assert!(matches!(err, Err(ClientError::InvalidSelector(_))));
        let err = resolve_mode(&device, &ModeSelector::Name("Rainbow".to_string()));
        assert!(matches!(err, Err(ClientError::InvalidSelector(_))));
    }

    #[test]
    fn test_apply_speed_override() {
        let mut mode = sample_mode();
        let redirect =
            apply_overrides(&mut mode, &ModeOverrides::new().with_speed(80)).unwrap();
        assert!(redirect.is_none());
        assert_eq!(mode.speed, 80);
    }

    #[test]
    fn test_speed_out_of_bounds_rejected() {
        let mut mode = sample_mode();
        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_speed(101));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));
        assert_eq!(mode.speed, 50);
    }

    #[test]
    fn test_speed_without_capability_rejected() {
        let mut mode = sample_mode();
        mode.flags = ModeFlags::from_bits(0);
        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_speed(50));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_brightness_override() {
        let mut mode = sample_mode();
        apply_overrides(&mut mode, &ModeOverrides::new().with_brightness(30)).unwrap();
        assert_eq!(mode.brightness, Some(30));

        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_brightness(101));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_brightness_pre_v3_rejected() {
        let mut mode = sample_mode();
        mode.brightness_min = None;
        mode.brightness_max = None;
        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_brightness(10));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_direction_variant_check() {
        let mut mode = sample_mode();
        // Left/right is supported.
        apply_overrides(&mut mode, &ModeOverrides::new().with_direction(1)).unwrap();
        assert_eq!(mode.direction, 1);

        // Up/down is not.
        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_direction(2));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));

        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_direction(6));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_color_count_bounds() {
        let mut mode = sample_mode();
        let colors = vec![Color::new(1, 1, 1); 3];
        let err = apply_overrides(&mut mode, &ModeOverrides::new().with_colors(colors));
        assert!(matches!(err, Err(ClientError::ValidationFailed(_))));

        let colors = vec![Color::new(1, 1, 1); 2];
        apply_overrides(&mut mode, &ModeOverrides::new().with_colors(colors.clone())).unwrap();
        assert_eq!(mode.colors, colors);
    }

    #[test]
    fn test_per_led_colors_redirected() {
        let mut mode = sample_mode();
        mode.color_mode = color_mode::PER_LED;
        let colors = vec![Color::new(9, 9, 9); 4];
        let redirect =
            apply_overrides(&mut mode, &ModeOverrides::new().with_colors(colors.clone()))
                .unwrap();
        assert_eq!(redirect, Some(colors));
        // The snapshot's own color list is left untouched.
        assert_eq!(mode.colors, vec![Color::new(0, 0, 0)]);
    }

    #[test]
    fn test_color_mode_override_applies_before_colors() {
        let mut mode = sample_mode();
        let overrides = ModeOverrides::new()
            .with_color_mode(color_mode::PER_LED)
            .with_colors(vec![Color::new(1, 2, 3)]);
        let redirect = apply_overrides(&mut mode, &overrides).unwrap();
        assert_eq!(redirect, Some(vec![Color::new(1, 2, 3)]));
        assert_eq!(mode.color_mode, color_mode::PER_LED);
    }
}
