//! Canonical descriptor data model.
//!
//! One set of types covers every protocol revision; fields that only exist
//! from a given version onwards are `Option`s left `None` on older streams.
//! Instances are immutable snapshots: the server does not push descriptor
//! changes, so callers re-request to observe new state.

/// An RGB color triple.
///
/// The wire representation carries a fourth padding byte that is never
/// surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// A single LED: its name and current color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Led {
    pub name: String,
    pub color: Color,
}

/// Mode capability bitfield.
///
/// Bits gate whether the associated numeric fields of a [`Mode`] carry
/// meaning; gated-off fields are normalized to zero during decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags(u32);

impl ModeFlags {
    /// Speed is adjustable.
    pub const SPEED: u32 = 1 << 0;
    /// Left/right direction variant.
    pub const DIRECTION_LR: u32 = 1 << 1;
    /// Up/down direction variant.
    pub const DIRECTION_UD: u32 = 1 << 2;
    /// Horizontal/vertical direction variant.
    pub const DIRECTION_HV: u32 = 1 << 3;
    /// Brightness is adjustable (protocol version 3 and up).
    pub const BRIGHTNESS: u32 = 1 << 4;
    /// Colors are set per LED.
    pub const PER_LED_COLOR: u32 = 1 << 5;
    /// Colors are specific to the mode.
    pub const MODE_SPECIFIC_COLOR: u32 = 1 << 6;
    /// Colors are chosen randomly.
    pub const RANDOM_COLOR: u32 = 1 << 7;
    /// Mode can be saved to the device manually.
    pub const MANUAL_SAVE: u32 = 1 << 8;
    /// Mode is saved to the device automatically.
    pub const AUTOMATIC_SAVE: u32 = 1 << 9;

    const DIRECTION_MASK: u32 = Self::DIRECTION_LR | Self::DIRECTION_UD | Self::DIRECTION_HV;
    const COLOR_MASK: u32 =
        Self::PER_LED_COLOR | Self::MODE_SPECIFIC_COLOR | Self::RANDOM_COLOR;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn has(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn has_speed(&self) -> bool {
        self.has(Self::SPEED)
    }

    /// Any of the three direction variants.
    pub fn has_direction(&self) -> bool {
        self.has(Self::DIRECTION_MASK)
    }

    pub fn has_brightness(&self) -> bool {
        self.has(Self::BRIGHTNESS)
    }

    pub fn has_per_led_color(&self) -> bool {
        self.has(Self::PER_LED_COLOR)
    }

    /// Any of the three color capabilities.
    pub fn has_any_color(&self) -> bool {
        self.has(Self::COLOR_MASK)
    }

    /// Capability tags derived from the set bits.
    ///
    /// If any direction variant is present a synthetic `"direction"` tag is
    /// appended after the per-variant tags.
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::new();
        for (bit, tag) in [
            (Self::SPEED, "speed"),
            (Self::DIRECTION_LR, "directionLR"),
            (Self::DIRECTION_UD, "directionUD"),
            (Self::DIRECTION_HV, "directionHV"),
            (Self::BRIGHTNESS, "brightness"),
            (Self::PER_LED_COLOR, "perLedColor"),
            (Self::MODE_SPECIFIC_COLOR, "modeSpecificColor"),
            (Self::RANDOM_COLOR, "randomColor"),
            (Self::MANUAL_SAVE, "manualSave"),
            (Self::AUTOMATIC_SAVE, "automaticSave"),
        ] {
            if self.has(bit) {
                tags.push(tag);
            }
        }
        if self.has_direction() {
            tags.push("direction");
        }
        tags
    }
}

/// Values of a mode's `color_mode` field.
pub mod color_mode {
    pub const NONE: u32 = 0;
    pub const PER_LED: u32 = 1;
    pub const MODE_SPECIFIC: u32 = 2;
    pub const RANDOM: u32 = 3;
}

/// A lighting mode of a device.
///
/// `id` is the mode's position in the descriptor; it is not transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub id: u32,
    pub name: String,
    pub value: i32,
    pub flags: ModeFlags,
    pub speed_min: u32,
    pub speed_max: u32,
    /// Present from protocol version 3.
    pub brightness_min: Option<u32>,
    /// Present from protocol version 3.
    pub brightness_max: Option<u32>,
    pub color_min: u32,
    pub color_max: u32,
    pub speed: u32,
    /// Present from protocol version 3.
    pub brightness: Option<u32>,
    pub direction: u32,
    pub color_mode: u32,
    pub colors: Vec<Color>,
}

impl Mode {
    /// Capability tags derived from the flag word.
    pub fn flag_list(&self) -> Vec<&'static str> {
        self.flags.tags()
    }
}

/// A 2-D LED matrix layout. Cells without an LED are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    pub height: u32,
    pub width: u32,
    /// Row-major grid of LED indices, `height * width` entries.
    pub keys: Vec<Option<u32>>,
}

impl Matrix {
    /// LED index at the given cell, if any.
    pub fn get(&self, row: u32, col: u32) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.keys
            .get((row * self.width + col) as usize)
            .copied()
            .flatten()
    }
}

/// A named sub-range of a zone (protocol version 4 and up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub kind: i32,
    pub start: u32,
    pub length: u32,
}

/// A contiguous, possibly resizable group of LEDs.
///
/// `id` is the zone's position in the descriptor; it is not transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: u32,
    pub name: String,
    pub kind: i32,
    pub leds_min: u32,
    pub leds_max: u32,
    pub leds_count: u32,
    pub matrix: Option<Matrix>,
    /// Present from protocol version 4.
    pub segments: Vec<Segment>,
    /// Present from protocol version 5.
    pub flags: Option<u32>,
}

impl Zone {
    /// A zone is resizable when its min and max LED counts differ.
    /// Purely derived, never transmitted.
    pub fn resizable(&self) -> bool {
        self.leds_min != self.leds_max
    }
}

/// A full controller descriptor: an immutable snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: u32,
    pub kind: u32,
    pub name: String,
    /// Present from protocol version 1.
    pub vendor: Option<String>,
    pub description: String,
    pub version: String,
    pub serial: String,
    pub location: String,
    pub active_mode: u32,
    pub modes: Vec<Mode>,
    pub zones: Vec<Zone>,
    pub leds: Vec<Led>,
    pub colors: Vec<Color>,
    /// Present from protocol version 5.
    pub alternate_led_names: Option<Vec<String>>,
    /// Present from protocol version 5.
    pub flags: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags_tags() {
        let flags = ModeFlags::from_bits(ModeFlags::SPEED);
        assert_eq!(flags.tags(), vec!["speed"]);

        let flags = ModeFlags::from_bits(ModeFlags::DIRECTION_LR | ModeFlags::RANDOM_COLOR);
        assert_eq!(flags.tags(), vec!["directionLR", "randomColor", "direction"]);

        assert!(ModeFlags::from_bits(0).tags().is_empty());
    }

    #[test]
    fn test_mode_flags_predicates() {
        let flags = ModeFlags::from_bits(ModeFlags::DIRECTION_UD | ModeFlags::BRIGHTNESS);
        assert!(flags.has_direction());
        assert!(flags.has_brightness());
        assert!(!flags.has_speed());
        assert!(!flags.has_any_color());
    }

    #[test]
    fn test_zone_resizable_is_derived() {
        let zone = Zone {
            id: 0,
            name: "strip".to_string(),
            kind: 1,
            leds_min: 10,
            leds_max: 60,
            leds_count: 30,
            matrix: None,
            segments: Vec::new(),
            flags: None,
        };
        assert!(zone.resizable());

        let fixed = Zone {
            leds_min: 30,
            leds_max: 30,
            ..zone
        };
        assert!(!fixed.resizable());
    }

    #[test]
    fn test_matrix_get() {
        let matrix = Matrix {
            height: 2,
            width: 3,
            keys: vec![Some(0), Some(1), None, Some(3), Some(4), Some(5)],
        };
        assert_eq!(matrix.get(0, 0), Some(0));
        assert_eq!(matrix.get(0, 2), None);
        assert_eq!(matrix.get(1, 0), Some(3));
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.get(0, 3), None);
    }
}
