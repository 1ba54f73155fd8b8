//! Per-version feature table for the descriptor format.
//!
//! The descriptor wire shape changed across protocol revisions: the vendor
//! string appeared in version 1, brightness fields in version 3 (which also
//! grows the mode-update payload from 9 to 12 packed words), zone segments
//! in version 4, and device/zone flag words in version 5. The table is a
//! pure lookup consulted on every descriptor decode and mode encode.

/// Which optional descriptor fields exist at a given protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolFeatures {
    pub has_vendor: bool,
    pub has_brightness: bool,
    pub has_segments: bool,
    pub has_device_flags: bool,
}

impl ProtocolFeatures {
    /// Looks up the feature set for a negotiated protocol version.
    pub fn for_version(version: u32) -> Self {
        Self {
            has_vendor: version >= 1,
            has_brightness: version >= 3,
            has_segments: version >= 4,
            has_device_flags: version >= 5,
        }
    }

    /// Number of packed u32 fields in a mode-update payload.
    pub fn mode_update_words(&self) -> usize {
        if self.has_brightness {
            12
        } else {
            9
        }
    }
}
