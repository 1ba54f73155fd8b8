//! Version-aware descriptor codec.
//!
//! Decodes the variable-length controller descriptor returned by
//! `RequestControllerData` and encodes the request bodies the update
//! commands consume, most notably the mode-update payload.
//!
//! All sub-records advance one shared [`Reader`] cursor; after each record
//! the cursor sits exactly at the start of the next, with no look-ahead.

use crate::device::{Color, Device, Led, Matrix, Mode, ModeFlags, Segment, Zone};
use crate::error::ProtocolError;
use crate::version::ProtocolFeatures;
use crate::wire::{self, Reader};
use bytes::{BufMut, BytesMut};

/// Sentinel in a matrix grid marking a cell with no LED.
const MATRIX_NO_LED: u32 = 0xFFFF_FFFF;

/// Decodes a full device descriptor.
///
/// `version` is the session's negotiated protocol version; it decides which
/// optional fields are on the wire.
pub fn decode_device(body: &[u8], device_id: u32, version: u32) -> Result<Device, ProtocolError> {
    let features = ProtocolFeatures::for_version(version);
    let mut r = Reader::new(body);

    // The leading u32 is the descriptor's own size; the framing layer
    // already delimits the body, so it is skipped.
    r.skip(4)?;
    let kind = r.read_u32()?;
    let name = r.read_string()?;
    let vendor = if features.has_vendor {
        Some(r.read_string()?)
    } else {
        None
    };
    let description = r.read_string()?;
    let firmware_version = r.read_string()?;
    let serial = r.read_string()?;
    let location = r.read_string()?;

    let mode_count = r.read_u16()?;
    let active_mode = r.read_u32()?;
    let mut modes = Vec::with_capacity(mode_count as usize);
    for id in 0..mode_count as u32 {
        modes.push(decode_mode(&mut r, id, &features)?);
    }

    let zone_count = r.read_u16()?;
    let mut zones = Vec::with_capacity(zone_count as usize);
    for id in 0..zone_count as u32 {
        zones.push(decode_zone(&mut r, id, &features)?);
    }

    let led_count = r.read_u16()?;
    let mut leds = Vec::with_capacity(led_count as usize);
    for _ in 0..led_count {
        let name = r.read_string()?;
        let color = r.read_color()?;
        leds.push(Led { name, color });
    }

    let color_count = r.read_u16()?;
    let mut colors = Vec::with_capacity(color_count as usize);
    for _ in 0..color_count {
        colors.push(r.read_color()?);
    }

    let (alternate_led_names, flags) = if features.has_device_flags {
        let alt_count = r.read_u16()?;
        let mut names = Vec::with_capacity(alt_count as usize);
        for _ in 0..alt_count {
            names.push(r.read_string()?);
        }
        (Some(names), Some(r.read_u32()?))
    } else {
        (None, None)
    };

    Ok(Device {
        id: device_id,
        kind,
        name,
        vendor,
        description,
        version: firmware_version,
        serial,
        location,
        active_mode,
        modes,
        zones,
        leds,
        colors,
        alternate_led_names,
        flags,
    })
}

fn decode_mode(
    r: &mut Reader<'_>,
    id: u32,
    features: &ProtocolFeatures,
) -> Result<Mode, ProtocolError> {
    let name = r.read_string()?;
    let value = r.read_i32()?;
    let flags = ModeFlags::from_bits(r.read_u32()?);
    let mut speed_min = r.read_u32()?;
    let mut speed_max = r.read_u32()?;
    let (mut brightness_min, mut brightness_max) = if features.has_brightness {
        (Some(r.read_u32()?), Some(r.read_u32()?))
    } else {
        (None, None)
    };
    let mut color_min = r.read_u32()?;
    let mut color_max = r.read_u32()?;
    let mut speed = r.read_u32()?;
    let mut brightness = if features.has_brightness {
        Some(r.read_u32()?)
    } else {
        None
    };
    let mut direction = r.read_u32()?;
    let color_mode = r.read_u32()?;
    let mut color_count = r.read_u16()?;

    // Fields whose capability bit is unset carry junk on some servers;
    // normalize them to zero no matter what the wire held.
    if !flags.has_speed() {
        speed_min = 0;
        speed_max = 0;
        speed = 0;
    }
    if !flags.has_direction() {
        direction = 0;
    }
    if !flags.has_brightness() {
        brightness_min = brightness_min.map(|_| 0);
        brightness_max = brightness_max.map(|_| 0);
        brightness = brightness.map(|_| 0);
    }
    if !flags.has_any_color() || color_count == 0 {
        color_count = 0;
        color_min = 0;
        color_max = 0;
    }

    let mut colors = Vec::with_capacity(color_count as usize);
    for _ in 0..color_count {
        colors.push(r.read_color()?);
    }

    Ok(Mode {
        id,
        name,
        value,
        flags,
        speed_min,
        speed_max,
        brightness_min,
        brightness_max,
        color_min,
        color_max,
        speed,
        brightness,
        direction,
        color_mode,
        colors,
    })
}

fn decode_zone(
    r: &mut Reader<'_>,
    id: u32,
    features: &ProtocolFeatures,
) -> Result<Zone, ProtocolError> {
    let name = r.read_string()?;
    let kind = r.read_i32()?;
    let leds_min = r.read_u32()?;
    let leds_max = r.read_u32()?;
    let leds_count = r.read_u32()?;

    // Matrix block: a u16 byte size, zero meaning no matrix. The size
    // covers the two u32 dimensions plus height * width u32 cells.
    let matrix_size = r.read_u16()?;
    let matrix = if matrix_size > 0 {
        let height = r.read_u32()?;
        let width = r.read_u32()?;
        // The grid must fit in the remaining body before anything is
        // allocated; dimensions are wire data and cannot be trusted.
        let cells = (height as usize)
            .checked_mul(width as usize)
            .unwrap_or(usize::MAX);
        let grid_bytes = cells.saturating_mul(4);
        if grid_bytes > r.remaining() {
            return Err(ProtocolError::Truncated {
                offset: r.position(),
                needed: grid_bytes - r.remaining(),
            });
        }
        let mut keys = Vec::with_capacity(cells);
        for _ in 0..cells {
            let raw = r.read_u32()?;
            keys.push((raw != MATRIX_NO_LED).then_some(raw));
        }
        Some(Matrix {
            height,
            width,
            keys,
        })
    } else {
        None
    };

    let segments = if features.has_segments {
        let segment_count = r.read_u16()?;
        let mut segments = Vec::with_capacity(segment_count as usize);
        for _ in 0..segment_count {
            segments.push(Segment {
                name: r.read_string()?,
                kind: r.read_i32()?,
                start: r.read_u32()?,
                length: r.read_u32()?,
            });
        }
        segments
    } else {
        Vec::new()
    };

    let flags = if features.has_device_flags {
        Some(r.read_u32()?)
    } else {
        None
    };

    Ok(Zone {
        id,
        name,
        kind,
        leds_min,
        leds_max,
        leds_count,
        matrix,
        segments,
        flags,
    })
}

/// Encodes the `UpdateMode`/`SaveMode` payload for a mode snapshot.
///
/// Layout: a u32 prefix carrying the byte length of everything after it,
/// the mode id as i32, the length-prefixed name, then 9 (version < 3) or
/// 12 (version >= 3) packed u32 fields, then the color list. The prefix is
/// computed last so it stays correct after caller-supplied overrides were
/// merged into the snapshot.
pub fn encode_mode_update(mode: &Mode, version: u32) -> BytesMut {
    let features = ProtocolFeatures::for_version(version);

    let mut data = BytesMut::new();
    data.put_i32_le(mode.id as i32);
    wire::put_string(&mut data, &mode.name);
    data.put_i32_le(mode.value);
    data.put_u32_le(mode.flags.bits());
    data.put_u32_le(mode.speed_min);
    data.put_u32_le(mode.speed_max);
    if features.has_brightness {
        data.put_u32_le(mode.brightness_min.unwrap_or(0));
        data.put_u32_le(mode.brightness_max.unwrap_or(0));
    }
    data.put_u32_le(mode.color_min);
    data.put_u32_le(mode.color_max);
    data.put_u32_le(mode.speed);
    if features.has_brightness {
        data.put_u32_le(mode.brightness.unwrap_or(0));
    }
    data.put_u32_le(mode.direction);
    data.put_u32_le(mode.color_mode);
    wire::put_color_list(&mut data, &mode.colors);

    let mut payload = BytesMut::with_capacity(4 + data.len());
    payload.put_u32_le(data.len() as u32);
    payload.put_slice(&data);
    payload
}

/// Body of an `UpdateLeds` request: a u32 size prefix, a u16 color count
/// and 4-byte color entries.
pub fn encode_led_update(colors: &[Color]) -> BytesMut {
    let size = 2 + 4 * colors.len() as u32;
    let mut buf = BytesMut::with_capacity(4 + size as usize);
    buf.put_u32_le(size);
    wire::put_color_list(&mut buf, colors);
    buf
}

/// Body of an `UpdateZoneLeds` request.
pub fn encode_zone_led_update(zone_id: u32, colors: &[Color]) -> BytesMut {
    let size = 6 + 4 * colors.len() as u32;
    let mut buf = BytesMut::with_capacity(4 + size as usize);
    buf.put_u32_le(size);
    buf.put_u32_le(zone_id);
    wire::put_color_list(&mut buf, colors);
    buf
}

/// Body of an `UpdateSingleLed` request. No size prefix.
pub fn encode_single_led_update(led_id: u32, color: Color) -> BytesMut {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_u32_le(led_id);
    wire::put_color(&mut buf, color);
    buf
}

/// Body of a `ResizeZone` request.
pub fn encode_zone_resize(zone_id: i32, new_length: i32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_i32_le(zone_id);
    buf.put_i32_le(new_length);
    buf
}

/// Body of the name-bearing requests (client name, profile save/load/
/// delete): the raw bytes plus a trailing NUL, no length prefix.
pub fn encode_name(name: &str) -> BytesMut {
    let mut buf = BytesMut::with_capacity(name.len() + 1);
    buf.put_slice(name.as_bytes());
    buf.put_u8(0);
    buf
}

/// Body of a `RequestProtocolVersion` or `RequestControllerData` request:
/// the client's protocol version as a bare u32.
pub fn encode_version(version: u32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u32_le(version);
    buf
}

/// Decodes a `RequestProfileList` reply: a u32 size prefix, a u16 count
/// and that many length-prefixed names.
pub fn decode_profile_list(body: &[u8]) -> Result<Vec<String>, ProtocolError> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.read_u16()?;
    let mut profiles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        profiles.push(r.read_string()?);
    }
    Ok(profiles)
}
