//! Little-endian primitive codec shared by the framing and descriptor layers.
//!
//! All multi-byte integers on the wire are little-endian. Strings are
//! encoded as a u16 byte length (text length plus one for a trailing NUL)
//! followed by that many bytes, the last of which is `0x00`. Colors occupy
//! four bytes: red, green, blue and one padding byte that is never surfaced.

use crate::device::Color;
use crate::error::ProtocolError;
use bytes::BufMut;

/// Cursor-based reader over a reply body or descriptor record.
///
/// Every read advances the cursor by exactly the bytes it consumed, so the
/// position after one record is the start of the next. Out-of-bounds reads
/// fail with [`ProtocolError::Truncated`] instead of panicking or returning
/// garbage.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Advances the cursor past `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a length-prefixed string and strips the trailing NUL.
    ///
    /// Consumes `2 + length` bytes; the printable portion is `length - 1`
    /// bytes. A missing NUL terminator is tolerated rather than corrupting
    /// the cursor for everything that follows.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u16()? as usize;
        let raw = self.take(len)?;
        let text = match raw.split_last() {
            Some((0, body)) => body,
            _ => raw,
        };
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Reads a color triple and discards the padding byte.
    pub fn read_color(&mut self) -> Result<Color, ProtocolError> {
        let b = self.take(4)?;
        Ok(Color::new(b[0], b[1], b[2]))
    }
}

/// Writes a length-prefixed, NUL-terminated string.
///
/// The u16 prefix counts the text plus the NUL, so at most `u16::MAX - 1`
/// text bytes are representable; anything longer is truncated rather than
/// letting the prefix wrap and desynchronize the stream.
pub fn put_string(buf: &mut impl BufMut, s: &str) {
    let text = &s.as_bytes()[..s.len().min(u16::MAX as usize - 1)];
    buf.put_u16_le(text.len() as u16 + 1);
    buf.put_slice(text);
    buf.put_u8(0);
}

/// Writes a color triple followed by a zero padding byte.
pub fn put_color(buf: &mut impl BufMut, color: Color) {
    buf.put_u8(color.red);
    buf.put_u8(color.green);
    buf.put_u8(color.blue);
    buf.put_u8(0);
}

/// Writes a u16 count followed by 4-byte color entries.
pub fn put_color_list(buf: &mut impl BufMut, colors: &[Color]) {
    buf.put_u16_le(colors.len() as u16);
    for &color in colors {
        put_color(buf, color);
    }
}
