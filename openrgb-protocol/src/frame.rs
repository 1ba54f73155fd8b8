//! Binary packet framing.
//!
//! Every message starts with a fixed 16-byte header:
//!
//! ```text
//! +--------+-----------+------------+----------+
//! | magic  | device_id | command_id | body_len |
//! | "ORGB" |  4 bytes  |  4 bytes   | 4 bytes  |
//! +--------+-----------+------------+----------+
//! ```
//!
//! All integers are little-endian. The body follows immediately and may be
//! empty. The stream gives no alignment guarantees: a packet may arrive
//! split across several reads or coalesced with others in one read, so
//! [`Packet::decode`] consumes nothing until a full packet is buffered and
//! must be called in a loop to drain everything available.

use crate::error::ProtocolError;
use crate::MAX_BODY_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Magic bytes identifying SDK packets: "ORGB".
pub const MAGIC: [u8; 4] = *b"ORGB";

/// Size of the fixed packet header in bytes.
pub const HEADER_SIZE: usize = 16;

/// A framed protocol packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub device_id: u32,
    pub command_id: u32,
    pub body: Bytes,
}

impl Packet {
    pub fn new(device_id: u32, command_id: u32, body: Bytes) -> Self {
        Self {
            device_id,
            command_id,
            body,
        }
    }

    /// Encodes the packet, header first.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.body.len());
        buf.put_slice(&MAGIC);
        buf.put_u32_le(self.device_id);
        buf.put_u32_le(self.command_id);
        buf.put_u32_le(self.body.len() as u32);
        buf.put_slice(&self.body);
        buf
    }

    /// Decodes the next packet from `buf`.
    ///
    /// Returns `Ok(Some(packet))` if a complete packet was consumed,
    /// `Ok(None)` if more stream data is needed (nothing is consumed in
    /// that case), or `Err` on a malformed header. A header error leaves
    /// the buffer misaligned, so the connection must be torn down rather
    /// than decoded further.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let device_id = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let command_id = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let body_len = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);

        if body_len > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge {
                size: body_len,
                max: MAX_BODY_SIZE,
            });
        }

        let total_len = HEADER_SIZE + body_len as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        buf.advance(HEADER_SIZE);
        let body = buf.split_to(body_len as usize).freeze();

        Ok(Some(Self {
            device_id,
            command_id,
            body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_roundtrip() {
        let packet = Packet::new(3, 1, Bytes::from_static(&[0xDE, 0xAD]));
        let mut buf = packet.encode();
        assert_eq!(buf.len(), HEADER_SIZE + 2);

        let decoded = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.device_id, 3);
        assert_eq!(decoded.command_id, 1);
        assert_eq!(decoded.body.as_ref(), &[0xDE, 0xAD]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_body_packet() {
        let packet = Packet::new(0, 1100, Bytes::new());
        let mut buf = packet.encode();
        assert_eq!(buf.len(), HEADER_SIZE);

        let decoded = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.command_id, 1100);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn test_split_packet_reassembly() {
        // Header-only first, then the body: the same single packet must
        // come out as when the bytes arrive in one piece.
        let encoded = Packet::new(1, 0, Bytes::from_static(&[5, 0, 0, 0])).encode();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encoded[..HEADER_SIZE]);
        assert!(Packet::decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE);

        buf.extend_from_slice(&encoded[HEADER_SIZE..]);
        let decoded = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.body.as_ref(), &[5, 0, 0, 0]);
    }

    #[test]
    fn test_partial_header() {
        let mut buf = BytesMut::from(&b"ORGB\x01\x00"[..]);
        assert!(Packet::decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_coalesced_packets() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&Packet::new(0, 0, Bytes::from_static(&[1])).encode());
        buf.extend_from_slice(&Packet::new(7, 1, Bytes::from_static(&[2, 2])).encode());

        let first = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.body.as_ref(), &[1]);

        let second = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.device_id, 7);
        assert_eq!(second.body.as_ref(), &[2, 2]);

        assert!(Packet::decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_invalid_magic() {
        let mut buf = BytesMut::from(&b"RGBA\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        let result = Packet::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidMagic(_))));
    }

    #[test]
    fn test_body_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(0);
        buf.put_u32_le(1);
        buf.put_u32_le(MAX_BODY_SIZE + 1);
        let result = Packet::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::BodyTooLarge { .. })));
    }

    #[test]
    fn test_header_layout() {
        let buf = Packet::new(0x01020304, 0x0000044D, Bytes::new()).encode();
        assert_eq!(&buf[0..4], b"ORGB");
        assert_eq!(&buf[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[8..12], &[0x4D, 0x04, 0x00, 0x00]);
        assert_eq!(&buf[12..16], &[0x00, 0x00, 0x00, 0x00]);
    }
}
