use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Packet header (zero-copy)
///
/// Layout matches the wire:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    length: [u8; 3],
    sequence_id: u8,
}

impl PacketHeader {
    pub fn payload_len(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < 4 {
            return Err(Error::MalformedPacket);
        }
        Self::ref_from_bytes(&data[..4]).map_err(|_| Error::MalformedPacket)
    }
}

/// Peek the header of the next packet without consuming anything.
pub fn peek_header(cursor: &ByteCursor) -> Result<PacketHeader> {
    let head = cursor.peek(4).ok_or(Error::InsufficientData)?;
    Ok(*PacketHeader::from_bytes(head)?)
}

/// Consume one whole packet from the cursor and return `(sequence, payload)`.
///
/// The cursor is left untouched unless the header *and* the full payload are
/// buffered, so a caller that gets `InsufficientData` can simply feed more
/// bytes and call again.
pub fn frame(cursor: &mut ByteCursor) -> Result<(u8, BytesMut)> {
    let header = peek_header(cursor)?;
    let payload_len = header.payload_len();
    if cursor.len() < 4 + payload_len {
        return Err(Error::InsufficientData);
    }
    cursor.skip(4)?;
    let payload = cursor.consume(payload_len)?;
    Ok((header.sequence_id(), payload))
}

/// Write a packet header in front of a `payload_len`-byte payload.
#[inline]
pub fn write_packet_header(out: &mut Vec<u8>, sequence_id: u8, payload_len: usize) {
    let bytes = (payload_len as u32).to_le_bytes();
    out.extend_from_slice(&bytes[..3]);
    out.push(sequence_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_whole_packet() {
        let mut cursor = ByteCursor::from(&[0x03, 0x00, 0x00, 0x02, b'a', b'b', b'c', 0xFF][..]);
        let (seq, payload) = frame(&mut cursor).unwrap();
        assert_eq!(seq, 2);
        assert_eq!(&payload[..], b"abc");
        // Trailing byte belongs to the next packet.
        assert_eq!(cursor.len(), 1);
    }

    #[test]
    fn test_frame_needs_full_header() {
        let mut cursor = ByteCursor::from(&[0x03, 0x00, 0x00][..]);
        assert!(matches!(frame(&mut cursor), Err(Error::InsufficientData)));
        assert_eq!(cursor.len(), 3);
    }

    #[test]
    fn test_frame_needs_full_payload() {
        let mut cursor = ByteCursor::from(&[0x03, 0x00, 0x00, 0x00, b'a'][..]);
        assert!(matches!(frame(&mut cursor), Err(Error::InsufficientData)));
        // Nothing consumed; feeding the rest makes the packet decodable.
        cursor.feed(b"bc");
        let (seq, payload) = frame(&mut cursor).unwrap();
        assert_eq!(seq, 0);
        assert_eq!(&payload[..], b"abc");
    }

    #[test]
    fn test_header_writer_round_trip() {
        let mut out = Vec::new();
        write_packet_header(&mut out, 1, 0x123456);
        let header = PacketHeader::from_bytes(&out).unwrap();
        assert_eq!(header.payload_len(), 0x123456);
        assert_eq!(header.sequence_id(), 1);
    }
}
