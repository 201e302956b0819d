//! Wire primitives shared by every packet decoder: little-endian fixed
//! integers, length-encoded integers and strings, NUL-terminated strings.
//!
//! Readers take a payload slice and return `(value, rest)`. A framed payload
//! is always complete, so running out of bytes mid-structure means the packet
//! itself is malformed, not that more data is pending.

use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE, U64 as U64LE};

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&byte, rest)) => Ok((byte, rest)),
        None => Err(Error::MalformedPacket),
    }
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    if data.len() < 2 {
        return Err(Error::MalformedPacket);
    }
    let value = U16LE::ref_from_bytes(&data[..2])
        .map_err(|_| Error::MalformedPacket)?
        .get();
    Ok((value, &data[2..]))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 3 {
        return Err(Error::MalformedPacket);
    }
    let value = u32::from_le_bytes([data[0], data[1], data[2], 0]);
    Ok((value, &data[3..]))
}

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::MalformedPacket);
    }
    let value = U32LE::ref_from_bytes(&data[..4])
        .map_err(|_| Error::MalformedPacket)?
        .get();
    Ok((value, &data[4..]))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::MalformedPacket);
    }
    let value = U64LE::ref_from_bytes(&data[..8])
        .map_err(|_| Error::MalformedPacket)?
        .get();
    Ok((value, &data[8..]))
}

/// Read length-encoded integer.
///
/// The 0xFB prefix is the NULL marker; it decodes to 0 here and callers that
/// must distinguish NULL use [`read_int_lenenc_or_null`]. 0xFF never starts a
/// length-encoded integer (it is the error-packet tag, consumed a layer up).
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (prefix, rest) = read_int_1(data)?;
    match prefix {
        0xFB => Ok((0, rest)),
        0xFC => {
            let (val, rest) = read_int_2(rest)?;
            Ok((val as u64, rest))
        }
        0xFD => {
            let (val, rest) = read_int_3(rest)?;
            Ok((val as u64, rest))
        }
        0xFE => read_int_8(rest),
        0xFF => Err(Error::MalformedPacket),
        val => Ok((val as u64, rest)),
    }
}

/// Read a length-encoded integer, reporting the NULL marker as `None`.
pub fn read_int_lenenc_or_null(data: &[u8]) -> Result<(Option<u64>, &[u8])> {
    if data.first() == Some(&0xFB) {
        return Ok((None, &data[1..]));
    }
    let (value, rest) = read_int_lenenc(data)?;
    Ok((Some(value), rest))
}

/// Read fixed-length bytes
pub fn read_bytes_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::MalformedPacket);
    }
    Ok(data.split_at(len))
}

/// Read null-terminated string (the NUL is consumed, not returned)
pub fn read_string_null(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match data.iter().position(|&byte| byte == 0) {
        Some(i) => Ok((&data[..i], &data[i + 1..])),
        None => Err(Error::MalformedPacket),
    }
}

/// Read length-encoded string. Zero-length strings are valid.
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    read_bytes_fix(rest, len as usize)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xFC);
        write_int_2(out, value as u16);
    } else if value < (1 << 24) {
        out.push(0xFD);
        write_int_3(out, value as u32);
    } else {
        out.push(0xFE);
        write_int_8(out, value);
    }
}

/// Write null-terminated string
pub fn write_string_null(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenenc_round_trip() {
        for n in [
            0u64,
            250,
            251,
            252,
            65535,
            65536,
            16_777_215,
            16_777_216,
            1 << 63,
        ] {
            let mut out = Vec::new();
            write_int_lenenc(&mut out, n);
            let (decoded, rest) = read_int_lenenc(&out).unwrap();
            assert_eq!(decoded, n, "value {n}");
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_lenenc_prefixes() {
        // One-byte literals stop at 0xFA.
        assert_eq!(read_int_lenenc(&[0xFA]).unwrap(), (0xFA, &[][..]));
        // NULL marker decodes to zero here.
        assert_eq!(read_int_lenenc(&[0xFB]).unwrap(), (0, &[][..]));
        assert_eq!(
            read_int_lenenc_or_null(&[0xFB, 0x01]).unwrap(),
            (None, &[0x01][..])
        );
        // 0xFF is reserved at this layer.
        assert!(matches!(
            read_int_lenenc(&[0xFF, 0x00]),
            Err(Error::MalformedPacket)
        ));
    }

    #[test]
    fn test_lenenc_truncated_tail() {
        assert!(read_int_lenenc(&[0xFC, 0x01]).is_err());
        assert!(read_int_lenenc(&[0xFE, 0, 0, 0]).is_err());
        assert!(read_int_lenenc(&[]).is_err());
    }

    #[test]
    fn test_string_null() {
        let (s, rest) = read_string_null(b"abc\0def").unwrap();
        assert_eq!(s, b"abc");
        assert_eq!(rest, b"def");
        assert!(read_string_null(b"no terminator").is_err());
    }

    #[test]
    fn test_string_lenenc() {
        let mut out = Vec::new();
        write_bytes_lenenc(&mut out, b"hello");
        let (s, rest) = read_string_lenenc(&out).unwrap();
        assert_eq!(s, b"hello");
        assert!(rest.is_empty());

        // Zero-length string is valid.
        let (s, rest) = read_string_lenenc(&[0x00, 0xAA]).unwrap();
        assert!(s.is_empty());
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn test_fixed_ints() {
        assert_eq!(read_int_2(&[0x34, 0x12]).unwrap().0, 0x1234);
        assert_eq!(read_int_3(&[0x56, 0x34, 0x12]).unwrap().0, 0x123456);
        assert_eq!(
            read_int_4(&[0x78, 0x56, 0x34, 0x12]).unwrap().0,
            0x12345678
        );
        assert_eq!(
            read_int_8(&[1, 0, 0, 0, 0, 0, 0, 0x80]).unwrap().0,
            (1 << 63) | 1
        );
    }
}
