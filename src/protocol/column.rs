use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::arena::Arena;
use crate::constant::{FieldFlags, FieldType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Fixed-size tail of a column definition packet (12 bytes)
///
/// Follows the six length-encoded string fields and the 0x0C length marker:
/// - collation: 2 bytes LE
/// - column length: 4 bytes LE
/// - column type: 1 byte
/// - flags: 2 bytes LE
/// - decimals: 1 byte
/// - reserved: 2 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct ColumnTail {
    collation: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

/// One column of a result set's metadata block.
///
/// All string fields are views into the reply's arena.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    catalog: &'a [u8],
    database: &'a [u8],
    table: &'a [u8],
    origin_table: &'a [u8],
    name: &'a [u8],
    origin_name: &'a [u8],
    collation: u16,
    length: u32,
    field_type: FieldType,
    flags: FieldFlags,
    decimals: u8,
}

impl<'a> Column<'a> {
    /// Decode a framed column definition payload.
    pub fn decode(payload: &[u8], arena: &'a Arena) -> Result<Self> {
        let (catalog, data) = read_string_lenenc(payload)?;
        let (database, data) = read_string_lenenc(data)?;
        let (table, data) = read_string_lenenc(data)?;
        let (origin_table, data) = read_string_lenenc(data)?;
        let (name, data) = read_string_lenenc(data)?;
        let (origin_name, data) = read_string_lenenc(data)?;

        // Length marker for the fixed tail, always 0x0C.
        let (tail_len, data) = read_int_lenenc(data)?;
        if tail_len != 12 || data.len() != 12 {
            return Err(Error::MalformedPacket);
        }
        let tail = ColumnTail::ref_from_bytes(data)?;

        let field_type =
            FieldType::from_u8(tail.column_type).ok_or(Error::MalformedPacket)?;

        Ok(Self {
            catalog: arena.alloc_copy(catalog)?,
            database: arena.alloc_copy(database)?,
            table: arena.alloc_copy(table)?,
            origin_table: arena.alloc_copy(origin_table)?,
            name: arena.alloc_copy(name)?,
            origin_name: arena.alloc_copy(origin_name)?,
            collation: tail.collation.get(),
            length: tail.column_length.get(),
            field_type,
            flags: FieldFlags::from_bits_truncate(tail.flags.get()),
            decimals: tail.decimals,
        })
    }

    pub fn catalog(&self) -> &'a [u8] {
        self.catalog
    }

    pub fn database(&self) -> &'a [u8] {
        self.database
    }

    pub fn table(&self) -> &'a [u8] {
        self.table
    }

    pub fn origin_table(&self) -> &'a [u8] {
        self.origin_table
    }

    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    pub fn name_str(&self) -> Result<&'a str> {
        simdutf8::basic::from_utf8(self.name).map_err(|_| Error::MalformedPacket)
    }

    pub fn origin_name(&self) -> &'a [u8] {
        self.origin_name
    }

    pub fn collation(&self) -> u16 {
        self.collation
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(FieldFlags::UNSIGNED_FLAG)
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

/// Build a column definition payload; test helper for the decoders.
#[cfg(test)]
pub(crate) fn write_column_payload(
    out: &mut Vec<u8>,
    name: &str,
    field_type: FieldType,
    flags: FieldFlags,
) {
    for s in ["def", "test", "t", "t", name, name] {
        write_bytes_lenenc(out, s.as_bytes());
    }
    write_int_1(out, 0x0C);
    write_int_2(out, 33); // collation: utf8_general_ci
    write_int_4(out, 11); // display length
    write_int_1(out, field_type as u8);
    write_int_2(out, flags.bits());
    write_int_1(out, 0); // decimals
    write_int_2(out, 0); // reserved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_tail_is_twelve_bytes() {
        assert_eq!(core::mem::size_of::<ColumnTail>(), 12);
    }

    #[test]
    fn test_decode_column() {
        let mut payload = Vec::new();
        write_column_payload(
            &mut payload,
            "id",
            FieldType::Long,
            FieldFlags::NOT_NULL_FLAG.union(FieldFlags::UNSIGNED_FLAG),
        );
        let arena = Arena::new();
        let col = Column::decode(&payload, &arena).unwrap();
        assert_eq!(col.catalog(), b"def");
        assert_eq!(col.database(), b"test");
        assert_eq!(col.name_str().unwrap(), "id");
        assert_eq!(col.origin_name(), b"id");
        assert_eq!(col.collation(), 33);
        assert_eq!(col.length(), 11);
        assert_eq!(col.field_type(), FieldType::Long);
        assert!(col.is_unsigned());
        assert_eq!(col.decimals(), 0);
    }

    #[test]
    fn test_decode_column_unknown_flag_bits_are_dropped() {
        let mut payload = Vec::new();
        // 0x4203: NOT_NULL | PRI_KEY | AUTO_INCREMENT plus a key-membership
        // bit outside the defined set; the extra bit must not fail the parse.
        write_column_payload(
            &mut payload,
            "id",
            FieldType::Long,
            FieldFlags::from_bits_retain(0x4203),
        );
        let arena = Arena::new();
        let col = Column::decode(&payload, &arena).unwrap();
        assert!(col.flags().contains(FieldFlags::PRI_KEY_FLAG));
        assert!(col.flags().contains(FieldFlags::AUTO_INCREMENT_FLAG));
        assert_eq!(col.flags().bits(), 0x0203);
    }

    #[test]
    fn test_decode_column_trailing_garbage() {
        let mut payload = Vec::new();
        write_column_payload(&mut payload, "id", FieldType::Long, FieldFlags::empty());
        payload.push(0xAA);
        let arena = Arena::new();
        assert!(matches!(
            Column::decode(&payload, &arena),
            Err(Error::MalformedPacket)
        ));
    }

    #[test]
    fn test_decode_column_unknown_type() {
        let mut payload = Vec::new();
        for s in ["def", "test", "t", "t", "c", "c"] {
            write_bytes_lenenc(&mut payload, s.as_bytes());
        }
        write_int_1(&mut payload, 0x0C);
        write_int_2(&mut payload, 33);
        write_int_4(&mut payload, 11);
        write_int_1(&mut payload, 0x50); // in the undefined gap
        write_int_2(&mut payload, 0);
        write_int_1(&mut payload, 0);
        write_int_2(&mut payload, 0);
        let arena = Arena::new();
        assert!(matches!(
            Column::decode(&payload, &arena),
            Err(Error::MalformedPacket)
        ));
    }
}
