use tracing::error;

use crate::arena::Arena;
use crate::constant::FieldType;
use crate::error::{Error, Result};
use crate::protocol::column::Column;
use crate::protocol::primitive::*;

/// One cell of a text-protocol row, converted to the type its column declares.
///
/// Numeric columns are parsed out of their decimal ASCII form at decode time;
/// everything else stays a byte view into the arena. Exactly one accessor
/// matches the `(type, unsigned)` pair of the owning column; calling any other
/// logs a diagnostic and returns a zero value.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    field_type: FieldType,
    is_unsigned: bool,
    data: FieldData<'a>,
}

#[derive(Debug, Clone, Copy)]
enum FieldData<'a> {
    Null,
    Int(i64),
    Uint(u64),
    Float(f32),
    Double(f64),
    Bytes(&'a [u8]),
}

impl<'a> Field<'a> {
    /// Decode the next cell of a row payload against its column definition.
    /// Returns the field and the rest of the payload.
    fn decode<'p>(
        data: &'p [u8],
        column: &Column<'_>,
        arena: &'a Arena,
    ) -> Result<(Self, &'p [u8])> {
        let field_type = column.field_type();
        let is_unsigned = column.is_unsigned();

        let (len, rest) = read_int_lenenc_or_null(data)?;
        let Some(len) = len else {
            return Ok((
                Self {
                    field_type,
                    is_unsigned,
                    data: FieldData::Null,
                },
                rest,
            ));
        };
        let (text, rest) = read_bytes_fix(rest, len as usize)?;

        let data = match field_type {
            FieldType::Null => FieldData::Null,
            FieldType::Tiny
            | FieldType::Short
            | FieldType::Year
            | FieldType::Int24
            | FieldType::Long
            | FieldType::LongLong => {
                if is_unsigned {
                    FieldData::Uint(ascii_to_u64(text))
                } else {
                    FieldData::Int(ascii_to_i64(text))
                }
            }
            FieldType::Float => FieldData::Float(ascii_to_f64(text) as f32),
            FieldType::Double => FieldData::Double(ascii_to_f64(text)),
            ty if ty.is_text() => FieldData::Bytes(arena.alloc_copy(text)?),
            _ => return Err(Error::MalformedPacket),
        };

        Ok((
            Self {
                field_type,
                is_unsigned,
                data,
            },
            rest,
        ))
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_unsigned(&self) -> bool {
        self.is_unsigned
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, FieldData::Null)
    }

    fn mismatch(&self, requested: &'static str) {
        error!(
            field_type = ?self.field_type,
            is_unsigned = self.is_unsigned,
            requested,
            "field does not hold the requested type; returning a zero value"
        );
    }

    fn signed(&self, want: FieldType, also: Option<FieldType>, requested: &'static str) -> i64 {
        let type_matches = self.field_type == want || Some(self.field_type) == also;
        match self.data {
            FieldData::Int(v) if type_matches && !self.is_unsigned => v,
            _ => {
                self.mismatch(requested);
                0
            }
        }
    }

    fn unsigned(&self, want: FieldType, also: Option<FieldType>, requested: &'static str) -> u64 {
        let type_matches = self.field_type == want || Some(self.field_type) == also;
        match self.data {
            FieldData::Uint(v) if type_matches && self.is_unsigned => v,
            _ => {
                self.mismatch(requested);
                0
            }
        }
    }

    pub fn as_i8(&self) -> i8 {
        self.signed(FieldType::Tiny, None, "i8") as i8
    }

    pub fn as_u8(&self) -> u8 {
        self.unsigned(FieldType::Tiny, None, "u8") as u8
    }

    pub fn as_i16(&self) -> i16 {
        self.signed(FieldType::Short, Some(FieldType::Year), "i16") as i16
    }

    pub fn as_u16(&self) -> u16 {
        self.unsigned(FieldType::Short, Some(FieldType::Year), "u16") as u16
    }

    pub fn as_i32(&self) -> i32 {
        self.signed(FieldType::Long, Some(FieldType::Int24), "i32") as i32
    }

    pub fn as_u32(&self) -> u32 {
        self.unsigned(FieldType::Long, Some(FieldType::Int24), "u32") as u32
    }

    pub fn as_i64(&self) -> i64 {
        self.signed(FieldType::LongLong, None, "i64")
    }

    pub fn as_u64(&self) -> u64 {
        self.unsigned(FieldType::LongLong, None, "u64")
    }

    pub fn as_f32(&self) -> f32 {
        match self.data {
            FieldData::Float(v) => v,
            _ => {
                self.mismatch("f32");
                0.0
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.data {
            FieldData::Double(v) => v,
            _ => {
                self.mismatch("f64");
                0.0
            }
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match self.data {
            FieldData::Bytes(v) => v,
            _ => {
                self.mismatch("bytes");
                &[]
            }
        }
    }

    pub fn as_str(&self) -> &'a str {
        match self.data {
            FieldData::Bytes(v) => simdutf8::basic::from_utf8(v).unwrap_or_else(|_| {
                self.mismatch("str");
                ""
            }),
            _ => {
                self.mismatch("str");
                ""
            }
        }
    }
}

impl core::fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.data {
            FieldData::Null => write!(f, "NULL"),
            FieldData::Int(v) => write!(f, "{v}"),
            FieldData::Uint(v) => write!(f, "{v}"),
            FieldData::Float(v) => write!(f, "{v}"),
            FieldData::Double(v) => write!(f, "{v}"),
            FieldData::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

/// One record of a result set.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    fields: Vec<Field<'a>>,
}

impl<'a> Row<'a> {
    /// Decode a framed text-protocol row payload: one cell per column, in
    /// column order, draining the payload exactly.
    pub(crate) fn decode(
        payload: &[u8],
        columns: &[Column<'_>],
        arena: &'a Arena,
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(columns.len());
        let mut data = payload;
        for column in columns {
            let (field, rest) = Field::decode(data, column, arena)?;
            fields.push(field);
            data = rest;
        }
        if !data.is_empty() {
            return Err(Error::MalformedPacket);
        }
        Ok(Self { fields })
    }

    pub fn field_count(&self) -> u64 {
        self.fields.len() as u64
    }

    pub fn field(&self, index: usize) -> Option<&Field<'a>> {
        self.fields.get(index)
    }
}

/// Parse a decimal ASCII prefix; parsing stops at the first non-digit and
/// saturates on overflow.
fn ascii_to_u64(text: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &byte in text {
        if !byte.is_ascii_digit() {
            break;
        }
        value = value
            .saturating_mul(10)
            .saturating_add((byte - b'0') as u64);
    }
    value
}

fn ascii_to_i64(text: &[u8]) -> i64 {
    match text.split_first() {
        Some((&b'-', rest)) => {
            let magnitude = ascii_to_u64(rest).min(1 << 63);
            (magnitude as i64).wrapping_neg()
        }
        _ => ascii_to_u64(text).min(i64::MAX as u64) as i64,
    }
}

fn ascii_to_f64(text: &[u8]) -> f64 {
    let end = text
        .iter()
        .position(|&b| !(b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')))
        .unwrap_or(text.len());
    simdutf8::basic::from_utf8(&text[..end])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::FieldFlags;
    use crate::protocol::column::write_column_payload;

    fn column(field_type: FieldType, flags: FieldFlags, arena: &Arena) -> Column<'_> {
        let mut payload = Vec::new();
        write_column_payload(&mut payload, "c", field_type, flags);
        Column::decode(&payload, arena).unwrap()
    }

    fn cell(text: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_bytes_lenenc(&mut out, text);
        out
    }

    #[test]
    fn test_ascii_numeric_parsing() {
        assert_eq!(ascii_to_u64(b"12345"), 12345);
        assert_eq!(ascii_to_u64(b""), 0);
        assert_eq!(ascii_to_u64(b"42abc"), 42);
        assert_eq!(ascii_to_u64(b"99999999999999999999999"), u64::MAX);
        assert_eq!(ascii_to_i64(b"-128"), -128);
        assert_eq!(ascii_to_i64(b"-"), 0);
        assert_eq!(ascii_to_i64(b"17"), 17);
        assert_eq!(ascii_to_i64(b"-9223372036854775808"), i64::MIN);
        assert_eq!(ascii_to_f64(b"3.5"), 3.5);
        assert_eq!(ascii_to_f64(b"-1.25e2"), -125.0);
        assert_eq!(ascii_to_f64(b"junk"), 0.0);
    }

    #[test]
    fn test_decode_signed_and_unsigned_cells() {
        let arena = Arena::new();
        let signed = column(FieldType::Long, FieldFlags::empty(), &arena);
        let unsigned = column(FieldType::Long, FieldFlags::UNSIGNED_FLAG, &arena);

        let payload = cell(b"-7");
        let (field, rest) = Field::decode(&payload, &signed, &arena).unwrap();
        assert!(rest.is_empty());
        assert_eq!(field.as_i32(), -7);

        let payload = cell(b"4000000000");
        let (field, _) = Field::decode(&payload, &unsigned, &arena).unwrap();
        assert_eq!(field.as_u32(), 4_000_000_000);
    }

    #[test]
    fn test_decode_null_vs_empty_string() {
        let arena = Arena::new();
        let col = column(FieldType::Varchar, FieldFlags::empty(), &arena);

        let (field, _) = Field::decode(&[0xFB], &col, &arena).unwrap();
        assert!(field.is_null());

        let (field, _) = Field::decode(&[0x00], &col, &arena).unwrap();
        assert!(!field.is_null());
        assert_eq!(field.as_str(), "");
    }

    #[test]
    fn test_mismatched_accessor_returns_zero() {
        let arena = Arena::new();
        let col = column(FieldType::Long, FieldFlags::empty(), &arena);
        let payload = cell(b"11");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_i32(), 11);
        // Wrong width, wrong signedness, wrong family.
        assert_eq!(field.as_i64(), 0);
        assert_eq!(field.as_u32(), 0);
        assert_eq!(field.as_f64(), 0.0);
        assert_eq!(field.as_bytes(), b"");
    }

    #[test]
    fn test_narrow_and_wide_integer_accessors() {
        let arena = Arena::new();

        let col = column(FieldType::Tiny, FieldFlags::empty(), &arena);
        let payload = cell(b"-128");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_i8(), -128);

        let col = column(FieldType::Tiny, FieldFlags::UNSIGNED_FLAG, &arena);
        let payload = cell(b"255");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_u8(), 255);

        let col = column(FieldType::Short, FieldFlags::UNSIGNED_FLAG, &arena);
        let payload = cell(b"65535");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_u16(), 65535);

        let col = column(FieldType::LongLong, FieldFlags::UNSIGNED_FLAG, &arena);
        let payload = cell(b"18446744073709551615");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_u64(), u64::MAX);

        let col = column(FieldType::Float, FieldFlags::empty(), &arena);
        let payload = cell(b"1.5");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_f32(), 1.5);
    }

    #[test]
    fn test_year_uses_short_accessors() {
        let arena = Arena::new();
        let col = column(FieldType::Year, FieldFlags::empty(), &arena);
        let payload = cell(b"2024");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert_eq!(field.as_i16(), 2024);
    }

    #[test]
    fn test_decode_row_drains_payload() {
        let arena = Arena::new();
        let columns = [
            column(FieldType::Long, FieldFlags::UNSIGNED_FLAG, &arena),
            column(FieldType::Varchar, FieldFlags::empty(), &arena),
        ];

        let mut payload = cell(b"1");
        payload.extend_from_slice(&cell(b"alice"));
        let row = Row::decode(&payload, &columns, &arena).unwrap();
        assert_eq!(row.field_count(), 2);
        assert_eq!(row.field(0).unwrap().as_u32(), 1);
        assert_eq!(row.field(1).unwrap().as_str(), "alice");
        assert!(row.field(2).is_none());

        payload.push(0xAA);
        assert!(matches!(
            Row::decode(&payload, &columns, &arena),
            Err(Error::MalformedPacket)
        ));
    }

    #[test]
    fn test_decode_double_cell() {
        let arena = Arena::new();
        let col = column(FieldType::Double, FieldFlags::empty(), &arena);
        let payload = cell(b"2.718281828");
        let (field, _) = Field::decode(&payload, &col, &arena).unwrap();
        assert!((field.as_f64() - 2.718281828).abs() < 1e-12);
    }
}
