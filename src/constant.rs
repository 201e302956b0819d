/// Command byte prefixed to an outgoing request payload.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    Ping = 0x0e,
}

/// Character set byte sent in the login packet (utf8_general_ci).
pub const UTF8_GENERAL_CI: u8 = 33;

/// Max packet size advertised in the login packet.
pub const MAX_PACKET_SIZE: u32 = 16_777_216;

bitflags::bitflags! {
    /// Client capability flags, lower 16 bits of the 4.1+ capability word.
    ///
    /// The greeting and the login packet carry the capability word as two
    /// separate little-endian 16-bit halves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u16 {
        const CLIENT_LONG_PASSWORD = 0x0001;
        const CLIENT_FOUND_ROWS = 0x0002;
        const CLIENT_LONG_FLAG = 0x0004;
        const CLIENT_CONNECT_WITH_DB = 0x0008;
        const CLIENT_NO_SCHEMA = 0x0010;
        const CLIENT_COMPRESS = 0x0020;
        const CLIENT_ODBC = 0x0040;
        const CLIENT_LOCAL_FILES = 0x0080;
        const CLIENT_IGNORE_SPACE = 0x0100;
        const CLIENT_PROTOCOL_41 = 0x0200;
        const CLIENT_INTERACTIVE = 0x0400;
        const CLIENT_SSL = 0x0800;
        const CLIENT_IGNORE_SIGPIPE = 0x1000;
        const CLIENT_TRANSACTIONS = 0x2000;
        const CLIENT_RESERVED = 0x4000;
        const CLIENT_SECURE_CONNECTION = 0x8000;
    }
}

bitflags::bitflags! {
    /// Client capability flags, upper 16 bits of the capability word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExtendedCapabilityFlags: u16 {
        const CLIENT_MULTI_STATEMENTS = 0x0001;
        const CLIENT_MULTI_RESULTS = 0x0002;
        const CLIENT_PS_MULTI_RESULTS = 0x0004;
    }
}

/// Capabilities announced in the login packet.
pub const LOGIN_CAPABILITIES: CapabilityFlags = CapabilityFlags::CLIENT_LONG_PASSWORD
    .union(CapabilityFlags::CLIENT_LONG_FLAG)
    .union(CapabilityFlags::CLIENT_LOCAL_FILES)
    .union(CapabilityFlags::CLIENT_PROTOCOL_41)
    .union(CapabilityFlags::CLIENT_TRANSACTIONS)
    .union(CapabilityFlags::CLIENT_SECURE_CONNECTION);

/// Capabilities announced when a default schema is sent along with the login.
pub const LOGIN_CAPABILITIES_WITH_SCHEMA: CapabilityFlags = LOGIN_CAPABILITIES
    .union(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
    .union(CapabilityFlags::CLIENT_INTERACTIVE);

/// Extended capabilities announced in the login packet.
pub const LOGIN_EXTENDED_CAPABILITIES: ExtendedCapabilityFlags =
    ExtendedCapabilityFlags::CLIENT_MULTI_STATEMENTS
        .union(ExtendedCapabilityFlags::CLIENT_MULTI_RESULTS)
        .union(ExtendedCapabilityFlags::CLIENT_PS_MULTI_RESULTS);

bitflags::bitflags! {
    /// Server status bits carried by OK and EOF packets.
    /// Note: 0x0004 does not exist in the protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ServerStatusFlags: u16 {
        /// A transaction is active
        const SERVER_STATUS_IN_TRANS = 0x0001;
        /// Autocommit mode is enabled
        const SERVER_STATUS_AUTOCOMMIT = 0x0002;
        /// More replies follow this one (multi-statement or multi-resultset)
        const SERVER_MORE_RESULTS_EXISTS = 0x0008;
        /// Query did not use a good index
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 0x0010;
        /// Query did not use any index
        const SERVER_STATUS_NO_INDEX_USED = 0x0020;
        /// Cursor exists (for prepared statements)
        const SERVER_STATUS_CURSOR_EXISTS = 0x0040;
        /// Last row was sent
        const SERVER_STATUS_LAST_ROW_SENT = 0x0080;
        /// Database was dropped
        const SERVER_STATUS_DB_DROPPED = 0x0100;
        /// No backslash escapes mode is enabled
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 0x0200;
        /// Metadata changed (for prepared statements)
        const SERVER_STATUS_METADATA_CHANGED = 0x0400;
        /// Query was slow
        const SERVER_QUERY_WAS_SLOW = 0x0800;
        /// Prepared statement has output parameters
        const SERVER_PS_OUT_PARAMS = 0x1000;
        /// In a read-only transaction
        const SERVER_STATUS_IN_TRANS_READONLY = 0x2000;
        /// Session state has changed
        const SERVER_SESSION_STATE_CHANGED = 0x4000;
    }
}

bitflags::bitflags! {
    /// Column definition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u16 {
        /// Field can't be NULL
        const NOT_NULL_FLAG = 0x0001;
        /// Field is part of a primary key
        const PRI_KEY_FLAG = 0x0002;
        /// Field is part of a unique key
        const UNIQUE_KEY_FLAG = 0x0004;
        /// Field is part of a non-unique key
        const MULTIPLE_KEY_FLAG = 0x0008;
        /// Field is a blob
        const BLOB_FLAG = 0x0010;
        /// Field is unsigned
        const UNSIGNED_FLAG = 0x0020;
        /// Field is zerofill
        const ZEROFILL_FLAG = 0x0040;
        /// Field is binary
        const BINARY_FLAG = 0x0080;
        /// Field is an enum
        const ENUM_FLAG = 0x0100;
        /// Field is auto-increment
        const AUTO_INCREMENT_FLAG = 0x0200;
        /// Field is a timestamp
        const TIMESTAMP_FLAG = 0x0400;
        /// Field is a set
        const SET_FLAG = 0x0800;
    }
}

/// Column type byte from a column definition packet.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    DateTime = 0x0c,
    Year = 0x0d,
    NewDate = 0x0e,
    Varchar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl FieldType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Decimal),
            0x01 => Some(Self::Tiny),
            0x02 => Some(Self::Short),
            0x03 => Some(Self::Long),
            0x04 => Some(Self::Float),
            0x05 => Some(Self::Double),
            0x06 => Some(Self::Null),
            0x07 => Some(Self::Timestamp),
            0x08 => Some(Self::LongLong),
            0x09 => Some(Self::Int24),
            0x0a => Some(Self::Date),
            0x0b => Some(Self::Time),
            0x0c => Some(Self::DateTime),
            0x0d => Some(Self::Year),
            0x0e => Some(Self::NewDate),
            0x0f => Some(Self::Varchar),
            0x10 => Some(Self::Bit),
            0xf5 => Some(Self::Json),
            0xf6 => Some(Self::NewDecimal),
            0xf7 => Some(Self::Enum),
            0xf8 => Some(Self::Set),
            0xf9 => Some(Self::TinyBlob),
            0xfa => Some(Self::MediumBlob),
            0xfb => Some(Self::LongBlob),
            0xfc => Some(Self::Blob),
            0xfd => Some(Self::VarString),
            0xfe => Some(Self::String),
            0xff => Some(Self::Geometry),
            _ => None,
        }
    }

    /// Types whose text-protocol cells stay raw bytes instead of being
    /// converted to a numeric value. Temporal types are included: in the text
    /// protocol they arrive as formatted strings.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Self::Decimal
                | Self::NewDecimal
                | Self::Varchar
                | Self::Bit
                | Self::Enum
                | Self::Set
                | Self::TinyBlob
                | Self::MediumBlob
                | Self::LongBlob
                | Self::Blob
                | Self::VarString
                | Self::String
                | Self::Geometry
                | Self::Json
                | Self::Time
                | Self::Date
                | Self::NewDate
                | Self::Timestamp
                | Self::DateTime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_capability_bits() {
        // The exact wire constants the login packet must carry.
        assert_eq!(LOGIN_CAPABILITIES.bits(), 0xA285);
        assert_eq!(LOGIN_CAPABILITIES_WITH_SCHEMA.bits(), 0xA68D);
        assert_eq!(LOGIN_EXTENDED_CAPABILITIES.bits(), 0x0007);
    }

    #[test]
    fn test_field_type_round_trip() {
        for byte in (0x00..=0x10).chain(0xf5..=0xff) {
            let ty = FieldType::from_u8(byte).unwrap();
            assert_eq!(ty as u8, byte);
        }
        // The gap between the two defined ranges is unknown.
        assert!(FieldType::from_u8(0x50).is_none());
        assert!(FieldType::from_u8(0x11).is_none());
    }

    #[test]
    fn test_text_family_excludes_numeric() {
        assert!(FieldType::Varchar.is_text());
        assert!(FieldType::DateTime.is_text());
        assert!(!FieldType::Long.is_text());
        assert!(!FieldType::Double.is_text());
        assert!(!FieldType::Null.is_text());
    }
}
