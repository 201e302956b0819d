use crate::arena::Arena;
use crate::constant::ServerStatusFlags;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::protocol::packet::peek_header;
use crate::protocol::primitive::*;

fn as_str(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::MalformedPacket)
}

/// The payload of an OK packet.
#[derive(Debug, Clone, Copy)]
pub struct OkPayload<'a> {
    affected_rows: u64,
    last_insert_id: u64,
    status: ServerStatusFlags,
    warnings: u16,
    info: &'a [u8],
}

impl<'a> OkPayload<'a> {
    /// Decode a framed OK payload. The human-readable `info` tail, when
    /// present, is copied into the arena; one trailing NUL is stripped.
    pub fn decode(payload: &[u8], arena: &'a Arena) -> Result<Self> {
        let (marker, data) = read_int_1(payload)?;
        if marker != 0x00 {
            return Err(Error::MalformedPacket);
        }
        let (affected_rows, data) = read_int_lenenc(data)?;
        let (last_insert_id, data) = read_int_lenenc(data)?;
        let (status, data) = read_int_2(data)?;
        let (warnings, data) = read_int_2(data)?;

        let info = match data.split_last() {
            Some((&0, head)) => head,
            _ => data,
        };

        Ok(Self {
            affected_rows,
            last_insert_id,
            status: ServerStatusFlags::from_bits_truncate(status),
            warnings,
            info: arena.alloc_copy(info)?,
        })
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    pub fn status(&self) -> ServerStatusFlags {
        self.status
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    pub fn info(&self) -> &'a [u8] {
        self.info
    }

    pub fn info_str(&self) -> Result<&'a str> {
        as_str(self.info)
    }
}

/// The payload of an ERR packet.
#[derive(Debug, Clone, Copy)]
pub struct ErrPayload<'a> {
    code: u16,
    sqlstate: &'a [u8],
    message: &'a [u8],
}

impl<'a> ErrPayload<'a> {
    /// Decode a framed ERR payload. The five sqlstate bytes follow a `#`
    /// marker which is dropped; the message runs to the end of the payload,
    /// minus one trailing NUL when the server sends one.
    pub fn decode(payload: &[u8], arena: &'a Arena) -> Result<Self> {
        let (marker, data) = read_int_1(payload)?;
        if marker != 0xFF {
            return Err(Error::MalformedPacket);
        }
        let (code, data) = read_int_2(data)?;
        let (hash, data) = read_int_1(data)?;
        if hash != b'#' {
            return Err(Error::MalformedPacket);
        }
        let (sqlstate, data) = read_bytes_fix(data, 5)?;

        let message = match data.split_last() {
            Some((&0, head)) => head,
            _ => data,
        };

        Ok(Self {
            code,
            sqlstate: arena.alloc_copy(sqlstate)?,
            message: arena.alloc_copy(message)?,
        })
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn sqlstate(&self) -> &'a [u8] {
        self.sqlstate
    }

    pub fn sqlstate_str(&self) -> Result<&'a str> {
        as_str(self.sqlstate)
    }

    pub fn message(&self) -> &'a [u8] {
        self.message
    }

    pub fn message_str(&self) -> Result<&'a str> {
        as_str(self.message)
    }
}

/// The payload of an EOF packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct EofPayload {
    warnings: u16,
    status: ServerStatusFlags,
}

impl EofPayload {
    /// Decode a framed EOF payload. 4.1+ servers send the 5-byte form; the
    /// bare 0xFE form decodes with zeroed counters.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let (marker, data) = read_int_1(payload)?;
        if marker != 0xFE {
            return Err(Error::MalformedPacket);
        }
        if data.is_empty() {
            return Ok(Self::default());
        }
        let (warnings, data) = read_int_2(data)?;
        let (status, data) = read_int_2(data)?;
        if !data.is_empty() {
            return Err(Error::MalformedPacket);
        }
        Ok(Self {
            warnings,
            status: ServerStatusFlags::from_bits_truncate(status),
        })
    }

    /// Check whether the next buffered packet is an EOF, without consuming
    /// anything. An EOF is a 0xFE discriminator together with a payload of at
    /// most 5 bytes; a longer packet starting 0xFE is an 8-byte
    /// length-encoded integer (a row), never an EOF. On a hit, the warning
    /// and status words are previewed straight out of the buffer.
    pub fn probe(cursor: &ByteCursor) -> Result<Option<Self>> {
        let head = cursor.peek(5).ok_or(Error::InsufficientData)?;
        let payload_len = peek_header(cursor)?.payload_len();
        if head[4] != 0xFE || payload_len > 5 {
            return Ok(None);
        }
        let packet = cursor
            .peek(4 + payload_len)
            .ok_or(Error::InsufficientData)?;
        if payload_len < 5 {
            return Ok(Some(Self::default()));
        }
        let (warnings, _) = read_int_2(&packet[5..])?;
        let (status, _) = read_int_2(&packet[7..])?;
        Ok(Some(Self {
            warnings,
            status: ServerStatusFlags::from_bits_truncate(status),
        }))
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    pub fn status(&self) -> ServerStatusFlags {
        self.status
    }
}
