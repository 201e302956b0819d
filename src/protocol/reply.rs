use tracing::{error, trace};

use crate::arena::Arena;
use crate::constant::ServerStatusFlags;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result, eyre};
use crate::protocol::column::Column;
use crate::protocol::connection::Greeting;
use crate::protocol::packet::{frame, peek_header};
use crate::protocol::primitive::read_int_lenenc;
use crate::protocol::response::{EofPayload, ErrPayload, OkPayload};
use crate::protocol::row::Row;

/// Which packet kind a decoded reply turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Unknown,
    Auth,
    Ok,
    Error,
    Eof,
    ResultSet,
}

/// Outcome of one decoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The cursor ran dry mid-reply. Feed more bytes and call again; all
    /// partially decoded state is kept.
    NeedMoreData,
    /// The reply is fully decoded. `is_multi` signals that the server will
    /// send another reply for the same request (multi-statement).
    Complete { is_multi: bool },
}

/// One decoded server reply: a single packet for Ok/Error/Eof/Auth, or the
/// whole packet sequence of a result set.
///
/// A reply starts `Unknown` and is driven by [`consume_partial`]
/// (Self::consume_partial) until it reports [`Progress::Complete`]. All
/// variable-length data lives in the caller's arena, which must outlive the
/// reply.
#[derive(Debug, Default)]
pub struct Reply<'a> {
    state: ReplyState<'a>,
}

#[derive(Debug, Default)]
enum ReplyState<'a> {
    #[default]
    Unknown,
    Auth(Greeting<'a>),
    Ok(OkPayload<'a>),
    Error(ErrPayload<'a>),
    Eof(EofPayload),
    ResultSet(ResultSet<'a>),
}

impl<'a> Reply<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the reply as the buffered bytes allow.
    ///
    /// `is_auth` must be true only for the first reply on a fresh connection,
    /// where the greeting packet is expected. Re-driving an already complete
    /// reply is a no-op that reports `Complete` again.
    pub fn consume_partial(
        &mut self,
        cursor: &mut ByteCursor,
        arena: &'a Arena,
        is_auth: bool,
    ) -> Result<Progress> {
        match self.try_consume(cursor, arena, is_auth) {
            Err(Error::InsufficientData) => Ok(Progress::NeedMoreData),
            other => other,
        }
    }

    fn try_consume(
        &mut self,
        cursor: &mut ByteCursor,
        arena: &'a Arena,
        is_auth: bool,
    ) -> Result<Progress> {
        if matches!(self.state, ReplyState::Unknown) {
            self.dispatch(cursor, arena, is_auth)?;
        }
        match &mut self.state {
            ReplyState::Unknown => Err(Error::LibraryBug(eyre!(
                "reply still unknown after dispatch"
            ))),
            ReplyState::Auth(_) | ReplyState::Error(_) => Ok(Progress::Complete { is_multi: false }),
            ReplyState::Ok(ok) => Ok(complete(ok.status())),
            ReplyState::Eof(eof) => Ok(complete(eof.status())),
            ReplyState::ResultSet(resultset) => resultset.advance(cursor, arena),
        }
    }

    /// Peek the discriminator byte behind the packet header and decode the
    /// single-packet reply kinds; a result set only gets its header packet
    /// consumed here and is carried on by [`ResultSet::advance`].
    fn dispatch(&mut self, cursor: &mut ByteCursor, arena: &'a Arena, is_auth: bool) -> Result<()> {
        let head = cursor.peek(5).ok_or(Error::InsufficientData)?;
        let discriminator = head[4];
        let payload_len = peek_header(cursor)?.payload_len();
        trace!(discriminator, payload_len, is_auth, "dispatching reply packet");

        // A fresh connection opens with the server greeting; its first
        // payload byte is the protocol version, not a reply tag. An
        // immediate 0x00 (ok) or 0xFF (refused before greeting) still means
        // what it always means.
        if is_auth && discriminator != 0x00 && discriminator != 0xFF {
            let (_seq, payload) = frame(cursor)?;
            self.state = ReplyState::Auth(Greeting::decode(&payload, arena)?);
            return Ok(());
        }

        match discriminator {
            0x00 => {
                let (_seq, payload) = frame(cursor)?;
                self.state = ReplyState::Ok(OkPayload::decode(&payload, arena)?);
            }
            0xFF => {
                let (_seq, payload) = frame(cursor)?;
                self.state = ReplyState::Error(ErrPayload::decode(&payload, arena)?);
            }
            0xFE if payload_len <= 5 => {
                let (_seq, payload) = frame(cursor)?;
                self.state = ReplyState::Eof(EofPayload::decode(&payload)?);
            }
            0x01..=0xFA => {
                let (_seq, payload) = frame(cursor)?;
                self.state = ReplyState::ResultSet(ResultSet::decode_header(&payload)?);
            }
            _ => {
                error!(discriminator, "unknown reply discriminator");
                return Err(Error::MalformedPacket);
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> ReplyKind {
        match &self.state {
            ReplyState::Unknown => ReplyKind::Unknown,
            ReplyState::Auth(_) => ReplyKind::Auth,
            ReplyState::Ok(_) => ReplyKind::Ok,
            ReplyState::Error(_) => ReplyKind::Error,
            ReplyState::Eof(_) => ReplyKind::Eof,
            ReplyState::ResultSet(_) => ReplyKind::ResultSet,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.state, ReplyState::Auth(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.state, ReplyState::Ok(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, ReplyState::Error(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.state, ReplyState::Eof(_))
    }

    pub fn is_resultset(&self) -> bool {
        matches!(self.state, ReplyState::ResultSet(_))
    }

    pub fn auth(&self) -> Option<&Greeting<'a>> {
        match &self.state {
            ReplyState::Auth(greeting) => Some(greeting),
            _ => None,
        }
    }

    pub fn ok(&self) -> Option<&OkPayload<'a>> {
        match &self.state {
            ReplyState::Ok(ok) => Some(ok),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrPayload<'a>> {
        match &self.state {
            ReplyState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn eof(&self) -> Option<&EofPayload> {
        match &self.state {
            ReplyState::Eof(eof) => Some(eof),
            _ => None,
        }
    }

    pub fn resultset(&self) -> Option<&ResultSet<'a>> {
        match &self.state {
            ReplyState::ResultSet(resultset) => Some(resultset),
            _ => None,
        }
    }

    pub fn column_count(&self) -> u64 {
        self.resultset().map_or_else(
            || {
                error!(kind = ?self.kind(), "column_count on a non-resultset reply");
                0
            },
            ResultSet::column_count,
        )
    }

    pub fn column(&self, index: usize) -> Option<&Column<'a>> {
        self.resultset().and_then(|rs| rs.column(index))
    }

    pub fn row_count(&self) -> u64 {
        self.resultset().map_or_else(
            || {
                error!(kind = ?self.kind(), "row_count on a non-resultset reply");
                0
            },
            ResultSet::row_count,
        )
    }

    /// Step the row iteration cursor. Returns `None` once all rows have been
    /// handed out.
    pub fn next_row(&mut self) -> Option<&Row<'a>> {
        let kind = self.kind();
        match &mut self.state {
            ReplyState::ResultSet(resultset) => resultset.next_row(),
            _ => {
                error!(?kind, "next_row on a non-resultset reply");
                None
            }
        }
    }
}

fn complete(status: ServerStatusFlags) -> Progress {
    Progress::Complete {
        is_multi: status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS),
    }
}

impl core::fmt::Display for Reply<'_> {
    /// Render the reply for debugging, one line per field.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.state {
            ReplyState::Unknown => write!(f, "unknown reply"),
            ReplyState::Auth(auth) => {
                write!(
                    f,
                    "protocol: {}\nversion: {}\nthread_id: {}",
                    auth.protocol(),
                    String::from_utf8_lossy(auth.server_version()),
                    auth.thread_id(),
                )
            }
            ReplyState::Ok(ok) => {
                write!(
                    f,
                    "affected_rows: {}\nlast_insert_id: {}\nstatus: {:#06x}\nwarnings: {}\ninfo: {}",
                    ok.affected_rows(),
                    ok.last_insert_id(),
                    ok.status().bits(),
                    ok.warnings(),
                    String::from_utf8_lossy(ok.info()),
                )
            }
            ReplyState::Error(err) => {
                write!(
                    f,
                    "ERROR {} ({}): {}",
                    err.code(),
                    String::from_utf8_lossy(err.sqlstate()),
                    String::from_utf8_lossy(err.message()),
                )
            }
            ReplyState::Eof(eof) => {
                write!(
                    f,
                    "warnings: {}\nstatus: {:#06x}",
                    eof.warnings(),
                    eof.status().bits()
                )
            }
            ReplyState::ResultSet(rs) => {
                write!(f, "columns:")?;
                for column in &rs.columns {
                    write!(f, " {}", String::from_utf8_lossy(column.name()))?;
                }
                for (i, row) in rs.rows.iter().enumerate() {
                    write!(f, "\nrow({i}):")?;
                    for j in 0..rs.columns.len() {
                        if let Some(field) = row.field(j) {
                            write!(f, " {field}")?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// A decoded result set: column metadata plus the row list.
///
/// Decoding is resumable at packet granularity: `phase` remembers which part
/// of the sequence comes next, so a cursor that runs dry mid-set picks up
/// exactly where it left off on the next pass.
#[derive(Debug)]
pub struct ResultSet<'a> {
    column_count: u64,
    extra: u64,
    columns: Vec<Column<'a>>,
    eof1: Option<EofPayload>,
    rows: Vec<Row<'a>>,
    eof2: Option<EofPayload>,
    iter_pos: usize,
    phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Columns,
    FirstEof,
    Rows,
    Done,
}

impl<'a> ResultSet<'a> {
    /// Decode the result-set header payload: the column count, and an
    /// optional extra metadata value when the server sends one.
    fn decode_header(payload: &[u8]) -> Result<Self> {
        let (column_count, rest) = read_int_lenenc(payload)?;
        let extra = if rest.is_empty() {
            0
        } else {
            let (extra, rest) = read_int_lenenc(rest)?;
            if !rest.is_empty() {
                return Err(Error::MalformedPacket);
            }
            extra
        };
        Ok(Self {
            column_count,
            extra,
            columns: Vec::with_capacity(column_count as usize),
            eof1: None,
            rows: Vec::new(),
            eof2: None,
            iter_pos: 0,
            phase: Phase::Columns,
        })
    }

    fn advance(&mut self, cursor: &mut ByteCursor, arena: &'a Arena) -> Result<Progress> {
        loop {
            match self.phase {
                Phase::Columns => {
                    if (self.columns.len() as u64) < self.column_count {
                        let (_seq, payload) = frame(cursor)?;
                        self.columns.push(Column::decode(&payload, arena)?);
                    } else {
                        self.phase = Phase::FirstEof;
                    }
                }
                Phase::FirstEof => {
                    let (_seq, payload) = frame(cursor)?;
                    self.eof1 = Some(EofPayload::decode(&payload)?);
                    self.phase = Phase::Rows;
                }
                Phase::Rows => {
                    if EofPayload::probe(cursor)?.is_some() {
                        let (_seq, payload) = frame(cursor)?;
                        self.eof2 = Some(EofPayload::decode(&payload)?);
                        self.phase = Phase::Done;
                    } else {
                        let (_seq, payload) = frame(cursor)?;
                        let row = Row::decode(&payload, &self.columns, arena)?;
                        trace!(row = self.rows.len(), "decoded row");
                        self.rows.push(row);
                    }
                }
                Phase::Done => {
                    let status = self.eof2.map_or(ServerStatusFlags::empty(), |e| e.status());
                    return Ok(complete(status));
                }
            }
        }
    }

    pub fn column_count(&self) -> u64 {
        self.column_count
    }

    /// Extra metadata value from the header packet; 0 when absent.
    pub fn extra(&self) -> u64 {
        self.extra
    }

    pub fn column(&self, index: usize) -> Option<&Column<'a>> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[Column<'a>] {
        &self.columns
    }

    /// The EOF terminating the column block.
    pub fn eof1(&self) -> Option<&EofPayload> {
        self.eof1.as_ref()
    }

    /// The EOF terminating the row block.
    pub fn eof2(&self) -> Option<&EofPayload> {
        self.eof2.as_ref()
    }

    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn row(&self, index: usize) -> Option<&Row<'a>> {
        self.rows.get(index)
    }

    pub fn next_row(&mut self) -> Option<&Row<'a>> {
        let row = self.rows.get(self.iter_pos)?;
        self.iter_pos += 1;
        Some(row)
    }
}
