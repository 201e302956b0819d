use tracing::debug;

use crate::arena::Arena;
use crate::constant::{
    CapabilityFlags, ExtendedCapabilityFlags, LOGIN_CAPABILITIES, LOGIN_CAPABILITIES_WITH_SCHEMA,
    LOGIN_EXTENDED_CAPABILITIES, MAX_PACKET_SIZE, ServerStatusFlags, UTF8_GENERAL_CI,
};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::packet::write_packet_header;
use crate::protocol::primitive::*;
use crate::protocol::reply::Reply;

// ============================================================================
// Server greeting (Server -> Client)
// ============================================================================

/// The greeting packet a server sends right after the connection opens.
///
/// Packet format:
/// ```text
/// 1   protocol version (10)
/// n   server version (null-terminated)
/// 4   thread id
/// n   first salt part (null-terminated, 8 bytes in practice)
/// 2   capability flags (lower half)
/// 1   language (server character set)
/// 2   status flags
/// 2   capability flags (upper half)
/// 1   auth plugin data length
/// 10  reserved
/// n   second salt part (null-terminated)
/// n   auth plugin name and other trailing data (ignored)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Greeting<'a> {
    protocol: u8,
    server_version: &'a [u8],
    thread_id: u32,
    salt: &'a [u8],
    capability: CapabilityFlags,
    language: u8,
    status: ServerStatusFlags,
    extended_capability: ExtendedCapabilityFlags,
    auth_plugin_length: u8,
    salt2: &'a [u8],
}

impl<'a> Greeting<'a> {
    /// Decode a framed greeting payload. Both salt parts are copied into the
    /// arena with their terminating NULs stripped.
    pub fn decode(payload: &[u8], arena: &'a Arena) -> Result<Self> {
        let (protocol, data) = read_int_1(payload)?;
        let (server_version, data) = read_string_null(data)?;
        let (thread_id, data) = read_int_4(data)?;
        let (salt, data) = read_string_null(data)?;
        let (capability, data) = read_int_2(data)?;
        let (language, data) = read_int_1(data)?;
        let (status, data) = read_int_2(data)?;
        let (extended_capability, data) = read_int_2(data)?;
        let (auth_plugin_length, data) = read_int_1(data)?;
        let (_reserved, data) = read_bytes_fix(data, 10)?;
        let (salt2, _data) = read_string_null(data)?;
        // The rest of the payload (auth plugin name) is not used.

        Ok(Self {
            protocol,
            server_version: arena.alloc_copy(server_version)?,
            thread_id,
            salt: arena.alloc_copy(salt)?,
            capability: CapabilityFlags::from_bits_truncate(capability),
            language,
            status: ServerStatusFlags::from_bits_truncate(status),
            extended_capability: ExtendedCapabilityFlags::from_bits_truncate(extended_capability),
            auth_plugin_length,
            salt2: arena.alloc_copy(salt2)?,
        })
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn server_version(&self) -> &'a [u8] {
        self.server_version
    }

    pub fn server_version_str(&self) -> Result<&'a str> {
        simdutf8::basic::from_utf8(self.server_version).map_err(|_| Error::MalformedPacket)
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn salt(&self) -> &'a [u8] {
        self.salt
    }

    pub fn salt2(&self) -> &'a [u8] {
        self.salt2
    }

    /// The full challenge: both salt parts, in order, NULs stripped.
    pub fn full_salt(&self) -> Vec<u8> {
        let mut seed = Vec::with_capacity(self.salt.len() + self.salt2.len());
        seed.extend_from_slice(self.salt);
        seed.extend_from_slice(self.salt2);
        seed
    }

    pub fn capability(&self) -> CapabilityFlags {
        self.capability
    }

    pub fn language(&self) -> u8 {
        self.language
    }

    pub fn status(&self) -> ServerStatusFlags {
        self.status
    }

    pub fn extended_capability(&self) -> ExtendedCapabilityFlags {
        self.extended_capability
    }

    pub fn auth_plugin_length(&self) -> u8 {
        self.auth_plugin_length
    }
}

// ============================================================================
// Challenge response and login packet (Client -> Server)
// ============================================================================

/// mysql_native_password challenge response.
///
/// Formula: `SHA1(password) XOR SHA1(challenge + SHA1(SHA1(password)))`.
/// An empty password answers with an empty token.
pub fn scramble_native_password(password: &str, challenge: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};

    if password.is_empty() {
        return Vec::new();
    }

    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let stage1 = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(stage1);
    let stage2 = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2);
    let mask = hasher.finalize();

    stage1
        .iter()
        .zip(mask.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Append the framed login packet (sequence 1) answering a greeting.
///
/// Payload layout: capability u16, extended capability u16, max packet size
/// u32, charset byte, 23 zero bytes, NUL-terminated username, 1-byte token
/// length, token, then the NUL-terminated schema when one is sent.
pub fn write_login_packet(out: &mut Vec<u8>, user: &str, token: &[u8], schema: Option<&str>) {
    let capability = if schema.is_some() {
        LOGIN_CAPABILITIES_WITH_SCHEMA
    } else {
        LOGIN_CAPABILITIES
    };

    let mut payload = Vec::new();
    write_int_2(&mut payload, capability.bits());
    write_int_2(&mut payload, LOGIN_EXTENDED_CAPABILITIES.bits());
    write_int_4(&mut payload, MAX_PACKET_SIZE);
    write_int_1(&mut payload, UTF8_GENERAL_CI);
    payload.extend_from_slice(&[0u8; 23]);
    write_string_null(&mut payload, user);
    write_int_1(&mut payload, token.len() as u8);
    payload.extend_from_slice(token);
    if let Some(schema) = schema {
        write_string_null(&mut payload, schema);
    }

    write_packet_header(out, 1, payload.len());
    out.extend_from_slice(&payload);
}

// ============================================================================
// Authentication state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    AwaitingGreeting,
    AwaitingLoginResult,
    Authenticated,
    Failed,
}

/// What the transport must do after feeding a reply to the authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// Transmit these framed packets on the connection.
    Send(Vec<u8>),
    /// Nothing to transmit.
    Done,
}

/// Per-connection login driver.
///
/// Owns the credentials and walks `AwaitingGreeting → AwaitingLoginResult →
/// Authenticated`; a rejected login lands in the terminal `Failed` step.
/// Commands queued before the handshake finishes are handed back for
/// transmission together with the successful login, so the first real query
/// goes out on the same connection without an extra round trip.
#[derive(Debug)]
pub struct Authenticator {
    user: String,
    password: String,
    schema: Option<String>,
    step: AuthStep,
    queued: Vec<u8>,
}

impl Authenticator {
    pub fn new(user: impl Into<String>, password: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            schema,
            step: AuthStep::AwaitingGreeting,
            queued: Vec::new(),
        }
    }

    pub fn from_opts(opts: &Opts) -> Self {
        Self::new(
            opts.user.clone(),
            opts.password.clone().unwrap_or_default(),
            opts.db.clone(),
        )
    }

    pub fn step(&self) -> AuthStep {
        self.step
    }

    /// Frame a COM_QUERY to transmit as soon as authentication succeeds.
    pub fn queue_command(&mut self, sql: &str) {
        crate::protocol::command::write_query(&mut self.queued, sql);
    }

    /// Feed the next decoded reply on this connection and learn what to send.
    pub fn on_reply(&mut self, reply: &Reply<'_>) -> Result<AuthAction> {
        match self.step {
            AuthStep::AwaitingGreeting => self.on_greeting(reply),
            AuthStep::AwaitingLoginResult => self.on_login_result(reply),
            AuthStep::Authenticated => Ok(AuthAction::Done),
            AuthStep::Failed => Err(Error::BadUsageError(
                "connection already failed authentication".to_string(),
            )),
        }
    }

    fn on_greeting(&mut self, reply: &Reply<'_>) -> Result<AuthAction> {
        if let Some(err) = reply.error() {
            self.step = AuthStep::Failed;
            return Err(self.rejection(err.code(), err.sqlstate(), err.message()));
        }
        // A server that skips authentication answers with an immediate Ok.
        if reply.ok().is_some() {
            self.step = AuthStep::Authenticated;
            return Ok(self.flush_queued());
        }
        let greeting = reply.auth().ok_or_else(|| {
            Error::BadUsageError("expected the server greeting".to_string())
        })?;

        debug!(
            protocol = greeting.protocol(),
            thread_id = greeting.thread_id(),
            "received server greeting"
        );

        let challenge = greeting.full_salt();
        let token = scramble_native_password(&self.password, &challenge);
        let mut out = Vec::new();
        write_login_packet(&mut out, &self.user, &token, self.schema.as_deref());

        self.step = AuthStep::AwaitingLoginResult;
        Ok(AuthAction::Send(out))
    }

    fn on_login_result(&mut self, reply: &Reply<'_>) -> Result<AuthAction> {
        if let Some(err) = reply.error() {
            self.step = AuthStep::Failed;
            return Err(self.rejection(err.code(), err.sqlstate(), err.message()));
        }
        if reply.ok().is_none() {
            return Err(Error::MalformedPacket);
        }
        debug!(user = %self.user, "authenticated");
        self.step = AuthStep::Authenticated;
        Ok(self.flush_queued())
    }

    fn flush_queued(&mut self) -> AuthAction {
        if self.queued.is_empty() {
            AuthAction::Done
        } else {
            AuthAction::Send(core::mem::take(&mut self.queued))
        }
    }

    fn rejection(&self, code: u16, sqlstate: &[u8], message: &[u8]) -> Error {
        Error::AuthFailed {
            code,
            sqlstate: String::from_utf8_lossy(sqlstate).into_owned(),
            message: String::from_utf8_lossy(message).into_owned(),
        }
    }
}
