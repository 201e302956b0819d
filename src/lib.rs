//! Client-side codec for the MySQL wire protocol (text protocol, 4.1+).
//!
//! The crate turns a byte stream delivered by a transport into typed replies
//! (greeting, OK, Error, EOF, result set), drives the challenge/response
//! login handshake, and frames outgoing command packets. It does no I/O of
//! its own: the transport feeds bytes into a [`ByteCursor`] and repeatedly
//! calls [`Reply::consume_partial`], which parks itself whenever the buffer
//! runs dry and resumes where it left off.
//!
//! Variable-length data in a decoded reply (column names, messages, cell
//! text) is stored in a caller-supplied [`Arena`] and exposed as borrowed
//! views, so the arena must outlive the reply it backs.

mod arena;
pub mod constant;
mod cursor;
pub mod error;
mod opts;
pub mod protocol;

pub use arena::Arena;
pub use cursor::ByteCursor;
pub use opts::Opts;
pub use protocol::connection::{AuthAction, AuthStep, Authenticator};
pub use protocol::{Progress, Reply, ReplyKind};
