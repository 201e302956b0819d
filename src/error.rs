use thiserror::Error;

pub use color_eyre::eyre::eyre;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Not enough bytes are buffered to decode the next item. Not fatal:
    /// feed more bytes into the cursor and drive the decoder again.
    #[error("insufficient data: need more bytes to continue decoding")]
    InsufficientData,

    /// The byte stream does not form a valid server packet. Fatal for the
    /// connection that produced it.
    #[error("malformed packet")]
    MalformedPacket,

    /// The arena refused an allocation.
    #[error("arena allocation failed")]
    OutOfMemory,

    /// The server rejected the login during the handshake.
    #[error("authentication failed: ERROR {code} ({sqlstate}): {message}")]
    AuthFailed {
        code: u16,
        sqlstate: String,
        message: String,
    },

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("A bug in mysql-codec: {0}")]
    LibraryBug(color_eyre::Report),
}

impl<Src, Dst: ?Sized> From<zerocopy::CastError<Src, Dst>> for Error {
    fn from(err: zerocopy::CastError<Src, Dst>) -> Self {
        Self::LibraryBug(color_eyre::eyre::eyre!("{:#?}", err))
    }
}
