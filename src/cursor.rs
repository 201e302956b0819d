use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};

/// A consumable byte queue fed by the transport.
///
/// The decoder peeks before it consumes, so a partially delivered packet is
/// left untouched in the cursor and decoding resumes cleanly once the
/// transport feeds the rest.
#[derive(Debug, Default)]
pub struct ByteCursor {
    buf: BytesMut,
}

impl ByteCursor {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Append bytes delivered by the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        self.buf.get(..n)
    }

    /// Remove and return the next `n` bytes.
    ///
    /// Callers must have verified availability with [`peek`](Self::peek) or
    /// [`len`](Self::len) first.
    pub fn consume(&mut self, n: usize) -> Result<BytesMut> {
        if self.buf.len() < n {
            return Err(Error::InsufficientData);
        }
        Ok(self.buf.split_to(n))
    }

    /// Drop the next `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(Error::InsufficientData);
        }
        self.buf.advance(n);
        Ok(())
    }
}

impl From<&[u8]> for ByteCursor {
    fn from(bytes: &[u8]) -> Self {
        let mut cursor = Self::new();
        cursor.feed(bytes);
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_consume() {
        let cursor = ByteCursor::from(&b"abcdef"[..]);
        assert_eq!(cursor.peek(3), Some(&b"abc"[..]));
        assert_eq!(cursor.len(), 6);
        assert_eq!(cursor.peek(7), None);
    }

    #[test]
    fn consume_advances() {
        let mut cursor = ByteCursor::from(&b"abcdef"[..]);
        let head = cursor.consume(2).unwrap();
        assert_eq!(&head[..], b"ab");
        assert_eq!(cursor.peek(4), Some(&b"cdef"[..]));
        assert!(matches!(
            cursor.consume(5),
            Err(Error::InsufficientData)
        ));
    }

    #[test]
    fn feed_appends() {
        let mut cursor = ByteCursor::new();
        cursor.feed(b"ab");
        cursor.feed(b"cd");
        assert_eq!(cursor.peek(4), Some(&b"abcd"[..]));
    }
}
