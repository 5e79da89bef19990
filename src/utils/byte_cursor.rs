use crate::asn1::tlv::consume_length;
use crate::err::{DerError, DerResult};

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`, intended for DER walking where:
/// - the whole receipt is already in memory, and
/// - every read must be bounded by the enclosing container, not only by the buffer.
///
/// Reads advance the cursor on success and leave it untouched on failure.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub(crate) fn u8_named(&mut self, what: &'static str) -> DerResult<u8> {
        let b = self
            .buf
            .get(self.pos)
            .copied()
            .ok_or(DerError::ReachedEof { what })?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads a DER length whose encoding must end before `limit`.
    pub(crate) fn length(&mut self, limit: usize) -> DerResult<usize> {
        let window = self
            .buf
            .get(self.pos..limit)
            .ok_or(DerError::ReachedEof { what: "length" })?;
        let (length, rest) = consume_length(window)?;
        self.pos = limit - rest.len();
        Ok(length)
    }

    /// Takes `len` bytes, failing if they would cross `limit`.
    pub(crate) fn take_bytes(
        &mut self,
        len: usize,
        limit: usize,
        what: &'static str,
    ) -> DerResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= limit && *end <= self.buf.len())
            .ok_or(DerError::InvalidLength {
                reason: "value overruns its enclosing container",
            })?;
        let out = &self.buf[self.pos..end];
        log::trace!("took {} bytes of {} at offset {}", len, what, self.pos);
        self.pos = end;
        Ok(out)
    }
}
