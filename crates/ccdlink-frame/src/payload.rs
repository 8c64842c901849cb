//! Bounds-checked cursors over payload buffers.
//!
//! [`Payload`] owns a fixed-capacity buffer and only grows its cursor
//! through checked writes. [`PayloadReader`] walks a borrowed buffer and
//! hands out zero-copy views. Neither exposes raw offsets.

use crate::error::{FrameError, Result};

/// Owned fixed-capacity write buffer with a cursor.
///
/// The cursor never leaves `[0, capacity]`. Callers reserve the worst case
/// with [`Payload::ensure_capacity`] before a multi-byte write so that a
/// failed write leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Payload {
    buf: Box<[u8]>,
    cursor: usize,
}

impl Payload {
    /// Create an empty payload that can hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Bytes still available for writing.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// True when the cursor sits at the end of the buffer.
    pub fn is_full(&self) -> bool {
        self.cursor == self.buf.len()
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Rewind the cursor to the start. Capacity is kept.
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Fail unless at least `needed` bytes are free.
    pub fn ensure_capacity(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(FrameError::Capacity { needed, remaining });
        }
        Ok(())
    }

    /// Append one byte.
    pub fn put_u8(&mut self, byte: u8) -> Result<()> {
        self.ensure_capacity(1)?;
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        Ok(())
    }

    /// Append raw bytes.
    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_capacity(bytes.len())?;
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }
}

/// Read cursor over a borrowed buffer.
///
/// Every read checks the end of the buffer first. Slices returned by
/// [`PayloadReader::get_slice`] borrow from the source, not the reader.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> PayloadReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// True when every byte has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.cursor == self.buf.len()
    }

    /// Read one byte.
    pub fn get_u8(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.cursor).ok_or(FrameError::UnexpectedEnd)?;
        self.cursor += 1;
        Ok(byte)
    }

    /// Borrow the next `len` bytes.
    pub fn get_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(FrameError::UnexpectedEnd);
        }
        let buf: &'a [u8] = self.buf;
        let slice = &buf[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }
}
