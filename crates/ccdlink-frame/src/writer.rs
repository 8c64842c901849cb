use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::cobs::{encode, max_encoded_len};
use crate::error::{FrameError, Result};
use crate::message::{CcdRequest, REQUEST_CAPACITY};
use crate::payload::Payload;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// COBS-encode `src` and append it, delimiter included, to `dst`.
pub fn encode_frame(src: &[u8], dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    dst.resize(start + max_encoded_len(src.len()), 0);
    match encode(src, &mut dst[start..]) {
        Ok(n) => {
            dst.truncate(start + n);
            Ok(())
        }
        Err(err) => {
            dst.truncate(start);
            Err(err)
        }
    }
}

/// Writes complete COBS frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    payload: Payload,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a frame writer sized for host requests.
    pub fn new(inner: T) -> Self {
        Self::with_payload_capacity(inner, REQUEST_CAPACITY)
    }

    /// Create a frame writer with an explicit payload scratch size.
    pub fn with_payload_capacity(inner: T, payload_capacity: usize) -> Self {
        Self {
            inner,
            payload: Payload::with_capacity(payload_capacity),
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Serialize, encode and write a CCD request. Returns the bytes written.
    pub fn send_request(&mut self, request: &CcdRequest) -> Result<usize> {
        self.send_with(|payload| request.serialize(payload))
    }

    /// Serialize a message with `build`, then encode and write it.
    ///
    /// Nothing is written if serialization fails.
    pub fn send_with<F>(&mut self, build: F) -> Result<usize>
    where
        F: FnOnce(&mut Payload) -> Result<()>,
    {
        self.payload.clear();
        build(&mut self.payload)?;

        self.buf.clear();
        encode_frame(self.payload.as_slice(), &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and write an already serialized payload.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<usize> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        trace!(bytes = offset, "frame written");
        Ok(offset)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
