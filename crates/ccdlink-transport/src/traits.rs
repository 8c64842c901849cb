use std::io::{Read, Write};

use crate::error::Result;

/// A connected device handle: anything that is both `Read` and `Write`.
///
/// Reads must not block: when nothing is pending, `read` returns `Ok(0)`.
/// Writes are expected to complete synchronously for small payloads.
pub trait DeviceIo: Read + Write {}

impl<T: Read + Write> DeviceIo for T {}

/// Opens device handles by path.
///
/// The host owns one connector and asks it for a fresh handle on every
/// connect request. Failures are reported, never retried here.
pub trait Connector {
    /// Open the device at `path`.
    fn open(&mut self, path: &str) -> Result<Box<dyn DeviceIo>>;
}

impl<F> Connector for F
where
    F: FnMut(&str) -> Result<Box<dyn DeviceIo>>,
{
    fn open(&mut self, path: &str) -> Result<Box<dyn DeviceIo>> {
        self(path)
    }
}
