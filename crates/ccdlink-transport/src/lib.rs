//! Serial device transport abstraction.
//!
//! Provides a unified interface over the byte pipe to an instrument:
//! - [`DeviceIo`]: any `Read + Write` handle the host can poll
//! - [`Connector`]: opens a [`DeviceIo`] for a device path
//! - [`SerialConnector`]: real serial ports via the `serialport` crate
//!
//! This is the lowest layer of ccdlink. Reads are best-effort and
//! non-blocking: a handle returns `Ok(0)` when nothing is pending.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConfig, SerialConnector, SerialDevice};
pub use traits::{Connector, DeviceIo};
