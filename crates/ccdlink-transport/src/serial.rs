use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, DeviceIo};

/// Default line rate for instrument links.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port settings applied on open.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line rate. USB CDC devices ignore it. Default: 115200.
    pub baud_rate: u32,
    /// Read timeout. Zero keeps reads non-blocking.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::ZERO,
        }
    }
}

/// An open serial port.
///
/// Wraps the `serialport` handle so that an empty read (timeout or
/// would-block) surfaces as `Ok(0)` instead of an error.
pub struct SerialDevice {
    port: Box<dyn serialport::SerialPort>,
    path: String,
}

impl SerialDevice {
    /// Open `path` with the given settings.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        if path.is_empty() {
            return Err(TransportError::EmptyPath);
        }

        let port = serialport::new(path, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source,
            })?;

        info!(path, baud_rate = config.baud_rate, "opened serial device");

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// The path this device was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if is_empty_read(err.kind()) => Ok(0),
            Err(err) => Err(err),
        }
    }
}

impl Write for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf).map_err(retryable_write)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .finish()
    }
}

fn is_empty_read(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// A zero timeout makes a write to a full output buffer time out; callers
/// retry on `WouldBlock`.
fn retryable_write(err: std::io::Error) -> std::io::Error {
    if err.kind() == ErrorKind::TimedOut {
        std::io::Error::from(ErrorKind::WouldBlock)
    } else {
        err
    }
}

/// Opens [`SerialDevice`]s with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    /// Create a connector with default serial settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector with explicit serial settings.
    pub fn with_config(config: SerialConfig) -> Self {
        Self { config }
    }

    /// Current serial settings.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Connector for SerialConnector {
    fn open(&mut self, path: &str) -> Result<Box<dyn DeviceIo>> {
        let device = SerialDevice::open(path, &self.config)?;
        Ok(Box::new(device))
    }
}

/// A serial port found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Human-readable label (USB product string when known).
    pub friendly_name: String,
    /// Path to pass to [`Connector::open`].
    pub path: String,
}

/// List the serial ports currently present.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    debug!(count = ports.len(), "enumerated serial ports");

    Ok(ports
        .into_iter()
        .map(|port| {
            let friendly_name = match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => usb
                    .product
                    .clone()
                    .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                _ => port.port_name.clone(),
            };
            PortInfo {
                friendly_name,
                path: port.port_name,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_non_blocking() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout, Duration::ZERO);
    }

    #[test]
    fn empty_path_rejected_before_open() {
        let err = SerialDevice::open("", &SerialConfig::default()).unwrap_err();
        assert!(matches!(err, TransportError::EmptyPath));
    }

    #[test]
    fn missing_device_reports_path() {
        let mut connector = SerialConnector::new();
        let err = match connector.open("/dev/ccdlink-does-not-exist") {
            Ok(_) => panic!("opening a missing device should fail"),
            Err(err) => err,
        };
        match err {
            TransportError::Open { path, .. } => assert_eq!(path, "/dev/ccdlink-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn timeouts_count_as_empty_reads() {
        assert!(is_empty_read(ErrorKind::TimedOut));
        assert!(is_empty_read(ErrorKind::WouldBlock));
        assert!(!is_empty_read(ErrorKind::BrokenPipe));
    }

    #[test]
    fn write_timeout_is_retryable() {
        let err = retryable_write(std::io::Error::from(ErrorKind::TimedOut));
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        let err = retryable_write(std::io::Error::from(ErrorKind::BrokenPipe));
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
