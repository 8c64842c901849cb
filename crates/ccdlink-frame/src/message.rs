//! Typed messages carried inside COBS frames.
//!
//! Host to device:
//! ```text
//! [tag=CcdSensor][varint id][varint iterations][varint exposure][varint checksum:u16]
//! ```
//! Device to host:
//! ```text
//! [tag=CcdResult][varint id][varint iterations][varint exposure][varint pixel_count][pixel_count × varint u32]
//! [tag=Log][varint severity][varint line][len-prefixed function][len-prefixed message]
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::error::{FrameError, Result};
use crate::payload::{Payload, PayloadReader};

/// Value sent in the request checksum slot.
///
/// The device firmware does not verify it; no checksum algorithm is
/// defined for this link yet.
pub const CHECKSUM_PLACEHOLDER: u16 = 420;

/// Exclusive upper bound on `pixel_count` in a CCD result.
pub const DEFAULT_MAX_PIXEL_COUNT: u32 = 5000;

/// Scratch size for serializing one request before COBS encoding.
pub const REQUEST_CAPACITY: usize = 64;

/// Commands understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HostCommand {
    GetInfo = 0,
    CcdSensor = 1,
}

impl TryFrom<u8> for HostCommand {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::GetInfo),
            1 => Ok(Self::CcdSensor),
            other => Err(FrameError::UnexpectedTag(other)),
        }
    }
}

/// Message kinds sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseTag {
    CcdResult = 0,
    Log = 1,
}

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Norm = 1,
    Error = 2,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Norm => "norm",
            Severity::Error => "error",
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Debug),
            1 => Ok(Self::Norm),
            2 => Ok(Self::Error),
            other => Err(FrameError::InvalidSeverity(other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to run one CCD acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcdRequest {
    /// Result id reserved by the host before sending.
    pub id: u32,
    pub iterations: u32,
    /// Exposure (integration) time in microseconds.
    pub exposure: u32,
}

impl CcdRequest {
    /// Append the request, checksum slot included.
    pub fn serialize(&self, payload: &mut Payload) -> Result<()> {
        payload.put_varint(HostCommand::CcdSensor as u8)?;
        payload.put_varint(self.id)?;
        payload.put_varint(self.iterations)?;
        payload.put_varint(self.exposure)?;
        payload.put_varint(CHECKSUM_PLACEHOLDER)
    }

    /// Parse a decoded request frame. Returns the request and its checksum field.
    pub fn decode(bytes: &[u8]) -> Result<(Self, u16)> {
        let mut reader = PayloadReader::new(bytes);
        let tag = HostCommand::try_from(reader.get_varint::<u8>()?)?;
        if tag != HostCommand::CcdSensor {
            return Err(FrameError::UnexpectedTag(tag as u8));
        }
        let request = Self {
            id: reader.get_varint()?,
            iterations: reader.get_varint()?,
            exposure: reader.get_varint()?,
        };
        let checksum = reader.get_varint()?;
        Ok((request, checksum))
    }
}

/// Accumulated samples of one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcdResult {
    pub id: u32,
    pub iterations: u32,
    pub exposure: u32,
    pub samples: Vec<u32>,
}

impl CcdResult {
    /// Append the result in the device's wire layout.
    pub fn serialize(&self, payload: &mut Payload) -> Result<()> {
        let pixel_count =
            u32::try_from(self.samples.len()).map_err(|_| FrameError::Capacity {
                needed: self.samples.len(),
                remaining: payload.remaining(),
            })?;
        payload.put_varint(ResponseTag::CcdResult as u8)?;
        payload.put_varint(self.id)?;
        payload.put_varint(self.iterations)?;
        payload.put_varint(self.exposure)?;
        payload.put_varint(pixel_count)?;
        for &sample in &self.samples {
            payload.put_varint(sample)?;
        }
        Ok(())
    }

    fn read_body(reader: &mut PayloadReader<'_>, max_pixel_count: u32) -> Result<Self> {
        let id = reader.get_varint()?;
        let iterations = reader.get_varint()?;
        let exposure = reader.get_varint()?;
        let pixel_count: u32 = reader.get_varint()?;

        if pixel_count >= max_pixel_count {
            return Err(FrameError::PixelCountTooLarge {
                count: pixel_count,
                max: max_pixel_count,
            });
        }
        // Each sample takes at least one byte.
        if pixel_count as usize > reader.remaining() {
            return Err(FrameError::UnexpectedEnd);
        }

        let mut samples = Vec::with_capacity(pixel_count as usize);
        for _ in 0..pixel_count {
            samples.push(reader.get_varint()?);
        }

        Ok(Self {
            id,
            iterations,
            exposure,
            samples,
        })
    }
}

/// A log line emitted by the device firmware.
///
/// Text fields borrow from the decode buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLog<'a> {
    pub severity: Severity,
    pub line: u32,
    pub function: &'a [u8],
    pub message: &'a [u8],
}

impl<'a> DeviceLog<'a> {
    pub fn function_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.function)
    }

    pub fn message_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.message)
    }

    /// Append the log record in the device's wire layout.
    pub fn serialize(&self, payload: &mut Payload) -> Result<()> {
        payload.put_varint(ResponseTag::Log as u8)?;
        payload.put_varint(self.severity as u8)?;
        payload.put_varint(self.line)?;
        payload.put_bytes(self.function)?;
        payload.put_bytes(self.message)
    }

    fn read_body(reader: &mut PayloadReader<'a>) -> Result<Self> {
        let severity = Severity::try_from(reader.get_varint::<u8>()?)?;
        let line = reader.get_varint()?;
        let function = reader.get_bytes()?;
        let message = reader.get_bytes()?;
        Ok(Self {
            severity,
            line,
            function,
            message,
        })
    }
}

/// One decoded device-to-host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage<'a> {
    CcdResult(CcdResult),
    Log(DeviceLog<'a>),
    /// A tag this host does not know; the body is left uninterpreted.
    Unknown(u8),
}

impl<'a> DeviceMessage<'a> {
    /// Interpret a COBS-decoded frame.
    ///
    /// `max_pixel_count` bounds the sample vector before it is allocated.
    pub fn decode(bytes: &'a [u8], max_pixel_count: u32) -> Result<Self> {
        let mut reader = PayloadReader::new(bytes);
        let tag: u8 = reader.get_varint()?;
        match tag {
            t if t == ResponseTag::CcdResult as u8 => Ok(Self::CcdResult(CcdResult::read_body(
                &mut reader,
                max_pixel_count,
            )?)),
            t if t == ResponseTag::Log as u8 => Ok(Self::Log(DeviceLog::read_body(&mut reader)?)),
            other => Ok(Self::Unknown(other)),
        }
    }
}
