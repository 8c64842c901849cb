//! Base-128 varints, zig-zag signed mapping and length-prefixed byte strings.
//!
//! Each byte carries 7 data bits, least significant group first; the high
//! bit is set when another byte follows. Signed values are zig-zag mapped
//! before encoding so small magnitudes stay short.
//!
//! Only integers up to 32 bits implement [`VarInt`]. Wider types do not
//! compile:
//!
//! ```compile_fail
//! let mut payload = ccdlink_frame::Payload::with_capacity(16);
//! payload.put_varint(1u64).unwrap();
//! ```

use crate::error::{FrameError, Result};
use crate::payload::{Payload, PayloadReader};

/// Worst-case encoded size of any supported integer.
pub const MAX_VARINT_LEN: usize = 5;

mod sealed {
    pub trait Sealed {}
}

/// Integer types with a varint wire representation (32 bits or narrower).
pub trait VarInt: sealed::Sealed + Copy {
    /// Width of the in-memory type.
    const BITS: u32;

    /// Map to the unsigned value that goes on the wire.
    fn to_wire(self) -> u32;

    /// Map a decoded wire value back, rejecting values wider than `Self`.
    fn from_wire(value: u64) -> Result<Self>;
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl sealed::Sealed for $t {}

        impl VarInt for $t {
            const BITS: u32 = <$t>::BITS;

            fn to_wire(self) -> u32 {
                u32::from(self)
            }

            fn from_wire(value: u64) -> Result<Self> {
                <$t>::try_from(value).map_err(|_| FrameError::VarintOverflow { bits: Self::BITS })
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty => $u:ty),*) => {$(
        impl sealed::Sealed for $t {}

        impl VarInt for $t {
            const BITS: u32 = <$t>::BITS;

            fn to_wire(self) -> u32 {
                u32::from(((self << 1) ^ (self >> (Self::BITS - 1))) as $u)
            }

            fn from_wire(value: u64) -> Result<Self> {
                let z = <$u>::try_from(value)
                    .map_err(|_| FrameError::VarintOverflow { bits: Self::BITS })?;
                Ok(((z >> 1) as $t) ^ -((z & 1) as $t))
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32);
impl_signed!(i8 => u8, i16 => u16, i32 => u32);

/// Zig-zag map a signed value: 0 → 0, -1 → 1, 1 → 2, -2 → 3, ...
pub fn zigzag_encode(value: i32) -> u32 {
    value.to_wire()
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Number of bytes `value` occupies on the wire.
pub fn encoded_len<T: VarInt>(value: T) -> usize {
    let mut wire = value.to_wire();
    let mut len = 1;
    while wire >= 0x80 {
        wire >>= 7;
        len += 1;
    }
    len
}

impl Payload {
    /// Serialize an integer as a varint.
    ///
    /// Requires [`MAX_VARINT_LEN`] free bytes regardless of the value; on
    /// failure the cursor does not move.
    pub fn put_varint<T: VarInt>(&mut self, value: T) -> Result<()> {
        self.ensure_capacity(MAX_VARINT_LEN)?;
        let mut wire = value.to_wire();
        loop {
            let group = (wire & 0x7F) as u8;
            wire >>= 7;
            if wire == 0 {
                self.put_u8(group)?;
                return Ok(());
            }
            self.put_u8(group | 0x80)?;
        }
    }

    /// Serialize a varint length followed by the raw bytes.
    ///
    /// Requires `MAX_VARINT_LEN + bytes.len()` free bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| FrameError::Capacity {
            needed: bytes.len(),
            remaining: self.remaining(),
        })?;
        self.ensure_capacity(MAX_VARINT_LEN + bytes.len())?;
        self.put_varint(len)?;
        self.put_slice(bytes)
    }
}

impl<'a> PayloadReader<'a> {
    /// Deserialize a varint into `T`.
    ///
    /// Fails without moving the cursor if the buffer ends mid-value or the
    /// value does not fit `T`.
    pub fn get_varint<T: VarInt>(&mut self) -> Result<T> {
        let mut ahead = self.clone();
        let mut value = 0u64;
        for group in 0..MAX_VARINT_LEN {
            let byte = ahead.get_u8()?;
            value |= u64::from(byte & 0x7F) << (7 * group);
            if byte & 0x80 == 0 {
                let decoded = T::from_wire(value)?;
                *self = ahead;
                return Ok(decoded);
            }
        }
        Err(FrameError::VarintOverflow { bits: T::BITS })
    }

    /// Deserialize a length-prefixed byte string as a view into the source.
    pub fn get_bytes(&mut self) -> Result<&'a [u8]> {
        let mut ahead = self.clone();
        let len: u32 = ahead.get_varint()?;
        let bytes = ahead.get_slice(len as usize)?;
        *self = ahead;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: VarInt + PartialEq + std::fmt::Debug>(value: T) {
        let mut payload = Payload::with_capacity(MAX_VARINT_LEN);
        payload.put_varint(value).unwrap();
        assert_eq!(payload.len(), encoded_len(value));

        let mut reader = PayloadReader::new(payload.as_slice());
        assert_eq!(reader.get_varint::<T>().unwrap(), value);
        assert!(reader.is_at_end());
    }

    #[test]
    fn unsigned_boundaries_roundtrip() {
        for value in [0u32, 1, 127, 128, 16_383, 16_384, u32::MAX / 2, u32::MAX] {
            roundtrip(value);
        }
        roundtrip(u8::MAX);
        roundtrip(u16::MAX);
    }

    #[test]
    fn signed_boundaries_roundtrip() {
        for value in [0i32, 1, -1, 63, -64, 64, -65, i32::MIN, i32::MAX] {
            roundtrip(value);
        }
        roundtrip(i8::MIN);
        roundtrip(i8::MAX);
        roundtrip(i16::MIN);
        roundtrip(i16::MAX);
    }

    #[test]
    fn zigzag_small_magnitudes() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode(i32::MIN), u32::MAX);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(u32::MAX), i32::MIN);
    }

    #[test]
    fn narrow_signed_uses_own_width() {
        assert_eq!((-1i8).to_wire(), 1);
        assert_eq!(i8::MIN.to_wire(), 255);
        assert_eq!(i16::MIN.to_wire(), 65_535);
    }

    #[test]
    fn known_encodings() {
        let mut payload = Payload::with_capacity(16);
        payload.put_varint(300u32).unwrap();
        payload.put_varint(-3i32).unwrap();
        assert_eq!(payload.as_slice(), &[0xAC, 0x02, 0x05]);
    }

    #[test]
    fn insufficient_capacity_leaves_cursor() {
        let mut payload = Payload::with_capacity(8);
        payload.put_slice(&[0xEE; 4]).unwrap();

        let err = payload.put_varint(1u8).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Capacity {
                needed: 5,
                remaining: 4
            }
        ));
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn bytes_need_prefix_headroom() {
        let mut payload = Payload::with_capacity(8);
        assert!(payload.put_bytes(b"abcd").is_err());
        assert!(payload.is_empty());

        payload.put_bytes(b"abc").unwrap();
        assert_eq!(payload.as_slice(), &[3, b'a', b'b', b'c']);
    }

    #[test]
    fn bytes_are_zero_copy_views() {
        let mut payload = Payload::with_capacity(32);
        payload.put_bytes(b"sensor_read").unwrap();
        payload.put_bytes(b"").unwrap();

        let wire = payload.as_slice().to_vec();
        let mut reader = PayloadReader::new(&wire);
        let first = reader.get_bytes().unwrap();
        let second = reader.get_bytes().unwrap();

        assert_eq!(first, b"sensor_read");
        assert!(second.is_empty());
        assert_eq!(first.as_ptr(), wire[1..].as_ptr());
    }

    #[test]
    fn truncated_varint_fails_without_advancing() {
        let wire = [0x80u8, 0x80];
        let mut reader = PayloadReader::new(&wire);
        assert!(matches!(
            reader.get_varint::<u32>(),
            Err(FrameError::UnexpectedEnd)
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn empty_buffer_is_unexpected_end() {
        let mut reader = PayloadReader::new(&[]);
        assert!(matches!(
            reader.get_varint::<u8>(),
            Err(FrameError::UnexpectedEnd)
        ));
    }

    #[test]
    fn too_many_groups_is_overflow() {
        let wire = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut reader = PayloadReader::new(&wire);
        assert!(matches!(
            reader.get_varint::<u32>(),
            Err(FrameError::VarintOverflow { bits: 32 })
        ));
    }

    #[test]
    fn value_wider_than_target_is_overflow() {
        let mut payload = Payload::with_capacity(8);
        payload.put_varint(256u32).unwrap();

        let mut reader = PayloadReader::new(payload.as_slice());
        assert!(matches!(
            reader.get_varint::<u8>(),
            Err(FrameError::VarintOverflow { bits: 8 })
        ));

        let mut five = PayloadReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]);
        assert!(matches!(
            five.get_varint::<u32>(),
            Err(FrameError::VarintOverflow { bits: 32 })
        ));
    }

    #[test]
    fn byte_string_longer_than_buffer_fails() {
        let wire = [10u8, b'x', b'y'];
        let mut reader = PayloadReader::new(&wire);
        assert!(matches!(reader.get_bytes(), Err(FrameError::UnexpectedEnd)));
        assert_eq!(reader.position(), 0);
    }
}
