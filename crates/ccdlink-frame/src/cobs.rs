//! Consistent Overhead Byte Stuffing.
//!
//! Encoding removes every zero byte from a payload so that a single
//! trailing `0x00` can delimit frames on the wire:
//!
//! ```text
//! ┌──────┬───────────────┬──────┬─────────┬─────┬──────┐
//! │ code │ code-1 bytes  │ code │ ...     │ ... │ 0x00 │
//! └──────┴───────────────┴──────┴─────────┴─────┴──────┘
//! ```
//!
//! A code byte `N` in `1..=0xFE` is followed by `N - 1` literal bytes and an
//! implied zero. `0xFF` is followed by 254 literal bytes and no implied zero.
//! The implied zero of the final run is the delimiter itself.

use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const DELIMITER: u8 = 0x00;

/// Longest run of literal bytes one code byte can cover.
pub const MAX_RUN: usize = 254;

const FULL_RUN_CODE: u8 = 0xFF;

/// Worst-case number of code bytes added when encoding `len` bytes.
pub const fn cobs_overhead(len: usize) -> usize {
    1 + len.div_ceil(MAX_RUN)
}

/// Worst-case size of `len` encoded bytes including the trailing delimiter.
pub const fn max_encoded_len(len: usize) -> usize {
    len + cobs_overhead(len) + 1
}

/// Worst-case bytes added on top of a command frame carrying `payload_len`
/// bytes of body.
///
/// A command frame is `[type:1][len:2 if payload_len > 0][payload][crc:2]`;
/// the result covers the COBS code bytes plus two frame markers.
pub const fn max_frame_overhead(payload_len: usize) -> usize {
    let length_prefix = if payload_len > 0 { 2 } else { 0 };
    let pre_size = 1 + length_prefix + payload_len + 2;
    cobs_overhead(pre_size) + 2
}

/// Incremental COBS encoder writing into a fixed destination.
///
/// Data may be pushed in several chunks; [`CobsEncoder::finish`] closes the
/// last run and appends the delimiter. A chunk that does not fit is rejected
/// as a whole: the encoder state is left as it was before the call.
#[derive(Debug)]
pub struct CobsEncoder<'a> {
    dst: &'a mut [u8],
    out: usize,
    code_pos: usize,
    code: u8,
}

impl<'a> CobsEncoder<'a> {
    /// Start encoding into `dst`. The first byte is reserved for a code byte.
    pub fn new(dst: &'a mut [u8]) -> Result<Self> {
        if dst.is_empty() {
            return Err(FrameError::Capacity {
                needed: 1,
                remaining: 0,
            });
        }
        Ok(Self {
            dst,
            out: 1,
            code_pos: 0,
            code: 1,
        })
    }

    /// Encode another chunk of source bytes.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        let (mut out, mut code_pos, mut code) = (self.out, self.code_pos, self.code);
        let mut i = 0;
        while i < data.len() {
            if out >= self.dst.len() {
                return Err(FrameError::Capacity {
                    needed: 1,
                    remaining: 0,
                });
            }

            if code == FULL_RUN_CODE {
                self.dst[code_pos] = code;
                code_pos = out;
                code = 1;
            } else if data[i] == DELIMITER {
                self.dst[code_pos] = code;
                code_pos = out;
                code = 1;
                i += 1;
            } else {
                self.dst[out] = data[i];
                code += 1;
                i += 1;
            }
            out += 1;
        }

        self.out = out;
        self.code_pos = code_pos;
        self.code = code;
        Ok(())
    }

    /// Close the final run, append the delimiter and return the encoded length.
    pub fn finish(self) -> Result<usize> {
        if self.out >= self.dst.len() {
            return Err(FrameError::Capacity {
                needed: 1,
                remaining: 0,
            });
        }
        self.dst[self.code_pos] = self.code;
        self.dst[self.out] = DELIMITER;
        Ok(self.out + 1)
    }
}

/// Encode `src` into `dst`, delimiter included. Returns the encoded length.
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut encoder = CobsEncoder::new(dst)?;
    encoder.push(src)?;
    encoder.finish()
}

/// Decode one frame (without its delimiter) into `dst`.
///
/// Returns the decoded length. Zero bytes inside the frame and runs cut
/// short by the end of the frame are rejected.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut out = 0usize;
    let mut run_left = 0usize;
    let mut implied_zero = false;

    for (offset, &byte) in src.iter().enumerate() {
        if byte == DELIMITER {
            return Err(FrameError::ZeroInFrame(offset));
        }

        if run_left == 0 {
            if implied_zero {
                write_decoded(dst, &mut out, DELIMITER)?;
            }
            run_left = usize::from(byte) - 1;
            implied_zero = byte != FULL_RUN_CODE;
        } else {
            write_decoded(dst, &mut out, byte)?;
            run_left -= 1;
        }
    }

    if run_left != 0 {
        return Err(FrameError::TruncatedRun { missing: run_left });
    }
    Ok(out)
}

fn write_decoded(dst: &mut [u8], out: &mut usize, byte: u8) -> Result<()> {
    let slot = dst.get_mut(*out).ok_or(FrameError::Capacity {
        needed: 1,
        remaining: 0,
    })?;
    *slot = byte;
    *out += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_vec(src: &[u8]) -> Vec<u8> {
        let mut dst = vec![0u8; max_encoded_len(src.len())];
        let n = encode(src, &mut dst).unwrap();
        dst.truncate(n);
        dst
    }

    fn decode_vec(frame: &[u8]) -> Vec<u8> {
        let mut dst = vec![0u8; frame.len()];
        let n = decode(frame, &mut dst).unwrap();
        dst.truncate(n);
        dst
    }

    #[test]
    fn reference_vectors() {
        let cases: [(&[u8], &[u8]); 6] = [
            (&[], &[0x01, 0x00]),
            (&[0x00], &[0x01, 0x01, 0x00]),
            (&[0x00, 0x00], &[0x01, 0x01, 0x01, 0x00]),
            (&[0x11, 0x22, 0x00, 0x33], &[0x03, 0x11, 0x22, 0x02, 0x33, 0x00]),
            (&[0x11, 0x22, 0x33, 0x44], &[0x05, 0x11, 0x22, 0x33, 0x44, 0x00]),
            (&[0x11, 0x00, 0x00, 0x00], &[0x02, 0x11, 0x01, 0x01, 0x01, 0x00]),
        ];

        for (raw, wire) in cases {
            assert_eq!(encode_vec(raw), wire, "encoding {raw:02x?}");
            assert_eq!(decode_vec(&wire[..wire.len() - 1]), raw);
        }
    }

    #[test]
    fn full_run_has_no_implied_zero() {
        let raw: Vec<u8> = (1..=254).collect();
        let wire = encode_vec(&raw);

        assert_eq!(wire[0], 0xFF);
        assert_eq!(&wire[1..255], raw.as_slice());
        assert_eq!(wire[255], 0x00);
        assert_eq!(wire.len(), 256);
        assert_eq!(decode_vec(&wire[..255]), raw);
    }

    #[test]
    fn run_longer_than_cap_splits() {
        let raw: Vec<u8> = (1..=255).collect();
        let wire = encode_vec(&raw);

        assert_eq!(wire[0], 0xFF);
        assert_eq!(&wire[255..], &[0x02, 0xFF, 0x00]);
        assert_eq!(decode_vec(&wire[..wire.len() - 1]), raw);
    }

    #[test]
    fn zero_right_after_full_run_survives() {
        let mut raw: Vec<u8> = (2..=255).collect();
        raw.push(0x00);
        let wire = encode_vec(&raw);

        assert_eq!(&wire[255..], &[0x01, 0x01, 0x00]);
        assert_eq!(decode_vec(&wire[..wire.len() - 1]), raw);
    }

    #[test]
    fn roundtrip_with_embedded_zeros() {
        let mut raw = Vec::new();
        for i in 0..2_000u32 {
            raw.push(if i % 7 == 0 { 0 } else { (i % 251) as u8 });
        }
        raw.extend(std::iter::repeat(0xAA).take(600));
        raw.extend([0, 0, 0]);

        let wire = encode_vec(&raw);
        assert_eq!(wire.iter().filter(|&&b| b == 0).count(), 1);
        assert!(wire.len() <= max_encoded_len(raw.len()));
        assert_eq!(decode_vec(&wire[..wire.len() - 1]), raw);
    }

    #[test]
    fn chunked_push_matches_single_push() {
        let raw: Vec<u8> = (0..600u32).map(|i| (i % 5) as u8).collect();
        let expected = encode_vec(&raw);

        let mut dst = vec![0u8; max_encoded_len(raw.len())];
        let mut encoder = CobsEncoder::new(&mut dst).unwrap();
        for chunk in raw.chunks(37) {
            encoder.push(chunk).unwrap();
        }
        let n = encoder.finish().unwrap();

        assert_eq!(&dst[..n], expected.as_slice());
    }

    #[test]
    fn encode_fails_when_destination_too_small() {
        let mut dst = [0u8; 4];
        assert!(matches!(
            encode(&[1, 2, 3, 4], &mut dst),
            Err(FrameError::Capacity { .. })
        ));
        assert!(matches!(
            encode(&[1, 2, 3], &mut dst[..0]),
            Err(FrameError::Capacity { .. })
        ));
        assert_eq!(encode(&[1, 2], &mut dst).unwrap(), 4);
    }

    #[test]
    fn rejected_chunk_is_not_committed() {
        let mut dst = [0u8; 6];
        let mut encoder = CobsEncoder::new(&mut dst).unwrap();
        encoder.push(&[1, 2]).unwrap();
        assert!(encoder.push(&[3, 4, 5, 6]).is_err());
        encoder.push(&[3]).unwrap();
        let n = encoder.finish().unwrap();

        assert_eq!(&dst[..n], &[0x04, 1, 2, 3, 0x00]);
    }

    #[test]
    fn decode_fails_when_destination_too_small() {
        let wire = [0x05, 0x11, 0x22, 0x33, 0x44];
        let mut dst = [0u8; 3];
        assert!(matches!(
            decode(&wire, &mut dst),
            Err(FrameError::Capacity { .. })
        ));
    }

    #[test]
    fn decode_rejects_malformed_frames() {
        let mut dst = [0u8; 16];
        assert!(matches!(
            decode(&[0x03, 0x00, 0x01], &mut dst),
            Err(FrameError::ZeroInFrame(1))
        ));
        assert!(matches!(
            decode(&[0x05, 0x11], &mut dst),
            Err(FrameError::TruncatedRun { missing: 3 })
        ));
    }

    #[test]
    fn empty_frame_decodes_to_nothing() {
        let mut dst = [0u8; 1];
        assert_eq!(decode(&[], &mut dst).unwrap(), 0);
        assert_eq!(decode(&[0x01], &mut dst).unwrap(), 0);
    }

    #[test]
    fn interoperates_with_cobs_crate() {
        let samples: [&[u8]; 4] = [
            b"hello",
            &[0x00, 0x01, 0x00, 0x02],
            &[0x10, 0x00, 0x00, 0x20, 0x30],
            &[0x01, 0x00],
        ];
        for raw in samples {
            let ours = encode_vec(raw);
            assert_eq!(&ours[..ours.len() - 1], cobs::encode_vec(raw).as_slice());
            assert_eq!(cobs::decode_vec(&ours[..ours.len() - 1]).unwrap(), raw);
        }

        let long: Vec<u8> = (0..700u32).map(|i| (i % 200) as u8 + 1).collect();
        assert_eq!(decode_vec(&cobs::encode_vec(&long)), long);
    }

    #[test]
    fn frame_overhead_formula() {
        assert_eq!(max_frame_overhead(0), 1 + 1 + 2);
        assert_eq!(max_frame_overhead(10), 1 + 1 + 2);
        assert_eq!(max_frame_overhead(250), 1 + 2 + 2);
        assert_eq!(cobs_overhead(254), 2);
        assert_eq!(cobs_overhead(255), 3);
        assert_eq!(max_encoded_len(0), 2);
    }
}
