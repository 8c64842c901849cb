use std::fs;

use ccdlink_frame::{cobs, DeviceMessage, FrameError, Reassembler};
use serde::Serialize;
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_json, print_table, sample_preview, OutputFormat};

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DecodedFrame {
    CcdResult {
        index: usize,
        id: u32,
        iterations: u32,
        exposure: u32,
        samples: Vec<u32>,
    },
    Log {
        index: usize,
        severity: &'static str,
        line: u32,
        function: String,
        message: String,
    },
    Unknown {
        index: usize,
        tag: u8,
    },
    Error {
        index: usize,
        error: String,
    },
}

#[derive(Debug)]
struct DecodeReport {
    frames: Vec<DecodedFrame>,
    trailing: usize,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let stream = read_stream(&args)?;
    let report = decode_stream(&stream, args.max_pixel_count);

    if report.trailing > 0 {
        warn!(
            bytes = report.trailing,
            "stream ends with an incomplete frame"
        );
    }

    print_frames(&report.frames, format);

    let failed = report
        .frames
        .iter()
        .any(|frame| matches!(frame, DecodedFrame::Error { .. }));
    Ok(if failed { DATA_INVALID } else { SUCCESS })
}

fn read_stream(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let Some(text) = &args.hex else {
        return Err(CliError::new(USAGE, "provide a hex stream or --file"));
    };
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|err| CliError::new(USAGE, format!("invalid hex stream: {err}")))
}

fn decode_stream(stream: &[u8], max_pixel_count: u32) -> DecodeReport {
    // One spare byte so a stream without any delimiter is not an overflow.
    let mut reassembler = Reassembler::with_capacity(stream.len() + 1);
    let mut ranges = Vec::new();
    if let Err(err) = reassembler.push(stream, &mut ranges) {
        return DecodeReport {
            frames: vec![DecodedFrame::Error {
                index: 0,
                error: err.to_string(),
            }],
            trailing: stream.len(),
        };
    }

    let mut scratch = vec![0u8; stream.len()];
    let frames = ranges
        .iter()
        .enumerate()
        .map(|(index, range)| {
            decode_one(reassembler.frame(*range), &mut scratch, max_pixel_count, index)
                .unwrap_or_else(|err| DecodedFrame::Error {
                    index,
                    error: err.to_string(),
                })
        })
        .collect();

    let consumed = ranges.last().map_or(0, |range| range.consumed_end());
    DecodeReport {
        frames,
        trailing: stream.len() - consumed,
    }
}

fn decode_one(
    encoded: &[u8],
    scratch: &mut [u8],
    max_pixel_count: u32,
    index: usize,
) -> Result<DecodedFrame, FrameError> {
    let len = cobs::decode(encoded, scratch)?;
    let decoded = match DeviceMessage::decode(&scratch[..len], max_pixel_count)? {
        DeviceMessage::CcdResult(result) => DecodedFrame::CcdResult {
            index,
            id: result.id,
            iterations: result.iterations,
            exposure: result.exposure,
            samples: result.samples,
        },
        DeviceMessage::Log(log) => DecodedFrame::Log {
            index,
            severity: log.severity.as_str(),
            line: log.line,
            function: log.function_lossy().into_owned(),
            message: log.message_lossy().into_owned(),
        },
        DeviceMessage::Unknown(tag) => DecodedFrame::Unknown { index, tag },
    };
    Ok(decoded)
}

fn print_frames(frames: &[DecodedFrame], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                print_json(frame);
            }
        }
        OutputFormat::Table => print_table(
            &["#", "KIND", "DETAIL"],
            frames
                .iter()
                .map(|frame| {
                    let (index, kind, detail) = describe(frame);
                    vec![index.to_string(), kind.to_string(), detail]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for frame in frames {
                let (index, kind, detail) = describe(frame);
                println!("#{index} {kind}: {detail}");
            }
        }
    }
}

fn describe(frame: &DecodedFrame) -> (usize, &'static str, String) {
    match frame {
        DecodedFrame::CcdResult {
            index,
            id,
            iterations,
            exposure,
            samples,
        } => (
            *index,
            "ccd_result",
            format!(
                "id={id} exposure={exposure}us iterations={iterations} pixels={} samples={}",
                samples.len(),
                sample_preview(samples)
            ),
        ),
        DecodedFrame::Log {
            index,
            severity,
            line,
            function,
            message,
        } => (*index, "log", format!("[{severity}] {function}:{line} {message}")),
        DecodedFrame::Unknown { index, tag } => (*index, "unknown", format!("tag={tag}")),
        DecodedFrame::Error { index, error } => (*index, "error", error.clone()),
    }
}

#[cfg(test)]
mod tests {
    use ccdlink_frame::{max_encoded_len, CcdResult, DeviceLog, Payload, Severity};

    use super::*;

    fn frame(write: impl FnOnce(&mut Payload) -> ccdlink_frame::Result<()>) -> Vec<u8> {
        let mut payload = Payload::with_capacity(512);
        write(&mut payload).unwrap();
        let mut wire = vec![0u8; max_encoded_len(payload.len())];
        let n = cobs::encode(payload.as_slice(), &mut wire).unwrap();
        wire.truncate(n);
        wire
    }

    #[test]
    fn mixed_stream_decodes_in_order() {
        let mut stream = frame(|p| {
            DeviceLog {
                severity: Severity::Norm,
                line: 3,
                function: b"main",
                message: b"boot",
            }
            .serialize(p)
        });
        stream.extend(frame(|p| {
            CcdResult {
                id: 2,
                iterations: 1,
                exposure: 50,
                samples: vec![1, 0, 3],
            }
            .serialize(p)
        }));
        stream.extend([0x02, 0x09]);

        let report = decode_stream(&stream, 5000);

        assert_eq!(report.trailing, 2);
        assert_eq!(report.frames.len(), 2);
        assert_eq!(
            report.frames[0],
            DecodedFrame::Log {
                index: 0,
                severity: "norm",
                line: 3,
                function: "main".into(),
                message: "boot".into(),
            }
        );
        assert_eq!(
            report.frames[1],
            DecodedFrame::CcdResult {
                index: 1,
                id: 2,
                iterations: 1,
                exposure: 50,
                samples: vec![1, 0, 3],
            }
        );
    }

    #[test]
    fn bad_frame_does_not_hide_good_ones() {
        let mut stream = vec![0x05, 0x01, 0x00];
        stream.extend(frame(|p| p.put_varint(7u8)));

        let report = decode_stream(&stream, 5000);

        assert!(matches!(report.frames[0], DecodedFrame::Error { index: 0, .. }));
        assert_eq!(report.frames[1], DecodedFrame::Unknown { index: 1, tag: 7 });
        assert_eq!(report.trailing, 0);
    }

    #[test]
    fn stream_without_delimiter_is_all_trailing() {
        let report = decode_stream(&[0x03, 0x01, 0x02], 5000);
        assert!(report.frames.is_empty());
        assert_eq!(report.trailing, 3);
    }
}
