use bytes::BytesMut;
use ccdlink_frame::{encode_frame, CcdRequest, Payload, CHECKSUM_PLACEHOLDER, REQUEST_CAPACITY};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct EncodedRequest {
    id: u32,
    iterations: u32,
    exposure: u32,
    checksum: u16,
    payload_hex: String,
    frame_hex: String,
    frame_len: usize,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let encoded = encode_request(CcdRequest {
        id: args.id,
        iterations: args.iterations,
        exposure: args.exposure,
    })?;

    match format {
        OutputFormat::Json => print_json(&encoded),
        OutputFormat::Table => print_table(
            &["ID", "ITERATIONS", "EXPOSURE_US", "PAYLOAD", "FRAME"],
            vec![vec![
                encoded.id.to_string(),
                encoded.iterations.to_string(),
                encoded.exposure.to_string(),
                encoded.payload_hex.clone(),
                encoded.frame_hex.clone(),
            ]],
        ),
        OutputFormat::Pretty => println!("{}", encoded.frame_hex),
    }
    Ok(SUCCESS)
}

fn encode_request(request: CcdRequest) -> CliResult<EncodedRequest> {
    let mut payload = Payload::with_capacity(REQUEST_CAPACITY);
    request
        .serialize(&mut payload)
        .map_err(|err| frame_error("serialize failed", err))?;

    let mut frame = BytesMut::new();
    encode_frame(payload.as_slice(), &mut frame)
        .map_err(|err| frame_error("encode failed", err))?;

    Ok(EncodedRequest {
        id: request.id,
        iterations: request.iterations,
        exposure: request.exposure,
        checksum: CHECKSUM_PLACEHOLDER,
        payload_hex: hex::encode(payload.as_slice()),
        frame_hex: hex::encode(&frame),
        frame_len: frame.len(),
    })
}
