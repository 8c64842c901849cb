use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ccdlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ccdlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("CCDLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "wire: cobs+varint, checksum placeholder {}",
        ccdlink_frame::CHECKSUM_PLACEHOLDER
    );
    println!(
        "defaults: baud={}, max_pixel_count={}, reassembly={} bytes",
        ccdlink_transport::serial::DEFAULT_BAUD_RATE,
        ccdlink_frame::DEFAULT_MAX_PIXEL_COUNT,
        ccdlink_frame::DEFAULT_REASSEMBLY_CAPACITY
    );

    Ok(SUCCESS)
}
