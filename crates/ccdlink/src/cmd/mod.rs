use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod ports;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Connect to an instrument and print results as they arrive.
    Run(RunArgs),
    /// Print the wire frame of a CCD request.
    Encode(EncodeArgs),
    /// Decode a captured device byte stream.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Run(args) => run::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial device path (e.g. /dev/ttyACM0, COM3).
    #[arg(env = "CCDLINK_PORT")]
    pub port: String,
    /// Line rate.
    #[arg(long, env = "CCDLINK_BAUD", default_value_t = ccdlink_transport::serial::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Start one acquisition with this exposure time in microseconds.
    #[arg(long, value_name = "MICROS")]
    pub exposure: Option<u32>,
    /// Accumulation passes for the acquisition.
    #[arg(long, default_value_t = 1, requires = "exposure")]
    pub iterations: u32,
    /// Exit after N results.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when no result arrived within this time (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Pause between ticks.
    #[arg(long, default_value = "10ms")]
    pub tick_interval: String,
    /// Results with this many pixels or more are rejected.
    #[arg(long, default_value_t = ccdlink_frame::DEFAULT_MAX_PIXEL_COUNT)]
    pub max_pixel_count: u32,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Result id carried by the request.
    #[arg(long, default_value_t = 1)]
    pub id: u32,
    /// Exposure time in microseconds.
    #[arg(long)]
    pub exposure: u32,
    /// Accumulation passes.
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded byte stream (whitespace allowed).
    #[arg(conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the raw byte stream from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Results with this many pixels or more are rejected.
    #[arg(long, default_value_t = ccdlink_frame::DEFAULT_MAX_PIXEL_COUNT)]
    pub max_pixel_count: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if millis {
        Ok(std::time::Duration::from_millis(value))
    } else {
        Ok(std::time::Duration::from_secs(value))
    }
}
