//! lava lamp
//!
//! Fills the window with a slowly shifting lamp color. Resizing, minimizing
//! and restoring the window rebuild the swapchain.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p lava-lamp -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `-s, --size <WxH>`: Initial window size (default: 1280x720)
//! - `-q, --queued-frames <N>`: Frames in flight (default: 2)
//! - `--no-vsync`: Prefer mailbox presentation
//! - `--fps <N>`: Frame rate cap
//! - `--gpu <N>`: Index of the GPU adapter to use
//! - `-h, --help`: Print help message
//!
//! ## Keys
//!
//! - `Enter`: Toggle auto play
//! - `Space`: Pause run time
//! - `+` / `-`: Change run time speed
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;
mod lamp;

use anyhow::Context;
use lava_app::{run_app, AppConfig};
use lava_core::{parse_size, Size};

use crate::app::LavaLamp;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    run_app::<LavaLamp>(config_from_args(&args)?)
}

fn config_from_args(args: &[String]) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::new("lava lamp").with_size(Size::new(WIDTH, HEIGHT));

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-s" | "--size" => {
                let value = args.next().context("--size needs a value")?;
                config = config.with_size(parse_size(value)?);
            }
            "-q" | "--queued-frames" => {
                let value = args.next().context("--queued-frames needs a value")?;
                config = config.with_queued_frames(
                    value
                        .parse()
                        .with_context(|| format!("invalid frame count {value:?}"))?,
                );
            }
            "--fps" => {
                let value = args.next().context("--fps needs a value")?;
                config = config.with_target_fps(
                    value
                        .parse()
                        .with_context(|| format!("invalid fps {value:?}"))?,
                );
            }
            "--gpu" => {
                let value = args.next().context("--gpu needs a value")?;
                config = config.with_adapter(
                    value
                        .parse()
                        .with_context(|| format!("invalid adapter index {value:?}"))?,
                );
            }
            "--no-vsync" => config = config.with_vsync(false),
            other => anyhow::bail!("unknown argument {other:?}, see --help"),
        }
    }

    Ok(config)
}

fn print_help() {
    eprintln!(
        "lava lamp

USAGE:
    cargo run -p lava-lamp -- [OPTIONS]

OPTIONS:
    -s, --size <WxH>         Initial window size (default: {WIDTH}x{HEIGHT})
    -q, --queued-frames <N>  Frames in flight (default: 2)
    --fps <N>                Frame rate cap
    --gpu <N>                Index of the GPU adapter to use
    --no-vsync               Prefer mailbox presentation
    -h, --help               Print this help message

KEYS:
    Enter                    Toggle auto play
    Space                    Pause run time
    + / -                    Change run time speed

ENVIRONMENT VARIABLES:
    RUST_LOG                 Set log level (e.g., info, debug, trace)"
    );
}
