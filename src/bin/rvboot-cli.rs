use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use rvboot_core::{BootSystem, UartConfig, CTRL_PROGRAM_ENABLE, UART_CTRL_ADDR};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rvboot-cli")]
#[command(about = "Host-side programming simulator for the serial bootloader core", long_about = None)]
struct Args {
    /// Flat binary image to program (multiple of 4 bytes, little-endian words)
    image: PathBuf,

    /// Core clock frequency in Hz
    #[arg(long, default_value_t = 100_000_000)]
    clock_hz: u32,

    /// Serial baud rate
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Clamp an undersized bit interval to 1 tick instead of refusing
    #[arg(long, action = ArgAction::SetTrue)]
    clamp_bit_time: bool,

    /// Output format for the programmed instruction store
    #[arg(long, value_enum, default_value_t = Format::Hex)]
    format: Format,

    /// Idle cycles between the last byte and the session close
    #[arg(long, default_value_t = 50)]
    drain_cycles: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Hex,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let image = fs::read(&args.image)
        .with_context(|| format!("reading image {}", args.image.display()))?;
    if image.is_empty() {
        bail!("image is empty");
    }
    if image.len() % 4 != 0 {
        bail!(
            "image length {} is not a multiple of 4 bytes; a trailing partial word would be discarded by the loader",
            image.len()
        );
    }

    let config = UartConfig {
        clock_hz: args.clock_hz,
        baud: args.baud,
    };
    let mut sys = if args.clamp_bit_time {
        BootSystem::with_bit_time(config.bit_time_clamped())
    } else {
        BootSystem::new(&config)?
    };
    eprintln!(
        "bit interval: {} tick(s) for {} baud at {} Hz",
        sys.bit_time(),
        args.baud,
        args.clock_hz
    );

    // The executing core would do this with a store to UART_CTRL; here the
    // harness plays that role.
    sys.bus_write(UART_CTRL_ADDR, CTRL_PROGRAM_ENABLE);
    for byte in &image {
        sys.feed_byte_frame(*byte);
    }
    sys.idle(args.drain_cycles);
    sys.bus_write(UART_CTRL_ADDR, 0);

    let snap = sys.snapshot();
    eprintln!(
        "programmed {} word(s) in {} cycle(s), {} framing error(s)",
        snap.words_written, snap.cycles, snap.framing_errors
    );
    if snap.imem_oob_writes > 0 {
        eprintln!(
            "warning: {} word(s) fell past the end of the instruction store and were dropped",
            snap.imem_oob_writes
        );
    }

    match args.format {
        Format::Hex => {
            for (index, word) in sys.imem.as_words().iter().enumerate() {
                println!("{index:04}: 0x{word:08X}");
            }
        }
        Format::Json => {
            let dump = serde_json::json!({
                "snapshot": snap,
                "imem": sys.imem.as_words(),
            });
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }
    Ok(())
}
