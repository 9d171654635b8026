//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use norflash_core::DeviceProfile;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "norflash")]
#[command(author, version, about = "Parallel NOR flash reader", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to extra device profiles (a .ron file or a directory of them)
    /// Defaults to looking in ./profiles/ and /usr/share/norflash/profiles/
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,

    /// Device profile
    #[arg(long, global = true, default_value = DeviceProfile::A24_PAGE)]
    pub profile: String,

    /// Override the device size from the profile (hex or decimal)
    #[arg(long, global = true, value_parser = parse_hex_u32)]
    pub size: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Address range options shared across commands
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct RangeArgs {
    /// Start address (hex, e.g., 0x10000)
    #[arg(long, value_parser = parse_hex_u32)]
    pub start: Option<u32>,

    /// Number of bytes (hex or decimal), defaults to the rest of the device
    #[arg(long, value_parser = parse_hex_u32)]
    pub length: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print flash contents as a hex dump, one byte read at a time
    Dump {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Read flash contents to file using page reads
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Serve the flash image over HTTP at /flash.bin
    Serve {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        listen: String,
    },

    /// List supported programmers
    ListProgrammers,

    /// List known device profiles
    ListProfiles,
}
