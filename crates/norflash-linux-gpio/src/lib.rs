//! norflash-linux-gpio - Linux GPIO parallel bus backend
//!
//! This crate drives a parallel NOR flash from plain GPIO lines using the
//! Linux character device GPIO interface (gpiocdev). Every address, data
//! and control pin of the flash goes to one line of a single GPIO chip.
//!
//! # Usage with the norflash CLI
//!
//! ```bash
//! # 24 address lines from GPIO 0, data on 24..=31
//! norflash dump -p linux_gpio:gpiochip=0,addr=0,data=24,ce=32,oe=33,we=34,reset=35,wp=36,byte=37
//!
//! # Address lines listed individually, A0 first
//! norflash --profile a23-byte dump \
//!     -p linux_gpio:dev=/dev/gpiochip0,addr=5/6/7/...,data=24,ce=32,oe=33
//! ```
//!
//! # Wiring
//!
//! | Flash Pin | Direction | Idle level |
//! |-----------|-----------|------------|
//! | A0..An    | output    | low        |
//! | DQ0..DQ7  | input     | -          |
//! | CE#, OE#  | output    | high       |
//! | WE#       | output    | high       |
//! | RESET#    | output    | high       |
//! | WP#       | output    | low        |
//! | BYTE#     | output    | low (x8)   |
//!
//! Lines left out of the options must be tied to their idle level on the
//! board.
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpioBus, LinuxGpioBusConfig};
pub use error::{LinuxGpioError, Result};

/// Open a Linux GPIO parallel bus for a device with `address_lines` lines
///
/// This is a convenience function for use in the CLI programmer dispatch.
pub fn open_linux_gpio(
    options: &[(&str, &str)],
    address_lines: u8,
) -> std::result::Result<LinuxGpioBus, Box<dyn std::error::Error>> {
    let config = parse_options(options, address_lines)?;
    let bus = LinuxGpioBus::open(&config)?;
    Ok(bus)
}
