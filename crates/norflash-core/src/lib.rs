//! norflash-core - Core library for reading parallel NOR flash over GPIO
//!
//! This crate drives a parallel NOR flash device directly through individual
//! lines (address bus, eight data lines, CE/OE/WE/RESET/WP/BYTE) and reads it
//! without a flash controller. It is `no_std` so the same code can run on a
//! microcontroller or on a Linux host bit-banging GPIO.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`) and the RON
//!   profile database
//! - `alloc` - Enable `ParallelBus` for boxed buses
//!
//! # Layers
//!
//! - [`bus`] - the `ParallelBus` trait backends implement
//! - [`address`] - linear address to line pattern, with byte-mode correction
//! - [`control`] - CE/OE handshake and the RESET pulse
//! - [`read`] - byte and page read primitives
//! - [`device`] - `ParallelFlash`, the initialized, bus-owning handle
//! - [`profile`] - device profiles and timing constants
//!
//! # Example
//!
//! ```ignore
//! use norflash_core::{DeviceProfile, ParallelFlash, ParallelBus};
//!
//! fn dump_first_page<B: ParallelBus>(bus: B) -> norflash_core::Result<()> {
//!     let mut flash = ParallelFlash::initialize(bus, DeviceProfile::a24_page())?;
//!     let page = flash.read_page(0, 16)?;
//!     println!("{:02X?}", page);
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod address;
pub mod bus;
pub mod control;
pub mod device;
pub mod error;
pub mod profile;
pub mod read;

pub use bus::{ControlLines, Level, ParallelBus};
pub use device::ParallelFlash;
pub use error::{Error, Result};
pub use profile::{DeviceProfile, Timing};
pub use read::{PageBuffer, MAX_PAGE_SIZE};
