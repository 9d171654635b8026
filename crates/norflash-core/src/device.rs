//! Device lifecycle and the owned flash handle
//!
//! `ParallelFlash` owns the bus for as long as it lives. The only way to
//! build one is [`ParallelFlash::initialize`], which validates the profile,
//! configures the lines and pulses RESET, so every read is guaranteed to
//! happen on an initialized bus with a consistent profile and no second
//! owner can drive the same lines.
//!
//! # Example
//!
//! ```ignore
//! use norflash_core::{DeviceProfile, ParallelFlash};
//!
//! let mut flash = ParallelFlash::initialize(bus, DeviceProfile::a24_page())?;
//! let first = flash.read_byte(0);
//! let page = flash.read_page(0x100, 16)?;
//! ```

use crate::bus::ParallelBus;
use crate::control;
use crate::error::{Error, Result};
use crate::profile::DeviceProfile;
use crate::read::{self, PageBuffer};

/// Initialized parallel NOR device
pub struct ParallelFlash<B: ParallelBus> {
    bus: B,
    profile: DeviceProfile,
}

impl<B: ParallelBus> ParallelFlash<B> {
    /// Take ownership of `bus` and bring the device to a known state
    ///
    /// Lines are configured with control outputs at their idle levels, the
    /// address bus is driven to zero and RESET is pulsed. Blocks for twice
    /// the profile's reset hold time.
    ///
    /// # Errors
    /// * `InvalidProfile` - If the profile fails validation; the bus is not
    ///   touched in that case
    pub fn initialize(mut bus: B, profile: DeviceProfile) -> Result<Self> {
        profile.validate()?;

        log::debug!(
            "Initializing {} ({} address lines, {} bytes{})",
            profile.name,
            profile.address_lines,
            profile.size,
            if profile.byte_mode_xor {
                ", byte-mode corrected"
            } else {
                ""
            }
        );

        control::configure_idle(&mut bus);
        bus.set_address(0);
        control::reset(&mut bus, &profile.timing);

        Ok(Self { bus, profile })
    }

    /// Read the byte at `addr`
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        read::read_byte(&mut self.bus, &self.profile, addr)
    }

    /// Read `len` sequential bytes starting at `addr` as one burst
    pub fn read_page(&mut self, addr: u32, len: usize) -> Result<PageBuffer> {
        read::read_page(&mut self.bus, &self.profile, addr, len)
    }

    /// Read one burst into `buf`
    pub fn read_page_into(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        read::read_page_into(&mut self.bus, &self.profile, addr, buf)
    }

    /// Read an arbitrary range into `buf`
    ///
    /// Bytes before the first page boundary are read one at a time, the rest
    /// in page-sized bursts.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If the read extends beyond the device size
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if !self.is_valid_range(addr, buf.len()) {
            return Err(Error::AddressOutOfBounds);
        }

        let page_size = self.profile.page_size as usize;
        let head = ((page_size - (addr as usize % page_size)) % page_size).min(buf.len());
        let (head_buf, rest) = buf.split_at_mut(head);

        for (offset, byte) in (0u32..).zip(head_buf.iter_mut()) {
            *byte = self.read_byte(addr + offset);
        }

        let mut page_addr = addr + head as u32;
        for chunk in rest.chunks_mut(page_size) {
            self.read_page_into(page_addr, chunk)?;
            page_addr += chunk.len() as u32;
        }

        Ok(())
    }

    /// Check if a range lies within the device
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        let end = addr as u64 + len as u64;
        end <= self.profile.size as u64
    }

    /// Device size in bytes
    pub fn size(&self) -> u32 {
        self.profile.size
    }

    /// Burst length used for streaming
    pub fn page_size(&self) -> usize {
        self.profile.page_size as usize
    }

    /// Profile this device was initialized with
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Shared access to the bus, e.g. to inspect a simulator
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Give up the device and return the bus
    pub fn into_bus(self) -> B {
        self.bus
    }
}
