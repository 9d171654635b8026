//! Byte and page read primitives
//!
//! [`read_byte`] is the random-access path: one full CE/OE handshake per
//! byte. [`read_page_into`] keeps CE/OE asserted for a whole burst and only
//! steps the address lines, which is what makes streaming the device
//! practical.
//!
//! Both return the same bytes for the same addresses. Every sample in the
//! page path is taken at `addr + i` through the same encoder the byte path
//! uses; the aligned base driven before the burst only sets up the upper
//! address lines early.
//!
//! Both leave CE and OE high on return.

use crate::address::AddressEncoder;
use crate::bus::{ControlLines, Level, ParallelBus};
use crate::control;
use crate::error::{Error, Result};
use crate::profile::DeviceProfile;

/// Capacity of a [`PageBuffer`]
pub const MAX_PAGE_SIZE: usize = 64;

/// One burst worth of data, in address order
pub type PageBuffer = heapless::Vec<u8, MAX_PAGE_SIZE>;

/// Read a single byte
///
/// Drive the address, assert CE then OE, sample DQ0-DQ7, deassert.
pub fn read_byte<B: ParallelBus + ?Sized>(bus: &mut B, profile: &DeviceProfile, addr: u32) -> u8 {
    let encoder = AddressEncoder::new(profile);

    bus.set_address(encoder.encode(addr));
    control::assert_read(bus, &profile.timing);
    let data = bus.read_data();
    control::deassert_read(bus, &profile.timing);

    data
}

/// Page base driven before a burst
#[inline]
pub fn page_base(profile: &DeviceProfile, addr: u32) -> u32 {
    let window = 1u32
        .checked_shl(profile.page_window_bits as u32)
        .map_or(u32::MAX, |w| w - 1);
    addr & !window
}

/// Read `buf.len()` sequential bytes with a single CE/OE assertion
///
/// Fails with [`Error::InvalidLength`] if the buffer is longer than
/// [`MAX_PAGE_SIZE`]; nothing is driven in that case.
pub fn read_page_into<B: ParallelBus + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    if buf.len() > MAX_PAGE_SIZE {
        return Err(Error::InvalidLength);
    }
    if buf.is_empty() {
        return Ok(());
    }

    let encoder = AddressEncoder::new(profile);
    let timing = &profile.timing;

    log::trace!("Page read 0x{:08X} (+{})", addr, buf.len());

    bus.set_address(encoder.encode(page_base(profile, addr)));
    bus.set_control(ControlLines::READ, Level::Low);
    bus.delay_ns(timing.page_assert_ns);

    for (offset, byte) in (0u32..).zip(buf.iter_mut()) {
        bus.set_address(encoder.encode(addr.wrapping_add(offset)));
        bus.delay_ns(timing.page_settle_ns);
        *byte = bus.read_data();
    }

    bus.set_control(ControlLines::READ, Level::High);
    Ok(())
}

/// Read a burst of `len` bytes into a fresh [`PageBuffer`]
pub fn read_page<B: ParallelBus + ?Sized>(
    bus: &mut B,
    profile: &DeviceProfile,
    addr: u32,
    len: usize,
) -> Result<PageBuffer> {
    let mut page = PageBuffer::new();
    page.resize(len, 0).map_err(|_| Error::InvalidLength)?;
    read_page_into(bus, profile, addr, &mut page)?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Combinational stand-in for a device: data = low byte of the decoded address
    struct Echo {
        pattern: u32,
        high: ControlLines,
        asserts: u32,
    }

    impl Echo {
        fn new() -> Self {
            Self {
                pattern: 0,
                high: ControlLines::IDLE,
                asserts: 0,
            }
        }
    }

    impl ParallelBus for Echo {
        fn configure_lines(&mut self, high: ControlLines) {
            self.high = high;
        }

        fn set_address(&mut self, pattern: u32) {
            self.pattern = pattern;
        }

        fn set_control(&mut self, lines: ControlLines, level: Level) {
            if level == Level::Low && lines.contains(ControlLines::CE) {
                self.asserts += 1;
            }
            self.high.set(lines, level.is_high());
        }

        fn read_data(&mut self) -> u8 {
            if self.high.intersects(ControlLines::READ) {
                0xFF
            } else {
                (self.pattern ^ (self.pattern >> 8)) as u8
            }
        }

        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, _ms: u32) {}
    }

    #[test]
    fn test_page_matches_bytes() {
        for profile in DeviceProfile::builtin() {
            let mut bus = Echo::new();
            for base in [0u32, 16, 0x1230, 0x1F_FFF0] {
                let page = read_page(&mut bus, &profile, base, 16).unwrap();
                for (i, &b) in page.iter().enumerate() {
                    assert_eq!(b, read_byte(&mut bus, &profile, base + i as u32));
                }
            }
        }
    }

    #[test]
    fn test_page_asserts_once() {
        let profile = DeviceProfile::a24_page();
        let mut bus = Echo::new();

        read_page(&mut bus, &profile, 0x100, 16).unwrap();
        assert_eq!(bus.asserts, 1);
        assert!(bus.high.contains(ControlLines::READ));

        read_byte(&mut bus, &profile, 0x100);
        assert_eq!(bus.asserts, 2);
        assert!(bus.high.contains(ControlLines::READ));
    }

    #[test]
    fn test_page_too_long() {
        let profile = DeviceProfile::a24_page();
        let mut bus = Echo::new();

        assert_eq!(
            read_page(&mut bus, &profile, 0, MAX_PAGE_SIZE + 1),
            Err(Error::InvalidLength)
        );
        assert_eq!(bus.asserts, 0);
    }

    #[test]
    fn test_empty_page() {
        let profile = DeviceProfile::a24_page();
        let mut bus = Echo::new();

        assert!(read_page(&mut bus, &profile, 0, 0).unwrap().is_empty());
        assert_eq!(bus.asserts, 0);
    }

    #[test]
    fn test_page_base() {
        let profile = DeviceProfile::a24_page();
        assert_eq!(page_base(&profile, 0x1237), 0x1230);
        assert_eq!(page_base(&profile, 0x1238), 0x1238);
        assert_eq!(page_base(&profile, 0x123F), 0x1238);
    }
}
