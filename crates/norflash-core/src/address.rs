//! Address bus encoding
//!
//! Maps a linear byte address to the level pattern driven onto the physical
//! address lines, and back.
//!
//! In byte mode the device takes DQ15 as address bit A-1, which puts the two
//! bytes of every word in the opposite order from what a linear walk expects.
//! Profiles with `byte_mode_xor` set compensate by flipping bit 0 before the
//! address goes out. Every read path goes through [`AddressEncoder::encode`],
//! so byte and page reads on the same bus always agree.
//!
//! No range checking happens here: bits above the wired line count are
//! dropped.

use crate::profile::DeviceProfile;

/// Encoder for one device profile
#[derive(Debug, Clone, Copy)]
pub struct AddressEncoder<'a> {
    mask: u32,
    byte_mode_xor: bool,
    line_map: Option<&'a [u8]>,
}

impl<'a> AddressEncoder<'a> {
    /// Create an encoder for `profile`
    pub fn new(profile: &'a DeviceProfile) -> Self {
        Self {
            mask: profile.address_mask(),
            byte_mode_xor: profile.byte_mode_xor,
            line_map: profile.line_map.as_deref(),
        }
    }

    /// Apply the byte-mode correction and drop unwired bits
    #[inline]
    pub fn logical(&self, addr: u32) -> u32 {
        let addr = if self.byte_mode_xor { addr ^ 1 } else { addr };
        addr & self.mask
    }

    /// Line pattern for `addr`: bit `i` is the level of physical line `i`
    #[inline]
    pub fn encode(&self, addr: u32) -> u32 {
        let logical = self.logical(addr);
        match self.line_map {
            None => logical,
            Some(map) => map
                .iter()
                .enumerate()
                .fold(0, |pattern, (line, &bit)| {
                    pattern | (((logical >> bit) & 1) << line)
                }),
        }
    }

    /// Address the device sees for a line pattern
    ///
    /// Undoes the wiring permutation and the mask but not the byte-mode
    /// correction, so `decode(encode(a))` is `a ^ 1` on corrected profiles.
    pub fn decode(&self, pattern: u32) -> u32 {
        let pattern = match self.line_map {
            None => pattern,
            Some(map) => map
                .iter()
                .enumerate()
                .fold(0, |addr, (line, &bit)| {
                    addr | (((pattern >> line) & 1) << bit)
                }),
        };
        pattern & self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::LineMap;

    #[test]
    fn test_round_trip_uncorrected() {
        let profile = DeviceProfile::a23_byte();
        let enc = AddressEncoder::new(&profile);

        for addr in [0, 1, 2, 0x1234, 0x40_0000, 0x7F_FFFE, 0x7F_FFFF] {
            assert_eq!(enc.encode(addr), addr);
            assert_eq!(enc.decode(enc.encode(addr)), addr);
        }
    }

    #[test]
    fn test_round_trip_byte_mode() {
        let profile = DeviceProfile::a24_page();
        let enc = AddressEncoder::new(&profile);

        for addr in (0..64).chain([0x1F_FFFE, 0x1F_FFFF, 0xFF_FFFF]) {
            assert_eq!(enc.decode(enc.encode(addr)), addr ^ 1);
        }
        assert_eq!(enc.encode(0), 1);
        assert_eq!(enc.encode(1), 0);
    }

    #[test]
    fn test_high_bits_truncated() {
        let profile = DeviceProfile::a23_byte();
        let enc = AddressEncoder::new(&profile);

        assert_eq!(enc.encode(0x80_0000), 0);
        assert_eq!(enc.encode(0x80_0005), 5);
        assert_eq!(enc.encode(u32::MAX), 0x7F_FFFF);
    }

    #[test]
    fn test_line_map() {
        let mut profile = DeviceProfile::a24_page();
        profile.address_lines = 4;
        profile.page_window_bits = 2;
        profile.byte_mode_xor = false;
        // Physical line 0 carries A3, line 3 carries A0
        profile.line_map = Some(LineMap::from_slice(&[3, 2, 1, 0]).unwrap());
        let enc = AddressEncoder::new(&profile);

        assert_eq!(enc.encode(0b0001), 0b1000);
        assert_eq!(enc.encode(0b0110), 0b0110);
        assert_eq!(enc.encode(0b1100), 0b0011);
        for addr in 0..16 {
            assert_eq!(enc.decode(enc.encode(addr)), addr);
        }
    }

    #[test]
    fn test_line_map_with_correction() {
        let mut profile = DeviceProfile::a24_page();
        profile.address_lines = 3;
        profile.page_window_bits = 1;
        profile.line_map = Some(LineMap::from_slice(&[1, 2, 0]).unwrap());
        let enc = AddressEncoder::new(&profile);

        for addr in 0..8 {
            assert_eq!(enc.decode(enc.encode(addr)), addr ^ 1);
        }
    }
}
