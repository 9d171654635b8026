//! Device profile types

use crate::error::{Error, ProfileFault, Result};
use crate::read::MAX_PAGE_SIZE;

/// Maximum number of address lines a profile can describe
pub const MAX_ADDRESS_LINES: usize = 32;

/// Maximum length of a profile name
pub const MAX_NAME_LEN: usize = 32;

/// Maximum length of a profile description
pub const MAX_DESCRIPTION_LEN: usize = 96;

/// Delay between asserting CE/OE and sampling the data lines
pub const PROPAGATION_DELAY_NS: u32 = 1_000;

/// Minimum time RESET is held in each state during the reset pulse
pub const RESET_HOLD_MS: u32 = 250;

/// Delay after asserting CE/OE in the page path
///
/// Zero: the loop overhead before the first sample is taken as enough
/// margin. Only valid for the clock rate it was measured on.
pub const PAGE_ASSERT_DELAY_NS: u32 = 0;

/// Delay between stepping the address and sampling in the page path
pub const PAGE_SETTLE_DELAY_NS: u32 = 100;

/// Profile name storage
pub type ProfileName = heapless::String<MAX_NAME_LEN>;

/// Profile description storage
pub type ProfileDescription = heapless::String<MAX_DESCRIPTION_LEN>;

/// Physical address line permutation
pub type LineMap = heapless::Vec<u8, MAX_ADDRESS_LINES>;

/// Copy `s` into a fixed-capacity string, truncating at the capacity
pub(crate) fn label<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Bus timing margins
///
/// All waits in the access core are fixed busy-waits taken from here, so a
/// port to a different clock rate only has to touch these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after each CE/OE edge in the byte read path
    pub propagation_ns: u32,
    /// Hold time for each RESET level
    pub reset_hold_ms: u32,
    /// Wait after asserting CE/OE in the page path
    pub page_assert_ns: u32,
    /// Wait after each address step in the page path
    pub page_settle_ns: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            propagation_ns: PROPAGATION_DELAY_NS,
            reset_hold_ms: RESET_HOLD_MS,
            page_assert_ns: PAGE_ASSERT_DELAY_NS,
            page_settle_ns: PAGE_SETTLE_DELAY_NS,
        }
    }
}

/// Description of one device wiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Short name used on the command line
    pub name: ProfileName,
    /// Human readable description
    pub description: ProfileDescription,
    /// Number of wired address lines
    pub address_lines: u8,
    /// Device size in bytes, as configured (never probed)
    pub size: u32,
    /// XOR the address with 1 before encoding (byte-mode correction)
    pub byte_mode_xor: bool,
    /// Burst length of the page read path
    pub page_size: u16,
    /// Low address bits cleared to get the page base driven before a burst
    pub page_window_bits: u8,
    /// Optional wiring permutation: physical line `i` carries address bit `line_map[i]`
    pub line_map: Option<LineMap>,
    /// Timing margins
    pub timing: Timing,
}

impl DeviceProfile {
    /// Name of the 23-line byte-dump profile
    pub const A23_BYTE: &'static str = "a23-byte";
    /// Name of the 24-line page-read profile
    pub const A24_PAGE: &'static str = "a24-page";

    /// 23 address lines, straight wiring, no byte-mode correction
    ///
    /// Address line 0 is wired to DQ15/A-1. The declared size covers the
    /// full range the dump loop walks.
    pub fn a23_byte() -> Self {
        Self {
            name: label(Self::A23_BYTE),
            description: label("23 address lines, DQ15/A-1 on line 0, uncorrected"),
            address_lines: 23,
            size: 0x200_0000,
            byte_mode_xor: false,
            page_size: 16,
            page_window_bits: 3,
            line_map: None,
            timing: Timing::default(),
        }
    }

    /// 24 address lines with the byte-mode XOR correction and 16-byte bursts
    pub fn a24_page() -> Self {
        Self {
            name: label(Self::A24_PAGE),
            description: label("24 address lines, byte-mode corrected, 16-byte page reads"),
            address_lines: 24,
            size: 0x20_0000,
            byte_mode_xor: true,
            page_size: 16,
            page_window_bits: 3,
            line_map: None,
            timing: Timing::default(),
        }
    }

    /// All built-in profiles
    pub fn builtin() -> [Self; 2] {
        [Self::a23_byte(), Self::a24_page()]
    }

    /// Look up a built-in profile by name
    pub fn find_builtin(name: &str) -> Result<Self> {
        Self::builtin()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or(Error::UnknownProfile)
    }

    /// Return a copy with a different device size
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Mask of the significant address bits
    pub fn address_mask(&self) -> u32 {
        if self.address_lines as usize >= MAX_ADDRESS_LINES {
            u32::MAX
        } else {
            (1u32 << self.address_lines) - 1
        }
    }

    /// Check the profile for internal consistency
    pub fn validate(&self) -> Result<()> {
        let fault = |f| Err(Error::InvalidProfile(f));

        if self.name.is_empty() {
            return fault(ProfileFault::Name);
        }
        if self.address_lines == 0 || self.address_lines as usize > MAX_ADDRESS_LINES {
            return fault(ProfileFault::AddressLines);
        }
        if self.size == 0 {
            return fault(ProfileFault::Size);
        }
        let page = self.page_size as usize;
        if page == 0 || !page.is_power_of_two() || page > MAX_PAGE_SIZE {
            return fault(ProfileFault::PageSize);
        }
        if self.page_window_bits > self.address_lines {
            return fault(ProfileFault::WindowBits);
        }
        if let Some(map) = &self.line_map {
            if map.len() != self.address_lines as usize {
                return fault(ProfileFault::LineMap);
            }
            let mut seen = 0u64;
            for &bit in map {
                if bit >= self.address_lines || seen & (1 << bit) != 0 {
                    return fault(ProfileFault::LineMap);
                }
                seen |= 1 << bit;
            }
        }
        if self.timing.reset_hold_ms < RESET_HOLD_MS {
            return fault(ProfileFault::ResetHold);
        }
        Ok(())
    }
}
