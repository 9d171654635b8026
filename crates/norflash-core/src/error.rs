//! Error types for norflash-core
//!
//! The read primitives have no failure mode on the bus itself: a miswired or
//! unresponsive device simply yields wrong data. The errors below cover the
//! few things the core can actually check, which are caller-supplied lengths,
//! ranges and device profiles.

use core::fmt;

/// Which part of a device profile failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFault {
    /// Profile name is empty or too long
    Name,
    /// Address line count outside `1..=32`
    AddressLines,
    /// Device size is zero
    Size,
    /// Page size is zero, not a power of two, or larger than the page buffer
    PageSize,
    /// Page window wider than the address bus
    WindowBits,
    /// Line map is not a permutation of the address bits
    LineMap,
    /// Reset hold time below the device minimum
    ResetHold,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Requested burst length exceeds the page buffer capacity
    InvalidLength,
    /// Bulk read extends beyond the device size
    AddressOutOfBounds,
    /// Device profile is inconsistent
    InvalidProfile(ProfileFault),
    /// No device profile with the requested name
    UnknownProfile,
}

impl fmt::Display for ProfileFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name must be 1 to 32 characters"),
            Self::AddressLines => write!(f, "address line count must be between 1 and 32"),
            Self::Size => write!(f, "device size must be non-zero"),
            Self::PageSize => write!(
                f,
                "page size must be a power of two no larger than {}",
                crate::read::MAX_PAGE_SIZE
            ),
            Self::WindowBits => write!(f, "page window is wider than the address bus"),
            Self::LineMap => write!(f, "line map must be a permutation of the address bits"),
            Self::ResetHold => write!(
                f,
                "reset hold time must be at least {} ms",
                crate::profile::RESET_HOLD_MS
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength => write!(
                f,
                "burst length exceeds the {} byte page buffer",
                crate::read::MAX_PAGE_SIZE
            ),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidProfile(fault) => write!(f, "invalid device profile: {}", fault),
            Self::UnknownProfile => write!(f, "unknown device profile"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
