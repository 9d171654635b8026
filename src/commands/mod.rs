//! CLI command implementations
//!
//! Every command works on an initialized `ParallelFlash`, whatever bus is
//! behind it. `dump` uses the byte path, `read` and `serve` the page path.

pub mod dump;
mod list;
pub mod read;
pub mod serve;

pub use list::{list_profiles, list_programmers};

use std::ops::Range;

use crate::cli::RangeArgs;
use thiserror::Error;

/// Address range outside the device
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Range 0x{start:08X}+0x{length:X} exceeds device size 0x{size:X}")]
pub struct RangeError {
    start: u32,
    length: u32,
    size: u32,
}

/// Resolve `--start`/`--length` against the device size
///
/// A missing start means 0, a missing length means up to the end.
pub fn resolve_range(args: RangeArgs, size: u32) -> Result<Range<u32>, RangeError> {
    let start = args.start.unwrap_or(0);
    let length = args.length.unwrap_or_else(|| size.saturating_sub(start));
    let err = RangeError {
        start,
        length,
        size,
    };

    if start > size {
        return Err(err);
    }
    match start.checked_add(length) {
        Some(end) if end <= size => Ok(start..end),
        _ => Err(err),
    }
}
