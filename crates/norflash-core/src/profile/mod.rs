//! Device profiles
//!
//! A profile captures everything the access core needs to know about one
//! wiring of one device: how many address lines are connected, how large the
//! device is, whether the byte-mode address correction applies, the burst
//! geometry and the timing margins.
//!
//! Two profiles are built in. More can be loaded from RON files with
//! [`ProfileDatabase`] when the `std` feature is enabled.

mod types;

#[cfg(feature = "std")]
mod database;

pub use types::*;

#[cfg(feature = "std")]
pub use database::*;
