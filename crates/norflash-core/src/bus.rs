//! Parallel bus abstraction
//!
//! A parallel NOR device hangs off three groups of lines: the address bus
//! (outputs), eight data lines (inputs) and a handful of control lines
//! (outputs). Backends expose those groups through [`ParallelBus`]; the read
//! paths in this crate only ever talk to the device through it.
//!
//! ## Group writes
//!
//! [`ParallelBus::set_address`] and [`ParallelBus::set_control`] drive a whole
//! group of lines. A backend may implement that as one wide register write or
//! as a sequence of per-line writes, but every line must have reached its new
//! level before the call returns.
//!
//! ## Failures
//!
//! The methods are infallible. A backend that can fail at line level (e.g. a
//! GPIO ioctl) logs the failure and carries on, the same way bit-bang SPI
//! masters do. The device has no way to report a bad read anyway.

use bitflags::bitflags;

bitflags! {
    /// Control lines of a parallel NOR device
    ///
    /// Used both to name a group of lines to drive and to describe the
    /// current bus state (the set of lines currently driven high). All lines
    /// except BYTE are active low.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlLines: u8 {
        /// Chip enable (CE#)
        const CE    = 1 << 0;
        /// Output enable (OE#)
        const OE    = 1 << 1;
        /// Write enable (WE#), never driven low by this crate
        const WE    = 1 << 2;
        /// Hardware reset (RESET#)
        const RESET = 1 << 3;
        /// Write protect (WP#)
        const WP    = 1 << 4;
        /// Byte/word select (BYTE#), low selects the 8-bit data bus
        const BYTE  = 1 << 5;

        /// CE and OE together, the pair toggled around every access
        const READ = Self::CE.bits() | Self::OE.bits();
    }
}

impl ControlLines {
    /// Lines driven high while the bus is idle
    ///
    /// CE, OE, WE and RESET are inactive. WP and BYTE are absent, so they sit
    /// low: write protect asserted and the data bus in x8 mode.
    pub const IDLE: Self = Self::from_bits_retain(
        Self::CE.bits() | Self::OE.bits() | Self::WE.bits() | Self::RESET.bits(),
    );
}

impl Default for ControlLines {
    fn default() -> Self {
        ControlLines::IDLE
    }
}

/// Logic level of an output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Driven low
    Low,
    /// Driven high
    High,
}

impl Level {
    /// Returns true for [`Level::High`]
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Trait for driving a parallel NOR device over individual lines
///
/// This is the minimal set of operations the flash access core needs.
/// Implementations own the physical lines; nothing else may drive them while
/// the implementation is alive.
pub trait ParallelBus {
    /// Configure line directions and initial control levels
    ///
    /// Address and control lines become outputs, the data lines become
    /// inputs. Control lines contained in `high` start high, all others low.
    fn configure_lines(&mut self, high: ControlLines);

    /// Drive the address lines to `pattern`
    ///
    /// Bit `i` of `pattern` is the level of physical address line `i`. Bits
    /// beyond the number of wired lines are ignored.
    fn set_address(&mut self, pattern: u32);

    /// Drive every line in `lines` to `level`
    fn set_control(&mut self, lines: ControlLines, level: Level);

    /// Sample the eight data lines, DQ0 in bit 0
    fn read_data(&mut self) -> u8;

    /// Busy-wait for at least `ns` nanoseconds
    fn delay_ns(&mut self, ns: u32);

    /// Wait for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<B: ParallelBus + ?Sized> ParallelBus for &mut B {
    fn configure_lines(&mut self, high: ControlLines) {
        (**self).configure_lines(high)
    }

    fn set_address(&mut self, pattern: u32) {
        (**self).set_address(pattern)
    }

    fn set_control(&mut self, lines: ControlLines, level: Level) {
        (**self).set_control(lines, level)
    }

    fn read_data(&mut self) -> u8 {
        (**self).read_data()
    }

    fn delay_ns(&mut self, ns: u32) {
        (**self).delay_ns(ns)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

// Boxed buses let the CLI pick a backend at runtime
#[cfg(feature = "alloc")]
impl<B: ParallelBus + ?Sized> ParallelBus for alloc::boxed::Box<B> {
    fn configure_lines(&mut self, high: ControlLines) {
        (**self).configure_lines(high)
    }

    fn set_address(&mut self, pattern: u32) {
        (**self).set_address(pattern)
    }

    fn set_control(&mut self, lines: ControlLines, level: Level) {
        (**self).set_control(lines, level)
    }

    fn read_data(&mut self) -> u8 {
        (**self).read_data()
    }

    fn delay_ns(&mut self, ns: u32) {
        (**self).delay_ns(ns)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
