//! Control line sequencing
//!
//! CE and OE are toggled around every access, RESET is pulsed once at
//! startup. WE stays high for the lifetime of the bus and WP stays asserted;
//! nothing in this module ever drives them.

use crate::bus::{ControlLines, Level, ParallelBus};
use crate::profile::Timing;

/// Put every control line at its idle level and set line directions
pub fn configure_idle<B: ParallelBus + ?Sized>(bus: &mut B) {
    bus.configure_lines(ControlLines::IDLE);
}

/// Enable the device and its outputs
///
/// CE goes low first, then OE. Each edge is followed by the propagation
/// delay, so data may be sampled as soon as this returns.
pub fn assert_read<B: ParallelBus + ?Sized>(bus: &mut B, timing: &Timing) {
    bus.set_control(ControlLines::CE, Level::Low);
    bus.delay_ns(timing.propagation_ns);
    bus.set_control(ControlLines::OE, Level::Low);
    bus.delay_ns(timing.propagation_ns);
}

/// Release the device, returning CE and OE to idle
pub fn deassert_read<B: ParallelBus + ?Sized>(bus: &mut B, timing: &Timing) {
    bus.delay_ns(timing.propagation_ns);
    bus.set_control(ControlLines::CE, Level::High);
    bus.delay_ns(timing.propagation_ns);
    bus.set_control(ControlLines::OE, Level::High);
}

/// Pulse RESET: active for the hold time, then inactive for the hold time
///
/// RESET must already be inactive, as [`configure_idle`] leaves it.
pub fn reset<B: ParallelBus + ?Sized>(bus: &mut B, timing: &Timing) {
    log::debug!("Pulsing RESET ({} ms per level)", timing.reset_hold_ms);

    bus.set_control(ControlLines::RESET, Level::Low);
    bus.delay_ms(timing.reset_hold_ms);
    bus.set_control(ControlLines::RESET, Level::High);
    bus.delay_ms(timing.reset_hold_ms);
}
