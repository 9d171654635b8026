//! norflash-dummy - Simulated parallel NOR device for testing
//!
//! This crate provides a `ParallelBus` implementation with an in-memory NOR
//! device behind it. It decodes the driven address lines the way the real
//! chip would, only drives the data lines while CE and OE are low, and keeps
//! a mock clock so timing margins can be checked without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use norflash_core::address::AddressEncoder;
use norflash_core::bus::{ControlLines, Level, ParallelBus};
use norflash_core::profile::DeviceProfile;

/// Value read from the data lines while the device is not driving them
pub const FLOATING_BUS: u8 = 0xFF;

const NS_PER_MS: u64 = 1_000_000;

/// Configuration for the simulated device
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wiring and size of the simulated device
    pub profile: DeviceProfile,
    /// Time from address change or OE assertion until the outputs are valid
    pub access_ns: u32,
    /// Time charged to the mock clock for every line operation
    pub op_ns: u32,
    /// Whether the device swaps the bytes of each word in x8 mode
    ///
    /// Defaults to the profile's `byte_mode_xor`: a profile only corrects a
    /// device that actually has the quirk.
    pub byte_swapped: bool,
    /// Record every bus operation
    pub trace: bool,
}

impl SimConfig {
    /// Configuration matching `profile`, with zero access time
    pub fn new(profile: DeviceProfile) -> Self {
        let byte_swapped = profile.byte_mode_xor;
        Self {
            profile,
            access_ns: 0,
            op_ns: 0,
            byte_swapped,
            trace: false,
        }
    }

    /// Set the access time
    pub fn with_access_ns(mut self, ns: u32) -> Self {
        self.access_ns = ns;
        self
    }

    /// Set the per-operation cost
    pub fn with_op_ns(mut self, ns: u32) -> Self {
        self.op_ns = ns;
        self
    }

    /// Override the byte-swap quirk
    pub fn with_byte_swapped(mut self, swapped: bool) -> Self {
        self.byte_swapped = swapped;
        self
    }

    /// Enable the bus trace
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(DeviceProfile::a24_page())
    }
}

/// One recorded bus operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// Lines configured with the given control lines high
    Configure(ControlLines),
    /// Address lines driven to a pattern
    Address(u32),
    /// Control lines driven
    Control(ControlLines, Level),
    /// Data lines sampled
    Sample(u8),
    /// Delay, in nanoseconds
    Delay(u64),
}

/// Timing of the most recent RESET pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPulse {
    /// How long RESET was held low
    pub low_ns: u64,
    /// How long RESET has been high since the pulse ended
    pub high_ns: u64,
}

/// Simulated parallel NOR device
#[cfg(feature = "alloc")]
pub struct SimulatedNor {
    config: SimConfig,
    data: Vec<u8>,
    configured: bool,
    high: ControlLines,
    pattern: u32,
    now_ns: u64,
    valid_at_ns: u64,
    last_output: u8,
    reset_fell_at: Option<u64>,
    reset_rose_at: Option<u64>,
    reset_low_ns: Option<u64>,
    read_cycles: u64,
    early_samples: u64,
    write_enables: u64,
    events: Vec<BusEvent>,
}

#[cfg(feature = "alloc")]
impl SimulatedNor {
    /// Create an erased device (all bytes 0xFF)
    pub fn new(config: SimConfig) -> Self {
        let data = vec![0xFF; config.profile.size as usize];
        Self {
            config,
            data,
            configured: false,
            high: ControlLines::empty(),
            pattern: 0,
            now_ns: 0,
            valid_at_ns: 0,
            last_output: FLOATING_BUS,
            reset_fell_at: None,
            reset_rose_at: None,
            reset_low_ns: None,
            read_cycles: 0,
            early_samples: 0,
            write_enables: 0,
            events: Vec::new(),
        }
    }

    /// Create a device with pre-filled data
    ///
    /// Content is given in logical address order; excess data is dropped.
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut sim = Self::new(config);
        let len = core::cmp::min(initial_data.len(), sim.data.len());
        sim.data[..len].copy_from_slice(&initial_data[..len]);
        sim
    }

    /// Create a device whose byte at address `a` is `a` mixed with its upper bits
    pub fn with_counter(config: SimConfig) -> Self {
        let mut sim = Self::new(config);
        for (addr, byte) in sim.data.iter_mut().enumerate() {
            *byte = counter_byte(addr as u32);
        }
        sim
    }

    /// Device content in logical address order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable device content
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Control lines currently high
    pub fn control_state(&self) -> ControlLines {
        self.high
    }

    /// Pattern currently on the address lines
    pub fn address_pattern(&self) -> u32 {
        self.pattern
    }

    /// Whether `configure_lines` has run
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Mock clock, in nanoseconds since creation
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    /// Number of CE falling edges seen
    pub fn read_cycles(&self) -> u64 {
        self.read_cycles
    }

    /// Samples taken before the outputs were valid
    pub fn early_samples(&self) -> u64 {
        self.early_samples
    }

    /// Number of times WE was driven low
    pub fn write_enables(&self) -> u64 {
        self.write_enables
    }

    /// Timing of the last completed RESET pulse
    pub fn last_reset_pulse(&self) -> Option<ResetPulse> {
        let low_ns = self.reset_low_ns?;
        let rose_at = self.reset_rose_at?;
        Some(ResetPulse {
            low_ns,
            high_ns: self.now_ns - rose_at,
        })
    }

    /// Recorded events (empty unless tracing is enabled)
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded events
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: BusEvent) {
        if self.config.trace {
            self.events.push(event);
        }
    }

    fn tick(&mut self) {
        self.now_ns += self.config.op_ns as u64;
    }

    fn outputs_enabled(&self) -> bool {
        self.configured
            && !self.high.intersects(ControlLines::READ)
            && self.high.contains(ControlLines::RESET)
    }

    /// Byte the device drives for the current address pattern
    fn cell(&self) -> u8 {
        let encoder = AddressEncoder::new(&self.config.profile);
        let mut addr = encoder.decode(self.pattern);
        if self.config.byte_swapped {
            addr ^= 1;
        }
        self.data.get(addr as usize).copied().unwrap_or(FLOATING_BUS)
    }

    fn restart_access(&mut self) {
        self.valid_at_ns = self.now_ns + self.config.access_ns as u64;
    }
}

/// Content generator used by [`SimulatedNor::with_counter`]
pub fn counter_byte(addr: u32) -> u8 {
    (addr ^ (addr >> 8) ^ (addr >> 16)) as u8
}

#[cfg(feature = "alloc")]
impl ParallelBus for SimulatedNor {
    fn configure_lines(&mut self, high: ControlLines) {
        self.tick();
        self.configured = true;
        self.high = high;
        if !high.contains(ControlLines::WE) {
            self.write_enables += 1;
        }
        self.record(BusEvent::Configure(high));
    }

    fn set_address(&mut self, pattern: u32) {
        self.tick();
        let pattern = pattern & self.config.profile.address_mask();
        if pattern != self.pattern {
            self.pattern = pattern;
            self.restart_access();
        }
        self.record(BusEvent::Address(pattern));
    }

    fn set_control(&mut self, lines: ControlLines, level: Level) {
        self.tick();
        let was = self.high;
        self.high.set(lines, level.is_high());

        let fell = was & !self.high;
        let rose = self.high & !was;

        if fell.contains(ControlLines::CE) {
            self.read_cycles += 1;
        }
        if fell.intersects(ControlLines::READ) {
            self.restart_access();
        }
        if fell.contains(ControlLines::WE) {
            self.write_enables += 1;
            log::warn!("dummy: WE driven low at {} ns", self.now_ns);
        }
        if fell.contains(ControlLines::RESET) {
            self.reset_fell_at = Some(self.now_ns);
        }
        if rose.contains(ControlLines::RESET) {
            if let Some(fell_at) = self.reset_fell_at.take() {
                self.reset_low_ns = Some(self.now_ns - fell_at);
                self.reset_rose_at = Some(self.now_ns);
            }
        }

        self.record(BusEvent::Control(lines, level));
    }

    fn read_data(&mut self) -> u8 {
        self.tick();
        let value = if !self.outputs_enabled() {
            FLOATING_BUS
        } else if self.now_ns < self.valid_at_ns {
            self.early_samples += 1;
            self.last_output
        } else {
            self.cell()
        };
        self.last_output = value;
        self.record(BusEvent::Sample(value));
        value
    }

    fn delay_ns(&mut self, ns: u32) {
        if ns == 0 {
            return;
        }
        self.now_ns += ns as u64;
        self.record(BusEvent::Delay(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now_ns += ms as u64 * NS_PER_MS;
        self.record(BusEvent::Delay(ms as u64 * NS_PER_MS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use norflash_core::profile::{LineMap, RESET_HOLD_MS};
    use norflash_core::error::ProfileFault;
    use norflash_core::{Error, ParallelFlash, MAX_PAGE_SIZE};

    fn small(profile: DeviceProfile) -> DeviceProfile {
        profile.with_size(0x1_0000)
    }

    fn counter_flash(profile: DeviceProfile) -> ParallelFlash<SimulatedNor> {
        let profile = small(profile);
        let sim = SimulatedNor::with_counter(SimConfig::new(profile.clone()));
        ParallelFlash::initialize(sim, profile).unwrap()
    }

    #[test]
    fn test_initialize_sequence() {
        let profile = small(DeviceProfile::a24_page());
        let config = SimConfig::new(profile.clone()).with_trace();
        let flash = ParallelFlash::initialize(SimulatedNor::new(config), profile).unwrap();
        let sim = flash.bus();

        assert!(sim.is_configured());
        assert_eq!(sim.control_state(), ControlLines::IDLE);
        assert_eq!(sim.write_enables(), 0);
        assert_eq!(
            &sim.events()[..3],
            &[
                BusEvent::Configure(ControlLines::IDLE),
                BusEvent::Address(0),
                BusEvent::Control(ControlLines::RESET, Level::Low),
            ]
        );
    }

    #[test]
    fn test_initialize_rejects_bad_page_size() {
        for page_size in [0, (MAX_PAGE_SIZE * 2) as u16] {
            let mut profile = small(DeviceProfile::a24_page());
            let mut sim = SimulatedNor::new(SimConfig::new(profile.clone()).with_trace());
            profile.page_size = page_size;

            let result = ParallelFlash::initialize(&mut sim, profile);
            assert_eq!(
                result.err(),
                Some(Error::InvalidProfile(ProfileFault::PageSize))
            );
            assert!(!sim.is_configured());
            assert!(sim.events().is_empty());
        }
    }

    #[test]
    fn test_reset_timing() {
        let flash = counter_flash(DeviceProfile::a24_page());
        let pulse = flash.bus().last_reset_pulse().unwrap();
        let hold = RESET_HOLD_MS as u64 * NS_PER_MS;

        assert!(pulse.low_ns >= hold);
        assert!(pulse.high_ns >= hold);
    }

    #[test]
    fn test_page_equals_bytes() {
        for profile in DeviceProfile::builtin() {
            let sim = SimulatedNor::with_counter(SimConfig::new(small(profile.clone())));
            let mut flash = ParallelFlash::initialize(sim, small(profile)).unwrap();

            for base in (0..0x1_0000).step_by(0x1010) {
                let page = flash.read_page(base, 16).unwrap();
                let bytes: Vec<u8> = (0..16).map(|i| flash.read_byte(base + i)).collect();
                assert_eq!(page.as_slice(), bytes.as_slice());
                assert_eq!(
                    page.as_slice(),
                    &flash.bus().data()[base as usize..base as usize + 16]
                );
            }
        }
    }

    #[test]
    fn test_known_pattern_page() {
        let pattern: [u8; 16] = [
            0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
            0xAA, 0xBB,
        ];
        let profile = small(DeviceProfile::a24_page());
        let sim = SimulatedNor::with_data(SimConfig::new(profile.clone()), &pattern);
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        assert_eq!(flash.read_page(0, 16).unwrap().as_slice(), &pattern);
    }

    #[test]
    fn test_idle_after_reads() {
        let mut flash = counter_flash(DeviceProfile::a24_page());

        flash.read_byte(0x42);
        assert!(flash.bus().control_state().contains(ControlLines::READ));

        flash.read_page(0x40, 16).unwrap();
        assert!(flash.bus().control_state().contains(ControlLines::READ));

        let mut buf = [0u8; 37];
        flash.read(0x33, &mut buf).unwrap();
        assert_eq!(flash.bus().control_state(), ControlLines::IDLE);
        assert_eq!(flash.bus().write_enables(), 0);
    }

    #[test]
    fn test_page_asserts_once() {
        let mut flash = counter_flash(DeviceProfile::a24_page());
        let before = flash.bus().read_cycles();

        flash.read_page(0x100, 16).unwrap();
        assert_eq!(flash.bus().read_cycles() - before, 1);

        for i in 0..16 {
            flash.read_byte(0x100 + i);
        }
        assert_eq!(flash.bus().read_cycles() - before, 17);
    }

    #[test]
    fn test_boundaries() {
        let profile = DeviceProfile::a24_page();
        let size = profile.size;
        let mut data = vec![0u8; size as usize];
        data[0] = 0x5A;
        data[size as usize - 1] = 0xA5;
        let sim = SimulatedNor::with_data(SimConfig::new(profile.clone()), &data);
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        assert_eq!(flash.read_byte(0), 0x5A);
        assert_eq!(flash.read_byte(size - 1), 0xA5);

        let mut last = [0u8; 1];
        flash.read(size - 1, &mut last).unwrap();
        assert_eq!(last, [0xA5]);
        assert_eq!(flash.read(size, &mut last), Err(Error::AddressOutOfBounds));
    }

    #[test]
    fn test_bulk_read_unaligned() {
        let mut flash = counter_flash(DeviceProfile::a24_page());
        let mut buf = vec![0u8; 100];

        flash.read(0x1235, &mut buf).unwrap();
        assert_eq!(buf.as_slice(), &flash.bus().data()[0x1235..0x1235 + 100]);
    }

    #[test]
    fn test_uncorrected_reads_swapped() {
        let pattern = [0x10, 0x11, 0x12, 0x13];
        let mut profile = small(DeviceProfile::a24_page());
        let config = SimConfig::new(profile.clone());
        profile.byte_mode_xor = false;
        let sim = SimulatedNor::with_data(config, &pattern);
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        assert_eq!(flash.read_page(0, 4).unwrap().as_slice(), &[0x11, 0x10, 0x13, 0x12]);
        assert_eq!(flash.read_byte(0), 0x11);
    }

    #[test]
    fn test_line_map_wiring() {
        let mut profile = DeviceProfile::a23_byte().with_size(256);
        profile.address_lines = 8;
        profile.line_map = Some(LineMap::from_slice(&[7, 6, 5, 4, 3, 2, 1, 0]).unwrap());
        let sim = SimulatedNor::with_counter(SimConfig::new(profile.clone()));
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        let mut buf = [0u8; 256];
        flash.read(0, &mut buf).unwrap();
        assert_eq!(&buf[..], flash.bus().data());
    }

    #[test]
    fn test_settle_too_short() {
        let mut profile = small(DeviceProfile::a24_page());
        profile.timing.page_settle_ns = 10;
        let sim = SimulatedNor::with_counter(SimConfig::new(profile.clone()).with_access_ns(70));
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        flash.read_page(0x200, 16).unwrap();
        assert_eq!(flash.bus().early_samples(), 16);
    }

    #[test]
    fn test_default_timing_meets_access_time() {
        let profile = small(DeviceProfile::a24_page());
        let sim = SimulatedNor::with_counter(SimConfig::new(profile.clone()).with_access_ns(90));
        let mut flash = ParallelFlash::initialize(sim, profile).unwrap();

        let page = flash.read_page(0x200, 16).unwrap();
        let byte = flash.read_byte(0x205);
        assert_eq!(flash.bus().early_samples(), 0);
        assert_eq!(page[5], byte);
        assert_eq!(byte, counter_byte(0x205));
    }

    #[test]
    fn test_floating_when_deasserted() {
        let mut sim = SimulatedNor::with_counter(SimConfig::new(small(DeviceProfile::a24_page())));
        sim.configure_lines(ControlLines::IDLE);
        sim.set_address(5);
        assert_eq!(sim.read_data(), FLOATING_BUS);

        sim.set_control(ControlLines::READ, Level::Low);
        assert_eq!(sim.read_data(), counter_byte(4));
    }
}
