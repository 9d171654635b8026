//! Linux GPIO parallel bus implementation
//!
//! `LinuxGpioBus` implements `ParallelBus` on top of the GPIO character
//! device. Every line of the flash is one GPIO line on a single chip: the
//! address bus, DQ0-DQ7, and the CE/OE/WE/RESET/WP/BYTE control lines.
//!
//! Lines are requested as inputs when the bus is opened and only switched to
//! outputs by `configure_lines`, so nothing is driven before the device
//! lifecycle takes over.

use crate::error::{LinuxGpioError, Result};

use std::time::{Duration, Instant};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use norflash_core::bus::{ControlLines, Level, ParallelBus};
use norflash_core::profile::MAX_ADDRESS_LINES;

/// Number of data lines (x8 mode)
pub const DATA_LINES: usize = 8;

/// Highest gpiochip number accepted by `gpiochip=`
const MAX_GPIOCHIP: u32 = 9;

/// Configuration for opening a Linux GPIO parallel bus
#[derive(Debug, Clone, Default)]
pub struct LinuxGpioBusConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Address line offsets, A0 first
    pub address: Vec<Offset>,
    /// Data line offsets, DQ0 first
    pub data: [Offset; DATA_LINES],
    /// CE# line offset
    pub ce: Offset,
    /// OE# line offset
    pub oe: Offset,
    /// WE# line offset, if wired
    pub we: Option<Offset>,
    /// RESET# line offset, if wired
    pub reset: Option<Offset>,
    /// WP# line offset, if wired
    pub wp: Option<Offset>,
    /// BYTE# line offset, if wired
    pub byte: Option<Offset>,
}

impl LinuxGpioBusConfig {
    /// Create a configuration with contiguous address and data lines
    pub fn new(
        device: impl Into<String>,
        first_address: Offset,
        address_lines: u8,
        first_data: Offset,
        ce: Offset,
        oe: Offset,
    ) -> Self {
        Self {
            device: device.into(),
            address: (first_address..first_address + address_lines as Offset).collect(),
            data: core::array::from_fn(|i| first_data + i as Offset),
            ce,
            oe,
            ..Default::default()
        }
    }

    /// Control lines that are wired, with their offsets
    pub fn control_lines(&self) -> Vec<(ControlLines, Offset)> {
        [
            (ControlLines::CE, Some(self.ce)),
            (ControlLines::OE, Some(self.oe)),
            (ControlLines::WE, self.we),
            (ControlLines::RESET, self.reset),
            (ControlLines::WP, self.wp),
            (ControlLines::BYTE, self.byte),
        ]
        .into_iter()
        .filter_map(|(line, offset)| offset.map(|o| (line, o)))
        .collect()
    }

    /// Every offset this configuration uses
    pub fn offsets(&self) -> Vec<Offset> {
        let mut all = self.address.clone();
        all.extend_from_slice(&self.data);
        all.extend(self.control_lines().into_iter().map(|(_, o)| o));
        all
    }

    /// Check line counts and that no offset is used twice
    pub fn validate(&self, address_lines: u8) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        if self.address.len() != address_lines as usize {
            return Err(LinuxGpioError::AddressLineCount {
                expected: address_lines as usize,
                actual: self.address.len(),
            });
        }

        let mut offsets = self.offsets();
        offsets.sort_unstable();
        if let Some(w) = offsets.windows(2).find(|w| w[0] == w[1]) {
            return Err(LinuxGpioError::DuplicateLine(w[0]));
        }
        Ok(())
    }
}

/// Parallel NOR bus on Linux GPIO lines
pub struct LinuxGpioBus {
    /// GPIO line request handle
    request: Request,
    /// Address line offsets, A0 first
    address: Vec<Offset>,
    /// Data line offsets, DQ0 first
    data: [Offset; DATA_LINES],
    /// Wired control lines
    control: Vec<(ControlLines, Offset)>,
    /// Pattern currently on the address lines, once driven
    pattern: Option<u32>,
}

impl LinuxGpioBus {
    /// Request every line of `config` as an input
    pub fn open(config: &LinuxGpioBusConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let mut req_config = Config::default();
        for offset in config.offsets() {
            req_config.with_line(offset).as_input();
        }

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("norflash")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: Opened {} ({} address lines from {}, data from {}, ce={}, oe={})",
            config.device,
            config.address.len(),
            config.address.first().copied().unwrap_or_default(),
            config.data[0],
            config.ce,
            config.oe
        );

        Ok(Self {
            request,
            address: config.address.clone(),
            data: config.data,
            control: config.control_lines(),
            pattern: None,
        })
    }

    fn set_line(&self, offset: Offset, high: bool, what: &str) {
        let value = if high { Value::Active } else { Value::Inactive };
        if let Err(e) = self.request.set_value(offset, value) {
            log::error!("Failed to set {} (line {}): {}", what, offset, e);
        }
    }
}

impl ParallelBus for LinuxGpioBus {
    fn configure_lines(&mut self, high: ControlLines) {
        let mut cfg = Config::default();
        for &offset in &self.address {
            cfg.with_line(offset).as_output(Value::Inactive);
        }
        for &offset in &self.data {
            cfg.with_line(offset).as_input();
        }
        for &(line, offset) in &self.control {
            let value = if high.contains(line) {
                Value::Active
            } else {
                Value::Inactive
            };
            cfg.with_line(offset).as_output(value);
        }

        if let Err(e) = self.request.reconfigure(&cfg) {
            log::error!("Failed to configure bus lines: {}", e);
        }
        self.pattern = Some(0);
        log::debug!("linux_gpio: Lines configured, control high: {:?}", high);
    }

    fn set_address(&mut self, pattern: u32) {
        // Only lines whose level changes are written
        let changed = match self.pattern {
            Some(current) => current ^ pattern,
            None => u32::MAX,
        };
        for (bit, &offset) in self.address.iter().enumerate() {
            if changed & (1 << bit) != 0 {
                self.set_line(offset, pattern & (1 << bit) != 0, "address line");
            }
        }
        self.pattern = Some(pattern);
    }

    fn set_control(&mut self, lines: ControlLines, level: Level) {
        for &(line, offset) in &self.control {
            if lines.contains(line) {
                self.set_line(offset, level.is_high(), "control line");
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        let mut byte = 0u8;
        for (bit, &offset) in self.data.iter().enumerate() {
            match self.request.value(offset) {
                Ok(Value::Active) => byte |= 1 << bit,
                Ok(Value::Inactive) => {}
                Err(e) => log::error!("Failed to get DQ{}: {}", bit, e),
            }
        }
        byte
    }

    fn delay_ns(&mut self, ns: u32) {
        if ns == 0 {
            return;
        }
        // Sleeping overshoots by tens of microseconds, so spin instead
        let deadline = Instant::now() + Duration::from_nanos(ns as u64);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Parse a line list: either the first of `count` contiguous offsets, or an
/// explicit `/`-separated list
fn parse_lines(name: &'static str, value: &str, count: usize) -> Result<Vec<Offset>> {
    let invalid = || LinuxGpioError::InvalidLineNumber {
        name,
        value: value.to_string(),
    };

    if value.contains('/') {
        return value
            .split('/')
            .map(|v| v.trim().parse::<Offset>().map_err(|_| invalid()))
            .collect();
    }

    let first: Offset = value.parse().map_err(|_| invalid())?;
    (0..count as Offset)
        .map(|i| first.checked_add(i).ok_or_else(invalid))
        .collect()
}

fn parse_line(name: &'static str, value: &str) -> Result<Offset> {
    value
        .parse()
        .map_err(|_| LinuxGpioError::InvalidLineNumber {
            name,
            value: value.to_string(),
        })
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `addr=N` - first of `address_lines` contiguous address lines, or
///   `addr=N/N/...` to list them A0 first (required)
/// - `data=N` - first of 8 contiguous data lines, or `data=N/N/...` (required)
/// - `ce=N`, `oe=N` - chip and output enable (required)
/// - `we=N`, `reset=N`, `wp=N`, `byte=N` - optional control lines; leave
///   out the ones tied off on the board
pub fn parse_options(options: &[(&str, &str)], address_lines: u8) -> Result<LinuxGpioBusConfig> {
    let mut config = LinuxGpioBusConfig::default();
    let mut gpiochip: Option<u32> = None;
    let mut have_data = false;
    let mut ce = None;
    let mut oe = None;

    if address_lines as usize > MAX_ADDRESS_LINES {
        return Err(LinuxGpioError::InvalidParameter(format!(
            "{} address lines requested, at most {} supported",
            address_lines, MAX_ADDRESS_LINES
        )));
    }

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("Invalid gpiochip value: {}", value))
                })?);
            }
            "addr" => {
                config.address = parse_lines("addr", value, address_lines as usize)?;
            }
            "data" => {
                let lines = parse_lines("data", value, DATA_LINES)?;
                config.data = lines
                    .as_slice()
                    .try_into()
                    .map_err(|_| LinuxGpioError::DataLineCount(lines.len()))?;
                have_data = true;
            }
            "ce" => ce = Some(parse_line("ce", value)?),
            "oe" => oe = Some(parse_line("oe", value)?),
            "we" => config.we = Some(parse_line("we", value)?),
            "reset" => config.reset = Some(parse_line("reset", value)?),
            "wp" => config.wp = Some(parse_line("wp", value)?),
            "byte" => config.byte = Some(parse_line("byte", value)?),
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    if config.device.is_empty() {
        match gpiochip {
            Some(n) if n > MAX_GPIOCHIP => {
                return Err(LinuxGpioError::InvalidParameter(format!(
                    "Maximum gpiochip number supported is {}",
                    MAX_GPIOCHIP
                )));
            }
            Some(n) => config.device = format!("/dev/gpiochip{}", n),
            None => return Err(LinuxGpioError::NoDevice),
        }
    } else if gpiochip.is_some() {
        return Err(LinuxGpioError::InvalidParameter(
            "Only one of 'dev' or 'gpiochip' can be specified".to_string(),
        ));
    }

    if config.address.is_empty() {
        return Err(LinuxGpioError::MissingParameter("addr"));
    }
    if !have_data {
        return Err(LinuxGpioError::MissingParameter("data"));
    }
    config.ce = ce.ok_or(LinuxGpioError::MissingParameter("ce"))?;
    config.oe = oe.ok_or(LinuxGpioError::MissingParameter("oe"))?;

    config.validate(address_lines)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &[(&str, &str)] = &[
        ("gpiochip", "0"),
        ("addr", "2"),
        ("data", "30"),
        ("ce", "40"),
        ("oe", "41"),
        ("we", "42"),
        ("reset", "43"),
    ];

    #[test]
    fn test_parse_contiguous() {
        let config = parse_options(BASIC, 4).unwrap();
        assert_eq!(config.device, "/dev/gpiochip0");
        assert_eq!(config.address, vec![2, 3, 4, 5]);
        assert_eq!(config.data, [30, 31, 32, 33, 34, 35, 36, 37]);
        assert_eq!(config.ce, 40);
        assert_eq!(config.oe, 41);
        assert_eq!(config.we, Some(42));
        assert_eq!(config.reset, Some(43));
        assert_eq!(config.wp, None);
        assert_eq!(
            config.control_lines(),
            vec![
                (ControlLines::CE, 40),
                (ControlLines::OE, 41),
                (ControlLines::WE, 42),
                (ControlLines::RESET, 43),
            ]
        );
    }

    #[test]
    fn test_parse_explicit_lists() {
        let opts = [
            ("dev", "/dev/gpiochip1"),
            ("addr", "9/3/7"),
            ("data", "10/11/12/13/20/21/22/23"),
            ("ce", "0"),
            ("oe", "1"),
        ];
        let config = parse_options(&opts, 3).unwrap();
        assert_eq!(config.device, "/dev/gpiochip1");
        assert_eq!(config.address, vec![9, 3, 7]);
        assert_eq!(config.data, [10, 11, 12, 13, 20, 21, 22, 23]);
    }

    #[test]
    fn test_parse_errors() {
        let no_dev = [("addr", "0"), ("data", "8"), ("ce", "20"), ("oe", "21")];
        assert!(matches!(
            parse_options(&no_dev, 2),
            Err(LinuxGpioError::NoDevice)
        ));

        let no_oe = [("gpiochip", "0"), ("addr", "0"), ("data", "8"), ("ce", "20")];
        assert!(matches!(
            parse_options(&no_oe, 2),
            Err(LinuxGpioError::MissingParameter("oe"))
        ));

        let short_data = [
            ("gpiochip", "0"),
            ("addr", "0"),
            ("data", "8/9"),
            ("ce", "20"),
            ("oe", "21"),
        ];
        assert!(matches!(
            parse_options(&short_data, 2),
            Err(LinuxGpioError::DataLineCount(2))
        ));

        let wrong_addr = [
            ("gpiochip", "0"),
            ("addr", "0/1/2"),
            ("data", "8"),
            ("ce", "20"),
            ("oe", "21"),
        ];
        assert!(matches!(
            parse_options(&wrong_addr, 2),
            Err(LinuxGpioError::AddressLineCount {
                expected: 2,
                actual: 3
            })
        ));

        let bad_number = [("gpiochip", "0"), ("addr", "x")];
        assert!(matches!(
            parse_options(&bad_number, 2),
            Err(LinuxGpioError::InvalidLineNumber { name: "addr", .. })
        ));
    }

    #[test]
    fn test_parse_overlap() {
        // Address lines 2..=9 run into the data lines at 8
        let opts = [
            ("gpiochip", "0"),
            ("addr", "2"),
            ("data", "8"),
            ("ce", "20"),
            ("oe", "21"),
        ];
        assert!(matches!(
            parse_options(&opts, 8),
            Err(LinuxGpioError::DuplicateLine(8))
        ));
    }

    #[test]
    fn test_dev_and_gpiochip_conflict() {
        let opts = [
            ("dev", "/dev/gpiochip0"),
            ("gpiochip", "0"),
            ("addr", "0"),
            ("data", "8"),
            ("ce", "20"),
            ("oe", "21"),
        ];
        assert!(matches!(
            parse_options(&opts, 2),
            Err(LinuxGpioError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_config_new() {
        let config = LinuxGpioBusConfig::new("/dev/gpiochip0", 0, 24, 24, 32, 33);
        assert_eq!(config.address.len(), 24);
        assert_eq!(config.data[7], 31);
        assert!(config.validate(24).is_ok());
        assert!(config.validate(23).is_err());
    }
}
