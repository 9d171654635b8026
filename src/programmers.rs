//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all bus backends, with
//! support for feature-gated inclusion and dynamic help text generation.

use std::collections::HashMap;

use norflash_core::{DeviceProfile, ParallelBus, ParallelFlash};
use thiserror::Error;

/// Bus chosen at runtime
pub type BoxedBus = Box<dyn ParallelBus>;

/// Initialized device on a runtime-selected bus
pub type FlashHandle = ParallelFlash<BoxedBus>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Parsed programmer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// `key=value` options
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Options as borrowed pairs, for backend option parsers
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Errors from parsing a programmer string or opening a backend
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// Option without `=`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidFormat(String),

    /// Option value that does not parse
    #[error("Invalid {programmer} parameter {key}={value}")]
    InvalidValue {
        programmer: &'static str,
        key: &'static str,
        value: String,
    },

    /// No backend with this name is compiled in
    #[error(
        "Unknown programmer: {name}\n\n{help}\n\
         Use 'norflash list-programmers' for more details"
    )]
    Unknown { name: String, help: String },
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated NOR device for testing \
                      (size=<bytes>,file=<image>,pattern=counter|erased)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio"],
        description: "Linux GPIO character device \
                      (gpiochip=N,addr=N,data=N,ce=N,oe=N[,we,reset,wp,byte])",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, ProgrammerError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    for opt in opts_str.split(',').filter(|o| !o.is_empty()) {
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| ProgrammerError::InvalidFormat(opt.to_string()))?;
        params.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a bus backend and initialize the device behind it
///
/// This is the main entry point for the CLI. It parses the programmer
/// string, opens the backend for the wiring described by `profile`, then
/// configures the lines and pulses RESET.
pub fn open_flash(
    programmer: &str,
    profile: &DeviceProfile,
) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    let bus: BoxedBus = match find_programmer(&params.name) {
        #[cfg(feature = "dummy")]
        Some("dummy") => open_dummy(&params, profile)?,

        #[cfg(feature = "linux-gpio")]
        Some("linux_gpio") => open_linux_gpio(&params, profile)?,

        _ => {
            return Err(ProgrammerError::Unknown {
                name: params.name,
                help: programmer_help(),
            }
            .into())
        }
    };

    log::info!(
        "Initializing {} ({} bytes)...",
        profile.name,
        profile.size
    );
    Ok(ParallelFlash::initialize(bus, profile.clone())?)
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &ProgrammerParams,
    profile: &DeviceProfile,
) -> Result<BoxedBus, Box<dyn std::error::Error>> {
    use norflash_dummy::{SimConfig, SimulatedNor};

    let mut sim_profile = profile.clone();
    if let Some(size) = params.params.get("size") {
        sim_profile.size =
            crate::cli::parse_hex_u32(size).map_err(|_| ProgrammerError::InvalidValue {
                programmer: "dummy",
                key: "size",
                value: size.clone(),
            })?;
    }
    let config = SimConfig::new(sim_profile);

    let sim = if let Some(path) = params.params.get("file") {
        let image = std::fs::read(path)
            .map_err(|e| format!("Failed to read dummy image {}: {}", path, e))?;
        log::info!("dummy: Loaded {} bytes from {}", image.len(), path);
        SimulatedNor::with_data(config, &image)
    } else {
        match params.params.get("pattern").map(String::as_str) {
            None | Some("erased") => SimulatedNor::new(config),
            Some("counter") => SimulatedNor::with_counter(config),
            Some(other) => {
                return Err(ProgrammerError::InvalidValue {
                    programmer: "dummy",
                    key: "pattern",
                    value: other.to_string(),
                }
                .into())
            }
        }
    };

    log::debug!("dummy: Simulating {} bytes", sim.data().len());
    Ok(Box::new(sim))
}

#[cfg(feature = "linux-gpio")]
fn open_linux_gpio(
    params: &ProgrammerParams,
    profile: &DeviceProfile,
) -> Result<BoxedBus, Box<dyn std::error::Error>> {
    log::info!("Opening Linux GPIO programmer...");

    let bus = norflash_linux_gpio::open_linux_gpio(&params.pairs(), profile.address_lines)
        .map_err(|e| {
            format!(
                "Failed to open Linux GPIO bus: {}\n\
                 Make sure the gpiochip exists and you have read/write permissions.",
                e
            )
        })?;
    Ok(Box::new(bus))
}
