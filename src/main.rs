//! norflash - Parallel NOR flash reader
//!
//! Reads a parallel NOR flash device driven directly over GPIO lines, with
//! no flash controller in between.
//!
//! # Architecture
//!
//! A programmer backend provides a `ParallelBus` (Linux GPIO lines, or the
//! simulated device). The bus is handed to `ParallelFlash::initialize`
//! together with a device profile, and every command works on the
//! resulting handle:
//! - `dump` prints the device as hex, one byte read per byte
//! - `read` writes it to a file using page reads
//! - `serve` answers HTTP requests for `/flash.bin`

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use norflash_core::profile::ProfileDatabase;
use norflash_core::DeviceProfile;
use programmers::open_flash;

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    let default_filter = log_level(cli.verbose).as_str();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Load profile database
    let db = match load_profile_database(cli.profiles.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load device profiles: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} device profiles", db.len());

    match cli.command {
        Commands::Dump { programmer, range } => {
            let profile = select_profile(&db, &cli.profile, cli.size)?;
            let mut flash = open_flash(&programmer, &profile)?;
            let range = commands::resolve_range(range, flash.size())?;
            let mut out = BufWriter::new(io::stdout().lock());
            commands::dump::run_dump(&mut flash, range, &mut out)?;
            Ok(())
        }
        Commands::Read {
            programmer,
            output,
            range,
        } => {
            let profile = select_profile(&db, &cli.profile, cli.size)?;
            let mut flash = open_flash(&programmer, &profile)?;
            let range = commands::resolve_range(range, flash.size())?;
            commands::read::run_read(&mut flash, range, &output)
        }
        Commands::Serve { programmer, listen } => {
            let profile = select_profile(&db, &cli.profile, cli.size)?;
            let mut flash = open_flash(&programmer, &profile)?;
            commands::serve::run_serve(&mut flash, &listen)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListProfiles => {
            commands::list_profiles(&db);
            Ok(())
        }
    }
}

/// Load the profile database from the specified path or default locations
///
/// The built-in profiles are always present; files can add profiles or
/// replace a built-in one by using its name.
/// Default log level for the given number of `-v` flags
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn load_profile_database(
    path: Option<&Path>,
) -> Result<ProfileDatabase, Box<dyn std::error::Error>> {
    let mut db = ProfileDatabase::new();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Profile path not found: {}", path.display()).into());
        }
    } else {
        // Try default locations
        let default_paths = [
            PathBuf::from("profiles"),
            PathBuf::from("/usr/share/norflash/profiles"),
            PathBuf::from("/usr/local/share/norflash/profiles"),
        ];

        for dir in &default_paths {
            if dir.is_dir() {
                match db.load_dir(dir) {
                    Ok(count) => log::debug!("Loaded {} profiles from {}", count, dir.display()),
                    Err(e) => log::warn!("Failed to load profiles from {}: {}", dir.display(), e),
                }
            }
        }
    }

    Ok(db)
}

/// Pick the profile named on the command line and apply `--size`
fn select_profile(
    db: &ProfileDatabase,
    name: &str,
    size: Option<u32>,
) -> Result<DeviceProfile, Box<dyn std::error::Error>> {
    let mut profile = db
        .find(name)
        .cloned()
        .ok_or_else(|| format!("Unknown device profile: {} (see 'norflash list-profiles')", name))?;

    if let Some(size) = size {
        log::debug!("Overriding {} size: {} -> {} bytes", name, profile.size, size);
        profile = profile.with_size(size);
    }
    profile.validate()?;

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), log::LevelFilter::Info);
        assert_eq!(log_level(1), log::LevelFilter::Debug);
        assert_eq!(log_level(2), log::LevelFilter::Trace);
        assert_eq!(log_level(5), log::LevelFilter::Trace);
    }

    #[test]
    fn test_select_profile() {
        let db = ProfileDatabase::new();

        let profile = select_profile(&db, "A24-PAGE", None).unwrap();
        assert_eq!(profile, DeviceProfile::a24_page());

        let resized = select_profile(&db, "a23-byte", Some(0x80_0000)).unwrap();
        assert_eq!(resized.size, 0x80_0000);
        assert_eq!(resized.address_lines, 23);

        assert!(select_profile(&db, "a25-word", None).is_err());
        assert!(select_profile(&db, "a24-page", Some(0)).is_err());
    }

    #[test]
    fn test_missing_profile_path() {
        assert!(load_profile_database(Some(Path::new("/nonexistent/norflash"))).is_err());
    }
}
