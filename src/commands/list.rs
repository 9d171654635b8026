//! List commands implementation

use crate::programmers;
use norflash_core::profile::ProfileDatabase;

/// List all supported programmers
pub fn list_programmers() {
    let programmers = programmers::available_programmers();

    println!("Supported programmers:");
    println!();
    if programmers.is_empty() {
        println!("  (none, recompile with programmer features enabled)");
    }
    for p in &programmers {
        println!("  {:12} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            println!("  {:12}   aliases: {}", "", p.aliases.join(", "));
        }
    }
}

/// List all known device profiles
pub fn list_profiles(db: &ProfileDatabase) {
    println!("Device profiles:");
    println!();
    println!(
        "{:<16} {:>5} {:>10} {:>5} {:>5}  {}",
        "Name", "Lines", "Size", "XOR", "Page", "Description"
    );
    println!("{}", "-".repeat(72));

    for profile in db.profiles() {
        println!(
            "{:<16} {:>5} {:>10} {:>5} {:>5}  {}",
            profile.name.as_str(),
            profile.address_lines,
            format_size(profile.size),
            if profile.byte_mode_xor { "yes" } else { "no" },
            profile.page_size,
            profile.description.as_str()
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0x200_0000), "32 MiB");
        assert_eq!(format_size(0x20_0000), "2 MiB");
        assert_eq!(format_size(4096), "4 KiB");
        assert_eq!(format_size(100), "100 B");
    }
}
