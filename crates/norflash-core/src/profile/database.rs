//! Profile database for runtime loading and lookup
//!
//! This module provides the `ProfileDatabase` type for loading device
//! profiles from RON files at runtime, on top of the built-in profiles.
//!
//! # File format
//!
//! ```ron
//! (
//!     profiles: [
//!         (
//!             name: "mx29lv640-x8",
//!             description: "MX29LV640 in byte mode",
//!             address_lines: 23,
//!             size: MiB(8),
//!             byte_mode_xor: true,
//!             page_size: 16,
//!             timing: (propagation_ns: 500),
//!         ),
//!     ],
//! )
//! ```

use alloc::{format, string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use super::types::{
    label, DeviceProfile, LineMap, Timing, MAX_ADDRESS_LINES, MAX_DESCRIPTION_LEN, MAX_NAME_LEN,
    PAGE_ASSERT_DELAY_NS, PAGE_SETTLE_DELAY_NS, PROPAGATION_DELAY_NS, RESET_HOLD_MS,
};

/// Error type for profile database operations
#[derive(Debug)]
pub enum ProfileDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// Validation error
    Validation(String),
}

impl From<io::Error> for ProfileDbError {
    fn from(e: io::Error) -> Self {
        ProfileDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ProfileDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        ProfileDbError::Parse(e)
    }
}

impl std::fmt::Display for ProfileDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileDbError::Io(e) => write!(f, "I/O error: {}", e),
            ProfileDbError::Parse(e) => write!(f, "Parse error: {}", e),
            ProfileDbError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ProfileDbError {}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
    /// Size in mebibytes (1024 * 1024 bytes)
    MiB(u32),
}

impl Size {
    /// Convert to bytes, `None` on overflow
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
            Size::MiB(n) => n.checked_mul(1024 * 1024),
        }
    }
}

/// Timing block (RON format), every field optional
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
struct TimingDef {
    propagation_ns: u32,
    reset_hold_ms: u32,
    page_assert_ns: u32,
    page_settle_ns: u32,
}

impl Default for TimingDef {
    fn default() -> Self {
        Self {
            propagation_ns: PROPAGATION_DELAY_NS,
            reset_hold_ms: RESET_HOLD_MS,
            page_assert_ns: PAGE_ASSERT_DELAY_NS,
            page_settle_ns: PAGE_SETTLE_DELAY_NS,
        }
    }
}

impl From<TimingDef> for Timing {
    fn from(def: TimingDef) -> Self {
        Timing {
            propagation_ns: def.propagation_ns,
            reset_hold_ms: def.reset_hold_ms,
            page_assert_ns: def.page_assert_ns,
            page_settle_ns: def.page_settle_ns,
        }
    }
}

/// Single profile definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ProfileDef {
    name: String,
    #[serde(default)]
    description: String,
    address_lines: u8,
    size: Size,
    #[serde(default)]
    byte_mode_xor: bool,
    #[serde(default = "default_page_size")]
    page_size: u16,
    #[serde(default = "default_page_window_bits")]
    page_window_bits: u8,
    #[serde(default)]
    line_map: Option<Vec<u8>>,
    #[serde(default)]
    timing: TimingDef,
}

fn default_page_size() -> u16 {
    16
}

fn default_page_window_bits() -> u8 {
    3
}

/// Top-level RON document
#[derive(Debug, Clone, serde::Deserialize)]
struct ProfileFileDef {
    profiles: Vec<ProfileDef>,
}

impl ProfileDef {
    fn into_profile(self) -> Result<DeviceProfile, ProfileDbError> {
        if self.name.is_empty() || self.name.chars().count() > MAX_NAME_LEN {
            return Err(ProfileDbError::Validation(format!(
                "profile name '{}' must be 1 to {} characters",
                self.name, MAX_NAME_LEN
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            log::warn!(
                "Description of profile '{}' truncated to {} characters",
                self.name,
                MAX_DESCRIPTION_LEN
            );
        }

        let size = self.size.to_bytes().ok_or_else(|| {
            ProfileDbError::Validation(format!("profile '{}': size overflows 32 bits", self.name))
        })?;

        let line_map = match self.line_map {
            Some(map) => Some(LineMap::from_slice(&map).map_err(|_| {
                ProfileDbError::Validation(format!(
                    "profile '{}': line map has more than {} entries",
                    self.name, MAX_ADDRESS_LINES
                ))
            })?),
            None => None,
        };

        let profile = DeviceProfile {
            name: label(&self.name),
            description: label(&self.description),
            address_lines: self.address_lines,
            size,
            byte_mode_xor: self.byte_mode_xor,
            page_size: self.page_size,
            page_window_bits: self.page_window_bits,
            line_map,
            timing: self.timing.into(),
        };

        profile
            .validate()
            .map_err(|e| ProfileDbError::Validation(format!("profile '{}': {}", self.name, e)))?;

        Ok(profile)
    }
}

// ============================================================================
// Profile database
// ============================================================================

/// Runtime profile database
///
/// Starts out with the built-in profiles. Profiles loaded later replace
/// earlier ones with the same (case-insensitive) name.
#[derive(Debug, Clone)]
pub struct ProfileDatabase {
    profiles: Vec<DeviceProfile>,
}

impl Default for ProfileDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileDatabase {
    /// Create a database holding the built-in profiles
    pub fn new() -> Self {
        Self {
            profiles: DeviceProfile::builtin().into_iter().collect(),
        }
    }

    /// Create an empty database
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Load profile definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ProfileDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load profile definitions from a RON string
    ///
    /// Either every profile in the document is added or none is.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ProfileDbError> {
        let file_def: ProfileFileDef = ron::from_str(content)?;

        let loaded = file_def
            .profiles
            .into_iter()
            .map(ProfileDef::into_profile)
            .collect::<Result<Vec<_>, _>>()?;

        for (i, profile) in loaded.iter().enumerate() {
            if loaded[..i]
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&profile.name))
            {
                return Err(ProfileDbError::Validation(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        let count = loaded.len();
        for profile in loaded {
            self.insert(profile);
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ProfileDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Add a profile, replacing any profile with the same name
    pub fn insert(&mut self, profile: DeviceProfile) {
        if let Some(existing) = self
            .profiles
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
        {
            log::debug!("Replacing profile '{}'", profile.name);
            *existing = profile;
        } else {
            self.profiles.push(profile);
        }
    }

    /// Get all profiles in the database
    pub fn profiles(&self) -> &[DeviceProfile] {
        &self.profiles
    }

    /// Get the number of profiles in the database
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Find a profile by name (case-insensitive exact match)
    pub fn find(&self, name: &str) -> Option<&DeviceProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_RON: &str = r#"
    (
        profiles: [
            (
                name: "mx29lv640-x8",
                description: "MX29LV640 in byte mode",
                address_lines: 23,
                size: MiB(8),
                byte_mode_xor: true,
                timing: (propagation_ns: 500),
            ),
            (
                name: "swizzled",
                address_lines: 4,
                size: B(16),
                page_size: 4,
                page_window_bits: 2,
                line_map: Some([3, 2, 1, 0]),
            ),
        ],
    )
    "#;

    #[test]
    fn test_load_ron() {
        let mut db = ProfileDatabase::new();
        let count = db.load_ron(TEST_RON).unwrap();

        assert_eq!(count, 2);
        assert_eq!(db.len(), 4);

        let profile = db.find("MX29LV640-X8").unwrap();
        assert_eq!(profile.size, 8 * 1024 * 1024);
        assert!(profile.byte_mode_xor);
        assert_eq!(profile.page_size, 16);
        assert_eq!(profile.page_window_bits, 3);
        assert_eq!(profile.timing.propagation_ns, 500);
        assert_eq!(profile.timing.reset_hold_ms, RESET_HOLD_MS);

        let swizzled = db.find("swizzled").unwrap();
        assert_eq!(swizzled.line_map.as_deref(), Some(&[3u8, 2, 1, 0][..]));
    }

    #[test]
    fn test_builtin_replaced() {
        let mut db = ProfileDatabase::new();
        let ron = r#"(profiles: [(name: "a24-page", address_lines: 24, size: MiB(4))])"#;
        db.load_ron(ron).unwrap();

        assert_eq!(db.len(), 2);
        let profile = db.find("a24-page").unwrap();
        assert_eq!(profile.size, 4 * 1024 * 1024);
        assert!(!profile.byte_mode_xor);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut db = ProfileDatabase::empty();
        let ron = r#"(profiles: [(name: "bad", address_lines: 40, size: MiB(4))])"#;
        assert!(matches!(
            db.load_ron(ron),
            Err(ProfileDbError::Validation(_))
        ));
        assert!(db.is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut db = ProfileDatabase::empty();
        let ron = r#"(profiles: [
            (name: "dup", address_lines: 20, size: MiB(1)),
            (name: "DUP", address_lines: 20, size: MiB(1)),
        ])"#;
        assert!(matches!(
            db.load_ron(ron),
            Err(ProfileDbError::Validation(_))
        ));
        assert!(db.is_empty());
    }

    #[test]
    fn test_parse_error() {
        let mut db = ProfileDatabase::empty();
        assert!(matches!(
            db.load_ron("(profiles: [(name: 3)])"),
            Err(ProfileDbError::Parse(_))
        ));
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(256).to_bytes(), Some(256));
        assert_eq!(Size::KiB(4).to_bytes(), Some(4096));
        assert_eq!(Size::MiB(32).to_bytes(), Some(0x200_0000));
        assert_eq!(Size::MiB(4096).to_bytes(), None);
    }
}
