//! Error types for the Linux GPIO parallel bus

use thiserror::Error;

/// Linux GPIO parallel bus errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{path}': {source}")]
    LineRequestFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Invalid GPIO line number
    #[error("Invalid GPIO line number for {name}: {value}")]
    InvalidLineNumber { name: &'static str, value: String },

    /// Address line list does not match the profile
    #[error("Expected {expected} address lines, got {actual}")]
    AddressLineCount { expected: usize, actual: usize },

    /// Wrong number of data lines
    #[error("Expected 8 data lines, got {0}")]
    DataLineCount(usize),

    /// The same GPIO offset is used twice
    #[error("GPIO line {0} is assigned more than once")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
