// src/error.rs
//! Error types for GPS link discovery and sentence processing

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug, Error)]
pub enum GpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device could not be opened at all (missing, busy, permission).
    #[error("Failed to open {device} at {baud} baud: {reason}")]
    TransportOpen {
        device: String,
        baud: u32,
        reason: String,
    },

    #[error("Read error on {link}: {source}")]
    Read {
        link: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {0} disconnected")]
    Disconnected(String),

    #[error("Baud rate change to {baud} on {device} was not confirmed")]
    BaudChange { device: String, baud: u32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GpsError {
    pub fn transport_open(device: &str, baud: u32, reason: impl ToString) -> Self {
        GpsError::TransportOpen {
            device: device.to_string(),
            baud,
            reason: reason.to_string(),
        }
    }
}
