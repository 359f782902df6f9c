// src/config.rs
//! Configuration management: candidate links and negotiation settings

use crate::{
    error::{GpsError, Result},
    link::{self, LinkCandidate},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Devices to probe, in order
    pub devices: Vec<String>,
    /// Baud rates to try on each device, in order
    pub baud_rates: Vec<u32>,
    /// Rate to switch a found receiver to; `None` leaves it alone
    pub preferred_baud: Option<u32>,
    pub detect_timeout_ms: u64,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                "/dev/ttyAMA0".to_string(),
                "/dev/ttyACM0".to_string(),
                "/dev/ttyUSB0".to_string(),
            ],
            baud_rates: vec![38400, 9600, 4800],
            preferred_baud: Some(38400),
            detect_timeout_ms: 2000,
        }
    }
}

impl GpsConfig {
    /// Load configuration from the default location, or defaults if there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `$HOME/.config/gps-link/config.json`
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-link").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(GpsError::Config("no devices to probe".to_string()));
        }
        if self.baud_rates.is_empty() {
            return Err(GpsError::Config("no baud rates to try".to_string()));
        }
        if self.baud_rates.contains(&0) || self.preferred_baud == Some(0) {
            return Err(GpsError::Config("baud rate must be non-zero".to_string()));
        }
        if self.detect_timeout_ms == 0 {
            return Err(GpsError::Config("detect timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Candidate links in probe order
    pub fn candidates(&self) -> Vec<LinkCandidate> {
        link::candidates(&self.devices, &self.baud_rates)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }

    /// Probe only this device
    pub fn update_device(&mut self, device: String) {
        self.devices = vec![device];
    }

    /// Try only this baud rate
    pub fn update_baud(&mut self, baud: u32) {
        self.baud_rates = vec![baud];
    }
}
