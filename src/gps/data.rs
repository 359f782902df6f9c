// src/gps/data.rs
//! Navigation record and the lock that guards it

use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

const RAW_HISTORY_LEN: usize = 5;

/// Latest navigation solution as reported by the receiver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Navigation {
    // Position fix group
    pub fix_time_secs: Option<u32>, // seconds since UTC midnight
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,       // metres MSL
    pub geoid_separation: Option<f64>, // metres
    pub last_fix: Option<DateTime<Utc>>,

    // Ground track group
    pub ground_speed: Option<f64>, // knots
    pub true_course: Option<f64>,  // degrees
    pub last_ground_track: Option<DateTime<Utc>>,

    // Link bookkeeping
    pub link: Option<String>,
    pub valid_sentences: u64,
    pub rejected_lines: u64,
    pub raw_data: String,
    pub raw_history: Vec<String>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a position has ever been reported
    pub fn has_fix(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Age of the last position fix in seconds
    pub fn age_seconds(&self) -> Option<i64> {
        self.last_fix.map(|ts| Utc::now().signed_duration_since(ts).num_seconds())
    }

    /// Check if the last fix is recent (within 10 seconds)
    pub fn is_recent(&self) -> bool {
        self.age_seconds().map_or(false, |age| age < 10)
    }

    /// Add a raw NMEA sentence to history (keep last 5)
    pub fn add_raw_sentence(&mut self, sentence: &str) {
        self.raw_data = sentence.to_string();
        self.raw_history.push(sentence.to_string());

        if self.raw_history.len() > RAW_HISTORY_LEN {
            self.raw_history.remove(0);
        }
    }

    /// Fix time formatted as `HH:MM:SS UTC`
    pub fn fix_time_description(&self) -> String {
        match self.fix_time_secs {
            Some(secs) => format!(
                "{:02}:{:02}:{:02} UTC",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            ),
            None => "No fix".to_string(),
        }
    }

    /// Get fix type description
    pub fn fix_description(&self) -> String {
        match self.fix_quality {
            Some(0) => "No fix".to_string(),
            Some(1) => "GPS".to_string(),
            Some(2) => "DGPS".to_string(),
            Some(3) => "PPS".to_string(),
            Some(4) => "RTK".to_string(),
            Some(5) => "Float RTK".to_string(),
            Some(6) => "Estimated".to_string(),
            Some(7) => "Manual".to_string(),
            Some(8) => "Simulation".to_string(),
            Some(quality) => format!("Unknown ({})", quality),
            None => "Unknown".to_string(),
        }
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:>12.6}°", val),
            None => "No fix".to_string(),
        }
    }

    /// Format value with unit for display
    pub fn format_value<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
        match value {
            Some(val) => format!("{:>12} {}", val, unit),
            None => "Unknown".to_string(),
        }
    }
}

/// Shared handle to the navigation record.
///
/// The record is only reachable inside [`NavState::update`] and
/// [`NavState::read`], so every access happens with the lock held and no
/// reference outlives the guard. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct NavState {
    inner: Arc<RwLock<Navigation>>,
}

impl NavState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access. Everything `f` writes becomes visible
    /// to readers at once, when the guard is dropped.
    pub fn update<R>(&self, f: impl FnOnce(&mut Navigation) -> R) -> R {
        // A panicking writer cannot leave a half-applied group behind because
        // handlers validate before they lock, so a poisoned lock is still usable.
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Run `f` with shared access.
    pub fn read<R>(&self, f: impl FnOnce(&Navigation) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> Navigation {
        self.read(Navigation::clone)
    }
}
