// src/lib.rs
//! GPS Link Library
//!
//! Finds a GPS receiver on one of several serial ports and baud rates,
//! optionally moves it to a faster rate, and keeps a shared navigation
//! state updated from its NMEA sentences.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod link;
pub mod monitor;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::{NavState, Navigation};
pub use link::LinkCandidate;
pub use monitor::GpsMonitor;
