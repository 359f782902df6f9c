// src/link/mod.rs
//! Serial link discovery and the steady-state sentence reader

pub mod detect;
pub mod reader;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use detect::{detect, Negotiator, DETECT_TIMEOUT};
pub use reader::SentenceReader;
pub use transport::{Line, LineReader, SerialTransport, Transport, MAX_LINE_LEN};

/// A (device, baud rate) pair to probe
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub device: String,
    pub baud: u32,
}

impl LinkCandidate {
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
        }
    }

    /// Same device at a different rate
    pub fn with_baud(&self, baud: u32) -> Self {
        Self::new(self.device.clone(), baud)
    }
}

impl fmt::Display for LinkCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.device, self.baud)
    }
}

/// Expand devices and rates into probe order: every rate of the first
/// device, then every rate of the second, and so on.
pub fn candidates<S: AsRef<str>>(devices: &[S], rates: &[u32]) -> Vec<LinkCandidate> {
    devices
        .iter()
        .flat_map(|device| rates.iter().map(move |&baud| LinkCandidate::new(device.as_ref(), baud)))
        .collect()
}
