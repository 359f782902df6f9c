// src/link/detect.rs
//! Finding which device and baud rate carries a live receiver

use super::{
    transport::{Line, LineReader, Transport},
    LinkCandidate,
};
use crate::{
    error::{GpsError, Result},
    gps::sentence,
};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWriteExt},
    time::timeout,
};
use tracing::{debug, info, trace, warn};

/// A receiver sends at least one sentence per fix, normally once a second.
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(2);

/// MediaTek command that sets the receiver's output baud rate
pub const SET_BAUD_COMMAND: &str = "PMTK251";

/// Probe one candidate.
///
/// Returns `Ok(true)` as soon as one checksum-valid line arrives and
/// `Ok(false)` if none does within `wait`. Only a failure to open the
/// device is an error. The link is closed before returning in every case.
pub async fn detect<T: Transport>(
    transport: &T,
    candidate: &LinkCandidate,
    wait: Duration,
) -> Result<bool> {
    let link = transport.open(&candidate.device, candidate.baud)?;
    let mut lines = LineReader::new(link);

    // A pending read is dropped when the timer wins; the link closes on return.
    match timeout(wait, first_valid_sentence(&mut lines)).await {
        Ok(Some(payload)) => {
            info!(%candidate, sentence = %payload, "valid sentence");
            Ok(true)
        }
        Ok(None) => {
            debug!(%candidate, "link closed before a valid sentence");
            Ok(false)
        }
        Err(_) => {
            debug!(%candidate, ?wait, "timeout reached");
            Ok(false)
        }
    }
}

async fn first_valid_sentence<L: AsyncRead + Unpin>(lines: &mut LineReader<L>) -> Option<String> {
    loop {
        match lines.next_line().await {
            Ok(Some(Line::Complete(line))) => match sentence::validate(&line) {
                Ok(payload) => return Some(String::from_utf8_lossy(payload).into_owned()),
                Err(e) => trace!(line = %String::from_utf8_lossy(&line), error = %e, "not a sentence"),
            },
            Ok(Some(Line::Overlong(len))) => trace!(len, "overlong line"),
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "read failed while probing");
                return None;
            }
        }
    }
}

/// Sweeps candidates with [`detect`] and optionally moves the receiver to a
/// faster rate.
#[derive(Debug, Clone)]
pub struct Negotiator<T> {
    transport: T,
    detect_timeout: Duration,
}

impl<T: Transport> Negotiator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            detect_timeout: DETECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, detect_timeout: Duration) -> Self {
        self.detect_timeout = detect_timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// First candidate, in order, with a live receiver. Candidates are tried
    /// one at a time so a device is never open twice.
    pub async fn negotiate(&self, candidates: &[LinkCandidate]) -> Option<LinkCandidate> {
        for candidate in candidates {
            match detect(&self.transport, candidate, self.detect_timeout).await {
                Ok(true) => {
                    info!(%candidate, "GPS found");
                    return Some(candidate.clone());
                }
                Ok(false) => debug!(%candidate, "no GPS"),
                Err(e) => warn!(%candidate, error = %e, "error detecting GPS"),
            }
        }

        warn!(tried = candidates.len(), "no GPS found on any candidate");
        None
    }

    /// Ask the receiver on `found` to switch to `baud`, then confirm it did.
    ///
    /// Fails with [`GpsError::BaudChange`] if nothing valid is heard at the
    /// new rate.
    pub async fn change_baud_rate(&self, found: &LinkCandidate, baud: u32) -> Result<LinkCandidate> {
        if found.baud == baud {
            return Ok(found.clone());
        }

        let command = sentence::frame(format!("{},{}", SET_BAUD_COMMAND, baud).as_bytes());
        {
            let mut link = self.transport.open(&found.device, found.baud)?;
            link.write_all(&command).await?;
            link.flush().await?;
        }
        info!(%found, baud, "sent baud rate change");

        let target = found.with_baud(baud);
        if detect(&self.transport, &target, self.detect_timeout).await? {
            info!(%target, "baud rate change confirmed");
            Ok(target)
        } else {
            Err(GpsError::BaudChange {
                device: found.device.clone(),
                baud,
            })
        }
    }

    /// Negotiate, then move to `preferred` if given. If the change cannot be
    /// confirmed the originally detected rate is kept.
    pub async fn establish(
        &self,
        candidates: &[LinkCandidate],
        preferred: Option<u32>,
    ) -> Option<LinkCandidate> {
        let found = self.negotiate(candidates).await?;

        match preferred {
            Some(baud) if baud != found.baud => match self.change_baud_rate(&found, baud).await {
                Ok(changed) => Some(changed),
                Err(e) => {
                    warn!(%found, error = %e, "keeping detected baud rate");
                    Some(found)
                }
            },
            _ => Some(found),
        }
    }
}
