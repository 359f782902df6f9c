// src/link/reader.rs
//! Steady-state reading of an established link

use super::{
    transport::{Line, LineReader, Transport},
    LinkCandidate,
};
use crate::{
    error::{GpsError, Result},
    gps::{sentence, Dispatch, HandlerRegistry, NavState},
};
use std::sync::Arc;
use tokio::{io::AsyncRead, sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

/// Feeds lines from a link through validation and dispatch into the shared state.
#[derive(Debug, Clone)]
pub struct SentenceReader {
    registry: Arc<HandlerRegistry>,
    state: NavState,
}

impl SentenceReader {
    pub fn new(registry: Arc<HandlerRegistry>, state: NavState) -> Self {
        Self { registry, state }
    }

    /// Validate and dispatch one raw line, terminator already removed.
    /// Lines that fail validation are counted and dropped; `None` is
    /// returned for them and for empty lines.
    pub fn process_line(&self, line: &[u8]) -> Option<Dispatch> {
        if line.is_empty() {
            return None;
        }

        // Checked on the raw bytes; text is only made for handlers and logs.
        match sentence::validate(line) {
            Ok(payload) => {
                let raw = String::from_utf8_lossy(line);
                self.state.update(|nav| {
                    nav.valid_sentences += 1;
                    nav.add_raw_sentence(&raw);
                });
                Some(self.registry.dispatch(&String::from_utf8_lossy(payload), &self.state))
            }
            Err(e) => {
                warn!(line = %String::from_utf8_lossy(line), error = %e, "invalid NMEA sentence");
                self.state.update(|nav| nav.rejected_lines += 1);
                None
            }
        }
    }

    /// Count a line dropped for exceeding the length limit
    fn reject_overlong(&self, len: usize) {
        warn!(len, "line too long, dropped");
        self.state.update(|nav| nav.rejected_lines += 1);
    }

    /// Read until the link fails or `shutdown` turns true.
    ///
    /// There is no per-line timeout. End of stream is reported as
    /// [`GpsError::Disconnected`]; reconnecting is up to the caller.
    pub async fn run<L: AsyncRead + Unpin>(
        &self,
        link: L,
        name: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut lines = LineReader::new(link);
        info!(link = name, "GPS reader started");

        loop {
            if *shutdown.borrow_and_update() {
                info!(link = name, "GPS reader stopping");
                return Ok(());
            }

            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!(link = name, "shutdown handle dropped, GPS reader stopping");
                        return Ok(());
                    }
                    continue;
                }
                next = lines.next_line() => next,
            };

            match next {
                Ok(Some(Line::Complete(line))) => {
                    self.process_line(&line);
                }
                Ok(Some(Line::Overlong(len))) => self.reject_overlong(len),
                Ok(None) => {
                    error!(link = name, "GPS device disconnected, reader terminating");
                    return Err(GpsError::Disconnected(name.to_string()));
                }
                Err(e) => {
                    error!(link = name, error = %e, "error reading serial data, reader terminating");
                    return Err(GpsError::Read {
                        link: name.to_string(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// Open `candidate` and run `reader` on it in a background task.
///
/// Opening happens before spawning so a failure to open is returned here.
pub fn spawn_reader<T: Transport>(
    transport: &T,
    candidate: &LinkCandidate,
    reader: SentenceReader,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<Result<()>>> {
    let link = transport.open(&candidate.device, candidate.baud)?;
    info!(%candidate, "opened GPS");

    let name = candidate.to_string();
    reader.state.update(|nav| nav.link = Some(name.clone()));

    Ok(tokio::spawn(async move { reader.run(link, &name, shutdown).await }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gps::{nmea::FieldError, sentence::frame},
        link::transport::fake::{FakeTransport, Script},
    };
    use crate::link::MAX_LINE_LEN;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn reader() -> SentenceReader {
        SentenceReader::new(Arc::new(HandlerRegistry::standard()), NavState::new())
    }

    #[test]
    fn test_process_line() {
        let reader = reader();

        assert_eq!(reader.process_line(GGA.as_bytes()), Some(Dispatch::Applied));
        assert_eq!(reader.process_line(b"$GPGSV,3,1,12,01,40,083,46*44"), Some(Dispatch::Unhandled));
        assert_eq!(reader.process_line(b"$GPGGA,123519*00"), None);
        assert_eq!(reader.process_line(b""), None);
        assert!(matches!(
            reader.process_line(b"$GPGGA,123519,,,,,0,00,,,M,,M,,*6B"),
            Some(Dispatch::Rejected(FieldError::Missing("latitude")))
        ));

        let nav = reader.state.snapshot();
        assert_eq!(nav.valid_sentences, 3);
        assert_eq!(nav.rejected_lines, 1);
        assert_eq!(nav.raw_data, "$GPGGA,123519,,,,,0,00,,,M,,M,,*6B");
        assert_eq!(nav.fix_time_secs, Some(45319));
    }

    #[test]
    fn test_leading_whitespace_is_rejected() {
        let reader = reader();

        assert_eq!(reader.process_line(format!(" {}", GGA).as_bytes()), None);
        assert_eq!(reader.process_line(b"   "), None);

        let nav = reader.state.snapshot();
        assert_eq!(nav.valid_sentences, 0);
        assert_eq!(nav.rejected_lines, 2);
        assert_eq!(nav.fix_time_secs, None);
    }

    #[tokio::test]
    async fn test_non_utf8_sentence_is_accepted() {
        let reader = reader();
        let (link, mut peer) = tokio::io::duplex(4096);
        let (_tx, rx) = watch::channel(false);

        peer.write_all(&frame(b"PGRMT,GPS 18x,T,25\xb0C")).await.unwrap();
        drop(peer);

        let result = reader.run(link, "/dev/ttyUSB0@9600", rx).await;

        assert!(matches!(result, Err(GpsError::Disconnected(_))));
        let nav = reader.state.snapshot();
        assert_eq!(nav.valid_sentences, 1);
        assert_eq!(nav.rejected_lines, 0);
    }

    #[tokio::test]
    async fn test_overlong_line_is_counted() {
        let reader = reader();
        let (link, mut peer) = tokio::io::duplex(64 * 1024);
        let (_tx, rx) = watch::channel(false);

        let mut input = vec![b'7'; 4 * MAX_LINE_LEN];
        input.extend_from_slice(format!("\r\n{}\r\n", GGA).as_bytes());
        peer.write_all(&input).await.unwrap();
        drop(peer);

        let result = reader.run(link, "/dev/ttyUSB0@4800", rx).await;

        assert!(matches!(result, Err(GpsError::Disconnected(_))));
        let nav = reader.state.snapshot();
        assert_eq!(nav.valid_sentences, 1);
        assert_eq!(nav.rejected_lines, 1);
        assert!(nav.has_fix());
    }

    #[tokio::test]
    async fn test_run_until_disconnect() {
        let reader = reader();
        let (link, mut peer) = tokio::io::duplex(4096);
        let (_tx, rx) = watch::channel(false);

        let input = format!("{}\r\n$GPGGA,garbage*00\r\n\r\n{}\r\n", GGA, RMC);
        peer.write_all(input.as_bytes()).await.unwrap();
        drop(peer);

        let result = reader.run(link, "/dev/ttyUSB0@9600", rx).await;

        assert!(matches!(result, Err(GpsError::Disconnected(ref name)) if name == "/dev/ttyUSB0@9600"));
        let nav = reader.state.snapshot();
        assert_eq!(nav.valid_sentences, 2);
        assert_eq!(nav.rejected_lines, 1);
        assert_eq!(nav.ground_speed, Some(22.4));
        assert!(nav.has_fix());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_waiting_for_line() {
        let reader = reader();
        let (link, _peer) = tokio::io::duplex(4096);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let reader = reader.clone();
            async move { reader.run(link, "/dev/ttyAMA0@38400", rx).await }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_spawn_reader_open_failure() {
        let transport = FakeTransport::new().script("/dev/ttyUSB0", 9600, Script::Missing);
        let (_tx, rx) = watch::channel(false);

        let result = spawn_reader(&transport, &LinkCandidate::new("/dev/ttyUSB0", 9600), reader(), rx);
        assert!(matches!(result, Err(GpsError::TransportOpen { .. })));
    }

    #[tokio::test]
    async fn test_spawn_reader_updates_shared_state() {
        let input = format!("{}\r\n", GGA).into_bytes();
        let transport = FakeTransport::new().script("/dev/ttyUSB0", 38400, Script::EmitThenHangUp(input));
        let reader = reader();
        let state = reader.state.clone();
        let (_tx, rx) = watch::channel(false);

        let handle = spawn_reader(&transport, &LinkCandidate::new("/dev/ttyUSB0", 38400), reader, rx).unwrap();
        let result = handle.await.unwrap();

        assert!(matches!(result, Err(GpsError::Disconnected(_))));
        let nav = state.snapshot();
        assert_eq!(nav.link.as_deref(), Some("/dev/ttyUSB0@38400"));
        assert_eq!(nav.fix_time_secs, Some(45319));
    }
}
