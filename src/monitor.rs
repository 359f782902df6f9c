// src/monitor.rs
//! Main GPS monitor coordination

use crate::{
    config::GpsConfig,
    error::Result,
    gps::{HandlerRegistry, NavState, Navigation},
    link::{reader, LinkCandidate, Negotiator, SentenceReader, SerialTransport, Transport},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

/// Finds the receiver, starts the reader and owns the shared state
pub struct GpsMonitor<T = SerialTransport> {
    config: GpsConfig,
    negotiator: Negotiator<T>,
    registry: Arc<HandlerRegistry>,
    state: NavState,
    shutdown: watch::Sender<bool>,
    /// A reader was spawned and not yet told to stop
    running: AtomicBool,
}

impl GpsMonitor<SerialTransport> {
    /// Create a new GPS monitor on the system's serial ports
    pub fn new(config: GpsConfig) -> Self {
        Self::with_transport(SerialTransport, config)
    }
}

impl<T: Transport> GpsMonitor<T> {
    pub fn with_transport(transport: T, config: GpsConfig) -> Self {
        let negotiator = Negotiator::new(transport).with_timeout(config.detect_timeout());
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            negotiator,
            registry: Arc::new(HandlerRegistry::standard()),
            state: NavState::new(),
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Replace the handler table used by readers started afterwards
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Sweep the configured candidates, switch to the preferred rate when
    /// possible and start the background reader.
    ///
    /// `Ok(None)` means no receiver answered on any candidate.
    pub async fn start(&self) -> Result<Option<(LinkCandidate, JoinHandle<Result<()>>)>> {
        let candidates = self.config.candidates();
        info!(candidates = candidates.len(), "searching for GPS");

        let Some(link) = self
            .negotiator
            .establish(&candidates, self.config.preferred_baud)
            .await
        else {
            warn!("couldn't find a GPS receiver on any configured port");
            return Ok(None);
        };

        self.shutdown.send_replace(false);
        let reader = SentenceReader::new(Arc::clone(&self.registry), self.state.clone());
        let handle = reader::spawn_reader(
            self.negotiator.transport(),
            &link,
            reader,
            self.shutdown.subscribe(),
        )?;
        self.running.store(true, Ordering::SeqCst);

        Ok(Some((link, handle)))
    }

    /// Signal running readers to stop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }

    /// True between a `start` that spawned a reader and the next `stop`
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Watch for [`GpsMonitor::stop`]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Handle to the shared state, for consumers
    pub fn state(&self) -> NavState {
        self.state.clone()
    }

    /// Get a copy of the current navigation data
    pub fn get_data(&self) -> Navigation {
        self.state.snapshot()
    }

    pub fn config(&self) -> &GpsConfig {
        &self.config
    }
}
