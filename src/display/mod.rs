// src/display/mod.rs
//! Display modules: consumers that periodically read the navigation state

pub mod terminal;

use crate::{error::Result, gps::NavState};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub use terminal::TerminalDisplay;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// How snapshots are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Terminal,
    Log,
}

/// Show the state until `shutdown` turns true
pub async fn run_display(
    mode: DisplayMode,
    state: NavState,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    match mode {
        DisplayMode::Terminal => TerminalDisplay::new().run(state, shutdown).await,
        DisplayMode::Log => {
            log_snapshots(state, shutdown).await;
            Ok(())
        }
    }
}

/// One log line per refresh interval
async fn log_snapshots(state: NavState, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);

    while !*shutdown.borrow() {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let nav = state.snapshot();
        if nav.has_fix() {
            info!(
                time = %nav.fix_time_description(),
                lat = nav.latitude,
                lon = nav.longitude,
                age = nav.age_seconds(),
                fix = %nav.fix_description(),
                "position"
            );
        } else {
            info!(sentences = nav.valid_sentences, rejected = nav.rejected_lines, "waiting for fix");
        }
    }
}
