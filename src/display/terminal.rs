// src/display/terminal.rs
//! Terminal-based display implementation

use super::REFRESH_INTERVAL;
use crate::{
    error::Result,
    gps::{NavState, Navigation},
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::io::{self, Write};
use tokio::sync::watch;

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Redraw once per refresh interval until `shutdown` turns true
    pub async fn run(&self, state: NavState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap)?;

        let mut interval = tokio::time::interval(REFRESH_INTERVAL);
        while !*shutdown.borrow() {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

            // Copy out under the lock, render without it
            let nav = state.snapshot();
            self.render(&mut stdout, &nav)?;
            stdout.flush()?;

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        execute!(stdout, Show, EnableLineWrap)?;
        println!("\nShutting down...");
        Ok(())
    }

    /// Render the navigation data to the terminal
    fn render(&self, out: &mut impl Write, nav: &Navigation) -> Result<()> {
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nGPS Link\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )?;

        let link = nav.link.as_deref().unwrap_or("not connected");
        let age = match nav.age_seconds() {
            Some(age) => format!("{}s ago", age),
            None => "no fix received".to_string(),
        };
        execute!(out, Print(format!("Link: {}   Last fix: {}\n\n", link, age)))?;

        self.section(out, Color::Yellow, "POSITION:")?;
        execute!(
            out,
            Print(format!("  Time:      {:>13}\n", nav.fix_time_description())),
            Print(format!("  Latitude:  {}\n", Navigation::format_coordinate(nav.latitude))),
            Print(format!("  Longitude: {}\n", Navigation::format_coordinate(nav.longitude))),
            Print(format!("  Altitude:  {}\n\n", Navigation::format_value(nav.altitude, "m")))
        )?;

        self.section(out, Color::Cyan, "MOVEMENT:")?;
        execute!(
            out,
            Print(format!("  Speed:     {}\n", Navigation::format_value(nav.ground_speed, "kn"))),
            Print(format!("  Course:    {}\n\n", Navigation::format_value(nav.true_course, "°")))
        )?;

        self.section(out, Color::Magenta, "QUALITY:")?;
        execute!(
            out,
            Print(format!("  Satellites: {}\n", Navigation::format_value(nav.satellites, ""))),
            Print(format!("  HDOP:       {}\n", Navigation::format_value(nav.hdop, ""))),
            Print(format!("  Fix Type:   {:>11}\n", nav.fix_description())),
            Print(format!(
                "  Sentences:  {:>11} ok, {} rejected\n\n",
                nav.valid_sentences, nav.rejected_lines
            ))
        )?;

        self.section(out, Color::Blue, "RAW DATA:")?;
        for line in &nav.raw_history {
            execute!(out, Print(format!("  {}\n", line)))?;
        }
        if nav.raw_history.is_empty() {
            execute!(out, Print("  No data\n"))?;
        }

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nPress Ctrl+C to exit\n"),
            ResetColor
        )?;

        Ok(())
    }

    fn section(&self, out: &mut impl Write, color: Color, title: &str) -> Result<()> {
        execute!(out, SetForegroundColor(color), Print(title), Print("\n"), ResetColor)?;
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
