//! Status reporting for a cloning run.
//!
//! The localizer only ever pushes messages into a [`ProgressSink`]; nothing it
//! does depends on what the sink shows or how long it takes to show it.

use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Final annotation for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Error(String),
}

#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink {
    fn on_progress(&self, message: &str);

    fn on_finish(&self, outcome: Outcome) {
        let _ = outcome;
    }
}

/// Animated terminal spinner; indicatif ticks it from a background thread.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn on_progress(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_finish(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success(message) => self.bar.finish_with_message(format!("✅ {}", message.green())),
            Outcome::Error(message) => self.bar.abandon_with_message(format!("❌ {}", message.red())),
        }
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Writes every status message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_finish(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success(message) => log::info!("{}", message),
            Outcome::Error(message) => log::error!("{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn on_progress(&self, _message: &str) {}
}
