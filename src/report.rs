//! Reporter capability: how the batch tells a front end what happened.
//!
//! The coordinator only ever talks to `&dyn Reporter`; the CLI, the JSON
//! stream, interactive sessions and tests each plug in their own.

use console::style;
use indicatif::ProgressBar;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::Sender;

use crate::image_processing::BatchOutcome;
use crate::utils::{create_progress_bar, format_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARNING",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A single human-readable report line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub level: Level,
    pub message: String,
}

pub trait Reporter: Send + Sync {
    fn line(&self, level: Level, message: &str);

    fn progress(&self, _completed: usize, _total: usize) {}

    /// Called exactly once when a batch that started has finished or been aborted
    fn finished(&self, _outcome: &BatchOutcome) {}
}

/// Record a line in the log and hand it to the reporter
pub fn emit(reporter: &dyn Reporter, level: Level, message: impl AsRef<str>) {
    let message = message.as_ref();
    match level {
        Level::Debug => tracing::debug!("{}", message),
        Level::Info => tracing::info!("{}", message),
        Level::Warn => tracing::warn!("{}", message),
        Level::Error => tracing::error!("{}", message),
    }
    reporter.line(level, message);
}

/// Styled terminal output with a progress bar underneath
pub struct ConsoleReporter {
    verbose: bool,
    bar: OnceCell<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            bar: OnceCell::new(),
        }
    }

    /// Styled text for a line, or `None` when it is filtered out
    fn render(&self, level: Level, message: &str) -> Option<String> {
        let text = match level {
            Level::Debug if !self.verbose => return None,
            Level::Debug => style(message).dim().to_string(),
            Level::Info => message.to_string(),
            Level::Warn => style(message).yellow().to_string(),
            Level::Error => style(message).red().to_string(),
        };
        Some(text)
    }

    fn print(&self, text: String) {
        match self.bar.get() {
            Some(bar) => bar.suspend(|| println!("{}", text)),
            None => println!("{}", text),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn line(&self, level: Level, message: &str) {
        if let Some(text) = self.render(level, message) {
            self.print(text);
        }
    }

    fn progress(&self, completed: usize, total: usize) {
        let bar = self.bar.get_or_init(|| create_progress_bar(total as u64));
        bar.set_position(completed as u64);
    }

    fn finished(&self, outcome: &BatchOutcome) {
        if let Some(bar) = self.bar.get() {
            bar.finish_and_clear();
        }

        if !self.verbose {
            return;
        }

        println!();
        let header = if outcome.aborted {
            style("Results Summary (aborted):").bold().yellow()
        } else {
            style("Results Summary:").bold().green()
        };
        println!("{}", header);
        println!(
            "  Successfully processed: {}",
            style(outcome.processed).bold().green()
        );
        if outcome.failed > 0 {
            println!("  Failed: {}", style(outcome.failed).bold().red());
        }
        if outcome.skipped > 0 {
            println!("  Skipped: {}", style(outcome.skipped).bold().yellow());
        }
        println!("  Total time: {}", format_duration(outcome.elapsed));
    }
}

/// Events delivered to an interactive front end, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Line(ReportLine),
    Progress { completed: usize, total: usize },
    Finished(BatchOutcome),
}

/// Forwards everything over a channel. A disconnected receiver is ignored.
pub struct ChannelReporter {
    sender: Sender<BatchEvent>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<BatchEvent>) -> Self {
        Self { sender }
    }
}

impl Reporter for ChannelReporter {
    fn line(&self, level: Level, message: &str) {
        let _ = self.sender.send(BatchEvent::Line(ReportLine {
            level,
            message: message.to_string(),
        }));
    }

    fn progress(&self, completed: usize, total: usize) {
        let _ = self.sender.send(BatchEvent::Progress { completed, total });
    }

    fn finished(&self, outcome: &BatchOutcome) {
        let _ = self.sender.send(BatchEvent::Finished(outcome.clone()));
    }
}
