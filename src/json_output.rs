//! JSON output for GUI integration
//!
//! When --json-progress flag is enabled, every report line, progress update
//! and the final summary are emitted as JSON lines to stdout, suppressing all
//! other output.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::image_processing::BatchOutcome;
use crate::report::{Level, Reporter};

/// Minimum gap between progress messages (~25 updates per second)
const PROGRESS_INTERVAL_MS: u64 = 40;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// One report line
    Log { level: Level, message: String },
    /// Progress update
    Progress { current: usize, total: usize },
    /// Processing summary
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        skipped: usize,
        aborted: bool,
        duration_secs: f64,
    },
}

impl JsonMessage {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_json() {
            println!("{}", json);
        }
    }

    pub fn summary(outcome: &BatchOutcome) -> Self {
        Self::Summary {
            total_files: outcome.total(),
            processed: outcome.processed,
            failed: outcome.failed,
            skipped: outcome.skipped,
            aborted: outcome.aborted,
            duration_secs: outcome.elapsed.as_secs_f64(),
        }
    }
}

/// Reporter that speaks JSON lines
#[derive(Debug, Default)]
pub struct JsonReporter {
    /// Last progress emission timestamp (milliseconds since epoch)
    last_progress_ms: AtomicU64,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Throttle check. The final update (current == total) always passes.
    fn should_emit_progress(&self, now_ms: u64, current: usize, total: usize) -> bool {
        let last_ms = self.last_progress_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last_ms) >= PROGRESS_INTERVAL_MS || current == total {
            self.last_progress_ms.store(now_ms, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

impl Reporter for JsonReporter {
    fn line(&self, level: Level, message: &str) {
        JsonMessage::Log {
            level,
            message: message.to_string(),
        }
        .emit();
    }

    fn progress(&self, completed: usize, total: usize) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        if self.should_emit_progress(now_ms, completed, total) {
            JsonMessage::Progress {
                current: completed,
                total,
            }
            .emit();
        }
    }

    fn finished(&self, outcome: &BatchOutcome) {
        JsonMessage::summary(outcome).emit();
    }
}
