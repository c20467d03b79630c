//! Persisted audit log: every reported line, appended with timestamp and severity

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILE: &str = "LOG.TXT";

/// Open `path` for appending, creating it if needed
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Subscriber writing plain-text records to `file`. `RUST_LOG` overrides the default `info` level.
pub fn file_subscriber(file: File) -> impl Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false),
    )
}

/// Install the file logger as the global subscriber
pub fn init(log_file: &Path) -> Result<()> {
    let file = open_log_file(log_file)
        .with_context(|| format!("Cannot open log file {}", log_file.display()))?;

    file_subscriber(file)
        .try_init()
        .context("Logging already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_records_carry_level_and_message() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_LOG_FILE);
        let subscriber = file_subscriber(open_log_file(&path).unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Processed a.png -> a_mod.png (Size: Original Size)");
            tracing::error!("Failed to process b.png: bad");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].ends_with("Processed a.png -> a_mod.png (Size: Original Size)"));
        assert!(lines[1].contains("ERROR"));
        assert!(!contents.contains('\u{1b}'));
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let subscriber = file_subscriber(open_log_file(&path).unwrap());
        tracing::subscriber::with_default(subscriber, || tracing::warn!("second run"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier run\n"));
        assert!(contents.contains("second run"));
    }

    #[test]
    fn test_init_reports_unopenable_path() {
        let dir = TempDir::new().unwrap();
        let result = init(&dir.path().join("missing").join("LOG.TXT"));
        assert!(result.is_err());
    }
}
