//! Background batch runs for interactive front ends.
//!
//! A front end starts a session, polls `try_events` from its UI loop and renders
//! lines in the order received. `abort` is safe to call at any time.

use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

use crate::cancel::CancellationFlag;
use crate::image_processing::{
    batch, BatchError, BatchOutcome, BatchRequest, ImageTransformer, PngTransformer,
};
use crate::report::{emit, BatchEvent, ChannelReporter, Level};

pub const ABORT_MESSAGE: &str = "Abort requested. Waiting for in-flight images to finish...";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Failed to start batch thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Batch thread panicked")]
    Panicked,
}

pub struct BatchSession {
    cancel: CancellationFlag,
    events: Receiver<BatchEvent>,
    reporter: ChannelReporter,
    handle: Option<JoinHandle<Result<BatchOutcome, BatchError>>>,
}

impl BatchSession {
    /// Start converting `request` on a background thread
    pub fn start(request: BatchRequest) -> Result<Self, SessionError> {
        Self::start_with(request, Arc::new(PngTransformer))
    }

    pub fn start_with(
        request: BatchRequest,
        transformer: Arc<dyn ImageTransformer>,
    ) -> Result<Self, SessionError> {
        let (tx, rx) = channel();
        let cancel = CancellationFlag::new();

        let worker_cancel = cancel.clone();
        let worker_reporter = ChannelReporter::new(tx.clone());
        let handle = thread::Builder::new()
            .name("artwork-batch".to_string())
            .spawn(move || {
                batch::run_with(
                    &request,
                    &worker_cancel,
                    &worker_reporter,
                    transformer.as_ref(),
                )
            })?;

        Ok(Self {
            cancel,
            events: rx,
            reporter: ChannelReporter::new(tx),
            handle: Some(handle),
        })
    }

    /// Stop dispatching new files. Returns `true` for the call that actually requested it;
    /// a batch that has already ended is left alone.
    pub fn abort(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let requested = self.cancel.cancel();
        if requested {
            emit(&self.reporter, Level::Warn, ABORT_MESSAGE);
        }
        requested
    }

    /// Drain pending events without blocking
    pub fn try_events(&self) -> Vec<BatchEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Block until the batch ends
    pub fn wait(mut self) -> Result<BatchOutcome, SessionError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => Ok(result?),
                Err(_) => Err(SessionError::Panicked),
            },
            None => Err(SessionError::Panicked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::{TargetSize, TransformError};
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Slow enough that an abort lands while the first wave is still running
    #[derive(Default)]
    struct SlowTransformer {
        calls: AtomicUsize,
    }

    impl ImageTransformer for SlowTransformer {
        fn transform(
            &self,
            _source: &Path,
            _output: &Path,
            _target_size: Option<TargetSize>,
        ) -> Result<(), TransformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(300));
            Ok(())
        }
    }

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]))
    }

    fn request_for(input: &Path, output: &Path) -> BatchRequest {
        BatchRequest {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            suffix: String::new(),
            target_size: None,
        }
    }

    fn messages(events: &[BatchEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Line(line) => Some(line.message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_session_runs_to_completion() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        create_test_image(12, 9).save(input.path().join("GN-05015.png")).unwrap();

        let session = BatchSession::start(request_for(input.path(), output.path())).unwrap();
        let outcome_events = {
            let deadline = Instant::now() + Duration::from_secs(30);
            let mut events = Vec::new();
            while !events.iter().any(|e| matches!(e, BatchEvent::Finished(_))) {
                assert!(Instant::now() < deadline, "session never finished");
                events.extend(session.try_events());
                thread::sleep(Duration::from_millis(5));
            }
            events
        };
        let outcome = session.wait().unwrap();

        assert_eq!(outcome.processed, 1);
        assert!(output.path().join("GN_050.15.png").exists());
        let lines = messages(&outcome_events);
        assert_eq!(lines.first().unwrap(), &format!("Input folder: {}", input.path().display()));
        assert_eq!(lines.last().unwrap(), batch::SUMMARY_COMPLETE);
        assert!(matches!(outcome_events.last(), Some(BatchEvent::Finished(o)) if *o == outcome));
    }

    #[test]
    fn test_session_abort_skips_remaining() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for i in 0..40 {
            std::fs::write(input.path().join(format!("cover{:02}.jpg", i)), b"").unwrap();
        }
        let transformer = Arc::new(SlowTransformer::default());

        let session =
            BatchSession::start_with(request_for(input.path(), output.path()), transformer.clone())
                .unwrap();
        thread::sleep(Duration::from_millis(100));

        assert!(session.abort());
        assert!(!session.abort());
        let outcome = session.wait().unwrap();

        let calls = transformer.calls.load(Ordering::SeqCst);
        assert!(outcome.aborted);
        assert_eq!(outcome.processed, calls);
        assert_eq!(outcome.skipped, 40 - calls);
        assert!(calls <= 2 * batch::MAX_WORKERS, "calls {}", calls);
    }

    #[test]
    fn test_abort_after_finish_is_ignored() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("cover.png"), b"").unwrap();
        let session = BatchSession::start_with(
            request_for(input.path(), output.path()),
            Arc::new(SlowTransformer::default()),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(30);
        while session.is_running() {
            assert!(Instant::now() < deadline, "session never finished");
            thread::sleep(Duration::from_millis(5));
        }

        assert!(!session.abort());
        let events = session.try_events();
        assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
        assert_eq!(messages(&events).last().unwrap(), batch::SUMMARY_COMPLETE);
        assert!(!session.wait().unwrap().aborted);
    }

    #[test]
    fn test_session_reports_missing_input_folder() {
        let scratch = TempDir::new().unwrap();
        let session = BatchSession::start(request_for(
            &scratch.path().join("missing"),
            &scratch.path().join("out"),
        ))
        .unwrap();

        let result = session.wait();
        assert!(matches!(
            result,
            Err(SessionError::Batch(BatchError::InputFolder(_)))
        ));
    }

    #[test]
    fn test_session_stops_running_when_batch_ends() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let session = BatchSession::start(request_for(input.path(), output.path())).unwrap();

        let deadline = Instant::now() + Duration::from_secs(30);
        while session.is_running() {
            assert!(Instant::now() < deadline, "session never finished");
            thread::sleep(Duration::from_millis(5));
        }
        let lines = messages(&session.try_events());
        assert!(lines.iter().any(|l| l.starts_with("No images found")));
        assert_eq!(session.wait().unwrap().total(), 0);
    }
}
