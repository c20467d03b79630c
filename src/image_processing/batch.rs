//! Batch coordination: enumerate eligible files, run them through a bounded
//! worker pool and account for every file as processed, failed or skipped.

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;
use walkdir::WalkDir;

use super::{naming, ImageTransformer, PngTransformer, TargetSize, TransformError};
use crate::cancel::CancellationFlag;
use crate::report::{emit, Level, Reporter};
use crate::utils::has_valid_extension;

/// Hard cap on concurrent transforms
pub const MAX_WORKERS: usize = 8;

/// Extensions (lowercase) that make a directory entry eligible
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub const SUMMARY_COMPLETE: &str = "Processing complete.";
pub const SUMMARY_ABORTED: &str = "Processing aborted by user.";

/// Parameters of one batch. Immutable once the batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub suffix: String,
    pub target_size: Option<TargetSize>,
}

/// One eligible input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source_filename: String,
    pub source_path: PathBuf,
}

/// Per-file accounting for a finished (or aborted) batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Cancellation was observed before every file had been dispatched
    pub aborted: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.processed + self.failed + self.skipped
    }

    /// Files that reached success or failure
    pub fn finished(&self) -> usize {
        self.processed + self.failed
    }

    fn record(&mut self, result: &FileResult) {
        match result {
            FileResult::Processed => self.processed += 1,
            FileResult::Failed => self.failed += 1,
        }
    }

    pub fn summary_line(&self) -> &'static str {
        if self.aborted {
            SUMMARY_ABORTED
        } else {
            SUMMARY_COMPLETE
        }
    }
}

/// Errors that stop a batch before any work is scheduled
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Input folder does not exist or is not a directory: {}", .0.display())]
    InputFolder(PathBuf),

    #[error("Cannot create output folder {}: {source}", .path.display())]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input folder {}: {source}", .path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

enum FileResult {
    Processed,
    Failed,
}

/// Workers for a batch of `items` files: never more than files, never more than [`MAX_WORKERS`]
pub fn worker_count(items: usize) -> usize {
    items.min(MAX_WORKERS)
}

/// List eligible images directly inside `input_dir`, sorted by filename.
///
/// Only a failure to read `input_dir` itself is an error. An entry that cannot
/// be inspected (dangling symlink, loop, no permission) is kept as a work item
/// when its name is eligible, so it fails on its own, and dropped otherwise.
pub fn discover_work_items(input_dir: &Path) -> Result<Vec<WorkItem>, BatchError> {
    let mut items = Vec::new();

    let walker = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(BatchError::Enumerate {
                    path: input_dir.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                if let Some(path) = e.path().filter(|p| has_valid_extension(p, &IMAGE_EXTENSIONS)) {
                    items.push(work_item(path));
                } else {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                }
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && has_valid_extension(path, &IMAGE_EXTENSIONS) {
            items.push(work_item(path));
        }
    }

    items.sort_by(|a, b| a.source_filename.cmp(&b.source_filename));
    Ok(items)
}

fn work_item(path: &Path) -> WorkItem {
    WorkItem {
        source_filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source_path: path.to_path_buf(),
    }
}

/// Run a batch with the PNG transformer
pub fn run(
    request: &BatchRequest,
    cancel: &CancellationFlag,
    reporter: &dyn Reporter,
) -> Result<BatchOutcome, BatchError> {
    run_with(request, cancel, reporter, &PngTransformer)
}

/// Run a batch with any transformer.
///
/// The calling thread is the sole submitter. It checks `cancel` right before
/// dispatching each file; once the flag is seen, nothing else is dispatched and
/// the remainder is counted as skipped. In-flight transforms are never
/// interrupted. Every per-file line is reported before the summary line.
pub fn run_with(
    request: &BatchRequest,
    cancel: &CancellationFlag,
    reporter: &dyn Reporter,
    transformer: &dyn ImageTransformer,
) -> Result<BatchOutcome, BatchError> {
    let start_time = Instant::now();

    emit(reporter, Level::Info, format!("Input folder: {}", request.input_dir.display()));
    emit(reporter, Level::Info, format!("Output folder: {}", request.output_dir.display()));
    emit(reporter, Level::Info, format!("Resize to: {}", size_label(request.target_size)));

    if let Err(e) = prepare_folders(request, reporter) {
        emit(reporter, Level::Error, e.to_string());
        return Err(e);
    }

    let items = match discover_work_items(&request.input_dir) {
        Ok(items) => items,
        Err(e) => {
            emit(reporter, Level::Error, e.to_string());
            return Err(e);
        }
    };

    let mut outcome = BatchOutcome::default();

    if items.is_empty() {
        emit(reporter, Level::Warn, "No images found in input folder.");
        return Ok(finish(outcome, start_time, reporter));
    }

    let workers = worker_count(items.len());
    emit(
        reporter,
        Level::Debug,
        format!("Found {} images, using {} workers", items.len(), workers),
    );

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("artwork-worker-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            let e = BatchError::from(e);
            emit(reporter, Level::Error, e.to_string());
            return Err(e);
        }
    };

    let total = items.len();

    pool.in_place_scope(|scope| {
        let (tx, rx) = mpsc::channel::<FileResult>();
        let mut in_flight = 0usize;

        for (index, item) in items.iter().enumerate() {
            // Wait for a free worker before deciding whether to dispatch
            if in_flight == workers {
                if let Ok(result) = rx.recv() {
                    in_flight -= 1;
                    outcome.record(&result);
                    reporter.progress(outcome.finished(), total);
                }
            }

            if cancel.is_cancelled() {
                outcome.skipped = total - index;
                outcome.aborted = true;
                emit(
                    reporter,
                    Level::Warn,
                    format!("Cancellation requested, skipping {} remaining images", outcome.skipped),
                );
                break;
            }

            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = process_work_item(item, request, reporter, transformer);
                // The receiver outlives every worker in this scope
                let _ = tx.send(result);
            });
            in_flight += 1;
        }

        drop(tx);
        for result in rx.iter().take(in_flight) {
            outcome.record(&result);
            reporter.progress(outcome.finished(), total);
        }
    });

    Ok(finish(outcome, start_time, reporter))
}

/// Validate the input folder and create the output folder if needed
fn prepare_folders(request: &BatchRequest, reporter: &dyn Reporter) -> Result<(), BatchError> {
    if !request.input_dir.is_dir() {
        return Err(BatchError::InputFolder(request.input_dir.clone()));
    }

    if !request.output_dir.is_dir() {
        std::fs::create_dir_all(&request.output_dir).map_err(|source| {
            BatchError::OutputFolder {
                path: request.output_dir.clone(),
                source,
            }
        })?;
        emit(
            reporter,
            Level::Info,
            format!("Created output folder: {}", request.output_dir.display()),
        );
    }

    Ok(())
}

/// Name, transform and report one file. Never panics out of the worker.
fn process_work_item(
    item: &WorkItem,
    request: &BatchRequest,
    reporter: &dyn Reporter,
    transformer: &dyn ImageTransformer,
) -> FileResult {
    let output_filename = naming::resolve(&item.source_filename, &request.suffix);
    let output_path = request.output_dir.join(&output_filename);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        transformer.transform(&item.source_path, &output_path, request.target_size)
    }))
    .unwrap_or_else(|payload| Err(TransformError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(()) => {
            emit(
                reporter,
                Level::Info,
                format!(
                    "Processed {} -> {} (Size: {})",
                    item.source_filename,
                    output_filename,
                    size_label(request.target_size)
                ),
            );
            FileResult::Processed
        }
        Err(e) => {
            emit(
                reporter,
                Level::Error,
                format!("Failed to process {}: {}", item.source_filename, e),
            );
            FileResult::Failed
        }
    }
}

fn finish(mut outcome: BatchOutcome, start_time: Instant, reporter: &dyn Reporter) -> BatchOutcome {
    outcome.elapsed = start_time.elapsed();
    emit(reporter, Level::Info, outcome.summary_line());
    reporter.finished(&outcome);
    outcome
}

fn size_label(size: Option<TargetSize>) -> String {
    match size {
        Some(size) => size.to_string(),
        None => "Original Size".to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
