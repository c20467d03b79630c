//! Per-batch cancellation flag and the OS interrupt hook that sets it

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::report::{emit, Level, Reporter};

pub const INTERRUPT_MESSAGE: &str = "Shutdown signal received. Finishing in-flight images...";
pub const FORCED_EXIT_MESSAGE: &str = "Second shutdown signal received. Exiting now.";

/// What the process should do about an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Stop dispatching and let in-flight images finish
    WindDown,
    /// Already winding down; leave immediately
    Exit,
}

/// One-way Active -> Cancelled switch shared between the coordinator and whoever aborts it.
///
/// Clones share state. Each batch gets its own flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancel `flag` when the process receives Ctrl-C.
///
/// The listener lives on a detached thread for the rest of the process. The
/// first interrupt winds the batch down; a second one exits with status 0.
pub fn cancel_on_interrupt(flag: CancellationFlag, reporter: Arc<dyn Reporter>) -> Result<()> {
    // Build here so setup failures surface to the caller
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if tokio::signal::ctrl_c().await.is_err() {
                        tracing::warn!("Interrupt listener unavailable");
                        return;
                    }
                    if on_interrupt(&flag, reporter.as_ref()) == InterruptAction::Exit {
                        std::process::exit(0);
                    }
                }
            })
        })
        .context("Failed to spawn interrupt listener")?;

    Ok(())
}

/// Handle one interrupt: the first cancels `flag`, any later one asks for exit
pub fn on_interrupt(flag: &CancellationFlag, reporter: &dyn Reporter) -> InterruptAction {
    if flag.cancel() {
        emit(reporter, Level::Warn, INTERRUPT_MESSAGE);
        InterruptAction::WindDown
    } else {
        emit(reporter, Level::Warn, FORCED_EXIT_MESSAGE);
        InterruptAction::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingReporter {
        lines: Mutex<Vec<String>>,
    }

    impl Reporter for CollectingReporter {
        fn line(&self, _level: Level, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_first_interrupt_winds_down() {
        let flag = CancellationFlag::new();
        let reporter = CollectingReporter::default();

        assert_eq!(on_interrupt(&flag, &reporter), InterruptAction::WindDown);
        assert!(flag.is_cancelled());
        assert_eq!(*reporter.lines.lock().unwrap(), vec![INTERRUPT_MESSAGE.to_string()]);
    }

    #[test]
    fn test_repeated_interrupt_exits() {
        let flag = CancellationFlag::new();
        let reporter = CollectingReporter::default();

        on_interrupt(&flag, &reporter);
        assert_eq!(on_interrupt(&flag, &reporter), InterruptAction::Exit);
        assert_eq!(on_interrupt(&flag, &reporter), InterruptAction::Exit);
        assert_eq!(
            reporter.lines.lock().unwrap().last().map(String::as_str),
            Some(FORCED_EXIT_MESSAGE)
        );
    }

    #[test]
    fn test_flag_starts_active() {
        assert!(!CancellationFlag::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let flag = CancellationFlag::new();
        assert!(flag.cancel());
        assert!(!flag.cancel());
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_fresh_flags_are_independent() {
        let first = CancellationFlag::new();
        first.cancel();
        assert!(!CancellationFlag::new().is_cancelled());
    }

    #[test]
    fn test_cancel_from_many_threads_transitions_once() {
        let flag = CancellationFlag::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flag = flag.clone();
                thread::spawn(move || flag.cancel())
            })
            .collect();

        let transitions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(transitions, 1);
    }
}
