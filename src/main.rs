use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::sync::Arc;

use opl_artwork_processor::cancel::{cancel_on_interrupt, CancellationFlag};
use opl_artwork_processor::cli::{Args, USAGE};
use opl_artwork_processor::image_processing::batch;
use opl_artwork_processor::json_output::JsonReporter;
use opl_artwork_processor::logging;
use opl_artwork_processor::report::{ConsoleReporter, Reporter};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => {
                    eprintln!("{}", USAGE);
                    ExitCode::from(1)
                }
            };
        }
    };

    if let Err(e) = logging::init(&args.log_file) {
        eprintln!("{} {:#}", style("Warning:").yellow().bold(), e);
    }

    let reporter: Arc<dyn Reporter> = if args.json_progress {
        Arc::new(JsonReporter::new())
    } else {
        println!("{}", style("OPL Artwork Processor").bold().blue());
        println!();
        Arc::new(ConsoleReporter::new(args.verbose))
    };

    let cancel = CancellationFlag::new();
    if let Err(e) = cancel_on_interrupt(cancel.clone(), Arc::clone(&reporter)) {
        // Still usable, just not interruptible
        tracing::warn!("{:#}", e);
        eprintln!("{} {:#}", style("Warning:").yellow().bold(), e);
    }

    // Configuration errors were already reported through the reporter
    match batch::run(&args.to_request(), &cancel, reporter.as_ref()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(1),
    }
}
