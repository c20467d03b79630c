use clap::Parser;
use std::path::PathBuf;

use crate::image_processing::{BatchRequest, TargetSize};

/// One-line usage shown after argument errors
pub const USAGE: &str =
    "Usage: opl-artwork-processor <path/to/artfolder/> <path/to/outputfolder/> <suffix> <width>x<height>";

#[derive(Parser, Debug)]
#[command(
    name = "opl-artwork-processor",
    version,
    about = "Batch converter for Open PS2 Loader artwork",
    long_about = "
OPL Artwork Processor

Converts every JPG/PNG in a folder into an 8-bit palette PNG for Open PS2 Loader,
optionally resized to an exact size, and renames product-coded files on the way:

  ALCH-00001.jpg   -> ALCH_000.01<suffix>.png
  SLES-51046-P.png -> SLES_510.46-P<suffix>.png
  anything.png     -> anything<suffix>.png

Up to 8 images are converted in parallel. Ctrl-C stops handing out new images
and lets the ones already running finish; a second Ctrl-C exits at once.

A suffix or size that looks like one of this tool's options (-v, -h, -V,
--verbose, ...) is read as that option. Put -- before the positional
arguments to pass it literally.

Example Usage:
  # Resize covers to 140x200 and tag them with _COV
  opl-artwork-processor ~/art ~/OPL/ART _COV 140x200

  # Keep original size, no suffix
  opl-artwork-processor ~/art ~/OPL/ART \"\"

  # Suffix that starts with a hyphen
  opl-artwork-processor -- ~/art ~/OPL/ART -v 140x200

  # JSON lines on stdout for GUI integration
  opl-artwork-processor ~/art ~/OPL/ART _BG 640x480 --json-progress"
)]
pub struct Args {
    /// Folder containing the source artwork
    #[arg(value_name = "INPUT_FOLDER")]
    pub input_dir: PathBuf,

    /// Folder for converted images (created if missing)
    #[arg(value_name = "OUTPUT_FOLDER")]
    pub output_dir: PathBuf,

    /// Text appended to every output name before .png (may be empty)
    #[arg(value_name = "SUFFIX", allow_hyphen_values = true)]
    pub suffix: String,

    /// Exact output size (format: WIDTHxHEIGHT, e.g., 140x200); invalid or missing keeps the original size
    #[arg(value_name = "WIDTHxHEIGHT", allow_hyphen_values = true)]
    pub size: Option<String>,

    /// Append log records to this file
    #[arg(long = "log-file", value_name = "FILE", default_value = "LOG.TXT")]
    pub log_file: PathBuf,

    /// Output progress as JSON lines (for GUI integration)
    #[arg(long = "json-progress", default_value_t = false)]
    pub json_progress: bool,

    /// Show debug lines and a results summary
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Requested output size; `None` means keep each image's own size
    pub fn target_size(&self) -> Option<TargetSize> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn to_request(&self) -> BatchRequest {
        BatchRequest {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            suffix: self.suffix.clone(),
            target_size: self.target_size(),
        }
    }
}
