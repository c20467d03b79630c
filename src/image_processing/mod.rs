pub mod batch;
pub mod convert;
pub mod naming;
pub mod quantize;
pub mod resize;

use image::ImageReader;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use batch::{BatchError, BatchOutcome, BatchRequest, WorkItem};

/// Palette cap for 8-bit indexed output
pub const MAX_PALETTE_COLORS: usize = 256;

/// Exact output dimensions requested for a batch. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TargetSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT` (the separator is case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let parts: Vec<&str> = lowered.split('x').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid size format '{}'. Use WIDTHxHEIGHT (e.g., 140x200)",
                s
            ));
        }

        let width = parts[0]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid width: '{}'", parts[0]))?;
        let height = parts[1]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid height: '{}'", parts[1]))?;

        Self::new(width, height).ok_or_else(|| "Width and height must be greater than 0".to_string())
    }
}

/// Why a single file could not be converted. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unsupported dimensions: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("resize buffer error: {0}")]
    ResizeBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("codec panicked: {0}")]
    Panicked(String),
}

/// Per-file conversion step used by the batch coordinator.
///
/// Implementations must leave `output` either holding a complete PNG or absent.
pub trait ImageTransformer: Send + Sync {
    fn transform(
        &self,
        source: &Path,
        output: &Path,
        target_size: Option<TargetSize>,
    ) -> Result<(), TransformError>;
}

/// Decode, optionally resize, reduce to an adaptive 256-color palette and write an indexed PNG
#[derive(Debug, Default, Clone, Copy)]
pub struct PngTransformer;

impl ImageTransformer for PngTransformer {
    fn transform(
        &self,
        source: &Path,
        output: &Path,
        target_size: Option<TargetSize>,
    ) -> Result<(), TransformError> {
        // Format comes from the content, not the extension
        let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
        let rgba = img.to_rgba8();

        let rgba = match target_size {
            Some(size) => resize::resize_exact(rgba, size)?,
            None => rgba,
        };

        let indexed = quantize::quantize(&rgba, MAX_PALETTE_COLORS);
        convert::write_png_atomically(&indexed, output)
    }
}
