// Library exports for reuse by GUI and other front ends
pub mod cancel;
pub mod cli;
pub mod image_processing;
pub mod json_output;
pub mod logging;
pub mod report;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use cancel::CancellationFlag;
pub use image_processing::{
    BatchError, BatchOutcome, BatchRequest, ImageTransformer, PngTransformer, TargetSize,
    TransformError, WorkItem,
};
pub use json_output::JsonReporter;
pub use report::{BatchEvent, ChannelReporter, ConsoleReporter, Level, Reporter};
pub use session::BatchSession;
