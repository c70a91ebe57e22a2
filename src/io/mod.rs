//! I/O collaborators of the solver: target images in, per-generation results out.

mod image_source;
mod sink;

pub use image_source::{FileImageSource, ImageError, ImageSource, save_png};
pub use sink::{LogSink, ResultSink, SnapshotSink};
