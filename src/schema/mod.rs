//! Schema module - Configuration and report types for triangle evolution.

mod config;
mod genome;
mod progress;

pub use config::*;
pub use genome::*;
pub use progress::*;
