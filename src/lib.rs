//! tri-evolve - Approximate images with evolved populations of translucent triangles.
//!
//! A population of candidate images, each a fixed-length list of coloured
//! triangles, is rendered, scored against a target image by mean squared
//! pixel error, and bred generation by generation with pluggable selection
//! and crossover strategies.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types, genome value types and run reports
//! - `compute`: Frames, rasterizers and the evolutionary core
//! - `io`: Image loading/saving and per-generation result sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use tri_evolve::{
//!     compute::{CpuRenderer, evolution::Solver},
//!     io::{FileImageSource, ImageSource, LogSink},
//!     schema::{RunLimits, SolverConfig},
//! };
//!
//! let target = FileImageSource::with_max_dimension(128)
//!     .load(Path::new("mona_lisa.png"))
//!     .unwrap();
//!
//! let config = SolverConfig::default();
//! let renderer = CpuRenderer::new(config.background);
//! let mut solver = Solver::new(config, Arc::new(target), renderer).unwrap();
//!
//! let limits = RunLimits { max_generations: 500, ..Default::default() };
//! let result = solver.run_with_callback(&limits, &mut LogSink::new(50)).unwrap();
//!
//! println!("Best fitness after {} generations: {:.6}",
//!     result.stats.generations, result.stats.best_fitness);
//! ```

pub mod compute;
pub mod io;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{Annealer, Solver, SolverError};
pub use compute::{CpuRenderer, Frame, Renderer};
pub use schema::{AnnealingConfig, RunLimits, SolverConfig};
