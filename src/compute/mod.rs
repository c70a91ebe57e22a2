//! Compute module - rasterization, pixel error and the evolutionary core.

mod frame;

pub mod evolution;
pub mod render;

pub use frame::*;
pub use render::{CpuRenderer, RenderError, RenderTargets, Renderer, create_renderer};
