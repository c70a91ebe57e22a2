//! Rasterization of triangle lists into RGBA8 frames.
//!
//! The evolutionary core only talks to the [`Renderer`] trait. Two backends
//! ship with the crate:
//!
//! - [`CpuRenderer`]: edge-function rasterizer on the calling thread
//! - `GpuRenderer`: wgpu compute rasterizer (`gpu` feature)
//!
//! Both clear to a background colour and then blend triangles in sequence
//! order with source-over alpha (`src * a + dst * (1 - a)`).

mod cpu;
#[cfg(feature = "gpu")]
mod gpu;
mod targets;

pub use cpu::CpuRenderer;
#[cfg(feature = "gpu")]
pub use gpu::{GpuError, GpuRenderer};
pub use targets::RenderTargets;

use crate::compute::Frame;
use crate::schema::{ConfigError, RendererKind, Triangle};

/// Turns a triangle list into pixels.
///
/// Implementations must be deterministic: identical triangles and frame
/// dimensions give identical bytes. `render_into` returns only after the
/// frame holds the finished image.
pub trait Renderer {
    /// Draw `triangles` into `frame`, replacing its previous contents.
    fn render_into(&mut self, triangles: &[Triangle], frame: &mut Frame)
    -> Result<(), RenderError>;

    /// Draw `triangles` into a freshly allocated frame.
    fn render(
        &mut self,
        triangles: &[Triangle],
        width: u32,
        height: u32,
    ) -> Result<Frame, RenderError> {
        let mut frame = Frame::new(width, height);
        self.render_into(triangles, &mut frame)?;
        Ok(frame)
    }

    /// Short backend name for logging.
    fn name(&self) -> &'static str;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render_into(
        &mut self,
        triangles: &[Triangle],
        frame: &mut Frame,
    ) -> Result<(), RenderError> {
        (**self).render_into(triangles, frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Build the renderer selected by configuration.
pub fn create_renderer(
    kind: RendererKind,
    background: [u8; 4],
) -> Result<Box<dyn Renderer>, RendererInitError> {
    match kind {
        RendererKind::Cpu => Ok(Box::new(CpuRenderer::new(background))),
        #[cfg(feature = "gpu")]
        RendererKind::Gpu => {
            let renderer = pollster::block_on(GpuRenderer::new(background))?;
            Ok(Box::new(renderer))
        }
        #[cfg(not(feature = "gpu"))]
        RendererKind::Gpu => Err(ConfigError::UnsupportedRenderer(
            "gpu renderer requires the `gpu` feature".to_string(),
        )
        .into()),
    }
}

/// Errors raised while drawing.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer backend failure: {0}")]
    Backend(String),

    #[cfg(feature = "gpu")]
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Errors raised while creating a renderer.
#[derive(Debug, thiserror::Error)]
pub enum RendererInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[cfg(feature = "gpu")]
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cpu_renderer() {
        let mut renderer = create_renderer(RendererKind::Cpu, [1, 2, 3, 255]).unwrap();
        assert_eq!(renderer.name(), "cpu");
        let frame = renderer.render(&[], 2, 2).unwrap();
        assert_eq!(frame.pixel(1, 1), [1, 2, 3, 255]);
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_create_gpu_renderer_unsupported() {
        let result = create_renderer(RendererKind::Gpu, [0, 0, 0, 255]);
        assert!(matches!(
            result,
            Err(RendererInitError::Config(ConfigError::UnsupportedRenderer(_)))
        ));
    }
}
