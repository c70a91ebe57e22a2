//! CPU rasterizer - edge functions evaluated at pixel centres.

use super::{RenderError, Renderer};
use crate::compute::Frame;
use crate::schema::{Triangle, Vertex};

/// Deterministic software rasterizer.
///
/// Normalized device coordinates map onto the frame with `x = -1` on the
/// left edge and `y = 1` on the top edge. A pixel is covered when its
/// centre lies inside the triangle or on one of its edges; both windings
/// are drawn and zero-area triangles are skipped.
#[derive(Debug, Clone)]
pub struct CpuRenderer {
    background: [u8; 4],
}

impl CpuRenderer {
    /// Create a renderer clearing to `background`.
    pub fn new(background: [u8; 4]) -> Self {
        Self { background }
    }

    pub fn background(&self) -> [u8; 4] {
        self.background
    }
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new([0, 0, 0, 255])
    }
}

impl Renderer for CpuRenderer {
    fn render_into(
        &mut self,
        triangles: &[Triangle],
        frame: &mut Frame,
    ) -> Result<(), RenderError> {
        frame.clear(self.background);
        for triangle in triangles {
            draw_triangle(frame, triangle);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

/// NDC to continuous pixel coordinates.
#[inline]
pub(crate) fn to_pixel(v: Vertex, width: f32, height: f32) -> (f32, f32) {
    ((v.x + 1.0) * 0.5 * width, (1.0 - v.y) * 0.5 * height)
}

/// Signed doubled area of (a, b, p); positive when p is left of a->b in y-down space.
#[inline]
fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn draw_triangle(frame: &mut Frame, triangle: &Triangle) {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let (w, h) = (width as f32, height as f32);
    let [p0, p1, p2] = triangle.vertices.map(|v| to_pixel(v, w, h));

    let area = edge(p0, p1, p2);
    if area == 0.0 {
        return;
    }
    let sign = area.signum();

    // Pixel i is a candidate when its centre i + 0.5 lies inside the bbox.
    let min_x = p0.0.min(p1.0).min(p2.0);
    let max_x = p0.0.max(p1.0).max(p2.0);
    let min_y = p0.1.min(p1.1).min(p2.1);
    let max_y = p0.1.max(p1.1).max(p2.1);
    let x_start = ((min_x - 0.5).ceil() as i64).max(0);
    let x_end = ((max_x - 0.5).floor() as i64).min(width as i64 - 1);
    let y_start = ((min_y - 0.5).ceil() as i64).max(0);
    let y_end = ((max_y - 0.5).floor() as i64).min(height as i64 - 1);
    if x_start > x_end || y_start > y_end {
        return;
    }

    let alpha = triangle.color[3];
    let inv_alpha = 1.0 - alpha;
    let src = [
        triangle.color[0] * 255.0 * alpha,
        triangle.color[1] * 255.0 * alpha,
        triangle.color[2] * 255.0 * alpha,
        // SRC_ALPHA, ONE_MINUS_SRC_ALPHA applies to alpha as well
        255.0 * alpha * alpha,
    ];

    let stride = width as usize * 4;
    let pixels = frame.pixels_mut();
    for y in y_start..=y_end {
        let py = y as f32 + 0.5;
        let row = y as usize * stride;
        for x in x_start..=x_end {
            let p = (x as f32 + 0.5, py);
            let w0 = edge(p1, p2, p) * sign;
            let w1 = edge(p2, p0, p) * sign;
            let w2 = edge(p0, p1, p) * sign;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let i = row + x as usize * 4;
            for c in 0..4 {
                let blended = src[c] + pixels[i + c] as f32 * inv_alpha;
                pixels[i + c] = (blended + 0.5).clamp(0.0, 255.0) as u8;
            }
        }
    }
}
