//! Genome value types: vertices, triangles and exported chromosomes.

use serde::{Deserialize, Serialize};

/// Lower and upper bound of a vertex coordinate (normalized device coordinates).
pub const POSITION_BOUNDS: (f32, f32) = (-1.0, 1.0);
/// Lower and upper bound of a colour channel.
pub const COLOR_BOUNDS: (f32, f32) = (0.0, 1.0);

/// A 2D point in normalized device coordinates, each axis in [-1, 1].
///
/// `y = 1` is the top edge of the image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One gene: three vertices and a straight (non-premultiplied) RGBA colour in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub color: [f32; 4],
}

impl Triangle {
    pub fn new(vertices: [Vertex; 3], color: [f32; 4]) -> Self {
        Self { vertices, color }
    }

    /// Check every coordinate and channel lies in its clamped range.
    pub fn is_in_bounds(&self) -> bool {
        let in_range = |v: f32, (lo, hi): (f32, f32)| v >= lo && v <= hi;
        self.vertices
            .iter()
            .all(|v| in_range(v.x, POSITION_BOUNDS) && in_range(v.y, POSITION_BOUNDS))
            && self.color.iter().all(|&c| in_range(c, COLOR_BOUNDS))
    }
}

/// Serializable copy of a chromosome, used to export the elite genome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromosomeSnapshot {
    /// Triangles in draw order.
    pub triangles: Vec<Triangle>,
    /// Fitness score (higher is better).
    pub fitness: f32,
    /// Mean squared per-channel error against the target.
    pub mse: f64,
    /// Generation that produced it.
    pub generation: usize,
    /// Target image width in pixels.
    pub width: u32,
    /// Target image height in pixels.
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_bounds() {
        let tri = Triangle::new(
            [
                Vertex::new(-1.0, 1.0),
                Vertex::new(0.0, 0.0),
                Vertex::new(1.0, -1.0),
            ],
            [0.0, 0.5, 1.0, 1.0],
        );
        assert!(tri.is_in_bounds());

        let mut out = tri;
        out.vertices[1].x = 1.01;
        assert!(!out.is_in_bounds());

        let mut out = tri;
        out.color[3] = -0.01;
        assert!(!out.is_in_bounds());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = ChromosomeSnapshot {
            triangles: vec![Triangle::default(); 3],
            fitness: 0.5,
            mse: 1.0,
            generation: 4,
            width: 8,
            height: 6,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: ChromosomeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.triangles, snapshot.triangles);
        assert_eq!(parsed.generation, 4);
    }
}
