//! RGBA8 pixel buffers and the pixel-error fitness model.

/// Row-major RGBA8 pixel buffer, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a frame filled with a single colour.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Wrap an existing buffer. Returns `None` if its length is not `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Overwrite every pixel with `color`.
    pub fn clear(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Copy another frame of identical dimensions into this one.
    pub fn copy_from(&mut self, other: &Frame) {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        self.pixels.copy_from_slice(&other.pixels);
    }
}

/// Mean squared per-channel error between two equally sized buffers.
///
/// Summed in integers, so the result only depends on the byte values.
pub fn mean_squared_error(a: &[u8], b: &[u8]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let se: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u64
        })
        .sum();
    se as f64 / a.len() as f64
}

/// Convert an error into a "higher is better" fitness in (0, 1].
///
/// Strictly decreasing in `mse`, and always positive, so the roulette-wheel
/// precondition (total fitness > 0) holds for any rendered population.
#[inline]
pub fn fitness_from_mse(mse: f64) -> f32 {
    (1.0 / (1.0 + mse)) as f32
}

/// Inverse of [`fitness_from_mse`].
#[inline]
pub fn mse_from_fitness(fitness: f32) -> f64 {
    1.0 / fitness as f64 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(3, 2, [1, 2, 3, 4]);
        assert_eq!(frame.pixels().len(), 24);
        assert_eq!(frame.pixel(2, 1), [1, 2, 3, 4]);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(Frame::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(Frame::from_raw(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_mse() {
        let a = [0u8, 0, 0, 0];
        let b = [2u8, 2, 0, 0];
        assert!((mean_squared_error(&a, &b) - 2.0).abs() < 1e-12);
        assert_eq!(mean_squared_error(&a, &a), 0.0);

        let black = Frame::filled(2, 2, [0, 0, 0, 255]);
        let grey = Frame::filled(2, 2, [128, 128, 128, 255]);
        let expected = 128.0 * 128.0 * 3.0 / 4.0;
        assert!((mean_squared_error(black.pixels(), grey.pixels()) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fitness_is_monotonic_inverse_of_error() {
        assert_eq!(fitness_from_mse(0.0), 1.0);
        let mut last = f32::INFINITY;
        for mse in [0.0, 0.5, 1.0, 10.0, 1000.0, 65025.0] {
            let f = fitness_from_mse(mse);
            assert!(f > 0.0);
            assert!(f < last);
            last = f;
        }
        assert!((mse_from_fitness(fitness_from_mse(12.0)) - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_copy_from() {
        let mut a = Frame::new(2, 2);
        let b = Frame::filled(2, 2, [9, 9, 9, 9]);
        a.copy_from(&b);
        assert_eq!(a, b);
    }
}
