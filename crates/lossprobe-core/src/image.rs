//! Image representation shared by the metrics engine and the GPU crate.

/// A floating-point image. Always stored as RGBA f32.
///
/// Metrics inputs are block-aligned: `width`/`height` here are the padded
/// compressed-surface dimensions when the image comes out of a BC
/// round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data in RGBA f32 format, row-major.
    pub pixels: Vec<[f32; 4]>,
}

impl FloatImage {
    /// Build an image by evaluating `f` at every pixel coordinate.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [f32; 4]) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Fill with a single color.
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// Pixel count.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}
