use crate::foundation::error::{MatteError, MatteResult};

/// An observed or recovered RGB color.
pub type ColorSample = [u8; 3];

/// Straight-alpha RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// An owned RGBA8 image, row-major, tightly packed.
///
/// Width and height are always non-zero and `data.len() == width * height * 4`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA8 bytes, checking the size invariant.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MatteResult<Self> {
        let expected_len = rgba8_len(width, height)?;
        if data.len() != expected_len {
            return Err(MatteError::validation(format!(
                "pixel buffer expects {expected_len} bytes for {width}x{height} rgba8, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: Rgba8) -> MatteResult<Self> {
        let len = rgba8_len(width, height)?;
        Self::new(width, height, px.repeat(len / 4))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when both buffers have exactly the same width and height.
    pub fn is_congruent(&self, other: &PixelBuffer) -> bool {
        self.dimensions() == other.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Row stride in bytes.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 4
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

fn rgba8_len(width: u32, height: u32) -> MatteResult<usize> {
    if width == 0 || height == 0 {
        return Err(MatteError::validation(
            "pixel buffer width/height must be non-zero",
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MatteError::validation("pixel buffer size overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length_and_zero_size() {
        assert!(PixelBuffer::new(2, 2, vec![0u8; 15]).is_err());
        assert!(PixelBuffer::new(0, 2, vec![]).is_err());
        assert!(PixelBuffer::new(2, 0, vec![]).is_err());
        assert!(PixelBuffer::new(2, 2, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn pixel_access_is_row_major() {
        let data = (0u8..24).collect::<Vec<_>>();
        let buf = PixelBuffer::new(3, 2, data).unwrap();
        assert_eq!(buf.pixel(0, 0), Some([0, 1, 2, 3]));
        assert_eq!(buf.pixel(2, 0), Some([8, 9, 10, 11]));
        assert_eq!(buf.pixel(0, 1), Some([12, 13, 14, 15]));
        assert_eq!(buf.pixel(3, 0), None);
        assert_eq!(buf.row_bytes(), 12);
    }

    #[test]
    fn congruence_is_exact_dimension_equality() {
        let a = PixelBuffer::filled(4, 2, [0; 4]).unwrap();
        let b = PixelBuffer::filled(4, 2, [255; 4]).unwrap();
        let c = PixelBuffer::filled(2, 4, [0; 4]).unwrap();
        assert!(a.is_congruent(&b));
        assert!(!a.is_congruent(&c));
    }
}
