use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One 8-bit channel (coverage, luminance).
    Luma8,
    /// Four 8-bit channels, alpha last.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded bitmap handed over by the image-decoding collaborator.
///
/// Rows are tightly packed, top row first. The byte length always matches
/// `width * height * bytes_per_pixel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes: Vec<u8>,
}

impl BitmapImage {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, ConfigError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if bytes.len() != expected {
            return Err(ConfigError::BitmapSize {
                id: String::new(),
                width,
                height,
                bytes_per_pixel: format.bytes_per_pixel(),
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    /// A zero-filled bitmap.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            bytes: vec![0; width as usize * height as usize * format.bytes_per_pixel()],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Coverage of pixel (x, y) in [0, 1]: the only channel of `Luma8`, alpha of `Rgba8`.
    pub fn coverage(&self, x: u32, y: u32) -> f64 {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp + (bpp - 1);
        f64::from(self.bytes[idx]) / 255.0
    }

    pub fn set_luma(&mut self, x: u32, y: u32, value: u8) {
        debug_assert_eq!(self.format, PixelFormat::Luma8);
        let idx = y as usize * self.width as usize + x as usize;
        self.bytes[idx] = value;
    }

    /// Re-checks the length invariant, naming the bitmap in the error.
    pub fn check(&self, id: &str) -> Result<(), ConfigError> {
        let expected =
            self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        if self.bytes.len() != expected {
            return Err(ConfigError::BitmapSize {
                id: id.to_string(),
                width: self.width,
                height: self.height,
                bytes_per_pixel: self.format.bytes_per_pixel(),
                expected,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = BitmapImage::new(2, 2, PixelFormat::Rgba8, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BitmapSize {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn coverage_reads_alpha_for_rgba() {
        let img = BitmapImage::new(1, 1, PixelFormat::Rgba8, vec![10, 20, 30, 255]).unwrap();
        assert_eq!(img.coverage(0, 0), 1.0);

        let luma = BitmapImage::new(2, 1, PixelFormat::Luma8, vec![0, 51]).unwrap();
        assert_eq!(luma.coverage(0, 0), 0.0);
        assert!((luma.coverage(1, 0) - 0.2).abs() < 1e-12);
    }
}
