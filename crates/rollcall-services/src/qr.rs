//! Scannable QR images for converted links

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

const MODULE_PIXELS: u32 = 10;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("data cannot be encoded as a QR code: {0}")]
    Encode(String),

    #[error("failed to write PNG: {0}")]
    Png(String),
}

/// Renders grayscale PNG QR codes with high error correction and a
/// four-module quiet zone.
#[derive(Debug, Clone)]
pub struct QrGenerator {
    ec_level: EcLevel,
    module_pixels: u32,
}

impl Default for QrGenerator {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::H,
            module_pixels: MODULE_PIXELS,
        }
    }
}

impl QrGenerator {
    pub fn render_png(&self, data: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), self.ec_level)
            .map_err(|e| QrError::Encode(e.to_string()))?;

        let image = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_pixels, self.module_pixels)
            .quiet_zone(true)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| QrError::Png(e.to_string()))?;

        tracing::debug!(
            modules = code.width(),
            size_bytes = png.len(),
            "QR code rendered"
        );
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_render_png_dimensions() {
        let link = "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_90017";
        let png = QrGenerator::default().render_png(link).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        let modules = QrCode::with_error_correction_level(link.as_bytes(), EcLevel::H)
            .unwrap()
            .width() as u32;
        let expected = (modules + 8) * MODULE_PIXELS;
        assert_eq!(decoded.dimensions(), (expected, expected));
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        let data = "a".repeat(4000);
        let err = QrGenerator::default().render_png(&data).unwrap_err();
        assert!(matches!(err, QrError::Encode(_)));
    }
}
