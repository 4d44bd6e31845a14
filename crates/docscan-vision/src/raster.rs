// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster container — an RGBA or single-channel luminance pixel buffer with
// validated, non-zero dimensions. Wraps the `image` crate buffers so the rest of
// the pipeline can hand them straight to `imageproc`.

use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use docscan_core::error::{DocscanError, Result};
use tracing::{debug, instrument};

use crate::filter::luminance_into;

/// A frame, rectified page, or filtered result.
///
/// Invariants: `width > 0`, `height > 0`, and the buffer holds exactly
/// `width * height * channels` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: Pixels,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pixels {
    Rgba(RgbaImage),
    Luma(GrayImage),
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Wrap a raw RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_buffer(width, height, 4, data.len())?;
        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            DocscanError::InvalidImage(format!("RGBA buffer does not fit {width}x{height}"))
        })?;
        Ok(Self { pixels: Pixels::Rgba(image) })
    }

    /// Wrap a raw single-channel luminance buffer.
    pub fn from_luma(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_buffer(width, height, 1, data.len())?;
        let image = GrayImage::from_raw(width, height, data).ok_or_else(|| {
            DocscanError::InvalidImage(format!("luma buffer does not fit {width}x{height}"))
        })?;
        Ok(Self { pixels: Pixels::Luma(image) })
    }

    /// Wrap an existing RGBA image.
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { pixels: Pixels::Rgba(image) })
    }

    /// Wrap an existing grayscale image.
    pub fn from_gray_image(image: GrayImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { pixels: Pixels::Luma(image) })
    }

    /// Convert any decoded image. 8/16-bit luma stays single-channel, every
    /// other layout becomes RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        let pixels = match image {
            DynamicImage::ImageLuma8(gray) => Pixels::Luma(gray),
            DynamicImage::ImageLuma16(_) => Pixels::Luma(image.to_luma8()),
            DynamicImage::ImageRgba8(rgba) => Pixels::Rgba(rgba),
            other => Pixels::Rgba(other.to_rgba8()),
        };
        Ok(Self { pixels })
    }

    /// Decode encoded bytes (JPEG, PNG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            DocscanError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(width = image.width(), height = image.height(), "Image decoded from bytes");
        Self::from_dynamic(image)
    }

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|err| {
            DocscanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = image.width(), height = image.height(), "Image loaded");
        Self::from_dynamic(image)
    }

    /// Crate-internal wrap for buffers whose dimensions are already known to be
    /// non-zero (derived from another `RasterImage`).
    pub(crate) fn wrap_luma(image: GrayImage) -> Self {
        debug_assert!(image.width() > 0 && image.height() > 0);
        Self { pixels: Pixels::Luma(image) }
    }

    pub(crate) fn wrap_rgba(image: RgbaImage) -> Self {
        debug_assert!(image.width() > 0 && image.height() > 0);
        Self { pixels: Pixels::Rgba(image) }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgba(img) => img.width(),
            Pixels::Luma(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgba(img) => img.height(),
            Pixels::Luma(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// 4 for RGBA, 1 for luminance.
    pub fn channels(&self) -> u8 {
        match &self.pixels {
            Pixels::Rgba(_) => 4,
            Pixels::Luma(_) => 1,
        }
    }

    pub(crate) fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn is_luma(&self) -> bool {
        matches!(self.pixels, Pixels::Luma(_))
    }

    /// Raw interleaved pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Rgba(img) => img.as_raw(),
            Pixels::Luma(img) => img.as_raw(),
        }
    }

    pub fn as_rgba(&self) -> Option<&RgbaImage> {
        match &self.pixels {
            Pixels::Rgba(img) => Some(img),
            Pixels::Luma(_) => None,
        }
    }

    pub fn as_luma(&self) -> Option<&GrayImage> {
        match &self.pixels {
            Pixels::Rgba(_) => None,
            Pixels::Luma(img) => Some(img),
        }
    }

    /// Consume and return an `image` crate value for encoding or display.
    pub fn into_dynamic(self) -> DynamicImage {
        match self.pixels {
            Pixels::Rgba(img) => DynamicImage::ImageRgba8(img),
            Pixels::Luma(img) => DynamicImage::ImageLuma8(img),
        }
    }

    // -- Conversion -----------------------------------------------------------

    /// BT.601 luminance as a new grayscale buffer. A luma image is copied as is.
    pub fn luma_image(&self) -> GrayImage {
        match &self.pixels {
            Pixels::Luma(img) => img.clone(),
            Pixels::Rgba(_) => {
                let mut gray = GrayImage::new(self.width(), self.height());
                luminance_into(self, &mut gray);
                gray
            }
        }
    }

    /// Single-channel luminance version of this image.
    pub fn to_luma(&self) -> Self {
        Self::wrap_luma(self.luma_image())
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let dynamic = self.clone().into_dynamic();
        dynamic.write_to(&mut cursor, ImageFormat::Png).map_err(|err| {
            DocscanError::ImageError(format!("PNG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }

    /// Write to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let result = match &self.pixels {
            Pixels::Rgba(img) => img.save(path.as_ref()),
            Pixels::Luma(img) => img.save(path.as_ref()),
        };
        result.map_err(|err| {
            DocscanError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(DocscanError::InvalidImage(format!(
            "dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

fn check_buffer(width: u32, height: u32, channels: usize, len: usize) -> Result<()> {
    check_dimensions(width, height)?;
    let expected = width as usize * height as usize * channels;
    if len != expected {
        return Err(DocscanError::InvalidImage(format!(
            "buffer length {len} does not match {width}x{height}x{channels} = {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn rejects_zero_dimensions() {
        assert!(RasterImage::from_luma(0, 10, Vec::new()).is_err());
        assert!(RasterImage::from_gray_image(GrayImage::new(5, 0)).is_err());
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let err = RasterImage::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, DocscanError::InvalidImage(_)));
        assert!(RasterImage::from_rgba(2, 2, vec![0; 17]).is_err());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn luma_of_rgba_uses_bt601_weights() {
        let img = RasterImage::from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        let gray = img.to_luma();
        assert!(gray.is_luma());
        // 0.299 * 255 = 76.2
        assert_eq!(gray.as_bytes(), &[76]);
    }

    #[test]
    fn dynamic_luma_stays_single_channel() {
        let gray = GrayImage::from_pixel(3, 2, Luma([9u8]));
        let img = RasterImage::from_dynamic(DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(img.channels(), 1);
        assert_eq!(img.dimensions(), (3, 2));

        let rgb = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        assert_eq!(RasterImage::from_dynamic(rgb).unwrap().channels(), 4);
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let img = RasterImage::from_rgba_image(rgba).unwrap();
        let bytes = img.to_png_bytes().unwrap();
        let decoded = RasterImage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn save_and_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let img = RasterImage::from_gray_image(GrayImage::from_pixel(8, 8, Luma([200u8]))).unwrap();
        img.save(&path).unwrap();
        let loaded = RasterImage::open(&path).unwrap();
        assert_eq!(loaded, img);
    }

    #[test]
    fn open_missing_file_is_image_error() {
        let err = RasterImage::open("/nonexistent/scan.png").unwrap_err();
        assert!(matches!(err, DocscanError::ImageError(_)));
    }
}
