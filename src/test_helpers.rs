//! Shared test utilities: synthetic images and in-memory uploads.
//!
//! Tests generate their pixels instead of shipping fixture files, so every
//! input is deterministic and sized for the case at hand.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let img = DynamicImage::ImageRgb8(gradient_rgb(120, 80));
//! let source = source_from(&img, ImageFormat::Png);
//! assert_eq!(source.mime_type, "image/png");
//! ```

use crate::imaging::SourceImage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Pixel generators
// =========================================================================

/// Smooth opaque gradient: compresses well in every format.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Gradient with alpha falling off left to right.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let a = 255 - (x * 255 / width.max(1)) as u8;
        Rgba([(y * 255 / height.max(1)) as u8, 64, 200, a])
    })
}

/// Deterministic pseudo-random noise (LCG); close to incompressible.
pub fn noise_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    })
}

// =========================================================================
// Uploads
// =========================================================================

/// Encode `img` with the `image` crate's default settings.
pub fn encode_as(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// An upload of `img` encoded as `format`, declared with the matching MIME type.
pub fn source_from(img: &DynamicImage, format: ImageFormat) -> SourceImage {
    let ext = format.extensions_str()[0];
    SourceImage::new(encode_as(img, format), format.to_mime_type())
        .with_filename(format!("upload.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_deterministic_per_seed() {
        assert_eq!(noise_rgb(8, 8, 1), noise_rgb(8, 8, 1));
        assert_ne!(noise_rgb(8, 8, 1), noise_rgb(8, 8, 2));
    }

    #[test]
    fn source_from_declares_mime() {
        let img = DynamicImage::ImageRgb8(gradient_rgb(4, 4));
        let source = source_from(&img, ImageFormat::Png);
        assert_eq!(source.mime_type, "image/png");
        assert_eq!(source.filename.as_deref(), Some("upload.png"));
        assert_eq!(image::guess_format(&source.bytes).unwrap(), ImageFormat::Png);
    }
}
