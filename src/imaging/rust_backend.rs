//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Container sniffing | `image::ImageReader::with_guessed_format` |
//! | Decode + verify (JPEG, PNG, WebP) | `image` crate decoders (full decode) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression + filter per effort) |
//! | Encode → WebP lossy / lossless | `webp` crate (libwebp) |
//!
//! The `image` crate's own WebP encoder is lossless-only, hence `webp`.

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::params::{EncodeParams, PngEffort, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::LazyLock;

/// Containers accepted on input, with the extensions that name them.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the upload extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

fn is_accepted_container(format: ImageFormat) -> bool {
    INPUT_CANDIDATES.iter().any(|(_, f)| *f == format)
}

/// Production backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map PNG effort onto the encoder's coarse settings.
///
/// 0 is the "no optimize" setting: fast deflate and no row filtering.
fn png_settings(effort: PngEffort) -> (CompressionType, PngFilter) {
    match effort.value() {
        0 => (CompressionType::Fast, PngFilter::NoFilter),
        1 => (CompressionType::Fast, PngFilter::Adaptive),
        2..=4 => (CompressionType::Default, PngFilter::Adaptive),
        _ => (CompressionType::Best, PngFilter::Adaptive),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.value())
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, effort: PngEffort) -> Result<Vec<u8>, BackendError> {
    let rgba = img.to_rgba8();
    let (compression, filter) = png_settings(effort);
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, compression, filter)
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

/// Encode WebP, keeping an alpha channel only when the source has one.
fn encode_webp(
    img: &DynamicImage,
    quality: Quality,
    lossless: bool,
) -> Result<Vec<u8>, BackendError> {
    let (width, height) = img.dimensions();
    let q = quality.value() as f32;
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(lossless, q)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(lossless, q)
    };
    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))
}

impl ImageBackend for RustBackend {
    fn decode(&self, source: &SourceImage) -> Result<DynamicImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(source.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to read container: {e}")))?;

        let format = reader
            .format()
            .ok_or_else(|| BackendError::UnsupportedContainer("unrecognized".into()))?;
        if !is_accepted_container(format) {
            return Err(BackendError::UnsupportedContainer(format!("{format:?}")));
        }

        // A full decode is the integrity check: truncated or corrupt
        // payloads fail here rather than during encode.
        let img = reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("Failed to decode {format:?}: {e}")))?;

        if img.width() == 0 || img.height() == 0 {
            return Err(BackendError::Decode("Image has zero dimensions".into()));
        }
        Ok(img)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        match *params {
            EncodeParams::Jpeg { quality } => encode_jpeg(image, quality),
            EncodeParams::Png { effort } => encode_png(image, effort),
            EncodeParams::WebP { quality, lossless } => encode_webp(image, quality, lossless),
        }
    }
}
