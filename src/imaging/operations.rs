//! The ingestion pipeline.
//!
//! [`process`] takes one uploaded image and an [`EncodingProfile`] and returns
//! encoded bytes that fit the profile's size budget. It combines the pure
//! dimension math in [`calculations`](super::calculations), the fallback
//! sequences in [`ladder`](super::ladder) and a backend for the codec work:
//!
//! ```text
//! decode/verify → resolve format → normalize color → fit → encode
//!     → over budget? quality ladder → dimension ladder → floor
//! ```
//!
//! Everything here is synchronous and owns its buffers; nothing is shared
//! between calls.

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::calculations::{fit_within, scale_dimensions};
use super::ladder::{
    DOWNSCALE_PNG_EFFORT, DOWNSCALE_QUALITY, FLOOR_PNG_EFFORT, FLOOR_QUALITY, PNG_EFFORT_STEPS,
    QUALITY_STEPS, SCALE_STEPS,
};
use super::params::{EncodeParams, EncodingProfile, OutputFormat};
use crate::validation::ValidationError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, RgbaImage};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Encoded image is {actual} bytes, over the {budget} byte budget (tier none forbids recompression)")]
    BudgetExceeded { actual: usize, budget: usize },
    #[error("Encoder failed: {0}")]
    Encode(#[source] BackendError),
}

/// Which step of the pipeline produced the final bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodeStage {
    FirstPass,
    QualityLadder(EncodeParams),
    DimensionLadder { scale: f64, params: EncodeParams },
    /// Best-effort result; may be over budget.
    Floor(EncodeParams),
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeStage::FirstPass => f.write_str("first pass"),
            EncodeStage::QualityLadder(params) => write!(f, "quality ladder ({params})"),
            EncodeStage::DimensionLadder { scale, params } => {
                write!(f, "dimension ladder (x{scale}, {params})")
            }
            EncodeStage::Floor(params) => write!(f, "floor ({params})"),
        }
    }
}

/// Pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub stage: EncodeStage,
}

impl ProcessedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn within_budget(&self, budget_bytes: usize) -> bool {
        self.bytes.len() <= budget_bytes
    }

    /// Lowercase hex SHA-256 of the encoded bytes.
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

/// Flatten alpha onto opaque white.
///
/// Paletted sources reach this point already expanded to RGBA, so their
/// transparency is honored like any other alpha channel.
pub fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Convert the decoded image into the channel layout the target format needs.
///
/// JPEG gets 3-channel RGB8 with any alpha flattened onto white, PNG always
/// gets 4-channel RGBA8, WebP keeps whatever the source had.
pub fn normalize_color(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    match format {
        OutputFormat::Jpeg => {
            if img.color().has_alpha() {
                DynamicImage::ImageRgb8(flatten_onto_white(&img.to_rgba8()))
            } else if let DynamicImage::ImageRgb8(_) = img {
                img
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            }
        }
        OutputFormat::Png => match img {
            DynamicImage::ImageRgba8(_) => img,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        OutputFormat::WebP => img,
    }
}

/// Resample to exactly `dims` with Lanczos3, borrowing when nothing changes.
pub fn resize_to(img: &DynamicImage, dims: (u32, u32)) -> Cow<'_, DynamicImage> {
    if img.dimensions() == dims {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(img.resize_exact(dims.0, dims.1, FilterType::Lanczos3))
    }
}

/// Quality-ladder parameters for a format, in the order they are tried.
pub fn quality_ladder(format: OutputFormat) -> Vec<EncodeParams> {
    match format {
        OutputFormat::Png => PNG_EFFORT_STEPS
            .iter()
            .map(|&effort| EncodeParams::fallback(format, DOWNSCALE_QUALITY, effort))
            .collect(),
        OutputFormat::Jpeg | OutputFormat::WebP => QUALITY_STEPS
            .iter()
            .map(|&q| EncodeParams::fallback(format, q, DOWNSCALE_PNG_EFFORT))
            .collect(),
    }
}

/// Run the full pipeline for one upload.
///
/// Returns bytes within `profile.budget_bytes` whenever any ladder rung fits.
/// When nothing fits, the floor encode is returned anyway (logged as a
/// warning). Tier `none` never falls back and fails with
/// [`ProcessError::BudgetExceeded`] instead.
pub fn process(
    backend: &impl ImageBackend,
    source: &SourceImage,
    profile: &EncodingProfile,
) -> Result<ProcessedImage, ProcessError> {
    let decoded = backend
        .decode(source)
        .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;
    let (original_width, original_height) = decoded.dimensions();

    let format = profile.format.resolve(&source.mime_type);
    let normalized = normalize_color(decoded, format);
    let fitted_dims = fit_within((original_width, original_height), profile.bounds);
    let budget = profile.budget_bytes;

    let finish = |bytes: Vec<u8>, dims: (u32, u32), stage: EncodeStage| {
        info!(
            %format,
            width = dims.0,
            height = dims.1,
            size = bytes.len(),
            %stage,
            "Image processed"
        );
        ProcessedImage {
            bytes,
            format,
            width: dims.0,
            height: dims.1,
            original_width,
            original_height,
            stage,
        }
    };

    let fitted = resize_to(&normalized, fitted_dims);
    let first = profile.tier.params(format);
    let bytes = encode(backend, &fitted, &first)?;
    if bytes.len() <= budget {
        return Ok(finish(bytes, fitted_dims, EncodeStage::FirstPass));
    }
    if !profile.tier.allows_fallback() {
        return Err(ProcessError::BudgetExceeded {
            actual: bytes.len(),
            budget,
        });
    }
    debug!(size = bytes.len(), budget, "First pass over budget, trying quality ladder");

    for params in quality_ladder(format) {
        let bytes = encode(backend, &fitted, &params)?;
        if bytes.len() <= budget {
            return Ok(finish(bytes, fitted_dims, EncodeStage::QualityLadder(params)));
        }
    }

    let downscale = EncodeParams::fallback(format, DOWNSCALE_QUALITY, DOWNSCALE_PNG_EFFORT);
    for &scale in SCALE_STEPS {
        let dims = scale_dimensions(fitted_dims, scale);
        let scaled = resize_to(&normalized, dims);
        let bytes = encode(backend, &scaled, &downscale)?;
        if bytes.len() <= budget {
            let stage = EncodeStage::DimensionLadder {
                scale,
                params: downscale,
            };
            return Ok(finish(bytes, dims, stage));
        }
    }

    // Floor re-encodes the fitted image, not the smallest rung
    let floor = EncodeParams::fallback(format, FLOOR_QUALITY, FLOOR_PNG_EFFORT);
    let bytes = encode(backend, &fitted, &floor)?;
    if bytes.len() > budget {
        warn!(
            size = bytes.len(),
            budget, "Floor result still over budget, returning best effort"
        );
    }
    Ok(finish(bytes, fitted_dims, EncodeStage::Floor(floor)))
}

fn encode(
    backend: &impl ImageBackend,
    img: &DynamicImage,
    params: &EncodeParams,
) -> Result<Vec<u8>, ProcessError> {
    let bytes = backend.encode(img, params).map_err(ProcessError::Encode)?;
    debug!(
        %params,
        width = img.width(),
        height = img.height(),
        size = bytes.len(),
        "Encode attempt"
    );
    Ok(bytes)
}
