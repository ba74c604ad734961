//! Parameter types for the ingestion pipeline.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the call sites (which pick a profile), the
//! [`operations`](super::operations) module (which decides which encodes to
//! attempt) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`OutputFormat`]: the three encodable formats (JPEG, PNG, WebP).
//! - [`FormatChoice`]: what the caller asked for, including "keep original".
//! - [`CompressionTier`]: named aggressiveness level; maps to [`EncodeParams`].
//! - [`EncodeParams`]: one concrete encoder invocation.
//! - [`BoundingBox`] / [`EncodingProfile`]: the per-request profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest encoded object the remote store accepts (1 MiB).
pub const DEFAULT_BUDGET_BYTES: usize = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// PNG compression effort (0 = store fast, no filtering; 9 = slowest).
///
/// PNG is lossless, so effort is the only knob that trades CPU for size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PngEffort(pub u8);

impl PngEffort {
    pub fn new(value: u8) -> Self {
        Self(value.min(9))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// An encodable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl OutputFormat {
    /// File extension used when naming uploaded objects.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Map a MIME type such as `image/png` or `image/jpeg; q=1` to a format.
    ///
    /// Only the subtype is inspected. Returns `None` for anything outside
    /// jpeg/jpg/png/webp.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        let subtype = essence.rsplit('/').next().unwrap_or("").to_ascii_lowercase();
        Self::from_extension(&subtype)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// Requested output format, as picked by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormatChoice {
    /// Keep the uploaded format when it is encodable, else JPEG.
    #[default]
    #[serde(rename = "original", alias = "keep-original")]
    Original,
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl FormatChoice {
    /// Resolve the concrete output format against the source's declared MIME type.
    pub fn resolve(self, declared_mime: &str) -> OutputFormat {
        match self {
            FormatChoice::Original => {
                OutputFormat::from_mime(declared_mime).unwrap_or(OutputFormat::Jpeg)
            }
            FormatChoice::Jpeg => OutputFormat::Jpeg,
            FormatChoice::Png => OutputFormat::Png,
            FormatChoice::WebP => OutputFormat::WebP,
        }
    }
}

impl FromStr for FormatChoice {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" | "keep-original" => Ok(FormatChoice::Original),
            "jpg" | "jpeg" => Ok(FormatChoice::Jpeg),
            "png" => Ok(FormatChoice::Png),
            "webp" => Ok(FormatChoice::WebP),
            _ => Err(ParseError {
                kind: "format",
                value: s.to_string(),
                expected: "original, jpg, jpeg, png, webp",
            }),
        }
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatChoice::Original => "original",
            FormatChoice::Jpeg => "jpg",
            FormatChoice::Png => "png",
            FormatChoice::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// Named compression aggressiveness level.
///
/// | tier | JPEG quality | PNG effort | WebP |
/// |---|---|---|---|
/// | none | 100 | 0 | lossless |
/// | high | 98 | 1 | 95 |
/// | auto | 92 | 2 | 90 |
/// | medium | 88 | 3 | 85 |
/// | low | 80 | 5 | 75 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    /// Original quality. Over-budget results are an error, never degraded.
    None,
    #[default]
    High,
    Auto,
    Medium,
    Low,
}

impl CompressionTier {
    /// Whether the pipeline may fall back to lower quality or smaller
    /// dimensions when the first encode is over budget.
    pub fn allows_fallback(self) -> bool {
        self != CompressionTier::None
    }

    /// First-pass encoder parameters for this tier and format.
    pub fn params(self, format: OutputFormat) -> EncodeParams {
        let (jpeg, png, webp) = match self {
            CompressionTier::None => (100, 0, None),
            CompressionTier::High => (98, 1, Some(95)),
            CompressionTier::Auto => (92, 2, Some(90)),
            CompressionTier::Medium => (88, 3, Some(85)),
            CompressionTier::Low => (80, 5, Some(75)),
        };
        match format {
            OutputFormat::Jpeg => EncodeParams::Jpeg {
                quality: Quality::new(jpeg),
            },
            OutputFormat::Png => EncodeParams::Png {
                effort: PngEffort::new(png),
            },
            OutputFormat::WebP => match webp {
                Some(q) => EncodeParams::WebP {
                    quality: Quality::new(q),
                    lossless: false,
                },
                None => EncodeParams::WebP {
                    quality: Quality::new(100),
                    lossless: true,
                },
            },
        }
    }
}

impl FromStr for CompressionTier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionTier::None),
            "high" => Ok(CompressionTier::High),
            "auto" => Ok(CompressionTier::Auto),
            "medium" => Ok(CompressionTier::Medium),
            "low" => Ok(CompressionTier::Low),
            _ => Err(ParseError {
                kind: "compression tier",
                value: s.to_string(),
                expected: "none, high, auto, medium, low",
            }),
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionTier::None => "none",
            CompressionTier::High => "high",
            CompressionTier::Auto => "auto",
            CompressionTier::Medium => "medium",
            CompressionTier::Low => "low",
        };
        f.write_str(name)
    }
}

/// One concrete encoder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeParams {
    Jpeg { quality: Quality },
    Png { effort: PngEffort },
    WebP { quality: Quality, lossless: bool },
}

impl EncodeParams {
    pub fn format(&self) -> OutputFormat {
        match self {
            EncodeParams::Jpeg { .. } => OutputFormat::Jpeg,
            EncodeParams::Png { .. } => OutputFormat::Png,
            EncodeParams::WebP { .. } => OutputFormat::WebP,
        }
    }

    /// Lossy parameters at `quality`, or PNG parameters at `png_effort`.
    ///
    /// Used by the fallback ladders, which always encode WebP lossy.
    pub fn fallback(format: OutputFormat, quality: u8, png_effort: u8) -> Self {
        match format {
            OutputFormat::Jpeg => EncodeParams::Jpeg {
                quality: Quality::new(quality),
            },
            OutputFormat::Png => EncodeParams::Png {
                effort: PngEffort::new(png_effort),
            },
            OutputFormat::WebP => EncodeParams::WebP {
                quality: Quality::new(quality),
                lossless: false,
            },
        }
    }
}

impl fmt::Display for EncodeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeParams::Jpeg { quality } => write!(f, "jpeg q{}", quality.value()),
            EncodeParams::Png { effort } => write!(f, "png effort {}", effort.value()),
            EncodeParams::WebP {
                lossless: true, ..
            } => f.write_str("webp lossless"),
            EncodeParams::WebP { quality, .. } => write!(f, "webp q{}", quality.value()),
        }
    }
}

/// Maximum (width, height) an output image may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the pipeline needs to know about one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    pub format: FormatChoice,
    pub tier: CompressionTier,
    pub bounds: BoundingBox,
    /// Output size ceiling in bytes.
    pub budget_bytes: usize,
}

impl EncodingProfile {
    pub fn new(format: FormatChoice, tier: CompressionTier, bounds: BoundingBox) -> Self {
        Self {
            format,
            tier,
            bounds,
            budget_bytes: DEFAULT_BUDGET_BYTES,
        }
    }

    pub fn with_budget(mut self, budget_bytes: usize) -> Self {
        self.budget_bytes = budget_bytes;
        self
    }
}
