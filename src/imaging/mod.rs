//! Image ingestion: decode, normalize, fit, encode, enforce the size budget.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + verify** | `image::ImageReader` (JPEG, PNG, WebP) |
//! | **Resize** | Lanczos3 `resize_exact` to a shrink-to-fit box |
//! | **Encode JPEG / PNG** | `image` codecs |
//! | **Encode WebP** | `webp` (lossy and lossless) |
//!
//! The module is split into:
//! - **Parameters**: formats, tiers, profiles and encoder settings
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Ladder**: the fallback sequences as constants
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: the [`process`] pipeline combining all of the above

pub mod backend;
mod calculations;
pub mod ladder;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, SourceImage};
pub use calculations::{fit_within, scale_dimensions};
pub use operations::{EncodeStage, ProcessError, ProcessedImage, process};
pub use params::{
    BoundingBox, CompressionTier, DEFAULT_BUDGET_BYTES, EncodeParams, EncodingProfile,
    FormatChoice, OutputFormat, ParseError, PngEffort, Quality,
};
pub use rust_backend::RustBackend;
