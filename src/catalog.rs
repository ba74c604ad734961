//! The three catalog records that carry images, and their ingest settings.
//!
//! Categories, products and banners run the same pipeline. They differ only
//! in the bounding box, the raw upload ceiling and the default format/tier:
//!
//! | context | box | upload limit |
//! |---|---|---|
//! | category | 800×800 | 5 MiB |
//! | product | 1200×1200 | 10 MiB |
//! | banner | 1600×600 | 5 MiB |

use crate::imaging::{
    BoundingBox, CompressionTier, DEFAULT_BUDGET_BYTES, EncodingProfile, FormatChoice,
};
use crate::validation::UploadLimits;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of record an image is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageContext {
    Category,
    Product,
    Banner,
}

impl ImageContext {
    pub const ALL: [ImageContext; 3] = [
        ImageContext::Category,
        ImageContext::Product,
        ImageContext::Banner,
    ];
}

impl fmt::Display for ImageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageContext::Category => "category",
            ImageContext::Product => "product",
            ImageContext::Banner => "banner",
        })
    }
}

/// Ingest settings for one context (`[category]`, `[product]`, `[banner]`).
///
/// No field-level defaults: a partial section is filled from the stock
/// defaults during config merging, which differ per context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSettings {
    /// Bounding box the output must fit inside.
    pub max_width: u32,
    pub max_height: u32,
    /// Largest raw upload accepted, in MiB.
    pub max_upload_mib: usize,
    /// Output format when the request does not name one.
    pub format: FormatChoice,
    /// Compression tier when the request does not name one.
    pub tier: CompressionTier,
    /// Encoded size ceiling in bytes.
    pub budget_bytes: usize,
}

impl ContextSettings {
    pub fn defaults_for(context: ImageContext) -> Self {
        let (max_width, max_height, max_upload_mib) = match context {
            ImageContext::Category => (800, 800, 5),
            ImageContext::Product => (1200, 1200, 10),
            ImageContext::Banner => (1600, 600, 5),
        };
        Self {
            max_width,
            max_height,
            max_upload_mib,
            format: FormatChoice::Original,
            tier: CompressionTier::High,
            budget_bytes: DEFAULT_BUDGET_BYTES,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.max_width, self.max_height)
    }

    pub fn limits(&self) -> UploadLimits {
        UploadLimits::from_mib(self.max_upload_mib)
    }

    /// Build the pipeline profile, applying any per-request overrides.
    pub fn profile(
        &self,
        format: Option<FormatChoice>,
        tier: Option<CompressionTier>,
    ) -> EncodingProfile {
        EncodingProfile::new(
            format.unwrap_or(self.format),
            tier.unwrap_or(self.tier),
            self.bounds(),
        )
        .with_budget(self.budget_bytes)
    }

    /// Check value ranges; `section` names the config table in messages.
    pub fn validate(&self, section: &str) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(format!("{section}.max_width and max_height must be non-zero"));
        }
        if self.max_upload_mib == 0 {
            return Err(format!("{section}.max_upload_mib must be non-zero"));
        }
        if self.budget_bytes == 0 {
            return Err(format!("{section}.budget_bytes must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_site_defaults() {
        let category = ContextSettings::defaults_for(ImageContext::Category);
        assert_eq!(category.bounds(), BoundingBox::new(800, 800));
        assert_eq!(category.limits().max_upload_bytes, 5 * 1024 * 1024);

        let product = ContextSettings::defaults_for(ImageContext::Product);
        assert_eq!(product.bounds(), BoundingBox::new(1200, 1200));
        assert_eq!(product.limits().max_upload_bytes, 10 * 1024 * 1024);

        let banner = ContextSettings::defaults_for(ImageContext::Banner);
        assert_eq!(banner.bounds(), BoundingBox::new(1600, 600));
        assert_eq!(banner.limits().max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn defaults_keep_original_at_high() {
        for context in ImageContext::ALL {
            let settings = ContextSettings::defaults_for(context);
            assert_eq!(settings.format, FormatChoice::Original);
            assert_eq!(settings.tier, CompressionTier::High);
            assert_eq!(settings.budget_bytes, 1_048_576);
        }
    }

    #[test]
    fn profile_uses_settings_without_overrides() {
        let settings = ContextSettings::defaults_for(ImageContext::Banner);
        let profile = settings.profile(None, None);
        assert_eq!(profile.format, FormatChoice::Original);
        assert_eq!(profile.tier, CompressionTier::High);
        assert_eq!(profile.bounds, BoundingBox::new(1600, 600));
        assert_eq!(profile.budget_bytes, settings.budget_bytes);
    }

    #[test]
    fn profile_applies_request_overrides() {
        let settings = ContextSettings::defaults_for(ImageContext::Product);
        let profile = settings.profile(Some(FormatChoice::WebP), Some(CompressionTier::Low));
        assert_eq!(profile.format, FormatChoice::WebP);
        assert_eq!(profile.tier, CompressionTier::Low);
        assert_eq!(profile.bounds, BoundingBox::new(1200, 1200));
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut settings = ContextSettings::defaults_for(ImageContext::Category);
        assert!(settings.validate("category").is_ok());

        settings.max_height = 0;
        let err = settings.validate("category").unwrap_err();
        assert!(err.starts_with("category."));

        let mut settings = ContextSettings::defaults_for(ImageContext::Category);
        settings.budget_bytes = 0;
        assert!(settings.validate("category").is_err());
    }

    #[test]
    fn context_display() {
        assert_eq!(ImageContext::Product.to_string(), "product");
    }
}
