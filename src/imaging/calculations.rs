//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::BoundingBox;

/// Shrink `source` to fit inside `bounds`, preserving aspect ratio.
///
/// Never upscales: a source that already fits is returned unchanged. The
/// constraining edge lands exactly on the box edge; the other edge is rounded
/// to the nearest pixel and is never smaller than 1.
///
/// # Examples
/// ```
/// # use storefront_media::imaging::{BoundingBox, fit_within};
/// // 3000x2000 landscape into 800x800 → 800x533
/// assert_eq!(fit_within((3000, 2000), BoundingBox::new(800, 800)), (800, 533));
///
/// // Already small enough: untouched
/// assert_eq!(fit_within((640, 480), BoundingBox::new(1200, 1200)), (640, 480));
/// ```
pub fn fit_within(source: (u32, u32), bounds: BoundingBox) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w <= bounds.width && src_h <= bounds.height {
        return source;
    }

    let ratio = (bounds.width as f64 / src_w as f64).min(bounds.height as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, bounds.width.max(1));
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, bounds.height.max(1));
    (w, h)
}

/// Dimensions for one rung of the dimension ladder.
///
/// Both edges are scaled and truncated, then the original is re-fitted into
/// that box so the aspect ratio survives the truncation.
pub fn scale_dimensions(dims: (u32, u32), scale: f64) -> (u32, u32) {
    let (w, h) = dims;
    let target = BoundingBox::new(
        ((w as f64 * scale) as u32).max(1),
        ((h as f64 * scale) as u32).max(1),
    );
    fit_within(dims, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_aspect_within_one_pixel(source: (u32, u32), out: (u32, u32)) {
        let expected_h = out.0 as f64 * source.1 as f64 / source.0 as f64;
        assert!(
            (out.1 as f64 - expected_h).abs() <= 1.0,
            "{source:?} → {out:?}: height {} vs expected {expected_h:.2}",
            out.1
        );
    }

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within((3000, 2000), BoundingBox::new(800, 800)), (800, 533));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within((2000, 3000), BoundingBox::new(800, 800)), (533, 800));
    }

    #[test]
    fn fit_square_into_banner() {
        // 1600x600 banner box: height constrains
        assert_eq!(fit_within((2000, 2000), BoundingBox::new(1600, 600)), (600, 600));
    }

    #[test]
    fn fit_wide_into_banner() {
        // 4000x1000 is 4:1, box is 8:3 → width constrains
        assert_eq!(fit_within((4000, 1000), BoundingBox::new(1600, 600)), (1600, 400));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within((50, 50), BoundingBox::new(1200, 1200)), (50, 50));
        assert_eq!(fit_within((800, 800), BoundingBox::new(800, 800)), (800, 800));
    }

    #[test]
    fn fit_only_one_edge_over() {
        // Height fits, width does not
        assert_eq!(fit_within((1000, 100), BoundingBox::new(800, 800)), (800, 80));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((10000, 1), BoundingBox::new(800, 800)), (800, 1));
    }

    #[test]
    fn fit_preserves_aspect_within_one_pixel() {
        let bounds = BoundingBox::new(800, 800);
        for source in [(3000, 2000), (1234, 987), (4001, 3), (999, 1001), (5000, 5000)] {
            let out = fit_within(source, bounds);
            assert!(out.0 <= bounds.width && out.1 <= bounds.height);
            assert!(out.0 <= source.0 && out.1 <= source.1);
            assert_aspect_within_one_pixel(source, out);
        }
    }

    // =========================================================================
    // scale_dimensions tests
    // =========================================================================

    #[test]
    fn scale_truncates_then_refits() {
        // Target box 760x506 (506.35 truncated); height constrains the re-fit,
        // 800 * 506/533 = 759.47 → 759
        assert_eq!(scale_dimensions((800, 533), 0.95), (759, 506));
    }

    #[test]
    fn scale_square() {
        assert_eq!(scale_dimensions((1200, 1200), 0.75), (900, 900));
    }

    #[test]
    fn scale_never_collapses_to_zero() {
        assert_eq!(scale_dimensions((1, 1), 0.7), (1, 1));
    }

    #[test]
    fn scale_preserves_aspect() {
        for dims in [(800, 533), (1600, 400), (333, 777)] {
            for scale in [0.95, 0.9, 0.85, 0.8, 0.75, 0.7] {
                let out = scale_dimensions(dims, scale);
                assert!(out.0 <= dims.0 && out.1 <= dims.1);
                assert_aspect_within_one_pixel(dims, out);
            }
        }
    }
}
