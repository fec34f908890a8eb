//! Response-to-image step: decode the detection body and composite.
//!
//! A body that cannot be decoded never aborts the step. The problem is
//! reported as a notice and the source image is returned untouched.

use crate::compositor::Compositor;
use crate::detection::{self, DetectionResults};
use crate::types::{EarringAsset, SourceImage};
use image::RgbImage;

/// Everything produced for display by one try-on.
#[derive(Debug, Clone)]
pub struct TryOnOutcome {
    pub image: RgbImage,
    /// User-facing messages raised along the way.
    pub notices: Vec<String>,
    pub detection: Option<DetectionResults>,
    pub overlays: usize,
    pub pixels_written: usize,
}

impl TryOnOutcome {
    pub fn has_overlay(&self) -> bool {
        self.pixels_written > 0
    }
}

/// Decode `body` and draw `asset` on every landmark it contains.
pub fn render(
    source: &SourceImage,
    asset: &EarringAsset,
    body: &str,
    compositor: &Compositor,
) -> TryOnOutcome {
    let detection = match detection::parse_response(body) {
        Ok(detection) => detection,
        Err(e) => {
            tracing::warn!(error = %e, "detection response rejected; showing source image");
            return TryOnOutcome {
                image: source.image().clone(),
                notices: vec![e.to_string()],
                detection: None,
                overlays: 0,
                pixels_written: 0,
            };
        }
    };

    let mut notices = Vec::new();
    if detection.ear_coordinates.is_empty() {
        notices.push("no ear landmarks detected".to_string());
    }

    let groups = detection
        .ear_coordinates
        .to_pixel_groups(source.width(), source.height());
    let result = compositor.composite(source.image(), asset, &groups);

    tracing::info!(
        earring = asset.name(),
        overlays = result.overlays,
        pixels_written = result.pixels_written,
        "composite complete"
    );

    TryOnOutcome {
        image: result.image,
        notices,
        detection: Some(detection),
        overlays: result.overlays,
        pixels_written: result.pixels_written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn source() -> SourceImage {
        SourceImage::from_rgb(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))).unwrap()
    }

    fn stud() -> EarringAsset {
        EarringAsset::from_image("stud", RgbaImage::from_pixel(40, 40, Rgba([255, 255, 0, 255])))
    }

    #[test]
    fn test_render_draws_on_landmark() {
        let body = r#"{"results": {"ear_coordinates": [[0.5, 0.5]], "zoom_factor": 1.0, "norm_prod_height": 1.0}}"#;
        let outcome = render(&source(), &stud(), body, &Compositor::default());

        assert!(outcome.notices.is_empty());
        assert!(outcome.has_overlay());
        assert_eq!(outcome.overlays, 1);
        assert_eq!(outcome.image.get_pixel(50, 50), &Rgb([255, 255, 0]));
    }

    #[test]
    fn test_render_malformed_json_returns_source() {
        let src = source();
        let outcome = render(&src, &stud(), "<html>502 Bad Gateway</html>", &Compositor::default());

        assert_eq!(outcome.notices.len(), 1);
        assert!(outcome.notices[0].contains("failed to decode JSON"));
        assert!(outcome.detection.is_none());
        assert!(!outcome.has_overlay());
        assert_eq!(&outcome.image, src.image());
    }

    #[test]
    fn test_render_missing_results_returns_source() {
        let src = source();
        let outcome = render(
            &src,
            &stud(),
            r#"{"ear_coordinates": [[0.5, 0.5]]}"#,
            &Compositor::default(),
        );

        assert!(outcome.notices[0].contains("'results'"));
        assert_eq!(&outcome.image, src.image());
    }

    #[test]
    fn test_render_no_landmarks() {
        let src = source();
        let outcome = render(
            &src,
            &stud(),
            r#"{"results": {"ear_coordinates": {}}}"#,
            &Compositor::default(),
        );

        assert_eq!(outcome.notices, vec!["no ear landmarks detected".to_string()]);
        assert!(outcome.detection.is_some());
        assert_eq!(&outcome.image, src.image());
    }

    #[test]
    fn test_render_out_of_range_landmarks() {
        let src = source();
        let drop = EarringAsset::from_image(
            "drop",
            RgbaImage::from_pixel(40, 100, Rgba([255, 255, 0, 255])),
        );

        let far = r#"{"results": {"ear_coordinates": [[1e300, 0.5]]}}"#;
        let outcome = render(&src, &drop, far, &Compositor::default());
        assert_eq!(outcome.overlays, 1);
        assert_eq!(outcome.pixels_written, 0);
        assert_eq!(&outcome.image, src.image());

        // Negative landmarks clamp to the top-left corner; the 4x10 drop is drawn there.
        let negative = r#"{"results": {"ear_coordinates": [[-1e300, -1e300]]}}"#;
        let outcome = render(&src, &drop, negative, &Compositor::default());
        assert_eq!(outcome.pixels_written, 40);
        assert_eq!(outcome.image.get_pixel(3, 9), &Rgb([255, 255, 0]));
        assert_eq!(outcome.image.get_pixel(4, 10), &Rgb([0, 0, 0]));
    }
}
