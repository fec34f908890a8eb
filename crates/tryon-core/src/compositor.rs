//! Earring overlay compositing.
//!
//! Resizes the earring by a fixed factor chosen from its aspect, anchors it
//! on each landmark, and copies every pixel with non-zero alpha into the
//! destination. Later overlays overwrite earlier ones.

use crate::types::{EarringAsset, PixelLandmark};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

// --- Empirically tuned scale factors ---
pub const CIRCULAR_SCALE: f64 = 0.025;
pub const ELONGATED_SCALE: f64 = 0.10;

/// Resize factors keyed on whether the asset is square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub circular: f64,
    pub elongated: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            circular: CIRCULAR_SCALE,
            elongated: ELONGATED_SCALE,
        }
    }
}

impl ScaleFactors {
    pub fn for_asset(&self, asset: &EarringAsset) -> f64 {
        if asset.is_circular() {
            self.circular
        } else {
            self.elongated
        }
    }
}

/// Where the overlay sits relative to the landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchoring {
    /// Overlay centred on the landmark (studs).
    Centered,
    /// Overlay hangs from the landmark, horizontally centred (drops, hoops).
    TopCentered,
}

impl Anchoring {
    pub fn for_asset(asset: &EarringAsset) -> Self {
        if asset.is_circular() {
            Anchoring::Centered
        } else {
            Anchoring::TopCentered
        }
    }

    /// Top-left corner for an overlay of `width` x `height`, clamped to >= 0.
    ///
    /// Only the lower bound is clamped; the blit does the rest. Landmarks
    /// far outside the image saturate instead of overflowing.
    pub fn anchor(self, landmark: PixelLandmark, width: u32, height: u32) -> (i64, i64) {
        let x = landmark.x.saturating_sub(i64::from(width / 2));
        let y = match self {
            Anchoring::Centered => landmark.y.saturating_sub(i64::from(height / 2)),
            Anchoring::TopCentered => landmark.y,
        };
        (x.max(0), y.max(0))
    }
}

/// Resize with bilinear interpolation to `trunc(factor * dim)`.
///
/// Each output pixel samples the 2x2 source neighbourhood around its
/// half-pixel centre, replicating the border, so a downscale never averages
/// over a wider footprint. Returns `None` when either resized dimension
/// truncates to zero.
pub fn resize_asset(asset: &RgbaImage, factor: f64) -> Option<RgbaImage> {
    let width = (asset.width() as f64 * factor) as u32;
    let height = (asset.height() as f64 * factor) as u32;
    if width == 0 || height == 0 {
        return None;
    }

    let scale_x = asset.width() as f64 / width as f64;
    let scale_y = asset.height() as f64 / height as f64;
    let columns: Vec<Tap> = (0..width)
        .map(|x| Tap::new(x, scale_x, asset.width()))
        .collect();

    let mut resized = RgbaImage::new(width, height);
    for y in 0..height {
        let row = Tap::new(y, scale_y, asset.height());
        for (x, col) in columns.iter().enumerate() {
            let tl = asset.get_pixel(col.i0, row.i0).0;
            let tr = asset.get_pixel(col.i1, row.i0).0;
            let bl = asset.get_pixel(col.i0, row.i1).0;
            let br = asset.get_pixel(col.i1, row.i1).0;

            let mut out = [0u8; 4];
            for c in 0..4 {
                let top = f64::from(tl[c]) * (1.0 - col.frac) + f64::from(tr[c]) * col.frac;
                let bottom = f64::from(bl[c]) * (1.0 - col.frac) + f64::from(br[c]) * col.frac;
                let v = top * (1.0 - row.frac) + bottom * row.frac;
                out[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            resized.put_pixel(x as u32, y, Rgba(out));
        }
    }
    Some(resized)
}

/// Source indices and weight for one output coordinate along an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    i0: u32,
    i1: u32,
    frac: f64,
}

impl Tap {
    fn new(dst: u32, scale: f64, src_len: u32) -> Self {
        let pos = (f64::from(dst) + 0.5) * scale - 0.5;
        let floor = pos.floor();
        let last = src_len.saturating_sub(1);
        if floor < 0.0 {
            Tap { i0: 0, i1: 0, frac: 0.0 }
        } else if floor >= f64::from(last) {
            Tap { i0: last, i1: last, frac: 0.0 }
        } else {
            let i0 = floor as u32;
            Tap { i0, i1: i0 + 1, frac: pos - floor }
        }
    }
}

/// Copy every pixel of `overlay` with alpha > 0 into `dest` at `(x, y)`.
///
/// Pixels landing outside `dest`, including offsets that would overflow, are
/// skipped. Returns the number written.
pub fn blit_opaque(dest: &mut RgbImage, overlay: &RgbaImage, x: i64, y: i64) -> usize {
    let dest_w = i64::from(dest.width());
    let dest_h = i64::from(dest.height());
    let mut written = 0;

    for (ox, oy, px) in overlay.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        let (Some(dx), Some(dy)) = (x.checked_add(i64::from(ox)), y.checked_add(i64::from(oy)))
        else {
            continue;
        };
        if (0..dest_w).contains(&dx) && (0..dest_h).contains(&dy) {
            dest.put_pixel(dx as u32, dy as u32, Rgb([r, g, b]));
            written += 1;
        }
    }

    written
}

/// The source image with earrings drawn in.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub image: RgbImage,
    /// Opaque pixels written across all overlays.
    pub pixels_written: usize,
    /// Landmarks an overlay was placed on.
    pub overlays: usize,
}

/// Stateless compositor parameterised by its scale factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor {
    scales: ScaleFactors,
}

impl Compositor {
    pub fn new(scales: ScaleFactors) -> Self {
        Self { scales }
    }

    /// Draw `asset` on every landmark of every group, in order, onto a copy of `source`.
    pub fn composite(
        &self,
        source: &RgbImage,
        asset: &EarringAsset,
        groups: &[Vec<PixelLandmark>],
    ) -> CompositeResult {
        let mut image = source.clone();
        let factor = self.scales.for_asset(asset);
        let anchoring = Anchoring::for_asset(asset);

        let Some(overlay) = resize_asset(asset.image(), factor) else {
            tracing::warn!(
                asset = asset.name(),
                width = asset.width(),
                height = asset.height(),
                factor,
                "resized earring has zero size; nothing drawn"
            );
            return CompositeResult {
                image,
                pixels_written: 0,
                overlays: 0,
            };
        };

        let mut pixels_written = 0;
        let mut overlays = 0;
        for landmark in groups.iter().flatten() {
            let (x, y) = anchoring.anchor(*landmark, overlay.width(), overlay.height());
            let written = blit_opaque(&mut image, &overlay, x, y);
            tracing::debug!(
                landmark_x = landmark.x,
                landmark_y = landmark.y,
                anchor_x = x,
                anchor_y = y,
                written,
                "overlay placed"
            );
            pixels_written += written;
            overlays += 1;
        }

        CompositeResult {
            image,
            pixels_written,
            overlays,
        }
    }
}
