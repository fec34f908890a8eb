use image::{RgbImage, RgbaImage};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to load earring asset {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("source image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Landmark position as a fraction of source image width/height.
///
/// Deserializes from a two-element JSON array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct NormalizedLandmark {
    pub x: f64,
    pub y: f64,
}

impl From<[f64; 2]> for NormalizedLandmark {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl NormalizedLandmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale into pixel space, truncating toward zero.
    pub fn to_pixel(&self, width: u32, height: u32) -> PixelLandmark {
        PixelLandmark {
            x: (self.x * width as f64) as i64,
            y: (self.y * height as f64) as i64,
        }
    }
}

/// Landmark position in source image pixels. Signed: the detection
/// service is not trusted to stay inside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLandmark {
    pub x: i64,
    pub y: i64,
}

/// A named RGBA earring raster, immutable once loaded.
#[derive(Debug, Clone)]
pub struct EarringAsset {
    name: String,
    image: RgbaImage,
}

impl EarringAsset {
    /// Load an asset from disk, converting to RGBA.
    pub fn load(name: &str, path: &Path) -> Result<Self, AssetError> {
        let image = image::open(path)
            .map_err(|source| AssetError::Load {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();

        tracing::debug!(
            name,
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "loaded earring asset"
        );

        Ok(Self::from_image(name, image))
    }

    pub fn from_image(name: &str, image: RgbaImage) -> Self {
        Self {
            name: name.to_string(),
            image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Square assets are treated as studs and anchored on their centre.
    pub fn is_circular(&self) -> bool {
        self.image.width() == self.image.height()
    }
}

/// The user's ear/wrist photo, as RGB.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: RgbImage,
}

impl SourceImage {
    /// Decode JPEG/PNG bytes as delivered by the acquirer.
    pub fn decode(bytes: &[u8]) -> Result<Self, SourceError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Self::from_rgb(image)
    }

    pub fn from_rgb(image: RgbImage) -> Result<Self, SourceError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SourceError::Empty {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_to_pixel_center() {
        let p = NormalizedLandmark::new(0.5, 0.5).to_pixel(101, 75);
        assert_eq!(p, PixelLandmark { x: 50, y: 37 });
    }

    #[test]
    fn test_to_pixel_truncates_toward_zero() {
        let p = NormalizedLandmark::new(0.999, -0.004).to_pixel(100, 100);
        assert_eq!(p, PixelLandmark { x: 99, y: 0 });
    }

    #[test]
    fn test_landmark_deserializes_from_pair() {
        let lm: NormalizedLandmark = serde_json::from_str("[0.25, 0.75]").unwrap();
        assert_eq!(lm, NormalizedLandmark::new(0.25, 0.75));
        assert!(serde_json::from_str::<NormalizedLandmark>("[0.25]").is_err());
        assert!(serde_json::from_str::<NormalizedLandmark>("[0.1, 0.2, 0.3]").is_err());
    }

    #[test]
    fn test_is_circular() {
        let stud = EarringAsset::from_image("stud", RgbaImage::from_pixel(40, 40, Rgba([0; 4])));
        let drop = EarringAsset::from_image("drop", RgbaImage::from_pixel(40, 120, Rgba([0; 4])));
        assert!(stud.is_circular());
        assert!(!drop.is_circular());
    }

    #[test]
    fn test_source_decode_png() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let source = SourceImage::decode(&bytes).unwrap();
        assert_eq!((source.width(), source.height()), (3, 2));
        assert_eq!(source.image().get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_source_decode_garbage() {
        assert!(matches!(
            SourceImage::decode(b"not an image"),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn test_source_rejects_empty() {
        assert!(matches!(
            SourceImage::from_rgb(RgbImage::new(0, 10)),
            Err(SourceError::Empty { .. })
        ));
    }

    #[test]
    fn test_asset_load_missing_file() {
        let err = EarringAsset::load("x", Path::new("/nonexistent/earring.png")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/earring.png"));
    }
}
