//! Frame type and pixel conversion — YUYV/GREY to RGB, dark detection, JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

/// Fraction of near-black pixels above which a frame counts as dark.
pub const DARK_FRAME_THRESHOLD: f32 = 0.95;

const JPEG_QUALITY: u8 = 90;

/// A captured RGB camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Encode as baseline JPEG, the format uploaded to the detection service.
    pub fn to_jpeg(&self) -> Result<Vec<u8>, FrameError> {
        let expected = (self.width * self.height * 3) as usize;
        if self.data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: self.data.len(),
            });
        }
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
            &self.data,
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }
}

/// Integer BT.601 luma.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 77 + g as u32 * 150 + b as u32 * 29) >> 8) as u8
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Convert packed YUYV (4:2:2) to packed RGB using BT.601 limited-range coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U and V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let d = chunk[1] as i32 - 128;
        let e = chunk[3] as i32 - 128;
        for y in [chunk[0], chunk[2]] {
            let c = 298 * (y as i32 - 16);
            rgb.push(clamp_u8((c + 409 * e + 128) >> 8));
            rgb.push(clamp_u8((c - 100 * d - 208 * e + 128) >> 8));
            rgb.push(clamp_u8((c + 516 * d + 128) >> 8));
        }
    }
    Ok(rgb)
}

/// Replicate an 8-bit grayscale plane into packed RGB.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: grey.len(),
        });
    }
    Ok(grey[..expected].iter().flat_map(|&p| [p, p, p]).collect())
}

/// Check if an RGB frame is dark: more than `threshold_pct` of pixels with luma below 32.
pub fn is_dark_frame(rgb: &[u8], threshold_pct: f32) -> bool {
    let pixels = rgb.len() / 3;
    if pixels == 0 {
        return true;
    }
    let dark_count = rgb
        .chunks_exact(3)
        .filter(|px| luma(px[0], px[1], px[2]) < 32)
        .count();
    (dark_count as f32 / pixels as f32) > threshold_pct
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<u8>, width: u32, height: u32) -> Frame {
        Frame {
            data,
            width,
            height,
        }
    }

    #[test]
    fn test_yuyv_black_and_white() {
        // Y0 = 16 (black), Y1 = 235 (white), neutral chroma.
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // High V pushes red up and green down.
        let yuyv = vec![81, 90, 81, 240];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb[0] > 200, "red = {}", rgb[0]);
        assert!(rgb[1] < 50, "green = {}", rgb[1]);
        assert_eq!(&rgb[..3], &rgb[3..]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_rgb(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_grey_to_rgb() {
        let rgb = grey_to_rgb(&[7, 200], 2, 1).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 200, 200, 200]);
        assert!(grey_to_rgb(&[7], 2, 1).is_err());
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&vec![0u8; 300], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_normal() {
        assert!(!is_dark_frame(&vec![128u8; 300], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_borderline_bright() {
        // 94% dark, 6% bright → should NOT be dark
        let mut rgb = vec![10u8; 940 * 3];
        rgb.extend(vec![128u8; 60 * 3]);
        assert!(!is_dark_frame(&rgb, DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_to_jpeg_decodes() {
        let f = frame(vec![120u8; 16 * 8 * 3], 16, 8);
        let jpeg = f.to_jpeg().unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_to_jpeg_rejects_short_buffer() {
        let f = frame(vec![0u8; 10], 4, 4);
        assert!(matches!(f.to_jpeg(), Err(FrameError::InvalidLength { .. })));
    }
}
