//! Image source acquisition: camera still or uploaded file.

use crate::camera::{Camera, CameraError};
use crate::frame::FrameError;
use std::path::{Path, PathBuf};
use thiserror::Error;

const UPLOAD_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
    #[error("unsupported upload type {0:?} (expected jpg, jpeg or png)")]
    UnsupportedType(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is empty")]
    EmptyFile(String),
}

/// Where the ear/wrist photo comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Grab a still from a V4L2 device.
    Capture { device: String, warmup_frames: usize },
    /// Read a JPEG/PNG from disk.
    Upload(PathBuf),
}

/// Encoded image bytes ready for upload, plus the metadata the
/// multipart request needs.
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
}

impl ImageSource {
    pub fn acquire(&self) -> Result<AcquiredImage, AcquireError> {
        match self {
            ImageSource::Capture {
                device,
                warmup_frames,
            } => {
                let camera = Camera::open(device)?;
                let frame = camera.capture_still(*warmup_frames)?;
                let bytes = frame.to_jpeg()?;
                tracing::info!(
                    device = %device,
                    width = frame.width,
                    height = frame.height,
                    bytes = bytes.len(),
                    "acquired camera image"
                );
                Ok(AcquiredImage {
                    bytes,
                    file_name: "capture.jpg".to_string(),
                    mime: "image/jpeg",
                })
            }
            ImageSource::Upload(path) => read_upload(path),
        }
    }
}

fn read_upload(path: &Path) -> Result<AcquiredImage, AcquireError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AcquireError::UnsupportedType(ext));
    }

    let bytes = std::fs::read(path).map_err(|source| AcquireError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(AcquireError::EmptyFile(path.display().to_string()));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("upload.{ext}"));

    tracing::info!(path = %path.display(), bytes = bytes.len(), "acquired uploaded image");

    Ok(AcquiredImage {
        mime: mime_for(&bytes, &ext),
        bytes,
        file_name,
    })
}

/// Sniff the MIME type from content, falling back to the extension.
fn mime_for(bytes: &[u8], ext: &str) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ if ext == "png" => "image/png",
        _ => "image/jpeg",
    }
}
