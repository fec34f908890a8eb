//! Detection service request/response types.

use std::time::Duration;

/// Anatomical regions the service should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFlags {
    pub ear: bool,
    pub neck: bool,
}

impl Default for RegionFlags {
    fn default() -> Self {
        Self {
            ear: true,
            neck: false,
        }
    }
}

/// One image upload.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    /// Encoded JPEG/PNG bytes
    pub image: Vec<u8>,
    /// File name reported in the multipart part
    pub file_name: String,
    /// MIME type of `image`
    pub mime: String,
    pub regions: RegionFlags,
}

/// Undecoded service reply.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// Wall time from send to full body received
    pub elapsed: Duration,
}
