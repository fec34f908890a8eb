//! tryon-hw — Image source acquisition.
//!
//! Provides V4L2 still capture and file upload, both yielding encoded
//! bytes ready for the detection service.

pub mod camera;
pub mod frame;
pub mod source;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::Frame;
pub use source::{AcquireError, AcquiredImage, ImageSource};
