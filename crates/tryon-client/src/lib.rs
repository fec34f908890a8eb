//! Client for the remote ear-landmark detection service.
//!
//! Sends one multipart request per try-on and hands back the raw body;
//! decoding the body is `tryon_core::detection`'s job.

pub mod client;
pub mod error;
pub mod types;

pub use client::{DetectionClient, DetectionClientConfig};
pub use error::{ClientError, ClientResult};
pub use types::{DetectionRequest, RawResponse, RegionFlags};
