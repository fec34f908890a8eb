//! tryon-core — Earring catalog, detection response decoding and overlay compositing.
//!
//! Everything here is pure image and data handling; acquisition and the
//! network call live in `tryon-hw` and `tryon-client`.

pub mod catalog;
pub mod compositor;
pub mod detection;
pub mod pipeline;
pub mod session;
pub mod types;

pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use compositor::{Compositor, CompositeResult, ScaleFactors};
pub use detection::{parse_response, Coordinates, DetectionResults, ParseError};
pub use pipeline::{render, TryOnOutcome};
pub use session::{SelectError, Selection, Session, SessionError};
pub use types::{AssetError, EarringAsset, NormalizedLandmark, PixelLandmark, SourceError, SourceImage};
