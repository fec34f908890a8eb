use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tryon_client::DetectionClientConfig;
use tryon_core::compositor::{CIRCULAR_SCALE, ELONGATED_SCALE};
use tryon_core::{Catalog, CatalogError, ScaleFactors};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set (add it to .env)")]
    Missing(&'static str),
}

/// CLI configuration, loaded from environment variables (and `.env`).
pub struct Config {
    /// Detection service endpoint.
    pub api_url: String,
    /// Bearer credential for the detection service.
    pub bearer_token: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Base directory catalog asset paths are resolved against.
    pub asset_dir: PathBuf,
    /// Optional TOML catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
    /// Resize factors for circular / elongated earrings.
    pub scales: ScaleFactors,
    /// V4L2 device used for `--capture`.
    pub camera_device: String,
    /// Frames discarded before taking the still (auto-exposure settling).
    pub warmup_frames: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`. `API_URL` and `BEARER_TOKEN`
    /// are required; everything else falls back to a default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Self {
            api_url: required("API_URL")?,
            bearer_token: required("BEARER_TOKEN")?,
            timeout_secs: parsed(&lookup, "TRYON_TIMEOUT_SECS", 30),
            asset_dir: lookup("TRYON_ASSET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            catalog_path: lookup("TRYON_CATALOG").map(PathBuf::from),
            scales: ScaleFactors {
                circular: scale(&lookup, "TRYON_CIRCULAR_SCALE", CIRCULAR_SCALE),
                elongated: scale(&lookup, "TRYON_ELONGATED_SCALE", ELONGATED_SCALE),
            },
            camera_device: lookup("TRYON_CAMERA_DEVICE")
                .unwrap_or_else(|| "/dev/video0".to_string()),
            warmup_frames: parsed(&lookup, "TRYON_WARMUP_FRAMES", 4),
        })
    }

    pub fn client_config(&self) -> DetectionClientConfig {
        DetectionClientConfig::new(&self.api_url, &self.bearer_token)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::builtin().clone()),
        }
    }

    /// Resolved settings for display, with the token masked.
    pub fn status_json(&self) -> serde_json::Value {
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "api_url": self.api_url,
            "bearer_token": mask(&self.bearer_token),
            "timeout_secs": self.timeout_secs,
            "asset_dir": self.asset_dir.display().to_string(),
            "catalog": self
                .catalog_path
                .as_ref()
                .map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
            "circular_scale": self.scales.circular,
            "elongated_scale": self.scales.elongated,
            "camera_device": self.camera_device,
            "warmup_frames": self.warmup_frames,
        })
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn scale(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    let value: f64 = parsed(lookup, key, default);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        tracing::warn!(key, value, default, "ignoring non-positive scale factor");
        default
    }
}

/// Keep only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("API_URL", "https://detect.example/api"),
        ("BEARER_TOKEN", "tok-1234567890"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_url, "https://detect.example/api");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.asset_dir, PathBuf::from("."));
        assert!(config.catalog_path.is_none());
        assert_eq!(config.scales, ScaleFactors::default());
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.warmup_frames, 4);
    }

    #[test]
    fn test_missing_api_url_is_fatal() {
        let err = Config::from_lookup(lookup(&[("BEARER_TOKEN", "t")])).err();
        assert!(matches!(err, Some(ConfigError::Missing("API_URL"))));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let err =
            Config::from_lookup(lookup(&[("API_URL", "http://x"), ("BEARER_TOKEN", " ")])).err();
        assert!(matches!(err, Some(ConfigError::Missing("BEARER_TOKEN"))));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("TRYON_TIMEOUT_SECS", "5"),
            ("TRYON_ASSET_DIR", "/srv/assets"),
            ("TRYON_CATALOG", "/srv/catalog.toml"),
            ("TRYON_CIRCULAR_SCALE", "0.05"),
            ("TRYON_ELONGATED_SCALE", "0.2"),
            ("TRYON_CAMERA_DEVICE", "/dev/video2"),
            ("TRYON_WARMUP_FRAMES", "0"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.client_config().timeout, Duration::from_secs(5));
        assert_eq!(config.asset_dir, PathBuf::from("/srv/assets"));
        assert_eq!(config.catalog_path, Some(PathBuf::from("/srv/catalog.toml")));
        assert_eq!(config.scales, ScaleFactors { circular: 0.05, elongated: 0.2 });
        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!(config.warmup_frames, 0);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("TRYON_TIMEOUT_SECS", "soon"),
            ("TRYON_CIRCULAR_SCALE", "-1"),
            ("TRYON_ELONGATED_SCALE", "NaN"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.scales, ScaleFactors::default());
    }

    #[test]
    fn test_status_masks_token() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        let status = config.status_json().to_string();
        assert!(!status.contains("tok-1234567890"));
        assert!(status.contains("****7890"));
        assert!(status.contains("built-in"));
    }

    #[test]
    fn test_mask_short_secret() {
        assert_eq!(mask("abc"), "****");
    }
}
