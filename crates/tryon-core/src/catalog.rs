//! Earring catalog.
//!
//! The built-in catalog is embedded at compile time from
//! `contrib/catalog/earrings.toml`; a TOML file of the same shape may
//! replace it at runtime.

use crate::types::{AssetError, EarringAsset};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../../contrib/catalog/earrings.toml");

static BUILTIN: OnceLock<Catalog> = OnceLock::new();

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog is empty")]
    Empty,
    #[error("duplicate earring name in catalog: {0}")]
    DuplicateName(String),
    #[error("unknown earring {name:?} (available: {available})")]
    UnknownEarring { name: String, available: String },
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// One selectable earring: display name and asset path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub path: PathBuf,
}

impl CatalogEntry {
    /// Load this entry's raster, resolving `path` against `asset_dir`.
    pub fn load(&self, asset_dir: &Path) -> Result<EarringAsset, AssetError> {
        EarringAsset::load(&self.name, &asset_dir.join(&self.path))
    }
}

/// Ordered list of earrings offered to the user.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(rename = "earring", default)]
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// The compiled-in catalog.
    pub fn builtin() -> &'static Catalog {
        BUILTIN.get_or_init(|| match Catalog::from_toml_str(BUILTIN_CATALOG) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "built-in catalog is invalid");
                Catalog { entries: Vec::new() }
            }
        })
    }

    pub fn from_toml_str(src: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(src)?;
        if catalog.entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, entry) in catalog.entries.iter().enumerate() {
            if catalog.entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let src = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), entries = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its exact display name.
    pub fn find(&self, name: &str) -> Result<&CatalogEntry, CatalogError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| CatalogError::UnknownEarring {
                name: name.to_string(),
                available: self
                    .entries
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
