//! Per-session selection state.
//!
//! A session starts in [`Session::Selecting`] and moves to
//! [`Session::Compositing`] exactly once. There is no transition back.

use crate::catalog::{Catalog, CatalogError};
use crate::types::EarringAsset;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("earring {0:?} already selected for this session")]
    AlreadySelected(String),
    #[error("no earring selected")]
    NotSelected,
}

/// The earring fixed for a session.
#[derive(Debug, Clone)]
pub struct Selection {
    pub name: String,
    pub asset: EarringAsset,
}

#[derive(Debug, Clone, Default)]
pub enum Session {
    #[default]
    Selecting,
    Compositing(Selection),
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the session to `asset`. Fails if a selection was already made.
    pub fn select(&mut self, asset: EarringAsset) -> Result<&Selection, SessionError> {
        if let Session::Compositing(current) = self {
            return Err(SessionError::AlreadySelected(current.name.clone()));
        }

        tracing::info!(earring = asset.name(), "earring selected");
        *self = Session::Compositing(Selection {
            name: asset.name().to_string(),
            asset,
        });
        self.selection()
    }

    /// Look up `name` in `catalog`, load its asset and select it.
    pub fn select_from_catalog(
        &mut self,
        catalog: &Catalog,
        name: &str,
        asset_dir: &Path,
    ) -> Result<&Selection, SelectError> {
        if let Session::Compositing(current) = self {
            return Err(SessionError::AlreadySelected(current.name.clone()).into());
        }
        let asset = catalog.find(name)?.load(asset_dir).map_err(CatalogError::from)?;
        Ok(self.select(asset)?)
    }

    pub fn selection(&self) -> Result<&Selection, SessionError> {
        match self {
            Session::Compositing(selection) => Ok(selection),
            Session::Selecting => Err(SessionError::NotSelected),
        }
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self, Session::Selecting)
    }
}

/// Failure while selecting from a catalog.
#[derive(Error, Debug)]
pub enum SelectError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
