//! Crate-level error type.
//!
//! Each module keeps its own error enum; this type unifies the ones that
//! cross the public API so callers can use a single `?`.

use crate::backend::QueryError;
use crate::catalog::CatalogError;
use crate::config::{ConfigError, SettingsError};
use crate::export::ExportError;

/// Errors surfaced by the query layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection settings are absent or invalid. Fatal to the request only.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The engine or the transport failed. Never retried by this crate.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl Error {
    /// True for missing or invalid connection configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
