//! Error types for parsing filter inputs and catalogs.
//!
//! Only inputs crossing the crate boundary can fail. Once a [`FilterSpec`]
//! or [`RelationSearchMap`] exists, applying it never errors: shapes that
//! cannot be turned into a predicate are skipped.
//!
//! [`FilterSpec`]: crate::filter::FilterSpec
//! [`RelationSearchMap`]: crate::filter::RelationSearchMap

use thiserror::Error;

/// Errors raised while reading filter specs, relation-search maps and catalogs.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A JSON document does not have the expected outer shape.
    #[error("invalid {what}: expected {expected}")]
    InvalidShape {
        what: &'static str,
        expected: &'static str,
    },

    /// A filter spec names a filter kind that does not exist.
    #[error("unknown filter kind '{0}'")]
    UnknownKind(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML catalog: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// Result type alias using FilterError.
pub type FilterResult<T> = Result<T, FilterError>;
