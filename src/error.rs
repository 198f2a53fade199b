use crate::config::ConfigError;
use crate::schema::SchemaError;
use crate::tags::TagError;
use thiserror::Error;

/// Top-level error type for the wafl library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("tag error: {0}")]
    Tag(#[from] TagError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("no entry document given; call .with_file() before loading")]
    MissingEntry,
}
