use std::path::PathBuf;
use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid WAFL header in '{path}': {header}")]
    InvalidHeader { path: PathBuf, header: String },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: ParseError,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] serde_json::Error),
}
