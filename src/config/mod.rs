//! Loading pipeline: file access, imports, resolution passes and the builder.

mod builder;
mod env;
mod error;
mod file;
mod resolve;
mod source;

pub use builder::{Config, Loaded};
pub use env::Env;
pub use error::ConfigError;
pub use file::{load_document, Metadata};
pub use resolve::resolve;
pub use source::{FileSystem, OsFileSystem};

#[cfg(test)]
pub(crate) use source::memory;
