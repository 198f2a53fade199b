//! Loader for WAFL, an indentation-based configuration format with imports,
//! tags, expressions, conditional list items and schema validation.
//!
//! ```no_run
//! use wafl::Config;
//!
//! let loaded = Config::builder().with_file("config/app.wafl").load()?;
//! println!("{}", serde_json::to_string_pretty(&loaded.config).unwrap_or_default());
//! # Ok::<(), wafl::Error>(())
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod expr;
pub mod parser;
pub mod schema;
pub mod tags;
mod error;

pub use config::{Config, ConfigError, Env, FileSystem, Loaded, Metadata, OsFileSystem};
pub use context::EvalContext;
pub use document::{merge, Mapping, Node};
pub use error::Error;
pub use schema::SchemaError;
pub use tags::{TagContext, TagError, TagRegistry};
