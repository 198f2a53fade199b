use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::env::Env;
use super::file::{load_document, Metadata};
use super::resolve::resolve;
use super::source::{FileSystem, OsFileSystem};
use super::ConfigError;
use crate::context::EvalContext;
use crate::document::{Mapping, Node};
use crate::error::Error;
use crate::schema::{extract, validate};
use crate::tags::{TagContext, TagError, TagRegistry};

/// The fully processed document together with what the loader learned.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub config: Node,
    pub meta: Metadata,
}

/// Builder for loading a WAFL document and everything it imports.
///
/// Loading runs in a fixed order: the entry file and its imports are parsed
/// and merged, `<Type>` annotations are recorded, tags and environment
/// expressions are resolved, symbol expressions and conditional list items
/// are evaluated, and finally the result is checked against `@schema` when
/// one is present.
///
/// ## Example
///
/// ```no_run
/// use serde::Deserialize;
/// use wafl::{Config, Env};
///
/// #[derive(Deserialize)]
/// struct App {
///     name: String,
///     version: i64,
/// }
///
/// #[derive(Deserialize)]
/// struct Settings {
///     app: App,
/// }
///
/// let settings: Settings = Config::builder()
///     .with_file("config/base.wafl")
///     .with_env(Env::new().with("SHOW_EXTRA", true))
///     .with_symbol("region", "eu-west")
///     .build()?;
/// # Ok::<(), wafl::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .load() or .build() is called"]
pub struct Config {
    entry: Option<PathBuf>,
    env: Option<Env>,
    symbols: Mapping,
    tags: Option<TagRegistry>,
    cwd: Option<PathBuf>,
    fs: Option<Arc<dyn FileSystem>>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the entry document. Relative paths resolve against the working
    /// directory (see [`with_cwd`](Self::with_cwd)).
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.entry = Some(path.as_ref().to_path_buf());
        self
    }

    /// Uses `env` for `$ENV.NAME` lookups instead of a snapshot of the
    /// process environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// Binds a symbol visible to expressions as `$name`.
    pub fn with_symbol(mut self, name: impl Into<String>, value: impl Into<Node>) -> Self {
        self.symbols.insert(name.into(), value.into());
        self
    }

    /// Binds every entry of `symbols`, replacing same-named ones.
    pub fn with_symbols(mut self, symbols: Mapping) -> Self {
        self.symbols.extend(symbols);
        self
    }

    /// Registers a tag handler, replacing a built-in of the same name.
    ///
    /// ```no_run
    /// use wafl::{Config, Node};
    ///
    /// let loaded = Config::builder()
    ///     .with_file("app.wafl")
    ///     .with_tag("upper", |args, _env, _ctx| {
    ///         Ok(Node::from(args.join(" ").to_uppercase()))
    ///     })
    ///     .load()?;
    /// # Ok::<(), wafl::Error>(())
    /// ```
    pub fn with_tag<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[String], &Env, &TagContext<'_>) -> Result<Node, TagError> + Send + Sync + 'static,
    {
        self.tags
            .get_or_insert_with(TagRegistry::new)
            .register(name, handler);
        self
    }

    /// Sets the directory a relative entry path is resolved against.
    pub fn with_cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Serves every file read through `fs` instead of the host filesystem.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Loads, resolves, evaluates and validates the entry document.
    pub fn load(self) -> Result<Loaded, Error> {
        let entry = self.entry.ok_or(Error::MissingEntry)?;
        let entry = if entry.is_absolute() {
            entry
        } else {
            let cwd = match self.cwd {
                Some(cwd) => cwd,
                None => std::env::current_dir().map_err(|e| ConfigError::ReadError {
                    path: entry.clone(),
                    source: e,
                })?,
            };
            cwd.join(entry)
        };

        let fs: Arc<dyn FileSystem> = self.fs.unwrap_or_else(|| Arc::new(OsFileSystem));
        let env = self.env.unwrap_or_else(Env::from_process);
        let tags = self.tags.unwrap_or_default();

        let (doc, mut meta) = load_document(&entry, &*fs)?;
        let annotations = extract(&doc);

        let ctx = EvalContext::new(&env, &tags, &*fs).with_base_dir(&meta.base_dir);
        let resolved = resolve(doc, &ctx)?;
        let evaluated = resolve(resolved, &ctx.with_symbols(&self.symbols))?;

        let schema = match meta.schema.take() {
            Some(schema) => Some(schema),
            None => leftover_schema(&evaluated),
        };
        if let Some(schema) = &schema {
            debug!(
                types = schema.len(),
                annotations = annotations.len(),
                "validating against schema"
            );
            validate(&evaluated, schema, &annotations)?;
        }
        meta.schema = schema;

        Ok(Loaded {
            config: evaluated,
            meta,
        })
    }

    /// Loads the document and deserializes it into `T`.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, Error> {
        let loaded = self.load()?;
        let value = serde_json::to_value(&loaded.config).map_err(ConfigError::DeserializeError)?;
        let config = serde_json::from_value(value).map_err(ConfigError::DeserializeError)?;
        Ok(config)
    }
}

/// An `@schema` key the loader did not claim, such as `@schema<T>:` whose
/// annotation is stripped during resolution.
fn leftover_schema(doc: &Node) -> Option<Mapping> {
    let Node::Mapping(mapping) = doc else {
        return None;
    };
    match mapping.get("@schema") {
        Some(Node::Mapping(schema)) => Some(schema.clone()),
        _ => None,
    }
}
