//! Evaluation context threaded through the resolution passes.

use std::path::Path;

use crate::config::{Env, FileSystem};
use crate::document::Mapping;
use crate::tags::{TagContext, TagRegistry};

/// Everything a resolution pass may consult.
///
/// A context without symbols drives the environment pass: expressions that
/// mention `$name` symbols are left in place for a later pass. Attaching
/// symbols with [`with_symbols`](Self::with_symbols) yields the context for
/// the symbol pass.
///
/// ## Example
///
/// ```
/// use wafl::{EvalContext, Env, Mapping, Node, OsFileSystem, TagRegistry};
/// use wafl::config::resolve;
///
/// let env = Env::new().with("REPLICAS", 2i64);
/// let tags = TagRegistry::new();
/// let ctx = EvalContext::new(&env, &tags, &OsFileSystem);
///
/// let doc = Node::expression("$ENV.REPLICAS * 2");
/// assert_eq!(resolve(doc, &ctx)?, Node::Int(4));
///
/// let mut symbols = Mapping::new();
/// symbols.insert("base".into(), Node::Int(10));
/// let deferred = resolve(Node::expression("$base + 1"), &ctx)?;
/// assert_eq!(deferred, Node::expression("$base + 1"));
/// assert_eq!(resolve(deferred, &ctx.with_symbols(&symbols))?, Node::Int(11));
/// # Ok::<(), wafl::TagError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    env: &'a Env,
    symbols: Option<&'a Mapping>,
    base_dir: &'a Path,
    tags: &'a TagRegistry,
    fs: &'a dyn FileSystem,
}

impl<'a> EvalContext<'a> {
    /// Creates an environment-only context rooted at the current directory.
    pub fn new(env: &'a Env, tags: &'a TagRegistry, fs: &'a dyn FileSystem) -> Self {
        Self {
            env,
            symbols: None,
            base_dir: Path::new("."),
            tags,
            fs,
        }
    }

    /// Sets the directory `!file` and other tags resolve paths against.
    pub fn with_base_dir(self, base_dir: &'a Path) -> Self {
        Self { base_dir, ..self }
    }

    /// Binds a symbol table, turning this into a symbol-pass context.
    pub fn with_symbols(self, symbols: &'a Mapping) -> Self {
        Self {
            symbols: Some(symbols),
            ..self
        }
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    /// The bound symbols, or `None` during the environment pass.
    pub fn symbols(&self) -> Option<&'a Mapping> {
        self.symbols
    }

    pub fn base_dir(&self) -> &'a Path {
        self.base_dir
    }

    pub fn tags(&self) -> &'a TagRegistry {
        self.tags
    }

    /// The view handed to tag handlers.
    pub fn tag_context(&self) -> TagContext<'a> {
        TagContext {
            base_dir: self.base_dir,
            fs: self.fs,
        }
    }
}
