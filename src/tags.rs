//! Registry of `!name(args)` tag handlers.
//!
//! Two tags are built in:
//!
//! - `!rgb(r, g, b)` formats three integers as `"rgb(r, g, b)"`.
//! - `!file(path)` returns the text of a file relative to the document's
//!   base directory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::{Env, FileSystem};
use crate::document::Node;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TagError {
    #[error("unknown tag \"!{0}\"")]
    UnknownTag(String),

    #[error("!{tag} expects {expected} arguments, got {got}")]
    Arity {
        tag: String,
        expected: usize,
        got: usize,
    },

    #[error("file not found for !file: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read file for !file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("!{tag} failed: {message}")]
    Custom { tag: String, message: String },
}

/// What a tag handler can see besides its arguments.
#[derive(Clone, Copy)]
pub struct TagContext<'a> {
    /// Directory of the entry document; relative paths resolve against it.
    pub base_dir: &'a Path,
    pub fs: &'a dyn FileSystem,
}

impl fmt::Debug for TagContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagContext")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

pub type TagHandler =
    Arc<dyn Fn(&[String], &Env, &TagContext<'_>) -> Result<Node, TagError> + Send + Sync>;

/// Name to handler mapping.
#[derive(Clone)]
pub struct TagRegistry {
    handlers: HashMap<String, TagHandler>,
}

impl TagRegistry {
    /// A registry holding only the built-in tags.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("rgb", rgb);
        registry.register("file", file);
        registry
    }

    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `name`, replacing any existing handler.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[String], &Env, &TagContext<'_>) -> Result<Node, TagError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Runs the handler registered under `name`.
    pub fn run(
        &self,
        name: &str,
        args: &[String],
        env: &Env,
        ctx: &TagContext<'_>,
    ) -> Result<Node, TagError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| TagError::UnknownTag(name.to_string()))?;
        debug!(tag = name, args = ?args, "running tag");
        handler(args, env, ctx)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}

fn rgb(args: &[String], _env: &Env, _ctx: &TagContext<'_>) -> Result<Node, TagError> {
    let channels: Vec<i64> = args.iter().map(|arg| leading_int(arg)).collect();
    let [r, g, b] = channels[..] else {
        return Err(TagError::Arity {
            tag: "rgb".into(),
            expected: 3,
            got: channels.len(),
        });
    };
    Ok(Node::String(format!("rgb({r}, {g}, {b})")))
}

fn file(args: &[String], _env: &Env, ctx: &TagContext<'_>) -> Result<Node, TagError> {
    let relative = args.first().map(String::as_str).unwrap_or("");
    let resolved = ctx.fs.real_path(&ctx.base_dir.join(relative));
    if !ctx.fs.is_file(&resolved) {
        return Err(TagError::FileNotFound(resolved));
    }
    ctx.fs
        .read_to_string(&resolved)
        .map(Node::String)
        .map_err(|source| TagError::ReadError {
            path: resolved,
            source,
        })
}

/// Integer value of the leading numeric part of `s`, truncated toward zero;
/// 0 when there is none. The prefix may carry a fraction and an exponent, so
/// `"1e3"` is 1000 and `"12.7px"` is 12.
fn leading_int(s: &str) -> i64 {
    let s = s.trim();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !has_digits {
        return 0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    let prefix = &s[..end];
    match prefix.parse::<i64>() {
        Ok(value) => value,
        // Float-to-int `as` saturates and maps NaN to 0.
        Err(_) => prefix.parse::<f64>().map_or(0, |f| f.trunc() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsFileSystem;
    use std::io::Write;

    fn run(registry: &TagRegistry, name: &str, args: &[&str], base_dir: &Path) -> Result<Node, TagError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let ctx = TagContext {
            base_dir,
            fs: &OsFileSystem,
        };
        registry.run(name, &args, &Env::new(), &ctx)
    }

    #[test]
    fn test_rgb_formats_channels() {
        let registry = TagRegistry::new();
        let color = run(&registry, "rgb", &["255", "0", "0"], Path::new(".")).unwrap();
        assert_eq!(color, Node::String("rgb(255, 0, 0)".into()));
    }

    #[test]
    fn test_rgb_coerces_arguments() {
        let registry = TagRegistry::new();
        let color = run(&registry, "rgb", &["12.7", "abc", "-3"], Path::new(".")).unwrap();
        assert_eq!(color, Node::String("rgb(12, 0, -3)".into()));
    }

    #[test]
    fn test_rgb_arity() {
        let registry = TagRegistry::new();
        let err = run(&registry, "rgb", &["1", "2"], Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            TagError::Arity {
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_file_reads_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("banner.txt")).unwrap();
        write!(file, "hello\nworld").unwrap();

        let registry = TagRegistry::new();
        let text = run(&registry, "file", &["banner.txt"], dir.path()).unwrap();
        assert_eq!(text, Node::String("hello\nworld".into()));
    }

    #[test]
    fn test_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TagRegistry::new();
        let err = run(&registry, "file", &["missing.txt"], dir.path()).unwrap_err();
        assert!(matches!(err, TagError::FileNotFound(_)));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = TagRegistry::empty();
        let err = run(&registry, "rgb", &["1", "2", "3"], Path::new(".")).unwrap_err();
        assert!(matches!(err, TagError::UnknownTag(name) if name == "rgb"));
    }

    #[test]
    fn test_register_overrides_builtin() {
        let mut registry = TagRegistry::new();
        registry.register("rgb", |args: &[String], _: &Env, _: &TagContext<'_>| {
            Ok(Node::String(format!("#{}", args.join(""))))
        });
        let color = run(&registry, "rgb", &["ff", "00", "00"], Path::new(".")).unwrap();
        assert_eq!(color, Node::String("#ff0000".into()));
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int(" 7px"), 7);
        assert_eq!(leading_int("+5"), 5);
        assert_eq!(leading_int("x1"), 0);
        assert_eq!(leading_int("12.7"), 12);
        assert_eq!(leading_int("-3.9"), -3);
        assert_eq!(leading_int("1e3"), 1000);
        assert_eq!(leading_int("2.5E2px"), 250);
        assert_eq!(leading_int("4e"), 4);
        assert_eq!(leading_int(".5"), 0);
        assert_eq!(leading_int("-"), 0);
    }

    #[test]
    fn test_rgb_accepts_exponent_arguments() {
        let registry = TagRegistry::new();
        let color = run(&registry, "rgb", &["1e2", "2.55e2", "0"], Path::new(".")).unwrap();
        assert_eq!(color, Node::String("rgb(100, 255, 0)".into()));
    }
}
