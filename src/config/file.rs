//! Loading of the entry document and, recursively, its imports.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::source::FileSystem;
use super::ConfigError;
use crate::document::{merge, Mapping, Node};
use crate::parser::parse;

/// Directive keys recognised at the top level of every document.
const IMPORT_KEY: &str = "@import";
const SCHEMA_KEY: &str = "@schema";
const EVAL_KEY: &str = "@eval";

/// Information gathered while loading, alongside the merged document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Import paths declared by the entry document, as written.
    pub imports: Vec<String>,
    /// Named type specs from `@schema`; the entry's own block wins, then the
    /// first import that has one.
    pub schema: Option<Mapping>,
    /// The `@eval` block, carried through untouched.
    pub eval_block: Option<Node>,
    /// Directory of the entry document.
    pub base_dir: PathBuf,
}

/// Loads `entry` and every document it imports, merged into one tree.
///
/// Imports merge in declaration order and the importing document's own
/// content is merged last, so local keys override imported ones. A document
/// already visited during this call contributes nothing, which makes import
/// cycles harmless.
pub fn load_document(entry: &Path, fs: &dyn FileSystem) -> Result<(Node, Metadata), ConfigError> {
    let resolved = fs.real_path(entry);
    if !fs.is_file(&resolved) {
        return Err(ConfigError::FileNotFound(resolved));
    }

    let mut loader = ImportLoader {
        fs,
        visited: HashSet::new(),
    };
    let (doc, mut meta) = loader.load(&resolved)?;
    meta.base_dir = parent_dir(&resolved);
    Ok((doc, meta))
}

struct ImportLoader<'a> {
    fs: &'a dyn FileSystem,
    visited: HashSet<PathBuf>,
}

impl ImportLoader<'_> {
    fn load(&mut self, path: &Path) -> Result<(Node, Metadata), ConfigError> {
        let absolute = self.fs.real_path(path);
        if !self.visited.insert(absolute.clone()) {
            debug!(path = %absolute.display(), "skipping already loaded document");
            return Ok((Node::Mapping(Mapping::new()), Metadata::default()));
        }

        let source = read_source(self.fs, &absolute)?;
        check_header(&absolute, &source)?;
        let mut parsed = parse(&source).map_err(|source| ConfigError::ParseError {
            path: absolute.clone(),
            source,
        })?;

        let dir = parent_dir(&absolute);
        let mut meta = Metadata {
            base_dir: dir.clone(),
            ..Metadata::default()
        };
        if let Node::Mapping(mapping) = &mut parsed {
            if let Some(imports) = mapping.shift_remove(IMPORT_KEY) {
                meta.imports = import_paths(imports);
            }
            if let Some(schema) = mapping.shift_remove(SCHEMA_KEY) {
                meta.schema = match schema {
                    Node::Mapping(schema) => Some(schema),
                    other => {
                        debug!(kind = other.kind(), "ignoring non-mapping @schema block");
                        None
                    }
                };
            }
            meta.eval_block = mapping.shift_remove(EVAL_KEY);
        }
        debug!(
            path = %absolute.display(),
            imports = meta.imports.len(),
            "loaded document"
        );

        let mut merged = Node::Null;
        for import in &meta.imports {
            let target = resolve_import(self.fs, import, &dir);
            let (imported, imported_meta) = self.load(&target)?;
            merged = merge(merged, imported);
            if meta.schema.is_none() {
                meta.schema = imported_meta.schema;
            }
            if meta.eval_block.is_none() {
                meta.eval_block = imported_meta.eval_block;
            }
        }

        Ok((merge(merged, parsed), meta))
    }
}

fn read_source(fs: &dyn FileSystem, path: &Path) -> Result<String, ConfigError> {
    match fs.read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// A `%` first line must be exactly `%WAFL <major>.<minor>`.
fn check_header(path: &Path, source: &str) -> Result<(), ConfigError> {
    let Some(first) = source.lines().next().map(str::trim) else {
        return Ok(());
    };
    if first.starts_with('%') && !is_valid_header(first) {
        return Err(ConfigError::InvalidHeader {
            path: path.to_path_buf(),
            header: first.to_string(),
        });
    }
    Ok(())
}

fn is_valid_header(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("%WAFL") else {
        return false;
    };
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }
    let Some((major, minor)) = rest.trim().split_once('.') else {
        return false;
    };
    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    is_digits(major) && is_digits(minor)
}

/// `@import` may be a single path or a list of paths.
fn import_paths(node: Node) -> Vec<String> {
    match node {
        Node::Sequence(items) => items.into_iter().filter_map(scalar_text).collect(),
        Node::Mapping(mapping) => mapping.into_values().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(node: Node) -> Option<String> {
    match node {
        Node::String(s) => Some(s),
        Node::Int(i) => Some(i.to_string()),
        Node::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn resolve_import(fs: &dyn FileSystem, import: &str, current_dir: &Path) -> PathBuf {
    let path = Path::new(import);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    fs.real_path(&current_dir.join(path))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory::MemoryFileSystem;
    use crate::config::OsFileSystem;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_loads_imports_and_extracts_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "shared.wafl",
            "shared:\n  from: import\napp<App>:\n  name: Shared\n  debug: true\n",
        );
        let entry = write(
            dir.path(),
            "base.wafl",
            "%WAFL 0.1\n@import: ./shared.wafl\n@schema:\n  App:\n    name: string\napp<App>:\n  name: \"Demo\"\n",
        );

        let (doc, meta) = load_document(&entry, &OsFileSystem).unwrap();

        assert_eq!(doc.get_path("app<App>.name"), Some(&Node::from("Demo")));
        assert_eq!(doc.get_path("app<App>.debug"), Some(&Node::Bool(true)));
        assert_eq!(doc.get_path("shared.from"), Some(&Node::from("import")));
        assert_eq!(doc.get("@import"), None);
        assert_eq!(meta.imports, vec!["./shared.wafl".to_string()]);
        assert!(meta.schema.is_some());
        assert_eq!(meta.base_dir, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_missing_entry_file() {
        let result = load_document(Path::new("/nonexistent/path/config.wafl"), &OsFileSystem);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_header() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "bad.wafl", "%WAFL one\nkey: 1\n");
        let result = load_document(&entry, &OsFileSystem);
        assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));

        let entry = write(dir.path(), "other.wafl", "%YAML 1.2\nkey: 1\n");
        let result = load_document(&entry, &OsFileSystem);
        assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));
    }

    #[test]
    fn test_header_versions() {
        assert!(is_valid_header("%WAFL 0.1"));
        assert!(is_valid_header("%WAFL\t12.34"));
        assert!(!is_valid_header("%WAFL1.0"));
        assert!(!is_valid_header("%WAFL 1"));
        assert!(!is_valid_header("%WAFL 1.x"));
    }

    #[test]
    fn test_import_cycles_are_tolerated() {
        let fs = MemoryFileSystem::default()
            .with_file("/cfg/a.wafl", "@import: b.wafl\nfrom_a: 1\n")
            .with_file("/cfg/b.wafl", "@import: a.wafl\nfrom_b: 2\n");

        let (doc, meta) = load_document(Path::new("/cfg/a.wafl"), &fs).unwrap();
        assert_eq!(doc.get("from_a"), Some(&Node::Int(1)));
        assert_eq!(doc.get("from_b"), Some(&Node::Int(2)));
        assert_eq!(meta.base_dir, PathBuf::from("/cfg"));
    }

    #[test]
    fn test_local_content_overrides_imports_in_order() {
        let fs = MemoryFileSystem::default()
            .with_file(
                "/cfg/main.wafl",
                "@import:\n  - one.wafl\n  - two.wafl\nname: main\n",
            )
            .with_file(
                "/cfg/one.wafl",
                "name: one\nlevel: 1\ntags:\n  - a\n@eval:\n  mode: first\n",
            )
            .with_file("/cfg/two.wafl", "level: 2\ntags:\n  - b\n@eval:\n  mode: second\n");

        let (doc, meta) = load_document(Path::new("/cfg/main.wafl"), &fs).unwrap();
        assert_eq!(doc.get("name"), Some(&Node::from("main")));
        assert_eq!(doc.get("level"), Some(&Node::Int(2)));
        assert_eq!(
            doc.get("tags"),
            Some(&Node::Sequence(vec!["a".into(), "b".into()]))
        );
        assert_eq!(meta.imports, vec!["one.wafl", "two.wafl"]);
        assert_eq!(
            meta.eval_block.as_ref().and_then(|e| e.get("mode")),
            Some(&Node::from("first"))
        );
    }

    #[test]
    fn test_own_schema_takes_precedence() {
        let fs = MemoryFileSystem::default()
            .with_file(
                "/cfg/main.wafl",
                "@import: lib.wafl\n@schema:\n  Own:\n    a: string\n",
            )
            .with_file("/cfg/lib.wafl", "@schema:\n  Lib:\n    b: int\n");

        let (_, meta) = load_document(Path::new("/cfg/main.wafl"), &fs).unwrap();
        let schema = meta.schema.unwrap();
        assert!(schema.contains_key("Own"));
        assert!(!schema.contains_key("Lib"));
    }

    #[test]
    fn test_missing_import() {
        let fs = MemoryFileSystem::default().with_file("/cfg/main.wafl", "@import: gone.wafl\n");
        let result = load_document(Path::new("/cfg/main.wafl"), &fs);
        assert!(matches!(result, Err(ConfigError::FileNotFound(p)) if p == Path::new("/cfg/gone.wafl")));
    }
}
