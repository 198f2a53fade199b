use indexmap::IndexMap;
use tracing::trace;

use crate::document::Node;

/// Environment visible to expressions as `$ENV.NAME`.
///
/// Built once at the call boundary, either from explicit values or as a
/// snapshot of the process environment, and never consulted again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    vars: IndexMap<String, Node>,
}

impl Env {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the process environment.
    ///
    /// Values stay strings exactly as set, except `true`/`false` (any case)
    /// which become booleans so flags work in conditions. Variables whose
    /// name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    trace!(key = ?key, "skipping non UTF-8 environment variable");
                    None
                }
            }
        }))
    }

    /// Builds an environment from raw string pairs, coercing like
    /// [`from_process`](Self::from_process).
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        vars.into_iter()
            .map(|(key, value)| (key.into(), coerce_value(value.as_ref())))
            .collect()
    }

    /// Adds or replaces a variable, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Node>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.vars.get(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, Node)> for Env {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

fn coerce_value(s: &str) -> Node {
    if s.eq_ignore_ascii_case("true") {
        return Node::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Node::Bool(false);
    }
    Node::String(s.to_string())
}
