//! The document tree shared by every pipeline stage.
//!
//! A [`Node`] starts life as parser output and may carry unresolved markers
//! ([`Node::Expression`], [`Node::Tag`], [`Node::Conditional`]). After both
//! resolution passes only scalars, mappings and sequences remain.

mod merge;

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

pub use merge::merge;

/// Insertion-ordered mapping with unique keys.
pub type Mapping = IndexMap<String, Node>;

/// A document node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Mapping(Mapping),
    Sequence(Vec<Node>),
    /// Raw expression text from `key = expr`, evaluated during resolution.
    Expression(String),
    /// `!name(arg, ...)` invocation, dispatched through the tag registry.
    Tag(TagInvocation),
    /// `- if <cond>: <value>` list item.
    Conditional(Box<Conditional>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagInvocation {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: String,
    pub value: Node,
}

impl Node {
    pub fn expression(expr: impl Into<String>) -> Self {
        Node::Expression(expr.into())
    }

    pub fn tag(name: impl Into<String>, args: Vec<String>) -> Self {
        Node::Tag(TagInvocation {
            name: name.into(),
            args,
        })
    }

    pub fn conditional(condition: impl Into<String>, value: Node) -> Self {
        Node::Conditional(Box::new(Conditional {
            condition: condition.into(),
            value,
        }))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the node; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Int(i) => Some(*i as f64),
            Node::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a key when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Looks up a dotted path (`app.server.port`) through nested mappings.
    ///
    /// Returns `None` as soon as a segment is missing or an intermediate
    /// value is not a mapping.
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        path.split('.').try_fold(self, |current, segment| current.get(segment))
    }

    /// True when no unresolved marker is reachable from this node.
    pub fn is_resolved(&self) -> bool {
        match self {
            Node::Expression(_) | Node::Tag(_) | Node::Conditional(_) => false,
            Node::Mapping(m) => m.values().all(Node::is_resolved),
            Node::Sequence(items) => items.iter().all(Node::is_resolved),
            _ => true,
        }
    }

    /// Short name of the node's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Mapping(_) => "object",
            Node::Sequence(_) => "list",
            Node::Expression(_) => "expression",
            Node::Tag(_) => "tag",
            Node::Conditional(_) => "conditional",
        }
    }
}

impl fmt::Display for TagInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}({})", self.name, self.args.join(", "))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Int(i)
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Float(f)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Mapping(m)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => serializer.serialize_i64(*i),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) | Node::Expression(s) => serializer.serialize_str(s),
            Node::Tag(tag) => serializer.collect_str(tag),
            Node::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (key, value) in m {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Conditional(cond) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("if", &cond.condition)?;
                map.serialize_entry("value", &cond.value)?;
                map.end()
            }
        }
    }
}
