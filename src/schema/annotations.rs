//! `key<Type>` annotations captured before resolution strips them.

use indexmap::IndexMap;

use crate::document::Node;

/// Dotted path to declared type name, in document order.
pub type TypeAnnotations = IndexMap<String, String>;

/// A key split into its base name and annotated type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation<'a> {
    pub base: &'a str,
    pub type_name: &'a str,
}

/// Splits `name<Type>`; the type must be alphanumeric or `_`.
pub fn parse_annotation(key: &str) -> Option<Annotation<'_>> {
    let inner = key.strip_suffix('>')?;
    let open = inner.rfind('<')?;
    let type_name = &inner[open + 1..];
    if type_name.is_empty() || !type_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let base = &inner[..open];
    Some(Annotation {
        base: if base.is_empty() { key } else { base },
        type_name,
    })
}

/// The key with any annotation removed.
pub fn strip_annotation(key: &str) -> &str {
    parse_annotation(key).map_or(key, |annotation| annotation.base)
}

/// Walks mappings depth-first, recording every annotated key's dotted path.
///
/// Child paths are built from stripped keys so annotations on intermediate
/// mappings compose. Sequences are not descended into.
pub fn extract(doc: &Node) -> TypeAnnotations {
    let mut annotations = TypeAnnotations::new();
    walk(doc, "", &mut annotations);
    annotations
}

fn walk(node: &Node, path: &str, annotations: &mut TypeAnnotations) {
    let Node::Mapping(mapping) = node else {
        return;
    };

    for (key, value) in mapping {
        let clean = match parse_annotation(key) {
            Some(annotation) => {
                annotations.insert(join(path, annotation.base), annotation.type_name.to_string());
                annotation.base
            }
            None => key.as_str(),
        };
        walk(value, &join(path, clean), annotations);
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
