//! Structural type checking of resolved documents.

use tracing::debug;

use crate::document::{Mapping, Node};
use crate::parser::is_numeric;

use super::annotations::{parse_annotation, TypeAnnotations};
use super::SchemaError;

/// Normalised form of a schema entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    String,
    /// `int` or `number`; both accept any numeric value.
    Number(&'static str),
    Bool,
    List(Box<TypeSpec>),
    Object(Vec<FieldSpec>),
    /// A kind with no check attached.
    Unchecked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub optional: bool,
    pub spec: TypeSpec,
}

impl TypeSpec {
    /// Reads a schema entry: a type name, `list<T>`, or a mapping of fields
    /// where a trailing `?` marks the field optional.
    pub fn from_node(node: &Node) -> TypeSpec {
        match node {
            Node::String(name) => TypeSpec::from_name(name),
            Node::Mapping(fields) => TypeSpec::Object(
                fields
                    .iter()
                    .map(|(name, spec)| {
                        let (name, optional) = match name.strip_suffix('?') {
                            Some(stripped) => (stripped, true),
                            None => (name.as_str(), false),
                        };
                        FieldSpec {
                            name: name.to_string(),
                            optional,
                            spec: TypeSpec::from_node(spec),
                        }
                    })
                    .collect(),
            ),
            other => TypeSpec::Unchecked(other.kind().to_string()),
        }
    }

    pub fn from_name(name: &str) -> TypeSpec {
        if let Some(inner) = name.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
            return TypeSpec::List(Box::new(TypeSpec::from_name(inner)));
        }
        match name {
            "string" => TypeSpec::String,
            "int" => TypeSpec::Number("int"),
            "number" => TypeSpec::Number("number"),
            "bool" | "boolean" => TypeSpec::Bool,
            other => TypeSpec::Unchecked(other.to_string()),
        }
    }
}

/// Validates `doc` against the named types in `schema`.
///
/// With annotations, each annotated path is checked against its type;
/// unknown type names and missing or null values are skipped. Without
/// annotations, top-level keys still carrying a `<Type>` suffix are checked
/// instead. The first mismatch aborts validation.
pub fn validate(
    doc: &Node,
    schema: &Mapping,
    annotations: &TypeAnnotations,
) -> Result<(), SchemaError> {
    if schema.is_empty() {
        return Ok(());
    }

    if !annotations.is_empty() {
        debug!(annotations = annotations.len(), "validating annotated paths");
        for (path, type_name) in annotations {
            let Some(spec) = schema.get(type_name) else {
                continue;
            };
            match doc.get_path(path) {
                None | Some(Node::Null) => continue,
                Some(value) => check(path, value, &TypeSpec::from_node(spec))?,
            }
        }
        return Ok(());
    }

    let Some(mapping) = doc.as_mapping() else {
        return Ok(());
    };
    debug!("validating <Type> suffixed keys");
    for (key, value) in mapping {
        let Some(annotation) = parse_annotation(key) else {
            continue;
        };
        if let Some(spec) = schema.get(annotation.type_name) {
            check(annotation.base, value, &TypeSpec::from_node(spec))?;
        }
    }
    Ok(())
}

/// Recursively asserts that `value` matches `spec`.
pub fn check(path: &str, value: &Node, spec: &TypeSpec) -> Result<(), SchemaError> {
    match spec {
        TypeSpec::String => {
            if !matches!(value, Node::String(_)) {
                return Err(mismatch(path, "string", value));
            }
        }
        TypeSpec::Number(kind) => {
            if !is_number(value) {
                return Err(mismatch(path, kind, value));
            }
        }
        TypeSpec::Bool => {
            if !matches!(value, Node::Bool(_)) {
                return Err(mismatch(path, "boolean", value));
            }
        }
        TypeSpec::List(inner) => {
            let Node::Sequence(items) = value else {
                return Err(mismatch(path, "list", value));
            };
            for (index, item) in items.iter().enumerate() {
                check(&format!("{path}[{index}]"), item, inner)?;
            }
        }
        TypeSpec::Object(fields) => {
            let Node::Mapping(mapping) = value else {
                return Err(mismatch(path, "object", value));
            };
            for field in fields {
                match mapping.get(&field.name) {
                    Some(child) => {
                        let child_path = if path.is_empty() {
                            field.name.clone()
                        } else {
                            format!("{path}.{}", field.name)
                        };
                        check(&child_path, child, &field.spec)?;
                    }
                    None if field.optional => {}
                    None => {
                        return Err(SchemaError::MissingField {
                            field: field.name.clone(),
                            path: path.to_string(),
                        })
                    }
                }
            }
        }
        TypeSpec::Unchecked(_) => {}
    }
    Ok(())
}

fn is_number(value: &Node) -> bool {
    match value {
        Node::Int(_) | Node::Float(_) => true,
        Node::String(s) => is_numeric(s.trim()),
        _ => false,
    }
}

fn mismatch(path: &str, expected: &str, actual: &Node) -> SchemaError {
    SchemaError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::schema::extract;

    fn schema(source: &str) -> Mapping {
        match parse(source).unwrap() {
            Node::Mapping(m) => m,
            other => panic!("schema source parsed to {other:?}"),
        }
    }

    fn app_schema() -> Mapping {
        schema("App:\n  name: string\n  version: number\n")
    }

    #[test]
    fn test_annotation_driven_success() {
        let typed = parse("app<App>:\n  name: Demo\n  version: 2\n").unwrap();
        let resolved = parse("app:\n  name: Demo\n  version: 2\n").unwrap();
        let annotations = extract(&typed);

        assert!(validate(&resolved, &app_schema(), &annotations).is_ok());
    }

    #[test]
    fn test_annotation_driven_mismatch_names_path() {
        let typed = parse("app<App>:\n  name: Demo\n  version: oops\n").unwrap();
        let resolved = parse("app:\n  name: Demo\n  version: oops\n").unwrap();
        let annotations = extract(&typed);

        let err = validate(&resolved, &app_schema(), &annotations).unwrap_err();
        match err {
            SchemaError::TypeMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, "app.version");
                assert_eq!(expected, "number");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_types_and_missing_paths_are_skipped() {
        let doc = parse("app:\n  name: 1\n").unwrap();
        let mut annotations = TypeAnnotations::new();
        annotations.insert("app".into(), "Unknown".into());
        annotations.insert("missing.path".into(), "App".into());
        assert!(validate(&doc, &app_schema(), &annotations).is_ok());
    }

    #[test]
    fn test_suffix_driven_fallback() {
        let doc = parse("app<App>:\n  name: 5\n  version: 1\n").unwrap();
        let err = validate(&doc, &app_schema(), &TypeAnnotations::new()).unwrap_err();
        assert!(
            matches!(&err, SchemaError::TypeMismatch { path, .. } if path == "app.name"),
            "{err}"
        );
    }

    #[test]
    fn test_missing_required_and_optional_fields() {
        let spec = TypeSpec::from_node(&Node::Mapping(schema("host: string\nport?: int\n")));
        let doc = parse("host: h\n").unwrap();
        assert!(check("db", &doc, &spec).is_ok());

        let doc = parse("port: 5432\n").unwrap();
        let err = check("db", &doc, &spec).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingField { ref field, ref path } if field == "host" && path == "db"
        ));
    }

    #[test]
    fn test_list_elements_report_index() {
        let spec = TypeSpec::from_name("list<int>");
        let doc = Node::Sequence(vec![Node::Int(1), "2".into(), "x".into()]);
        let err = check("ports", &doc, &spec).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { ref path, .. } if path == "ports[2]"
        ));
    }

    #[test]
    fn test_bool_and_unchecked_kinds() {
        assert!(check("flag", &Node::Bool(true), &TypeSpec::from_name("boolean")).is_ok());
        assert!(check("flag", &Node::Int(1), &TypeSpec::from_name("bool")).is_err());
        assert!(check("any", &Node::Null, &TypeSpec::from_name("Custom")).is_ok());
    }

    #[test]
    fn test_empty_schema_always_passes() {
        let doc = parse("app<App>:\n  name: 5\n").unwrap();
        assert!(validate(&doc, &Mapping::new(), &TypeAnnotations::new()).is_ok());
    }
}
