//! Resolution of expressions, tags and conditional list items.
//!
//! A single traversal serves both passes; the [`EvalContext`] decides which
//! one runs. Without symbols (the environment pass) expressions that mention
//! `$name` are kept for later. With symbols everything left is evaluated.

use tracing::trace;

use crate::context::EvalContext;
use crate::document::{Conditional, Mapping, Node};
use crate::expr::{references_symbols, safe_eval, truthy};
use crate::schema::strip_annotation;
use crate::tags::TagError;

/// Resolves every marker node reachable from `doc` that `ctx` can resolve.
///
/// Mapping keys lose their `<Type>` annotation. Tag failures are the only
/// errors; expressions that fail to evaluate become their raw text.
pub fn resolve(doc: Node, ctx: &EvalContext<'_>) -> Result<Node, TagError> {
    match doc {
        Node::Mapping(mapping) => {
            let mut resolved = Mapping::with_capacity(mapping.len());
            for (key, value) in mapping {
                resolved.insert(strip_annotation(&key).to_string(), resolve(value, ctx)?);
            }
            Ok(Node::Mapping(resolved))
        }
        Node::Sequence(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Node::Conditional(cond) => {
                        if let Some(value) = resolve_conditional(*cond, ctx)? {
                            resolved.push(value);
                        }
                    }
                    other => resolved.push(resolve(other, ctx)?),
                }
            }
            Ok(Node::Sequence(resolved))
        }
        Node::Expression(expr) => Ok(evaluate(expr, ctx)),
        Node::Tag(tag) => ctx
            .tags()
            .run(&tag.name, &tag.args, ctx.env(), &ctx.tag_context()),
        // A conditional outside a sequence has nothing to drop out of, so a
        // false condition yields null.
        Node::Conditional(cond) => Ok(resolve_conditional(*cond, ctx)?.unwrap_or(Node::Null)),
        scalar => Ok(scalar),
    }
}

/// `Some` with the item to keep, `None` when the condition is false.
fn resolve_conditional(cond: Conditional, ctx: &EvalContext<'_>) -> Result<Option<Node>, TagError> {
    // The value stays untouched until the condition can be decided, so a
    // dropped item never runs its tags.
    if defers(&cond.condition, ctx) {
        trace!(condition = %cond.condition, "conditional deferred until symbols are bound");
        return Ok(Some(Node::Conditional(Box::new(cond))));
    }

    let decision = evaluate(cond.condition, ctx);
    if truthy(&decision) {
        resolve(cond.value, ctx).map(Some)
    } else {
        Ok(None)
    }
}

fn evaluate(expr: String, ctx: &EvalContext<'_>) -> Node {
    if defers(&expr, ctx) {
        trace!(expr = %expr, "expression deferred until symbols are bound");
        return Node::Expression(expr);
    }
    match ctx.symbols() {
        Some(symbols) => safe_eval(&expr, ctx.env(), symbols),
        None => safe_eval(&expr, ctx.env(), &Mapping::new()),
    }
}

fn defers(expr: &str, ctx: &EvalContext<'_>) -> bool {
    ctx.symbols().is_none() && references_symbols(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Env, OsFileSystem};
    use crate::parser::parse;
    use crate::tags::TagRegistry;

    fn resolve_with(doc: Node, env: &Env) -> Result<Node, TagError> {
        let tags = TagRegistry::new();
        let ctx = EvalContext::new(env, &tags, &OsFileSystem);
        resolve(doc, &ctx)
    }

    #[test]
    fn test_expressions_and_tags() {
        let doc = parse("app:\n  name: \"Demo\"\nvalue = 1 + 1\ncolor: !rgb(255, 0, 0)\n").unwrap();
        let resolved = resolve_with(doc, &Env::new()).unwrap();

        assert_eq!(resolved.get_path("app.name"), Some(&Node::from("Demo")));
        assert_eq!(resolved.get("value"), Some(&Node::Int(2)));
        assert_eq!(resolved.get("color"), Some(&Node::from("rgb(255, 0, 0)")));
        assert!(resolved.is_resolved());
    }

    #[test]
    fn test_conditional_items_follow_flag() {
        let doc = parse("items:\n  - first\n  - if $ENV.FLAG: \"second\"\n  - third\n").unwrap();

        let on = resolve_with(doc.clone(), &Env::new().with("FLAG", true)).unwrap();
        assert_eq!(
            on.get("items"),
            Some(&Node::Sequence(vec!["first".into(), "second".into(), "third".into()]))
        );

        let off = resolve_with(doc.clone(), &Env::new().with("FLAG", false)).unwrap();
        assert_eq!(
            off.get("items"),
            Some(&Node::Sequence(vec!["first".into(), "third".into()]))
        );

        let absent = resolve_with(doc, &Env::new()).unwrap();
        assert_eq!(absent, off);
    }

    #[test]
    fn test_fallback_expression() {
        let doc = parse("port = $ENV.MISSING || 42\n").unwrap();
        let resolved = resolve_with(doc, &Env::new()).unwrap();
        assert_eq!(resolved.get("port"), Some(&Node::Int(42)));
    }

    #[test]
    fn test_annotations_are_stripped_from_keys() {
        let doc = parse("app<App>:\n  port<Port>: 80\n").unwrap();
        let resolved = resolve_with(doc, &Env::new()).unwrap();
        assert_eq!(resolved.get_path("app.port"), Some(&Node::Int(80)));
    }

    #[test]
    fn test_symbol_expressions_wait_for_symbol_pass() {
        let doc = parse("total = $base * 2\nflags:\n  - if $enabled: on\n").unwrap();
        let env = Env::new();
        let tags = TagRegistry::new();
        let ctx = EvalContext::new(&env, &tags, &OsFileSystem);

        let first = resolve(doc, &ctx).unwrap();
        assert_eq!(first.get("total"), Some(&Node::expression("$base * 2")));
        assert!(!first.is_resolved());

        let mut symbols = Mapping::new();
        symbols.insert("base".into(), Node::Int(21));
        symbols.insert("enabled".into(), Node::Bool(true));
        let second = resolve(first, &ctx.with_symbols(&symbols)).unwrap();
        assert_eq!(second.get("total"), Some(&Node::Int(42)));
        assert_eq!(second.get("flags"), Some(&Node::Sequence(vec!["on".into()])));
        assert!(second.is_resolved());
    }

    #[test]
    fn test_false_symbol_condition_skips_its_value() {
        let doc = parse("items:\n  - a\n  - if $debug: !nope()\n").unwrap();
        let env = Env::new();
        let tags = TagRegistry::new();
        let ctx = EvalContext::new(&env, &tags, &OsFileSystem);

        let first = resolve(doc, &ctx).unwrap();
        assert_eq!(
            first.get("items"),
            Some(&Node::Sequence(vec![
                "a".into(),
                Node::conditional("$debug", Node::tag("nope", Vec::new())),
            ]))
        );

        let mut symbols = Mapping::new();
        symbols.insert("debug".into(), Node::Bool(false));
        let second = resolve(first.clone(), &ctx.with_symbols(&symbols)).unwrap();
        assert_eq!(second.get("items"), Some(&Node::Sequence(vec!["a".into()])));

        symbols.insert("debug".into(), Node::Bool(true));
        let err = resolve(first, &ctx.with_symbols(&symbols)).unwrap_err();
        assert!(matches!(err, TagError::UnknownTag(name) if name == "nope"));
    }

    #[test]
    fn test_unbound_symbol_falls_back_to_text() {
        let env = Env::new();
        let tags = TagRegistry::new();
        let symbols = Mapping::new();
        let ctx = EvalContext::new(&env, &tags, &OsFileSystem).with_symbols(&symbols);
        let resolved = resolve(Node::expression("$missing + 1"), &ctx).unwrap();
        assert_eq!(resolved, Node::from("$missing + 1"));
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let doc = parse("x: !nope(1)\n").unwrap();
        let err = resolve_with(doc, &Env::new()).unwrap_err();
        assert!(matches!(err, TagError::UnknownTag(name) if name == "nope"));
    }
}
