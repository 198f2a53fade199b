//! Restricted expression language used by `key = expr` and conditional
//! list items.
//!
//! The grammar covers literals, `$ENV.NAME` and `$name` references,
//! arithmetic, loose comparisons and boolean logic. Nothing else is
//! executable.
//!
//! [`safe_eval`] never fails: text that does not evaluate is returned as a
//! plain string.

mod ast;
mod eval;
mod token;

use thiserror::Error;
use tracing::trace;

use crate::config::Env;
use crate::document::{Mapping, Node};

/// Why an expression could not be evaluated. Only observable through
/// tracing, since [`safe_eval`] falls back to the raw text.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EvalError {
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("empty reference after '$'")]
    EmptyReference,

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown symbol: ${0}")]
    UnknownSymbol(String),

    #[error("operator '{op}' cannot be applied to {kind}")]
    InvalidOperand { op: String, kind: &'static str },

    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluates `expr` against the environment and symbol table.
///
/// Resolution order:
/// 1. `$ENV.NAME || fallback`: the variable when present and non-empty,
///    otherwise the fallback evaluated without further `||` fallbacks.
/// 2. Text containing `:` is returned verbatim.
/// 3. Otherwise the expression is tokenized, parsed and evaluated; any
///    failure returns the original text unchanged.
pub fn safe_eval(expr: &str, env: &Env, symbols: &Mapping) -> Node {
    evaluate(expr, env, symbols, true)
}

fn evaluate(expr: &str, env: &Env, symbols: &Mapping, allow_fallback: bool) -> Node {
    if allow_fallback {
        if let Some((name, fallback)) = split_fallback(expr.trim()) {
            return match env.get(name) {
                Some(value) if !is_blank(value) => value.clone(),
                _ => evaluate(fallback, env, symbols, false),
            };
        }
    }

    if expr.contains(':') {
        return Node::String(expr.to_string());
    }

    match interpret(expr, env, symbols) {
        Ok(value) => value,
        Err(err) => {
            trace!(expr, error = %err, "expression left as text");
            Node::String(expr.to_string())
        }
    }
}

fn interpret(expr: &str, env: &Env, symbols: &Mapping) -> Result<Node, EvalError> {
    let tokens = token::tokenize(expr)?;
    let tree = ast::parse(&tokens)?;
    eval::eval(&tree, &eval::Scope { env, symbols })
}

/// Matches `$ENV.NAME || rest`, returning the variable name and `rest`.
fn split_fallback(expr: &str) -> Option<(&str, &str)> {
    let rest = expr.strip_prefix("$ENV.")?;
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let (name, rest) = rest.split_at(name_len);
    let fallback = rest.trim_start().strip_prefix("||")?.trim();
    if fallback.is_empty() {
        return None;
    }
    Some((name, fallback))
}

fn is_blank(value: &Node) -> bool {
    match value {
        Node::Null => true,
        Node::String(s) => s.is_empty(),
        _ => false,
    }
}

/// True when the expression mentions a `$name` symbol, meaning it cannot be
/// evaluated until symbols are bound.
pub fn references_symbols(expr: &str) -> bool {
    token::tokenize(expr)
        .map(|tokens| tokens.iter().any(|t| matches!(t, token::Token::Symbol(_))))
        .unwrap_or(false)
}

/// Truthiness used by conditionals and logical operators.
pub fn truthy(value: &Node) -> bool {
    match value {
        Node::Null => false,
        Node::Bool(b) => *b,
        Node::Int(i) => *i != 0,
        Node::Float(f) => *f != 0.0,
        Node::String(s) => !(s.is_empty() || s == "0"),
        Node::Mapping(m) => !m.is_empty(),
        Node::Sequence(items) => !items.is_empty(),
        Node::Expression(_) | Node::Tag(_) | Node::Conditional(_) => true,
    }
}
