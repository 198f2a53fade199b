//! Classification of a single trimmed line and interpretation of bare values.

use crate::document::Node;

/// What a trimmed, non-comment line contributes to the tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line {
    /// `key:` opens a nested mapping.
    Section { key: String },
    /// `- value` or `- if cond: value`.
    ListItem(Node),
    /// `key = expr` or `key: value`.
    Assign { key: String, value: Node },
}

pub(crate) fn classify(line: &str) -> Option<Line> {
    if line.is_empty() {
        return None;
    }

    if let Some(key) = line.strip_suffix(':') {
        if !line.contains('=') {
            return Some(Line::Section {
                key: key.trim().to_string(),
            });
        }
    }

    if let Some(content) = list_content(line) {
        let item = match split_conditional(content) {
            Some((condition, value)) => Node::conditional(condition, interpret(value)),
            None => interpret(content),
        };
        return Some(Line::ListItem(item));
    }

    // The key runs up to the first ':' or '='; whichever comes first decides
    // between an expression and a plain value.
    let split = line.find([':', '='])?;
    if split == 0 {
        return None;
    }
    let key = line[..split].trim().to_string();
    let rest = line[split + 1..].trim();
    let value = if line[split..].starts_with('=') {
        Node::expression(rest)
    } else {
        interpret(rest)
    };
    Some(Line::Assign { key, value })
}

/// Returns the trimmed content after a `- ` list marker.
fn list_content(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('-')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Splits `if <cond>: <value>` at the first colon after the condition.
fn split_conditional(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("if")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let colon = rest.get(1..)?.find(':')? + 1;
    Some((rest[..colon].trim(), rest[colon + 1..].trim()))
}

/// Interprets a bare right-hand side into a typed node.
pub(crate) fn interpret(raw: &str) -> Node {
    let trimmed = raw.trim();
    match trimmed {
        "" => return Node::Null,
        "true" => return Node::Bool(true),
        "false" => return Node::Bool(false),
        _ => {}
    }

    if is_numeric(trimmed) {
        if let Some(number) = parse_number(trimmed) {
            return number;
        }
    }

    if let Some(tag) = parse_tag(trimmed) {
        return tag;
    }

    if let Some(unquoted) = unquote(trimmed) {
        return Node::String(unquoted.to_string());
    }

    Node::String(trimmed.to_string())
}

fn parse_number(s: &str) -> Option<Node> {
    if s.contains('.') {
        return s.parse::<f64>().ok().map(Node::Float);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Node::Int(i));
    }
    // Exponent forms such as `1e3` stay integral when they can.
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Node::Int(f as i64))
    } else {
        Some(Node::Float(f))
    }
}

/// Numeric literal check: optional sign, digits with an optional fraction
/// (or a bare fraction), optional exponent.
pub(crate) fn is_numeric(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// Parses `!name(arg, arg, ...)`; empty arguments are dropped.
fn parse_tag(s: &str) -> Option<Node> {
    let body = s.strip_prefix('!')?.strip_suffix(')')?;
    let open = body.find('(')?;
    let name = &body[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let args = body[open + 1..]
        .split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect();
    Some(Node::tag(name, args))
}

fn unquote(s: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if s.starts_with(quote) && s.ends_with(quote) {
            return Some(s.get(1..s.len() - 1).unwrap_or(""));
        }
    }
    None
}
