//! Tree-walking evaluation with loose comparison semantics.

use std::cmp::Ordering;

use crate::config::Env;
use crate::document::{Mapping, Node};
use crate::parser::is_numeric;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::{truthy, EvalError};

pub(crate) struct Scope<'a> {
    pub env: &'a Env,
    pub symbols: &'a Mapping,
}

pub(crate) fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Node, EvalError> {
    match expr {
        Expr::Literal(node) => Ok(node.clone()),
        Expr::Env(name) => Ok(scope.env.get(name).cloned().unwrap_or(Node::Null)),
        Expr::Symbol(name) => scope
            .symbols
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownSymbol(name.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Node::Bool(!truthy(&value))),
                UnaryOp::Plus => Ok(to_number(&value, "+")?.into_node()),
                UnaryOp::Neg => Ok(match to_number(&value, "-")? {
                    Number::Int(i) => i
                        .checked_neg()
                        .map(Node::Int)
                        .unwrap_or(Node::Float(-(i as f64))),
                    Number::Float(f) => Node::Float(-f),
                }),
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            Ok(Node::Bool(truthy(&eval(lhs, scope)?) && truthy(&eval(rhs, scope)?)))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            Ok(Node::Bool(truthy(&eval(lhs, scope)?) || truthy(&eval(rhs, scope)?)))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn binary(op: BinaryOp, lhs: &Node, rhs: &Node) -> Result<Node, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Node::Bool(loose_eq(lhs, rhs))),
        BinaryOp::Ne => Ok(Node::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Lt => Ok(Node::Bool(compare(op, lhs, rhs)? == Ordering::Less)),
        BinaryOp::Le => Ok(Node::Bool(compare(op, lhs, rhs)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Node::Bool(compare(op, lhs, rhs)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Node::Bool(compare(op, lhs, rhs)? != Ordering::Less)),
        _ => arithmetic(op, to_number(lhs, op.symbol())?, to_number(rhs, op.symbol())?),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn into_node(self) -> Node {
        match self {
            Number::Int(i) => Node::Int(i),
            Number::Float(f) => Node::Float(f),
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Node, EvalError> {
    if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div if a.checked_rem(b) == Some(0) => a.checked_div(b),
            BinaryOp::Div => None,
            BinaryOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Rem => Some(a.checked_rem(b).unwrap_or(0)),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Node::Int(result));
        }
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => {
            // Remainder works on the integer parts.
            let (a, b) = (a.trunc() as i64, b.trunc() as i64);
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            return Ok(Node::Int(a.checked_rem(b).unwrap_or(0)));
        }
        _ => return Err(EvalError::UnexpectedToken(op.symbol().to_string())),
    };
    Ok(Node::Float(result))
}

/// Coerces an operand for arithmetic. Booleans and null count as 0/1 and 0;
/// numeric strings are parsed.
fn to_number(node: &Node, op: &str) -> Result<Number, EvalError> {
    match node {
        Node::Int(i) => Ok(Number::Int(*i)),
        Node::Float(f) => Ok(Number::Float(*f)),
        Node::Bool(b) => Ok(Number::Int(i64::from(*b))),
        Node::Null => Ok(Number::Int(0)),
        Node::String(s) => numeric_string(s).ok_or_else(|| invalid_operand(op, node)),
        _ => Err(invalid_operand(op, node)),
    }
}

fn numeric_string(s: &str) -> Option<Number> {
    let s = s.trim();
    if !is_numeric(s) {
        return None;
    }
    if !s.contains(['.', 'e', 'E']) {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Int(i));
        }
    }
    s.parse::<f64>().ok().map(Number::Float)
}

fn invalid_operand(op: &str, node: &Node) -> EvalError {
    EvalError::InvalidOperand {
        op: op.to_string(),
        kind: node.kind(),
    }
}

/// Loose equality: booleans and null compare by truthiness, numbers and
/// numeric strings compare numerically, everything else compares as text.
fn loose_eq(lhs: &Node, rhs: &Node) -> bool {
    match (lhs, rhs) {
        (Node::Null, Node::Null) => true,
        (Node::Bool(_) | Node::Null, _) | (_, Node::Bool(_) | Node::Null) => {
            truthy(lhs) == truthy(rhs)
        }
        (Node::Mapping(_) | Node::Sequence(_), _) | (_, Node::Mapping(_) | Node::Sequence(_)) => {
            lhs == rhs
        }
        _ => match (as_number(lhs), as_number(rhs)) {
            (Some(a), Some(b)) => numbers_equal(a, b),
            _ => render(lhs) == render(rhs),
        },
    }
}

fn compare(op: BinaryOp, lhs: &Node, rhs: &Node) -> Result<Ordering, EvalError> {
    let unordered = || EvalError::InvalidOperand {
        op: op.symbol().to_string(),
        kind: if matches!(lhs, Node::Mapping(_) | Node::Sequence(_)) {
            lhs.kind()
        } else {
            rhs.kind()
        },
    };
    match (lhs, rhs) {
        (Node::Mapping(_) | Node::Sequence(_), _) | (_, Node::Mapping(_) | Node::Sequence(_)) => {
            Err(unordered())
        }
        (Node::Bool(_) | Node::Null, _) | (_, Node::Bool(_) | Node::Null)
            if !matches!((lhs, rhs), (Node::Null, Node::Null)) =>
        {
            Ok(truthy(lhs).cmp(&truthy(rhs)))
        }
        _ => match (as_number(lhs), as_number(rhs)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(unordered),
            _ => Ok(render(lhs).cmp(&render(rhs))),
        },
    }
}

fn as_number(node: &Node) -> Option<Number> {
    match node {
        Node::Int(i) => Some(Number::Int(*i)),
        Node::Float(f) => Some(Number::Float(*f)),
        Node::String(s) => numeric_string(s),
        _ => None,
    }
}

fn numbers_equal(a: Number, b: Number) -> bool {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => a == b,
        (a, b) => a.as_f64() == b.as_f64(),
    }
}

fn render(node: &Node) -> String {
    match node {
        Node::String(s) | Node::Expression(s) => s.clone(),
        Node::Int(i) => i.to_string(),
        Node::Float(f) => f.to_string(),
        Node::Bool(true) => "1".to_string(),
        Node::Bool(false) | Node::Null => String::new(),
        Node::Tag(tag) => tag.to_string(),
        other => other.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ast, token};

    fn run(input: &str) -> Result<Node, EvalError> {
        let env = Env::new().with("PORT", 8080i64).with("NAME", "api");
        let mut symbols = Mapping::new();
        symbols.insert("replicas".into(), Node::Int(3));
        let scope = Scope {
            env: &env,
            symbols: &symbols,
        };
        eval(&ast::parse(&token::tokenize(input)?)?, &scope)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(run("1 + 1").unwrap(), Node::Int(2));
        assert_eq!(run("7 % 3").unwrap(), Node::Int(1));
        assert_eq!(run("-(2 * 3)").unwrap(), Node::Int(-6));
        assert_eq!(run("$replicas * 2").unwrap(), Node::Int(6));
    }

    #[test]
    fn test_division() {
        assert_eq!(run("4 / 2").unwrap(), Node::Int(2));
        assert_eq!(run("1 / 2").unwrap(), Node::Float(0.5));
        assert_eq!(run("1 / 0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(run("1 % 0").unwrap_err(), EvalError::DivisionByZero);
    }

    #[test]
    fn test_mixed_numeric_types() {
        assert_eq!(run("1 + 0.5").unwrap(), Node::Float(1.5));
        assert_eq!(run("'2' + 3").unwrap(), Node::Int(5));
        assert_eq!(run("true + 1").unwrap(), Node::Int(2));
        assert!(matches!(
            run("'abc' + 1").unwrap_err(),
            EvalError::InvalidOperand { .. }
        ));
    }

    #[test]
    fn test_overflow_widens_to_float() {
        assert_eq!(
            run("9223372036854775807 + 1").unwrap(),
            Node::Float(9223372036854775808.0)
        );
    }

    #[test]
    fn test_loose_equality() {
        assert_eq!(run("1 == 1.0").unwrap(), Node::Bool(true));
        assert_eq!(run("'10' == 10").unwrap(), Node::Bool(true));
        assert_eq!(run("$ENV.NAME == 'api'").unwrap(), Node::Bool(true));
        assert_eq!(run("$ENV.MISSING == null").unwrap(), Node::Bool(true));
        assert_eq!(run("'' == false").unwrap(), Node::Bool(true));
        assert_eq!(run("'a' != 'b'").unwrap(), Node::Bool(true));
    }

    #[test]
    fn test_relational() {
        assert_eq!(run("$ENV.PORT > 1024").unwrap(), Node::Bool(true));
        assert_eq!(run("2 <= 2").unwrap(), Node::Bool(true));
        assert_eq!(run("'apple' < 'banana'").unwrap(), Node::Bool(true));
        assert_eq!(run("'9' < '10'").unwrap(), Node::Bool(true));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(run("1 && 0").unwrap(), Node::Bool(false));
        assert_eq!(run("0 || 'x'").unwrap(), Node::Bool(true));
        assert_eq!(run("!$ENV.MISSING").unwrap(), Node::Bool(true));
    }

    #[test]
    fn test_unknown_symbol_is_an_error() {
        assert_eq!(
            run("$nope + 1").unwrap_err(),
            EvalError::UnknownSymbol("nope".into())
        );
    }
}
