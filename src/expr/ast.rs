//! Precedence-climbing parser from tokens to an expression tree.

use crate::document::Node;

use super::token::Token;
use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Node),
    Env(String),
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// Binding power levels, lowest first.
const LEVELS: &[&[(Token, BinaryOp)]] = &[
    &[(Token::Or, BinaryOp::Or)],
    &[(Token::And, BinaryOp::And)],
    &[(Token::Eq, BinaryOp::Eq), (Token::Ne, BinaryOp::Ne)],
    &[
        (Token::Lt, BinaryOp::Lt),
        (Token::Le, BinaryOp::Le),
        (Token::Gt, BinaryOp::Gt),
        (Token::Ge, BinaryOp::Ge),
    ],
    &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
    &[
        (Token::Star, BinaryOp::Mul),
        (Token::Slash, BinaryOp::Div),
        (Token::Percent, BinaryOp::Rem),
    ],
];

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, EvalError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.binary(0)?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(token) => Err(EvalError::UnexpectedToken(format!("{token:?}"))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Left-associative binary operators at `level` and above.
    fn binary(&mut self, level: usize) -> Result<Expr, EvalError> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek().and_then(|token| lookup(ops, token)) {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Not) => Some(UnaryOp::Not),
            _ => None,
        };
        let Some(op) = op else {
            return self.primary();
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let expr = match self.advance() {
            Some(Token::Int(i)) => Expr::Literal(Node::Int(i)),
            Some(Token::Float(f)) => Expr::Literal(Node::Float(f)),
            Some(Token::Str(s)) => Expr::Literal(Node::String(s)),
            Some(Token::Bool(b)) => Expr::Literal(Node::Bool(b)),
            Some(Token::Null) => Expr::Literal(Node::Null),
            Some(Token::Env(name)) => Expr::Env(name),
            Some(Token::Symbol(name)) => Expr::Symbol(name),
            Some(Token::LParen) => {
                let inner = self.binary(0)?;
                match self.advance() {
                    Some(Token::RParen) => inner,
                    Some(token) => return Err(EvalError::UnexpectedToken(format!("{token:?}"))),
                    None => return Err(EvalError::UnexpectedEnd),
                }
            }
            Some(token) => return Err(EvalError::UnexpectedToken(format!("{token:?}"))),
            None => return Err(EvalError::UnexpectedEnd),
        };
        Ok(expr)
    }
}

fn lookup(ops: &[(Token, BinaryOp)], token: &Token) -> Option<BinaryOp> {
    ops.iter()
        .find(|(candidate, _)| candidate == token)
        .map(|(_, op)| *op)
}
