//! Tokenizer for the expression language.

use std::iter::Peekable;
use std::str::CharIndices;

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    /// `$ENV.NAME`
    Env(String),
    /// `$name`
    Symbol(String),
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    Lexer {
        input,
        chars: input.char_indices().peekable(),
    }
    .run()
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(&(pos, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }
            let token = match ch {
                '0'..='9' | '.' => self.number(pos)?,
                '"' | '\'' => self.string(ch)?,
                '$' => self.reference(pos)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.word(pos)?,
                _ => self.operator(pos, ch)?,
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut end = self.input.len();
        while let Some(&(pos, ch)) = self.chars.peek() {
            if !pred(ch) {
                end = pos;
                break;
            }
            self.chars.next();
        }
        end
    }

    fn next_is(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, EvalError> {
        let mut end = self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.next_is('.') {
            is_float = true;
            end = self.take_while(|c| c.is_ascii_digit());
        }
        if self.chars.peek().is_some_and(|&(_, c)| c == 'e' || c == 'E') {
            is_float = true;
            self.chars.next();
            if let Some(&(_, '+' | '-')) = self.chars.peek() {
                self.chars.next();
            }
            end = self.take_while(|c| c.is_ascii_digit());
        }

        let text = &self.input[start..end];
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Token::Int(i));
            }
        }
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| EvalError::InvalidNumber(text.to_string()))
    }

    fn string(&mut self, quote: char) -> Result<Token, EvalError> {
        self.chars.next();
        let mut value = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                c if c == quote => return Ok(Token::Str(value)),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(EvalError::UnterminatedString)
    }

    fn reference(&mut self, start: usize) -> Result<Token, EvalError> {
        self.chars.next();
        let name_start = start + 1;
        let end = self.take_while(is_name_char);
        let name = &self.input[name_start..end];

        if name == "ENV" && self.next_is('.') {
            let var_start = end + 1;
            let var_end = self.take_while(is_name_char);
            if var_end == var_start {
                return Err(EvalError::EmptyReference);
            }
            return Ok(Token::Env(self.input[var_start..var_end].to_string()));
        }
        if name.is_empty() {
            return Err(EvalError::EmptyReference);
        }
        Ok(Token::Symbol(name.to_string()))
    }

    fn word(&mut self, start: usize) -> Result<Token, EvalError> {
        let end = self.take_while(is_name_char);
        let word = &self.input[start..end];
        match word.to_ascii_lowercase().as_str() {
            "true" => Ok(Token::Bool(true)),
            "false" => Ok(Token::Bool(false)),
            "null" => Ok(Token::Null),
            _ => Err(EvalError::UnknownIdentifier(word.to_string())),
        }
    }

    fn operator(&mut self, pos: usize, ch: char) -> Result<Token, EvalError> {
        self.chars.next();
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' if self.next_is('=') => {
                self.next_is('=');
                Token::Eq
            }
            '!' if self.next_is('=') => {
                self.next_is('=');
                Token::Ne
            }
            '!' => Token::Not,
            '<' if self.next_is('=') => Token::Le,
            '<' if self.next_is('>') => Token::Ne,
            '<' => Token::Lt,
            '>' if self.next_is('=') => Token::Ge,
            '>' => Token::Gt,
            '&' if self.next_is('&') => Token::And,
            '|' if self.next_is('|') => Token::Or,
            _ => return Err(EvalError::UnexpectedChar { ch, pos }),
        };
        Ok(token)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
