use log::debug;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::mem;

/// Every kind of token the Krust scanner produces.  Only `STRING` and
/// `NUMBER` carry a payload: the literal's decoded value.
#[allow(non_camel_case_types)]
#[rustfmt::skip]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // Punctuation.
    LEFT_PAREN, RIGHT_PAREN, LEFT_BRACE, RIGHT_BRACE,
    COMMA, DOT, MINUS, PLUS, SEMICOLON, SLASH, STAR,

    // One or two character operators.
    BANG, BANG_EQUAL,
    EQUAL, EQUAL_EQUAL,
    GREATER, GREATER_EQUAL,
    LESS, LESS_EQUAL,

    // Literals.
    IDENTIFIER,
    STRING(String),
    NUMBER(f64),

    // Keywords.  `SUPER` is reserved; nothing parses it yet.
    AND, CLASS, ELSE, FALSE, FUN, FOR, IF, NIL, OR,
    PRINT, RETURN, SUPER, THIS, TRUE, VAR, WHILE,

    EOF,
}

/// Kinds compare by variant only, so `check(TokenType::NUMBER(0.0))` matches
/// any number.
impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// The kind's name as printed by `tokenize`: `STRING`, not `STRING("hi")`.
impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::STRING(_) => f.write_str("STRING"),
            TokenType::NUMBER(_) => f.write_str("NUMBER"),
            unit => write!(f, "{:?}", unit),
        }
    }
}

/// One lexeme plus where it came from.
///
/// Tokens own their text: function declarations keep their name and
/// parameter tokens alive inside closures long after the source line that
/// produced them is gone (the REPL drops every input once it has run).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize, // 1-based
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize) -> Self {
        let lexeme: String = lexeme.into();

        debug!("Token {} '{}' on line {}", token_type, lexeme, line);

        Self {
            token_type,
            lexeme,
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 3 → "3.0", 3.14 → "3.14"
        let literal: Cow<'_, str> = match &self.token_type {
            TokenType::STRING(s) => Cow::Borrowed(s.as_str()),
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Cow::Owned(format!("{}.0", itoa::Buffer::new().format(*n as i64)))
            }
            TokenType::NUMBER(n) => Cow::Owned(n.to_string()),
            _ => Cow::Borrowed("null"),
        };

        write!(f, "{} {} {}", self.token_type, self.lexeme, literal)
    }
}
