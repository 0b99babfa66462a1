//! Centralised error hierarchy for the **Krust interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime) convert their failure
//! modes into one of the variants defined here.  Static diagnostics (lex,
//! parse, resolve) are accumulated and returned to the caller; a runtime error
//! aborts the current `interpret` call and is returned exactly once.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum KrustError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either ` at 'lexeme'` or ` at end`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static resolution failure (self-referencing initializer, duplicate
    /// local, `this` or `return` in the wrong place).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`.  Enables `?` on I/O ops.
    #[error("I/O error: {0}")]
    Io(String),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<io::Error> for KrustError {
    fn from(err: io::Error) -> Self {
        KrustError::Io(err.to_string())
    }
}

/// Renders where in the source a token-anchored diagnostic points.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl KrustError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        KrustError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        KrustError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        KrustError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        KrustError::Runtime {
            message,
            line: token.line,
        }
    }

    /// Conventional sysexits-style code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            KrustError::Lex { .. } | KrustError::Parse { .. } | KrustError::Resolve { .. } => 65,
            KrustError::Runtime { .. } => 70,
            KrustError::Io(_) | KrustError::Utf8(_) => 74,
        }
    }

    /// The bare message, without the line prefix/suffix.
    pub fn message(&self) -> String {
        match self {
            KrustError::Lex { message, .. }
            | KrustError::Parse { message, .. }
            | KrustError::Resolve { message, .. }
            | KrustError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, KrustError>;
