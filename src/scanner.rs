//! Module `scanner` implements a one‑pass, streaming lexer for the Krust language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other iterator
//! adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, KrustError>` on each `.next()`.  Errors do not stop
//!   the scan; the caller sees every bad character in one pass.
//!
//! - `Scanner::scan_all(src) -> (Vec<Token>, Vec<KrustError>)`
//!   Convenience wrapper used by the session driver.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, allowing multi‑line and reporting unterminated errors.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//! - `//` comments are skipped with `memchr` straight to the next newline.

use crate::error::{KrustError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Lexer state over one source string.  Every slice it cuts starts and ends
/// on an ASCII byte, so it is always a valid `&str` boundary.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize, // first byte of the lexeme being scanned
    curr: usize,  // next byte to examine
    line: usize,
    emitted_eof: bool,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            emitted_eof: false,
        }
    }

    /// Scan the whole input, splitting tokens from lex errors.
    pub fn scan_all(src: &'a str) -> (Vec<Token>, Vec<KrustError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        for item in Scanner::new(src) {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        (tokens, errors)
    }

    // ── byte cursor ──

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Byte at `curr + ahead`, or `0` past the end.
    #[inline(always)]
    fn peek_at(&self, ahead: usize) -> u8 {
        self.bytes.get(self.curr + ahead).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// `two` if the next byte is `second` (consuming it), else `one`.
    #[inline(always)]
    fn either(&mut self, second: u8, two: TokenType, one: TokenType) -> TokenType {
        if self.peek_at(0) == second {
            self.curr += 1;
            two
        } else {
            one
        }
    }

    // ── lexemes ──

    /// Scans one lexeme starting at `start`.  `Ok(None)` means whitespace or
    /// a comment was skipped.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        use TokenType::*;

        let kind = match self.bump() {
            b'(' => LEFT_PAREN,
            b')' => RIGHT_PAREN,
            b'{' => LEFT_BRACE,
            b'}' => RIGHT_BRACE,
            b',' => COMMA,
            b'.' => DOT,
            b'-' => MINUS,
            b'+' => PLUS,
            b';' => SEMICOLON,
            b'*' => STAR,

            b'!' => self.either(b'=', BANG_EQUAL, BANG),
            b'=' => self.either(b'=', EQUAL_EQUAL, EQUAL),
            b'<' => self.either(b'=', LESS_EQUAL, LESS),
            b'>' => self.either(b'=', GREATER_EQUAL, GREATER),

            b'/' if self.peek_at(0) == b'/' => {
                // Leave the newline for the line counter.
                self.curr = match memchr(b'\n', &self.bytes[self.curr..]) {
                    Some(offset) => self.curr + offset,
                    None => self.bytes.len(),
                };
                return Ok(None);
            }
            b'/' => SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Step over the whole character so a multi-byte code point is
                // reported once and `start` stays on a char boundary.
                let ch = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + ch.len_utf8();

                return Err(KrustError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Body of a `"..."` literal; may span lines.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek_at(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(KrustError::lex(self.line, "Unterminated string."));
        }

        self.curr += 1; // closing quote

        let contents = &self.src[self.start + 1..self.curr - 1];
        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// `123` or `3.14`.  A trailing `.` without digits is left for the DOT token.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.peek_at(0) == b'.' && self.peek_at(1).is_ascii_digit() {
            self.curr += 1;
            self.skip_digits();
        }

        let text = &self.src[self.start..self.curr];
        TokenType::NUMBER(text.parse::<f64>().unwrap_or(0.0)) // only digits and one '.'
    }

    fn skip_digits(&mut self) {
        while self.peek_at(0).is_ascii_digit() {
            self.curr += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek_at(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    let lexeme = &self.src[self.start..self.curr];
                    debug!("Scanned {:?} on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, lexeme, self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        if self.emitted_eof {
            return None;
        }

        self.emitted_eof = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
