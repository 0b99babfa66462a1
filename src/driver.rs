//! Session driver: source text in, [`Outcome`] out.
//!
//! A [`Session`] owns one interpreter and one expression-id counter for its
//! whole lifetime, so a REPL accumulates globals (and closures keep working)
//! across inputs.  Diagnostics are returned instead of being recorded in
//! process-wide flags; the caller decides how to print them and which exit
//! code to use.

use std::io::Write;

use log::{debug, info};

use crate::ast::{ExprIds, Stmt};
use crate::error::KrustError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Result of running one piece of source.
#[derive(Debug)]
pub enum Outcome {
    Ok,

    /// Lex, parse or resolution errors.  Nothing was executed.
    StaticErrors(Vec<KrustError>),

    /// Execution stopped here; earlier output was already written.
    RuntimeError(KrustError),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// 0 on success, 65 for static errors, 70 for runtime errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Ok => 0,
            Outcome::StaticErrors(_) => 65,
            Outcome::RuntimeError(e) => e.exit_code(),
        }
    }

    /// All diagnostics, in the order they were found.
    pub fn errors(&self) -> Vec<&KrustError> {
        match self {
            Outcome::Ok => Vec::new(),
            Outcome::StaticErrors(errors) => errors.iter().collect(),
            Outcome::RuntimeError(e) => vec![e],
        }
    }
}

/// Decodes script bytes.  Invalid UTF-8 is an I/O-class failure (exit 74).
pub fn decode_source(bytes: Vec<u8>) -> Result<String, KrustError> {
    Ok(String::from_utf8(bytes)?)
}

pub struct Session {
    interpreter: Interpreter,
    ids: ExprIds,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session printing to stdout.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// A session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            ids: ExprIds::new(),
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Scans and parses `source` with this session's id counter.  Lex and
    /// parse errors are reported together.
    pub fn parse(&mut self, source: &str) -> Result<Vec<Stmt>, Vec<KrustError>> {
        let (tokens, mut errors) = Scanner::scan_all(source);
        debug!("Scanned {} tokens, {} lex errors", tokens.len(), errors.len());

        let mut parser = Parser::new(tokens, &mut self.ids);
        match parser.parse() {
            Ok(statements) if errors.is_empty() => Ok(statements),
            Ok(_) => Err(errors),
            Err(parse_errors) => {
                errors.extend(parse_errors);
                Err(errors)
            }
        }
    }

    /// Scan → parse → resolve → interpret.
    pub fn run(&mut self, source: &str) -> Outcome {
        let statements = match self.parse(source) {
            Ok(statements) => statements,
            Err(errors) => return Outcome::StaticErrors(errors),
        };

        let mut resolver = Resolver::with_globals(self.interpreter.global_names());
        let locals = match resolver.resolve(&statements) {
            Ok(locals) => locals,
            Err(errors) => return Outcome::StaticErrors(errors),
        };

        self.interpreter.note_locals(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => {
                info!("Program executed successfully");
                Outcome::Ok
            }
            Err(e) => {
                debug!("Runtime error: {}", e);
                Outcome::RuntimeError(e)
            }
        }
    }
}
