#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use krust::driver::{Outcome, Session};

/// In-memory `print` sink that stays readable after the session takes a copy.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Returns what was printed so far and clears the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session whose output lands in the returned buffer.
pub fn session() -> (Session, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let session = Session::with_output(Box::new(buffer.clone()));
    (session, buffer)
}

/// Runs `source` in a fresh session.
pub fn run(source: &str) -> (String, Outcome) {
    let (mut session, buffer) = session();
    let outcome = session.run(source);
    (buffer.contents(), outcome)
}

/// Runs `source`, expecting success, and returns its output.
pub fn output_of(source: &str) -> String {
    let (output, outcome) = run(source);
    assert!(
        outcome.is_ok(),
        "expected success, got {:?} (output so far: {:?})",
        outcome,
        output
    );
    output
}

/// Runs `source`, expecting a runtime error, and returns its bare message.
pub fn runtime_error_of(source: &str) -> String {
    match run(source).1 {
        Outcome::RuntimeError(e) => e.message(),
        other => panic!("expected a runtime error, got {:?}", other),
    }
}
