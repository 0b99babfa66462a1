use crate::error::{KrustError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One scope frame.  Frames are shared (`Rc<RefCell<_>>`) because a closure
/// keeps its defining frame alive after the block or call that created it has
/// finished.  `enclosing` is fixed at construction.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Binds `name` in this frame, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Names bound directly in this frame.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Dynamic lookup, walking outward until `name` is found.  Only used for
    /// names the resolver left to the global frame.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(KrustError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(KrustError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Reads `name` from the frame exactly `distance` links out.
    ///
    /// The resolver guarantees both that the chain is long enough and that the
    /// name is bound there; either failing means the two passes disagree about
    /// scoping, which is a bug in the interpreter, not in the script.
    pub fn get_at(&self, distance: usize, name: &str) -> Value {
        if distance == 0 {
            return match self.values.get(name) {
                Some(value) => value.clone(),
                None => panic!("resolved local '{}' is not bound in its frame", name),
            };
        }

        self.parent(distance).borrow().get_at(distance - 1, name)
    }

    /// Writes `name` in the frame exactly `distance` links out.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) {
        if distance == 0 {
            match self.values.get_mut(name) {
                Some(slot) => *slot = value,
                None => panic!("resolved local '{}' is not bound in its frame", name),
            }
            return;
        }

        self.parent(distance).borrow_mut().assign_at(distance - 1, name, value);
    }

    fn parent(&self, distance: usize) -> &Rc<RefCell<Environment>> {
        match &self.enclosing {
            Some(enclosing) => enclosing,
            None => panic!("resolved distance {} exceeds the frame chain", distance),
        }
    }
}
