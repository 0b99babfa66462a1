use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, Function, INITIALIZER};
use crate::error::{KrustError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

pub struct Class {
    pub name: String,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Own methods first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class takes whatever its initializer takes, or nothing.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Calling a class creates an instance and runs `init` on it.
    pub fn construct(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Constructing instance of '{}'", class.name);

        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method(INITIALIZER) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An object created by calling a class.  Fields spring into existence on
/// first assignment.
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: a field shadows a method of the same name.  Methods come
    /// back bound to `instance`.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(&name.lexeme) {
            let bound = method.bind(Rc::clone(instance));
            return Ok(Value::Callable(Callable::Function(Rc::new(bound))));
        }

        Err(KrustError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
