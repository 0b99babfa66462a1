//! Uniform invocation protocol over user functions, native functions and
//! classes.  The interpreter checks arity before dispatching here.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{KrustError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Name under which an initializer is declared inside a class body.
pub const INITIALIZER: &str = "init";

/// Name bound to the receiver inside a method.
pub const THIS: &str = "this";

#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Native(native) => native.arity,
            Callable::Class(class) => class.arity(),
        }
    }

    /// Invokes the callable.  `paren` locates errors raised by native code.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments),

            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(interpreter, &arguments).map_err(|msg| KrustError::runtime(paren, msg))
            }

            Callable::Class(class) => Class::construct(class, interpreter, arguments),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
            Callable::Class(class) => write!(f, "{}", class.name),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self)
    }
}

/// Host-implemented function such as `clock`.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, String>,
}

/// A user-defined function or method together with the frame it closes over.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Wraps this method in a frame that binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Function {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define(THIS, Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // The new frame hangs off the closure, not the caller's frame.
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let flow = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(environment)),
        )?;

        if self.is_initializer {
            return Ok(self.closure.borrow().get_at(0, THIS));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
