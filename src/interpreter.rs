//! Tree-walking evaluator.
//!
//! Statements produce a [`Flow`]: either they complete normally or a `return`
//! is unwinding toward the nearest call boundary.  Runtime errors travel in
//! the `Err` side of [`Result`] and abort the whole `interpret` call.
//!
//! Variable, assignment and `this` nodes consult the distance map filled by
//! [`Interpreter::note_locals`]; nodes without an entry are globals.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::callable::{Callable, Function, NativeFunction, INITIALIZER};
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{KrustError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

fn clock(_interpreter: &mut Interpreter, _args: &[Value]) -> std::result::Result<Value, String> {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64))
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");
        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            }))),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Records resolver output.  Entries accumulate across REPL inputs so
    /// closures created by earlier inputs keep their distances.
    pub fn note_locals(&mut self, locals: Locals) {
        debug!("Noting {} resolved locals", locals.len());
        self.locals.extend(locals);
    }

    /// Names currently bound in the global frame.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names().map(str::to_string).collect()
    }

    /// Runs a resolved program against the global frame.  Stops at the first
    /// runtime error; output already produced stays produced.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(_) = self.execute(stmt)? {
                unreachable!("resolver rejects top-level return");
            }
        }

        self.out.flush()?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(frame)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                // Bound first so methods can mention their own class.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let superclass = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Callable(Callable::Class(class)) => Some(class),
                        _ => {
                            let token = match &expr.kind {
                                ExprKind::Variable(token) => token,
                                _ => name,
                            };
                            return Err(KrustError::runtime(token, "Superclass must be a class."));
                        }
                    },
                    None => None,
                };

                let methods = methods
                    .iter()
                    .map(|method| {
                        let function = Function::new(
                            Rc::clone(method),
                            Rc::clone(&self.environment),
                            method.name.lexeme == INITIALIZER,
                        );
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(name.lexeme.clone(), superclass, methods);
                info!("Class '{}' defined", name.lexeme);

                self.environment.borrow_mut().assign(
                    name,
                    Value::Callable(Callable::Class(Rc::new(class))),
                )?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` inside `environment`, restoring the current frame on
    /// every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Variable(name) | ExprKind::This(name) => self.look_up_variable(expr.id, name),

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let decided = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match (&operator.token_type, right) {
                    (TokenType::BANG, right) => Ok(Value::Bool(!right.is_truthy())),
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenType::MINUS, _) => {
                        Err(KrustError::runtime(operator, "Operand must be a number."))
                    }
                    _ => unreachable!("parser only builds unary nodes from '!' and '-'"),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(KrustError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if values.len() != callable.arity() {
                    return Err(KrustError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                callable.call(self, paren, values)
            }

            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(KrustError::runtime(name, "Only instances have properties.")),
            },

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(KrustError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(self.environment.borrow().get_at(distance, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }
}

/// Binary operators, dispatched on the kinds of both operands.  Operands of
/// different kinds are never equal and support nothing but `==` / `!=`.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let op = &operator.token_type;

    match (left, right) {
        (Value::String(a), Value::String(b)) => match op {
            TokenType::PLUS => Ok(Value::String(a + &b)),
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(a == b)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(a != b)),
            _ => Err(KrustError::runtime(operator, "Invalid string operator.")),
        },

        (Value::Nil, Value::Nil) => match op {
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(true)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(false)),
            _ => Err(KrustError::runtime(operator, "Invalid nil operator.")),
        },

        (Value::Bool(a), Value::Bool(b)) => match op {
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(a == b)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(a != b)),
            _ => Err(KrustError::runtime(operator, "Invalid boolean operator.")),
        },

        (Value::Number(a), Value::Number(b)) => match op {
            TokenType::PLUS => Ok(Value::Number(a + b)),
            TokenType::MINUS => Ok(Value::Number(a - b)),
            TokenType::STAR => Ok(Value::Number(a * b)),
            TokenType::SLASH if b == 0.0 => {
                Err(KrustError::runtime(operator, "Attempted division by zero."))
            }
            TokenType::SLASH => Ok(Value::Number(a / b)),
            TokenType::GREATER => Ok(Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
            TokenType::LESS => Ok(Value::Bool(a < b)),
            TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(a == b)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(a != b)),
            _ => unreachable!("parser only builds binary nodes from binary operators"),
        },

        (left, right) => match op {
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(false)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(true)),
            _ => {
                debug!(
                    "Mismatched operands: {} {} {}",
                    left.kind(),
                    operator.lexeme,
                    right.kind()
                );
                Err(KrustError::runtime(
                    operator,
                    "Invalid operator on mismatched types.",
                ))
            }
        },
    }
}
