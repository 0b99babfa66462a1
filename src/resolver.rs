//! Static resolver pass for the **Krust** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, self-referencing initializer,
//!    `this` outside a class, `return` outside a function, a class inheriting
//!    from itself).  Errors are collected; the walk always runs to the end.
//! 3. Record, for each variable occurrence, how many frames out its binding
//!    lives, so the interpreter never falls back to dynamic lookup that would
//!    see a later shadowing local.

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::callable::THIS;
use crate::error::KrustError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Distance map: expression id → number of frames to walk out.
pub type Locals = HashMap<ExprId, usize>;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
}

/// Are we inside a class body?  Used to validate `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    globals: HashMap<String, bool>,
    locals: Locals,
    errors: Vec<KrustError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            globals: HashMap::new(),
            locals: Locals::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// A resolver that knows which globals already exist at run time, so a
    /// top-level `var x = x + 1;` reads the old `x` instead of being rejected.
    pub fn with_globals<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut resolver = Self::new();
        resolver
            .globals
            .extend(names.into_iter().map(|name| (name.into(), true)));
        resolver
    }

    /// Walk all top‑level statements and hand back the distance map, or every
    /// static error found.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<Locals, Vec<KrustError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        let locals = std::mem::take(&mut self.locals);
        let errors = std::mem::take(&mut self.errors);

        if errors.is_empty() {
            info!("Resolved {} local reference(s)", locals.len());
            Ok(locals)
        } else {
            info!("Resolution failed with {} error(s)", errors.len());
            Err(errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if let ExprKind::Variable(super_name) = &superclass.kind {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }
                    }
                    self.resolve_expr(superclass);
                }

                // Methods see `this` one frame out from their parameters.
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(THIS.to_string(), true);
                }

                for method in methods {
                    self.resolve_function(method, FunctionType::Method);
                }

                self.end_scope();
                self.current_class = enclosing;
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // The name is visible inside its own body, for recursion.
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.resolve_expr(inner),

            ExprKind::Unary { right, .. } => self.resolve_expr(right),

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Variable(name) => self.resolve_local(expr.id, name),

            ExprKind::Assign { name, value } => {
                // RHS first, then bind the target.
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            ExprKind::Get { object, .. } => self.resolve_expr(object),

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(expr.id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Parameters and body share one fresh scope, matching the single frame
    /// a call creates.
    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &function.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            // Globals may be redeclared; an existing one stays readable.
            self.globals.entry(name.lexeme.clone()).or_insert(false);
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), true),
            None => self.globals.insert(name.lexeme.clone(), true),
        };
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolution error at line {}: {}", token.line, message);
        self.errors.push(KrustError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it global.
    ///
    /// A declared-but-undefined entry is the variable whose initializer is
    /// being resolved right now; it is skipped so the initializer sees the
    /// binding it shadows.  With nothing to shadow, it is an error.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let mut in_own_initializer = false;

        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            match scope.get(&name.lexeme) {
                Some(true) => {
                    debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                    self.locals.insert(id, depth);
                    return;
                }
                Some(false) => in_own_initializer = true,
                None => {}
            }
        }

        let global = self.globals.get(&name.lexeme).copied();
        if global == Some(false) {
            in_own_initializer = true;
        }

        if in_own_initializer && global != Some(true) {
            self.error(name, "Can't read local variable in its own initializer.");
            return;
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
