//! Syntax tree consumed by the resolver and the interpreter.
//!
//! Both passes `match` exhaustively on [`ExprKind`] and [`Stmt`], so adding a
//! variant forces both of them to handle it.  Every [`Expr`] carries an
//! [`ExprId`] assigned by the parser; the resolver's distance map is keyed by
//! it, never by the node's address or structure.

use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Stable identity of one expression node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

/// Hands out fresh [`ExprId`]s.  One counter lives for a whole interpreter
/// session so ids from different REPL inputs never collide.
#[derive(Debug, Default, Clone)]
pub struct ExprIds {
    next: usize,
}

impl ExprIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: ExprId, kind: ExprKind) -> Self {
        Self { id, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable(Token),

    /// `identifier "=" expression`
    Assign { name: Token, value: Box<Expr> },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function, method or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This(Token),
}

/// A function or method declaration.  Shared behind an `Rc` because every
/// closure (and every bound method) created from it points back here.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an `ExprKind::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
