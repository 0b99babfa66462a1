/*!
Recursive-descent parser for Krust.

### Time & Space

Each token is consumed once via `advance()`, so a parse is Θ(n) in the number
of tokens; error recovery (`synchronize`) only discards tokens up to the next
statement boundary.  The AST holds one `Box` per interior node; call-stack
depth grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`                | `debug`| High‑level descent into grammar branches. |
| Error recovery               | `debug`| Context before resynchronising.           |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
returnStmt     → "return" expression? ";" ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" ;
```

`for` has no node of its own: it is desugared into a `Block` holding the
initializer and a `While` whose body runs the original body then the increment.
*/

use std::rc::Rc;

use crate::ast::{Expr, ExprIds, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::error::{KrustError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARGS: usize = 255;

/// Top‑level parser over an owned token buffer.
pub struct Parser<'i> {
    tokens: Vec<Token>,
    current: usize,
    ids: &'i mut ExprIds,
}

impl<'i> Parser<'i> {
    /// Construct a new parser.  `tokens` must end with an `EOF` token, which
    /// the scanner always emits.
    pub fn new(mut tokens: Vec<Token>, ids: &'i mut ExprIds) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if !matches!(tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            ids,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Parsing recovers at statement boundaries, so
    /// every syntax error in the input is reported, not just the first.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<KrustError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();
        let mut errors: Vec<KrustError> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            info!("Parsed {} statements", statements.len());
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    /// Parse a single expression followed by EOF (used by the `parse` command).
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let expr = self.expression()?;

        if !self.is_at_end() {
            return Err(KrustError::parse(self.peek(), "Expect end of expression."));
        }

        Ok(expr)
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr::new(self.ids.fresh(), kind)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            Ok(Stmt::Function(self.function("function")?))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass = if self.matches(TokenType::LESS) {
            let super_name = self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;
            Some(self.expr(ExprKind::Variable(super_name)))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token = self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(KrustError::parse(
                        self.peek(),
                        "Can't have more than 255 parameters.",
                    ));
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let keyword_line = self.previous().line;
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = match condition {
            Some(c) => c,
            None => self.expr(ExprKind::Literal(LiteralValue::True)),
        };
        debug!("Desugared for loop at line {}", keyword_line);

        let mut desugared = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }

        Ok(desugared)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr.kind {
                ExprKind::Variable(name) => Ok(self.expr(ExprKind::Assign {
                    name,
                    value: Box::new(value),
                })),

                ExprKind::Get { object, name } => Ok(self.expr(ExprKind::Set {
                    object,
                    name,
                    value: Box::new(value),
                })),

                _ => Err(KrustError::parse(&equals, "Invalid assignment target.")),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = self.expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = self.expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Shared loop for the left-associative binary precedence levels.
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while operators.iter().any(|op| self.check(op.clone())) {
            let operator: Token = self.advance().clone();
            let right: Expr = operand(self)?;

            expr = self.expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::SLASH, TokenType::STAR], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(self.expr(ExprKind::Unary {
                operator,
                right: Box::new(right),
            }));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = self.expr(ExprKind::Get {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(KrustError::parse(
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    ));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(self.expr(ExprKind::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(self.expr(ExprKind::Literal(LiteralValue::False)));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(self.expr(ExprKind::Literal(LiteralValue::True)));
        }
        if self.matches(TokenType::NIL) {
            return Ok(self.expr(ExprKind::Literal(LiteralValue::Nil)));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(self.expr(ExprKind::Literal(LiteralValue::Number(n))));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s = s.clone();
            self.advance();
            return Ok(self.expr(ExprKind::Literal(LiteralValue::Str(s))));
        }

        if self.matches(TokenType::THIS) {
            let keyword = self.previous().clone();
            return Ok(self.expr(ExprKind::This(keyword)));
        }

        if self.matches(TokenType::IDENTIFIER) {
            let name = self.previous().clone();
            return Ok(self.expr(ExprKind::Variable(name)));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(self.expr(ExprKind::Grouping(Box::new(expr))));
        }

        Err(KrustError::parse(self.peek(), "Expect expression."))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(KrustError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
