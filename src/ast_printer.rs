use std::fmt::Write;

use crate::ast::{Expr, ExprKind, LiteralValue};

/// Renders an expression in parenthesised prefix form, e.g. `(+ 1.0 (group x))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        let mut out = String::new();
        Self::write(&mut out, expr);
        out
    }

    fn write(out: &mut String, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(LiteralValue::Number(n)) if n.fract() == 0.0 => {
                let _ = write!(out, "{:.1}", n);
            }
            ExprKind::Literal(LiteralValue::Number(n)) => {
                let _ = write!(out, "{}", n);
            }
            ExprKind::Literal(LiteralValue::Str(s)) => out.push_str(s),
            ExprKind::Literal(LiteralValue::True) => out.push_str("true"),
            ExprKind::Literal(LiteralValue::False) => out.push_str("false"),
            ExprKind::Literal(LiteralValue::Nil) => out.push_str("nil"),

            ExprKind::Variable(name) => out.push_str(&name.lexeme),
            ExprKind::This(_) => out.push_str("this"),

            ExprKind::Grouping(inner) => Self::parenthesize(out, "group", &[inner]),
            ExprKind::Unary { operator, right } => {
                Self::parenthesize(out, &operator.lexeme, &[right])
            }
            ExprKind::Binary {
                left,
                operator,
                right,
            }
            | ExprKind::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(out, &operator.lexeme, &[left, right]),

            ExprKind::Assign { name, value } => {
                let _ = write!(out, "(= {} ", name.lexeme);
                Self::write(out, value);
                out.push(')');
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                out.push_str("(call ");
                Self::write(out, callee);
                for argument in arguments {
                    out.push(' ');
                    Self::write(out, argument);
                }
                out.push(')');
            }

            ExprKind::Get { object, name } => {
                out.push_str("(. ");
                Self::write(out, object);
                let _ = write!(out, " {})", name.lexeme);
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                out.push_str("(.= ");
                Self::write(out, object);
                let _ = write!(out, " {} ", name.lexeme);
                Self::write(out, value);
                out.push(')');
            }
        }
    }

    fn parenthesize<E: AsRef<Expr>>(out: &mut String, head: &str, operands: &[E]) {
        out.push('(');
        out.push_str(head);
        for operand in operands {
            out.push(' ');
            Self::write(out, operand.as_ref());
        }
        out.push(')');
    }
}
