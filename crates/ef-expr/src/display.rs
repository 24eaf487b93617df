//! Infix rendering with minimal parentheses.

use core::fmt;

use crate::expr::{BinaryOp, Expr, UnaryOp};

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Num(v) if *v < 0.0 => PREC_NEG,
        Expr::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) => PREC_SUM,
        Expr::Binary(BinaryOp::Mul | BinaryOp::Div, _, _) => PREC_PRODUCT,
        Expr::Binary(BinaryOp::Pow, _, _) => PREC_POW,
        Expr::Unary(UnaryOp::Neg, _) => PREC_NEG,
        _ => PREC_ATOM,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Quantity(q) => write!(f, "{}", q.name()),
            Expr::Slot(slot) => write!(f, "{slot}"),
            Expr::Derivative(d) => write!(f, "{d}"),
            Expr::Unary(UnaryOp::Neg, arg) => {
                f.write_str("-")?;
                write_operand(f, arg, precedence(arg) <= PREC_NEG)
            }
            Expr::Unary(op, arg) => write!(f, "{}({arg})", op.name()),
            Expr::Binary(BinaryOp::Min, lhs, rhs) => write!(f, "min({lhs}, {rhs})"),
            Expr::Binary(BinaryOp::Max, lhs, rhs) => write!(f, "max({lhs}, {rhs})"),
            Expr::Binary(op, lhs, rhs) => {
                let prec = precedence(self);
                let (symbol, right_assoc) = match op {
                    BinaryOp::Add => (" + ", false),
                    BinaryOp::Sub => (" - ", false),
                    BinaryOp::Mul => ("*", false),
                    BinaryOp::Div => ("/", false),
                    _ => ("^", true),
                };
                let left_parens = if right_assoc {
                    precedence(lhs) <= prec
                } else {
                    precedence(lhs) < prec
                };
                // A leading minus on the right always gets parentheses.
                let right_parens = precedence(rhs) == PREC_NEG
                    || match op {
                        BinaryOp::Sub | BinaryOp::Div => precedence(rhs) <= prec,
                        _ => precedence(rhs) < prec,
                    };
                write_operand(f, lhs, left_parens)?;
                f.write_str(symbol)?;
                write_operand(f, rhs, right_parens)
            }
        }
    }
}
