//! Arithmetic expressions over structure names
//!
//! Derived structures are defined by expressions such as `W / T` or
//! `CN1 + CN2 + CN3`. The source is parsed with the pest grammar in
//! `expression.pest` and folded into an [`Expr`] tree by a Pratt parser, so
//! only numbers, names, parentheses, unary minus and `+ - * /` are accepted.
//!
//! Division by zero evaluates to 0.

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
        .op(Op::prefix(Rule::neg))
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Invalid expression {expression:?}: {message}")]
    InvalidSource { expression: String, message: String },
}

impl ExpressionError {
    fn invalid(expression: &str, message: impl fmt::Display) -> Self {
        ExpressionError::InvalidSource {
            expression: expression.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

impl Expr {
    /// Evaluate, resolving names through `lookup`
    pub fn evaluate<E>(&self, lookup: &mut impl FnMut(&str) -> Result<f64, E>) -> Result<f64, E> {
        Ok(match self {
            Expr::Number(n) => *n,
            Expr::Name(name) => lookup(name)?,
            Expr::Neg(inner) => -inner.evaluate(lookup)?,
            Expr::Binary(lhs, op, rhs) => {
                let lhs = lhs.evaluate(lookup)?;
                let rhs = rhs.evaluate(lookup)?;
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div if rhs == 0.0 => 0.0,
                    BinaryOp::Div => lhs / rhs,
                }
            }
        })
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Name(name) => out.push(name),
            Expr::Neg(inner) => inner.collect_names(out),
            Expr::Binary(lhs, _, rhs) => {
                lhs.collect_names(out);
                rhs.collect_names(out);
            }
        }
    }

    fn is_additive(&self) -> bool {
        match self {
            Expr::Number(_) | Expr::Name(_) => true,
            Expr::Neg(_) => false,
            Expr::Binary(lhs, op, rhs) => {
                *op == BinaryOp::Add && lhs.is_additive() && rhs.is_additive()
            }
        }
    }
}

/// A parsed expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let mut pairs = ExpressionParser::parse(Rule::expression, source)
            .map_err(|e| ExpressionError::invalid(source, e.variant.message()))?;

        let expr = pairs
            .next()
            .and_then(|top| top.into_inner().find(|p| p.as_rule() == Rule::expr))
            .ok_or_else(|| ExpressionError::invalid(source, "empty expression"))?;
        let ast = build(expr.into_inner(), source)?;

        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Names referenced, left to right, repeats included
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.ast.collect_names(&mut names);
        names
    }

    /// True when the only operator is `+`; such sums keep their operands' matches
    pub fn is_additive(&self) -> bool {
        self.ast.is_additive()
    }

    pub fn evaluate<E>(&self, mut lookup: impl FnMut(&str) -> Result<f64, E>) -> Result<f64, E> {
        self.ast.evaluate(&mut lookup)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn build(pairs: Pairs<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    PRATT
        .map_primary(|primary| primary_expr(primary, source))
        .map_prefix(|_neg, rhs| Ok(Expr::Neg(Box::new(rhs?))))
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                rule => unreachable!("not an infix operator: {rule:?}"),
            };
            Ok(Expr::Binary(Box::new(lhs?), op, Box::new(rhs?)))
        })
        .parse(pairs)
}

fn primary_expr(pair: Pair<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    match pair.as_rule() {
        Rule::number => pair
            .as_str()
            .parse()
            .map(Expr::Number)
            .map_err(|e| ExpressionError::invalid(source, e)),
        Rule::name => Ok(Expr::Name(pair.as_str().to_string())),
        Rule::quoted => Ok(Expr::Name(pair.into_inner().as_str().to_string())),
        Rule::expr => build(pair.into_inner(), source),
        rule => unreachable!("not a primary: {rule:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn eval(source: &str, values: &[(&str, f64)]) -> f64 {
        Expression::parse(source)
            .unwrap()
            .evaluate(|name| {
                Ok::<_, Infallible>(
                    values.iter().find(|(n, _)| *n == name).map_or(0.0, |(_, v)| *v),
                )
            })
            .unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(eval("8 / 4 / 2", &[]), 1.0);
        assert_eq!(eval("10 - 3 - 2", &[]), 5.0);
        assert_eq!(eval("-2 * 3 + .5", &[]), -5.5);
    }

    #[test]
    fn test_names_and_quoted_names() {
        let values = [("W", 10.0), ("T", 4.0), ("C/S", 2.0)];
        assert_eq!(eval("W / T", &values), 2.5);
        assert_eq!(eval("W / `C/S`", &values), 5.0);
        assert_eq!(eval("T", &values), 4.0);

        let expr = Expression::parse("CN1 + CN2 + `C/S` + CN1").unwrap();
        assert_eq!(expr.names(), vec!["CN1", "CN2", "C/S", "CN1"]);
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(eval("W / S", &[("W", 12.0), ("S", 0.0)]), 0.0);
        assert_eq!(eval("1 / 0 + 3", &[]), 3.0);
    }

    #[test]
    fn test_additive() {
        assert!(Expression::parse("VP1 + VP2").unwrap().is_additive());
        assert!(Expression::parse("(A + B) + C").unwrap().is_additive());
        assert!(Expression::parse("T").unwrap().is_additive());
        assert!(!Expression::parse("A - B").unwrap().is_additive());
        assert!(!Expression::parse("A + B * 2").unwrap().is_additive());
        assert!(!Expression::parse("-A").unwrap().is_additive());
    }

    #[test]
    fn test_lookup_error_propagates() {
        let expr = Expression::parse("A + missing").unwrap();
        let result = expr.evaluate(|name| match name {
            "A" => Ok(1.0),
            other => Err(other.to_string()),
        });
        assert_eq!(result, Err("missing".to_string()));
    }

    #[test]
    fn test_rejects_anything_else() {
        for source in [
            "",
            "A +",
            "A ** 2",
            "__import__('os')",
            "A; B",
            "len(A)",
            "A ^ 2",
            "1e3",
            "`unterminated",
        ] {
            assert!(
                matches!(Expression::parse(source), Err(ExpressionError::InvalidSource { .. })),
                "{source:?}"
            );
        }
    }
}
