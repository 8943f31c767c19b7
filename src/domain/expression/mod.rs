//! Expression language for condition atoms that are not `name = value`.
//!
//! Atoms like `date("j") == 17` or `like(applicationContext, "Production*")`
//! are parsed into an [`Expr`] and evaluated against an
//! [`ExpressionContext`], which supplies variables and functions.

mod parser;

pub use parser::parse_expression;

use regex::Regex;
use tracing::trace;

use crate::domain::error::DomainError;
use crate::domain::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Identical,
    NotIdentical,
    Lt,
    Le,
    Gt,
    Ge,
    Matches,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Height of the tree; a literal has depth 1. Walks without recursion.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((expr, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match expr {
                Expr::Literal(_) | Expr::Variable(_) => {}
                Expr::Call { args, .. } => stack.extend(args.iter().map(|a| (a, depth + 1))),
                Expr::Unary { expr, .. } => stack.push((expr, depth + 1)),
                Expr::Binary { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        deepest
    }
}

/// Provides the names an expression can refer to.
pub trait ExpressionContext {
    /// Value of a bare identifier, `None` if unknown.
    fn variable(&self, name: &str) -> Option<Value>;

    /// Invoke function `name` with already evaluated arguments.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, DomainError>;
}

fn eval_error(expression: &str, message: impl Into<String>) -> DomainError {
    DomainError::InvalidExpression {
        expression: expression.to_string(),
        message: message.into(),
    }
}

/// Evaluate `expr`. `&&`/`||` short-circuit and yield booleans.
pub fn evaluate(expr: &Expr, ctx: &dyn ExpressionContext) -> Result<Value, DomainError> {
    let result = match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Variable(name) => ctx
            .variable(name)
            .ok_or_else(|| eval_error(name, format!("unknown variable {:?}", name)))?,
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|a| evaluate(a, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.call(name, &args)?
        }
        Expr::Unary { op, expr } => {
            let v = evaluate(expr, ctx)?;
            match op {
                UnaryOp::Not => Value::Bool(!v.is_truthy()),
                UnaryOp::Neg => match v {
                    Value::Int(i) => Value::Int(-i),
                    other => match other.as_number() {
                        Some(n) => Value::Float(-n),
                        None => {
                            return Err(eval_error(
                                "-",
                                format!("cannot negate {}", other.type_name()),
                            ))
                        }
                    },
                },
            }
        }
        Expr::Binary { op, left, right } => match op {
            BinaryOp::Or => {
                Value::Bool(evaluate(left, ctx)?.is_truthy() || evaluate(right, ctx)?.is_truthy())
            }
            BinaryOp::And => {
                Value::Bool(evaluate(left, ctx)?.is_truthy() && evaluate(right, ctx)?.is_truthy())
            }
            _ => {
                let l = evaluate(left, ctx)?;
                let r = evaluate(right, ctx)?;
                Value::Bool(compare(*op, &l, &r)?)
            }
        },
    };
    trace!("{:?} => {}", expr, result);
    Ok(result)
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<bool, DomainError> {
    use std::cmp::Ordering::*;

    Ok(match op {
        BinaryOp::Eq => l.loose_eq(r),
        BinaryOp::NotEq => !l.loose_eq(r),
        BinaryOp::Identical => l.identical(r),
        BinaryOp::NotIdentical => !l.identical(r),
        BinaryOp::Lt => matches!(l.loose_cmp(r), Some(Less)),
        BinaryOp::Le => matches!(l.loose_cmp(r), Some(Less | Equal)),
        BinaryOp::Gt => matches!(l.loose_cmp(r), Some(Greater)),
        BinaryOp::Ge => matches!(l.loose_cmp(r), Some(Greater | Equal)),
        BinaryOp::Matches => regex_matches(&l.to_plain_string(), &r.to_plain_string())?,
        BinaryOp::Or => l.is_truthy() || r.is_truthy(),
        BinaryOp::And => l.is_truthy() && r.is_truthy(),
    })
}

/// `matches` takes a delimited pattern like `/^foo/`; undelimited patterns
/// are used as they are.
fn regex_matches(subject: &str, pattern: &str) -> Result<bool, DomainError> {
    let body = match pattern.strip_prefix('/').and_then(|p| p.rsplit_once('/')) {
        Some((body, _flags)) => body.replace("\\/", "/"),
        None => pattern.to_string(),
    };
    let re = Regex::new(&body).map_err(|e| eval_error(pattern, e.to_string()))?;
    Ok(re.is_match(subject))
}
