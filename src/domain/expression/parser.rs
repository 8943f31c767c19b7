//! nom parser for the condition expression language.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or         := and (("||" | "or") and)*
//! and        := comparison (("&&" | "and") comparison)*
//! comparison := unary (cmp_op unary)?
//! unary      := ("!" | "not" | "-") unary | primary
//! primary    := "(" or ")" | string | number | ident ( "(" args ")" )?
//! ```

use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag};
use nom::character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace0, satisfy};
use nom::combinator::{all_consuming, map, not, opt, peek, recognize, value};
use nom::multi::{fold_many0, many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;
use tracing::{instrument, trace};

use super::{BinaryOp, Expr, UnaryOp};
use crate::domain::error::DomainError;
use crate::domain::value::Value;

type PResult<'a, T> = IResult<&'a str, T>;

/// Upper bound for parentheses plus prefix operators in one expression.
const MAX_NESTING: usize = 64;

/// Upper bound for the depth of a parsed expression tree.
const MAX_TREE_DEPTH: usize = 256;

/// Parse a complete expression.
///
/// Expressions nested deeper than `MAX_NESTING` or yielding a tree deeper
/// than `MAX_TREE_DEPTH` are rejected before they are evaluated.
#[instrument(level = "trace")]
pub fn parse_expression(input: &str) -> Result<Expr, DomainError> {
    let invalid = |message: String| DomainError::InvalidExpression {
        expression: input.to_string(),
        message,
    };

    let nested = nesting(input);
    if nested > MAX_NESTING {
        return Err(invalid(format!(
            "nesting of {} exceeds limit of {}",
            nested, MAX_NESTING
        )));
    }
    let expr = match all_consuming(ws(or_expr))(input) {
        Ok((_, expr)) => expr,
        Err(e) => return Err(invalid(e.to_string())),
    };
    let depth = expr.depth();
    if depth > MAX_TREE_DEPTH {
        return Err(invalid(format!(
            "expression depth {} exceeds limit of {}",
            depth, MAX_TREE_DEPTH
        )));
    }
    trace!("parsed: {:?}", expr);
    Ok(expr)
}

/// Deepest parenthesis level plus the number of prefix operators, both
/// counted outside of string literals.
fn nesting(input: &str) -> usize {
    let mut deepest = 0usize;
    let mut parens = 0usize;
    let mut prefix = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut word = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if is_ident_char(c) {
            word.push(c);
            continue;
        }
        if word == "not" {
            prefix += 1;
        }
        word.clear();
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => {
                parens += 1;
                deepest = deepest.max(parens);
            }
            ')' => parens = parens.saturating_sub(1),
            '!' if chars.peek() != Some(&'=') => prefix += 1,
            '-' => prefix += 1,
            _ => {}
        }
    }
    if word == "not" {
        prefix += 1;
    }
    deepest + prefix
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading and
/// trailing whitespace, returning the output of `inner`.
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Match a word operator like `and` without eating the prefix of `android`.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(peek(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn or_expr(input: &str) -> PResult<'_, Expr> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(ws(alt((tag("||"), keyword("or")))), and_expr),
        move || first.clone(),
        |acc, rhs| Expr::binary(BinaryOp::Or, acc, rhs),
    )(input)
}

fn and_expr(input: &str) -> PResult<'_, Expr> {
    let (input, first) = comparison(input)?;
    fold_many0(
        preceded(ws(alt((tag("&&"), keyword("and")))), comparison),
        move || first.clone(),
        |acc, rhs| Expr::binary(BinaryOp::And, acc, rhs),
    )(input)
}

fn comparison_operator(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        value(BinaryOp::Identical, tag("===")),
        value(BinaryOp::NotIdentical, tag("!==")),
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::NotEq, tag("!=")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        value(BinaryOp::Matches, keyword("matches")),
    ))(input)
}

fn comparison(input: &str) -> PResult<'_, Expr> {
    let (input, left) = unary(input)?;
    let (input, rest) = opt(pair(ws(comparison_operator), unary))(input)?;
    Ok(match rest {
        Some((op, right)) => (input, Expr::binary(op, left, right)),
        None => (input, left),
    })
}

fn unary(input: &str) -> PResult<'_, Expr> {
    alt((
        map(
            preceded(ws(alt((terminated(tag("!"), not(peek(char('=')))), keyword("not")))), unary),
            |e| Expr::unary(UnaryOp::Not, e),
        ),
        map(preceded(ws(char('-')), unary), |e| Expr::unary(UnaryOp::Neg, e)),
        primary,
    ))(input)
}

fn primary(input: &str) -> PResult<'_, Expr> {
    ws(alt((
        delimited(char('('), ws(or_expr), char(')')),
        map(string_literal, |s| Expr::Literal(Value::String(s))),
        number,
        call_or_variable,
    )))(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> PResult<'a, String> {
    let stop: &'static str = if quote == '"' { "\\\"" } else { "\\'" };
    delimited(
        char(quote),
        map(
            opt(escaped_transform(
                is_not(stop),
                '\\',
                alt((
                    value('\n', char('n')),
                    value('\t', char('t')),
                    value('\r', char('r')),
                    anychar,
                )),
            )),
            Option::unwrap_or_default,
        ),
        char(quote),
    )
}

/// Double or single quoted string; backslash escapes are resolved.
fn string_literal(input: &str) -> PResult<'_, String> {
    alt((quoted('"'), quoted('\'')))(input)
}

fn number(input: &str) -> PResult<'_, Expr> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    let literal = if text.contains('.') {
        text.parse::<f64>().map(Value::Float).ok()
    } else {
        text.parse::<i64>().map(Value::Int).ok()
    };
    match literal {
        Some(v) => Ok((rest, Expr::Literal(v))),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn call_or_variable(input: &str) -> PResult<'_, Expr> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), or_expr),
        ws(char(')')),
    ))(input)?;

    let expr = match (name, args) {
        (_, Some(args)) => Expr::Call {
            name: name.to_string(),
            args,
        },
        ("true", None) => Expr::Literal(Value::Bool(true)),
        ("false", None) => Expr::Literal(Value::Bool(false)),
        ("null", None) => Expr::Literal(Value::Null),
        (_, None) => Expr::Variable(name.to_string()),
    };
    Ok((input, expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn given_comparison_with_call_when_parsing_then_binary_node() {
        let expr = parse_expression(r#"date("j") == 17"#).unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Eq,
                call("date", vec![Expr::Literal(Value::String("j".into()))]),
                Expr::Literal(Value::Int(17)),
            )
        );
    }

    #[test]
    fn given_and_or_when_parsing_then_and_binds_tighter() {
        let expr = parse_expression("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Or,
                Expr::Variable("a".into()),
                Expr::binary(
                    BinaryOp::And,
                    Expr::Variable("b".into()),
                    Expr::Variable("c".into())
                ),
            )
        );
    }

    #[test]
    fn given_word_operators_when_parsing_then_same_as_symbols() {
        assert_eq!(
            parse_expression("a and not b").unwrap(),
            parse_expression("a && !b").unwrap()
        );
        // identifiers starting with a keyword stay identifiers
        assert_eq!(
            parse_expression("order").unwrap(),
            Expr::Variable("order".into())
        );
    }

    #[test]
    fn given_escaped_string_when_parsing_then_unescaped() {
        let expr = parse_expression(r#"like(applicationContext, "Production\/Staging\*")"#).unwrap();
        assert_eq!(
            expr,
            call(
                "like",
                vec![
                    Expr::Variable("applicationContext".into()),
                    Expr::Literal(Value::String("Production/Staging*".into())),
                ]
            )
        );
        assert_eq!(
            parse_expression(r#"''"#).unwrap(),
            Expr::Literal(Value::String(String::new()))
        );
    }

    #[test]
    fn given_identity_operator_when_parsing_then_not_split_into_eq() {
        let expr = parse_expression("feature('x') === true").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Identical,
                ..
            }
        ));
    }

    #[test]
    fn given_parentheses_in_strings_when_measuring_nesting_then_ignored() {
        assert_eq!(nesting(r#"like(a, "((((") && (b)"#), 1);
        assert_eq!(nesting("!(not a) && -1 != 2"), 4);
    }

    #[rstest]
    #[case(1)]
    #[case(MAX_NESTING)]
    fn given_nesting_within_limit_when_parsing_then_ok(#[case] depth: usize) {
        let input = format!("{}1 == 1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_expression(&input).is_ok());
    }

    #[rstest]
    #[case(format!("{}1 == 1{}", "(".repeat(1000), ")".repeat(1000)))]
    #[case(format!("{}true", "!".repeat(1000)))]
    #[case(format!("{}true", "not ".repeat(1000)))]
    #[case(format!("{}1{}", "f(".repeat(1000), ")".repeat(1000)))]
    #[case(vec!["a"; 1000].join(" || "))]
    fn given_excessive_nesting_when_parsing_then_invalid_expression(#[case] input: String) {
        assert!(matches!(
            parse_expression(&input),
            Err(DomainError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn given_trailing_garbage_when_parsing_then_error() {
        assert!(parse_expression("a ==").is_err());
        assert!(parse_expression("request.getParsedBody()['type'] > 0").is_err());
        assert!(parse_expression("").is_err());
    }
}
