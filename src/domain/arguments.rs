//! Parsing of user function calls like `myFunc(1, "a, b", true)`.

use std::fmt;

use itertools::Itertools;
use tracing::debug;

use crate::domain::value::Value;

/// A parsed function call: identifier plus typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Plain function name or `Class::method`
    pub name: String,
    pub arguments: Vec<Value>,
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.iter().join(", "))
    }
}

/// Parse `identifier` or `identifier(arg, ...)`.
///
/// Never fails: malformed input degrades to fewer arguments or literal
/// strings.
pub fn parse_arguments(input: &str) -> FunctionCall {
    let input = input.trim();
    let name_end = input
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(input.len());
    let name = input[..name_end].to_string();
    let rest = input[name_end..].trim();

    let arguments = match rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => parse_argument_list(inner),
        None => {
            if !rest.is_empty() {
                debug!("ignoring malformed argument list {:?} of {}", rest, name);
            }
            Vec::new()
        }
    };

    FunctionCall { name, arguments }
}

/// Parse a comma separated argument list (the text between the parentheses).
pub fn parse_argument_list(list: &str) -> Vec<Value> {
    let mut args = Vec::new();
    let mut rest = list.trim_start();

    while !rest.is_empty() {
        let quote = rest.as_bytes()[0];
        if quote == b'"' || quote == b'\'' {
            match find_closing_quote(rest, quote) {
                Some(end) => {
                    let raw = &rest[1..end];
                    let escaped = format!("\\{}", quote as char);
                    args.push(Value::String(raw.replace(&escaped, &(quote as char).to_string())));
                    // anything between the closing quote and the next comma is dropped
                    rest = match rest[end + 1..].find(',') {
                        Some(comma) => &rest[end + 1 + comma + 1..],
                        None => "",
                    };
                }
                None => {
                    // unterminated: keep the remainder literally
                    let raw = rest[1..].trim_end();
                    let raw = raw.strip_suffix(quote as char).unwrap_or(raw);
                    debug!("unterminated quote in argument list, using {:?}", raw);
                    args.push(Value::String(raw.to_string()));
                    rest = "";
                }
            }
        } else {
            let (token, next) = match rest.find(',') {
                Some(comma) => (&rest[..comma], &rest[comma + 1..]),
                None => (rest, ""),
            };
            args.push(typed_literal(token.trim()));
            rest = next;
        }
        rest = rest.trim_start();
    }
    args
}

/// Byte offset of the first quote matching `quote` that is not preceded by
/// a backslash, skipping the opening quote at offset 0.
fn find_closing_quote(s: &str, quote: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    (1..bytes.len()).find(|&i| bytes[i] == quote && bytes[i - 1] != b'\\')
}

/// Type an unquoted argument.
fn typed_literal(token: &str) -> Value {
    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => match token.parse::<i64>() {
            Ok(i) if is_integer_literal(token) => Value::Int(i),
            _ => Value::String(token.to_string()),
        },
    }
}

fn is_integer_literal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_plus_sign_when_typing_then_string() {
        // i64::from_str accepts "+1", literals do not
        assert_eq!(typed_literal("+1"), Value::String("+1".into()));
        assert_eq!(typed_literal("-7"), Value::Int(-7));
    }

    #[test]
    fn given_leading_comma_when_parsing_then_empty_string_argument() {
        assert_eq!(
            parse_argument_list(",1"),
            vec![Value::String(String::new()), Value::Int(1)]
        );
    }

    #[test]
    fn given_trailing_comma_when_parsing_then_no_extra_argument() {
        assert_eq!(parse_argument_list("1,"), vec![Value::Int(1)]);
    }

    #[test]
    fn given_call_when_displayed_then_round_trips_shape() {
        let call = parse_arguments("f(1, 'a', true)");
        assert_eq!(call.to_string(), "f(1, \"a\", true)");
    }
}
