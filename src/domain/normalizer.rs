//! Condition expression normalization.
//!
//! A condition is a sequence of bracket atoms (`[hostname = localhost]`)
//! joined by boolean operators. Operators between atoms are rewritten to
//! `&&` / `||`; atom contents are never touched, nested brackets included.

use tracing::trace;

/// A top-level piece of a condition string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Balanced `[...]` including the brackets.
    Atom(&'a str),
    /// Text outside of atoms.
    Text(&'a str),
}

/// Split `input` into atoms and the text between them.
///
/// Brackets inside quoted strings of an atom are not counted; `\` escapes
/// the next character of a quoted string. An atom that is never closed runs
/// to the end of the input.
fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
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
        match c {
            '"' | '\'' if depth > 0 => quote = Some(c),
            '[' => {
                if depth == 0 {
                    if i > start {
                        out.push(Segment::Text(&input[start..i]));
                    }
                    start = i;
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(Segment::Atom(&input[start..=i]));
                    start = i + 1;
                }
            }
            _ => {}
        }
    }
    if start < input.len() {
        let rest = &input[start..];
        if depth > 0 {
            out.push(Segment::Atom(rest));
        } else {
            out.push(Segment::Text(rest));
        }
    }
    out
}

/// Canonical operator for the text found between two atoms.
fn canonical_operator(between: &str) -> &str {
    let op = between.trim();
    if op.is_empty() || op == "||" || op.eq_ignore_ascii_case("or") {
        "||"
    } else if op == "&&" || op.eq_ignore_ascii_case("and") {
        "&&"
    } else {
        op
    }
}

/// Rewrite a condition into canonical form.
///
/// `[foo] AND [bar] [baz]` becomes `[foo]&&[bar]||[baz]`.
pub fn normalize_expression(expression: &str) -> String {
    let segs = segments(expression.trim());
    let mut out = String::with_capacity(expression.len());

    for (i, seg) in segs.iter().enumerate() {
        match seg {
            Segment::Atom(atom) => {
                // adjacent atoms without any text in between
                if matches!(segs.get(i.wrapping_sub(1)), Some(Segment::Atom(_))) {
                    out.push_str("||");
                }
                out.push_str(atom);
            }
            Segment::Text(text) => {
                let between_atoms = i > 0
                    && matches!(segs.get(i - 1), Some(Segment::Atom(_)))
                    && matches!(segs.get(i + 1), Some(Segment::Atom(_)));
                if between_atoms {
                    out.push_str(canonical_operator(text));
                } else {
                    out.push_str(text.trim());
                }
            }
        }
    }
    trace!("normalized {:?} -> {:?}", expression, out);
    out
}

/// Split a normalized condition into OR groups of AND atoms.
///
/// Returns the atom bodies without their outer brackets. `None` if the
/// expression is not a well-formed sequence of atoms joined by `&&`/`||`.
pub fn split_condition(normalized: &str) -> Option<Vec<Vec<&str>>> {
    if !normalized.starts_with('[') || !normalized.ends_with(']') {
        return None;
    }
    let mut groups: Vec<Vec<&str>> = vec![Vec::new()];
    let mut expect_atom = true;

    for seg in segments(normalized) {
        match seg {
            Segment::Atom(atom) if expect_atom => {
                let body = atom.strip_prefix('[')?.strip_suffix(']')?;
                groups.last_mut()?.push(body);
                expect_atom = false;
            }
            Segment::Text("&&") if !expect_atom => expect_atom = true,
            Segment::Text("||") if !expect_atom => {
                groups.push(Vec::new());
                expect_atom = true;
            }
            _ => return None,
        }
    }
    if expect_atom {
        return None;
    }
    Some(groups)
}
