//! Function-call boundary matching.
//!
//! The scanner consumes this as a collaborator: given text positioned at a
//! candidate call it reports the name and the balanced parenthesized
//! argument list, or nothing. Argument syntax is validated one parenthesis
//! level deep with double-quote awareness; argument *meaning* is the
//! post-processing evaluator's business, not ours.

use crate::span::Span;

/// Byte-offset layout of a matched `name(args)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionCall {
    /// The function name.
    pub name: Span,
    /// Argument list, parentheses included.
    pub params: Span,
}

/// Matches a `name(args)` call starting exactly at `pos`.
///
/// The name is a non-empty run of lower-case letters, digits and `_`.
#[must_use]
pub fn match_call(text: &str, pos: usize) -> Option<FunctionCall> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && is_function_char(bytes[i]) {
        i += 1;
    }
    if i == pos || bytes.get(i) != Some(&b'(') {
        return None;
    }

    let len = validate_params(&bytes[i + 1..])?;
    Some(FunctionCall {
        name: Span::new(pos, i - 1),
        params: Span::new(i, i + 1 + len),
    })
}

const fn is_function_char(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'
}

#[derive(Clone, Copy)]
enum ParamState {
    Next,
    Quoted,
    PostQuoted,
    Unquoted,
}

/// Walks the argument characters and returns the offset of the closing
/// parenthesis relative to the list start.
fn validate_params(bytes: &[u8]) -> Option<usize> {
    let mut state = ParamState::Next;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b')' && !matches!(state, ParamState::Quoted) {
            return Some(i);
        }
        state = match state {
            ParamState::Next => match b {
                b'"' => ParamState::Quoted,
                b' ' | b',' => ParamState::Next,
                _ => ParamState::Unquoted,
            },
            ParamState::Quoted => {
                if b == b'"' && bytes[i - 1] != b'\\' {
                    ParamState::PostQuoted
                } else {
                    ParamState::Quoted
                }
            }
            ParamState::PostQuoted => match b {
                b',' => ParamState::Next,
                b' ' => ParamState::PostQuoted,
                _ => return None,
            },
            ParamState::Unquoted => {
                if b == b',' {
                    ParamState::Next
                } else {
                    ParamState::Unquoted
                }
            }
        };
    }
    None
}
