//! User-macro parsing and context (un)quoting.
//!
//! A user macro is `{$NAME}` or `{$NAME:context}`. The context may carry a
//! `regex:` operator marker, may be double-quoted (with `\"` escaping a
//! quote) and keeps any trailing spaces; leading spaces before it are
//! separator decoration and belong to neither name nor context.

use alloc::string::String;
use thiserror::Error;

use crate::scanner::is_macro_char;
use crate::span::Span;
use crate::token::MacroContext;

/// Match operator applied to a user-macro context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContextOp {
    /// The context must equal the matched value.
    #[default]
    Equals,
    /// The context is a regular expression the matched value must match.
    Regex,
}

/// Marker introducing a regular-expression context match.
const REGEX_PREFIX: &[u8] = b"regex:";

/// Parsed layout of a `{$NAME}` / `{$NAME:context}` user macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserMacroParts {
    /// Macro name, sigil and braces excluded.
    pub name: Span,
    /// Context suffix, when a `:` separator was present. Without one the
    /// match operator is [`ContextOp::Equals`].
    pub context: Option<MacroContext>,
    /// Offset of the closing `}`.
    pub end: usize,
}

/// Parses a user macro at the start of `text`.
///
/// Text may continue past the closing brace; `end` reports where the macro
/// stopped. Returns `None` when `text` does not begin with a well-formed
/// user macro (in particular for the empty name `{$}`).
#[must_use]
pub fn parse_user_macro(text: &str) -> Option<UserMacroParts> {
    parse_user_macro_at(text, 0)
}

pub(crate) fn parse_user_macro_at(text: &str, start: usize) -> Option<UserMacroParts> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') || bytes.get(start + 1) != Some(&b'$') {
        return None;
    }

    let name_l = start + 2;
    let mut i = name_l;
    while i < bytes.len() && is_macro_char(bytes[i]) {
        i += 1;
    }
    if i == name_l {
        return None;
    }
    let name = Span::new(name_l, i - 1);

    match bytes.get(i)? {
        b'}' => Some(UserMacroParts { name, context: None, end: i }),
        b':' => {
            i += 1;
            let op = if bytes[i..].starts_with(REGEX_PREFIX) {
                i += REGEX_PREFIX.len();
                ContextOp::Regex
            } else {
                ContextOp::Equals
            };
            while bytes.get(i) == Some(&b' ') {
                i += 1;
            }
            if bytes.get(i) == Some(&b'"') {
                let ctx_l = i;
                i += 1;
                loop {
                    match bytes.get(i)? {
                        b'"' => break,
                        b'\\' if bytes.get(i + 1) == Some(&b'"') => i += 2,
                        _ => i += 1,
                    }
                }
                if bytes.get(i + 1) != Some(&b'}') {
                    return None;
                }
                let context = MacroContext { loc: Span::new(ctx_l, i), quoted: true, op };
                Some(UserMacroParts { name, context: Some(context), end: i + 1 })
            } else {
                let ctx_l = i;
                loop {
                    match bytes.get(i)? {
                        b'}' => break,
                        _ => i += 1,
                    }
                }
                // an empty unquoted context yields the empty span at ctx_l
                let context = MacroContext { loc: Span::new(ctx_l, i - 1), quoted: false, op };
                Some(UserMacroParts { name, context: Some(context), end: i })
            }
        }
        _ => None,
    }
}

/// Failure to render a user-macro context value in quoted form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteContextError {
    /// Quoting a value that ends with a backslash would leave an ambiguous
    /// escape before the closing quote.
    #[error("quoted context must not end with a backslash")]
    TrailingBackslash,
}

/// Renders a raw context value in its minimally-escaped stored form.
///
/// Quoting applies when `force` is set, or when the value starts with a
/// quote or space or contains `}` — the shapes an unquoted context cannot
/// carry.
///
/// # Errors
///
/// [`QuoteContextError::TrailingBackslash`] when quoting applies and the
/// value ends with a backslash.
pub fn quote_context(value: &str, force: bool) -> Result<String, QuoteContextError> {
    let force = force || value.starts_with('"') || value.starts_with(' ') || value.contains('}');
    if !force {
        return Ok(String::from(value));
    }
    if value.ends_with('\\') {
        return Err(QuoteContextError::TrailingBackslash);
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Ok(out)
}

/// Recovers the context value from its raw (possibly quoted) slice: strips
/// wrapping quotes and collapses `\"` to a literal quote. Operates on the
/// slice as given; unquoted input passes through unchanged.
#[must_use]
pub fn unquote_context(raw: &str) -> String {
    match raw.strip_prefix('"') {
        Some(body) => body.strip_suffix('"').unwrap_or(body).replace("\\\"", "\""),
        None => String::from(raw),
    }
}
