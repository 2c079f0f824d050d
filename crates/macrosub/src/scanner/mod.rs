//! Positional placeholder scanner.
//!
//! Overview
//! - [`find_token`] walks a string forward from a caller-supplied offset
//!   looking for the next placeholder the search mask allows, and returns a
//!   tagged descriptor of byte-offset spans. It never allocates and never
//!   fails: a `{` that does not open a well-formed placeholder is literal
//!   text, and scanning resumes one character after it.
//! - Dispatch is on the character following the `{`: `$` user macro, `#`
//!   discovery macro, `?` expression macro (when enabled), `{` the nested
//!   shapes (see `nested`), a digit an object id falling back to a plain
//!   macro, anything else a plain macro falling back to a simple macro
//!   (when enabled).
//! - With [`TokenSearch::REFERENCES`], a parallel cursor tracks the next
//!   unescaped `$<digit>` back-reference and reports it when it precedes
//!   the next brace; once the text holds no further `$`, the tracking is
//!   dropped for the remainder of the call.
//! - With [`TokenSearch::IGNORE_QUOTED`], braces inside double-quoted runs
//!   are not candidates; an unterminated quoted run ends the scan.
//!
//! Calling `find_token` again at `token.loc.r + 1` enumerates all tokens
//! left to right, non-overlapping, deterministically.

mod nested;

#[cfg(test)]
mod tests;

use bstr::ByteSlice;

use crate::context;
use crate::search::TokenSearch;
use crate::span::Span;
use crate::token::{Token, TokenData};

/// Finds the next enabled placeholder at or after `pos`.
///
/// Returns `None` when no placeholder remains in `text`. See the module
/// documentation for the dispatch and enumeration contract.
#[must_use]
pub fn find_token(text: &str, pos: usize, search: TokenSearch) -> Option<Token> {
    let bytes = text.as_bytes();
    let mut pos = pos;
    let mut dollar = pos;
    let mut references = search.contains(TokenSearch::REFERENCES);

    loop {
        let brace = if search.contains(TokenSearch::IGNORE_QUOTED) {
            next_unquoted_brace(bytes, pos)
        } else {
            find_byte_from(bytes, pos, b'{')
        };

        if references {
            loop {
                let Some(d) = find_byte_from(bytes, dollar, b'$') else {
                    references = false;
                    break;
                };
                if brace.is_some_and(|b| d > b) {
                    dollar = d;
                    break;
                }
                if d > 0 && bytes[d - 1] == b'\\' {
                    // escaped dollar is literal text
                    dollar = d + 1;
                    continue;
                }
                match bytes.get(d + 1) {
                    Some(&c) if c.is_ascii_digit() => {
                        return Some(Token {
                            loc: Span::new(d, d + 1),
                            data: TokenData::Reference { index: c - b'0' },
                        });
                    }
                    _ => dollar = d + 1,
                }
            }
        }

        let bp = brace?;
        let next = *bytes.get(bp + 1)?;

        let token = if search.contains(TokenSearch::VAR_MACRO) {
            if next == b'{' {
                // the nested shapes are not recognized in var-macro mode
                None
            } else {
                parse_var_macro(text, bp).or_else(|| dispatch(text, bp, next, search))
            }
        } else if next == b'{' {
            nested::parse(text, bp, search)
        } else {
            dispatch(text, bp, next, search)
        };

        if let Some(token) = token {
            return Some(token);
        }
        pos = bp + 1;
    }
}

fn dispatch(text: &str, pos: usize, next: u8, search: TokenSearch) -> Option<Token> {
    match next {
        b'$' => parse_user_macro(text, pos),
        b'#' => parse_discovery_macro(text, pos),
        b'?' => {
            if search.contains(TokenSearch::EXPRESSION_MACRO) {
                parse_expression_macro(text, pos, search)
            } else {
                None
            }
        }
        _ => {
            let mut token = None;
            if next.is_ascii_digit() {
                token = parse_objectid(text, pos);
            }
            token
                .or_else(|| parse_macro(text, pos))
                .or_else(|| {
                    if search.contains(TokenSearch::SIMPLE_MACRO) {
                        parse_simple_macro(text, pos)
                    } else {
                        None
                    }
                })
        }
    }
}

pub(crate) const fn is_macro_char(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'.' || b == b'_'
}

const fn is_hostname_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b' ' || b == b'_' || b == b'-'
}

const fn is_var_macro_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_byte_from(bytes: &[u8], pos: usize, b: u8) -> Option<usize> {
    bytes.get(pos..)?.find_byte(b).map(|i| pos + i)
}

/// `strchr('{')` with double-quoted runs skipped.
fn next_unquoted_brace(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'{' => return Some(i),
            b'"' => {
                i += 1;
                loop {
                    match bytes.get(i)? {
                        b'"' => break,
                        b'\\' if bytes.get(i + 1) == Some(&b'"') => i += 2,
                        _ => i += 1,
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// `{NAME}` — dot-separated strict segments, at most one quoted segment at
/// the end.
pub(super) fn parse_macro(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let end = parse_macro_name(bytes, pos + 1)?;
    if bytes.get(end) != Some(&b'}') {
        return None;
    }
    Some(Token {
        loc: Span::new(pos, end),
        data: TokenData::Macro { name: Span::new(pos + 1, end - 1) },
    })
}

/// Returns the offset just past the macro name.
fn parse_macro_name(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    loop {
        if bytes.get(i) == Some(&b'"') {
            // a quoted segment is always the last
            return parse_quoted_segment(bytes, i);
        }
        let seg = i;
        while i < bytes.len() && is_macro_char(bytes[i]) {
            i += 1;
        }
        if i == seg {
            return None;
        }
        if bytes[i - 1] != b'.' || bytes.get(i) != Some(&b'"') {
            return Some(i);
        }
    }
}

/// Returns the offset just past the closing quote. Only `\` and `"` may be
/// escaped inside; the segment must not be empty.
fn parse_quoted_segment(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    loop {
        match bytes.get(i)? {
            b'"' => return (i > start + 1).then_some(i + 1),
            b'\\' => match bytes.get(i + 1)? {
                b'"' | b'\\' => i += 2,
                _ => return None,
            },
            _ => i += 1,
        }
    }
}

fn parse_user_macro(text: &str, pos: usize) -> Option<Token> {
    let parts = context::parse_user_macro_at(text, pos)?;
    Some(Token {
        loc: Span::new(pos, parts.end),
        data: TokenData::UserMacro { name: parts.name, context: parts.context },
    })
}

pub(super) fn parse_discovery_macro(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let mut i = pos + 2;
    loop {
        match bytes.get(i)? {
            b'}' => break,
            &b if is_macro_char(b) => i += 1,
            _ => return None,
        }
    }
    if i == pos + 2 {
        return None;
    }
    Some(Token {
        loc: Span::new(pos, i),
        data: TokenData::DiscoveryMacro { name: Span::new(pos + 2, i - 1) },
    })
}

fn parse_objectid(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let mut i = pos + 1;
    loop {
        match bytes.get(i)? {
            b'}' => break,
            b'0'..=b'9' => i += 1,
            _ => return None,
        }
    }
    if i == pos + 1 {
        return None;
    }
    Some(Token {
        loc: Span::new(pos, i),
        data: TokenData::ObjectId { id: Span::new(pos + 1, i - 1) },
    })
}

/// `{?expression}` — the closing brace is searched with quote-state
/// tracking, stepping over inner placeholders located by a recursive scan.
/// Nested expression macros are not supported; an inner `{?` is ordinary
/// text.
pub(super) fn parse_expression_macro(text: &str, pos: usize, search: TokenSearch) -> Option<Token> {
    use crate::token::TokenKind;

    let bytes = text.as_bytes();
    let inner_search = search.without(TokenSearch::EXPRESSION_MACRO);
    let mut quoted = false;
    let mut i = pos + 2;
    while i < bytes.len() {
        let b = bytes[i];
        if quoted {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    quoted = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        match b {
            b'{' => {
                if bytes.get(i + 1) == Some(&b'?') {
                    i += 1;
                    continue;
                }
                if let Some(inner) = find_token(text, i, inner_search) {
                    let skip = inner.loc.l == i
                        && matches!(
                            inner.kind(),
                            TokenKind::Macro
                                | TokenKind::UserMacro
                                | TokenKind::DiscoveryMacro
                                | TokenKind::FuncMacro
                                | TokenKind::UserFuncMacro
                                | TokenKind::DiscoveryFuncMacro
                        );
                    if skip {
                        i = inner.loc.r + 1;
                        continue;
                    }
                }
                i += 1;
            }
            b'}' => {
                if i == pos + 2 {
                    return None;
                }
                return Some(Token {
                    loc: Span::new(pos, i),
                    data: TokenData::ExpressionMacro { expression: Span::new(pos + 2, i - 1) },
                });
            }
            b'"' => {
                quoted = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// `{host:key.func(args)}` with a literal host name. The nested-macro host
/// form is reached through the `nested` module instead.
fn parse_simple_macro(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let mut i = pos + 1;
    loop {
        match bytes.get(i)? {
            b':' => break,
            b'}' => return None,
            &b if is_hostname_char(b) => i += 1,
            _ => return None,
        }
    }
    if i == pos + 1 {
        return None;
    }
    parse_simple_macro_key(text, pos, Span::new(pos + 1, i - 1), i + 1)
}

/// Continues a simple macro at its key position; `pos` is the opening brace
/// of the whole token.
pub(super) fn parse_simple_macro_key(text: &str, pos: usize, host: Span, key_start: usize) -> Option<Token> {
    use crate::token::SimpleMacroData;

    let bytes = text.as_bytes();
    let mut key_end = match crate::params::parse_key(text, key_start) {
        Some(end) => end,
        // the key position may hold a user macro instead
        None => context::parse_user_macro_at(text, key_start)?.end + 1,
    };

    // A parameterless key swallows the function name up to its opening
    // parenthesis; back up to the separating dot.
    if bytes.get(key_end) == Some(&b'(') {
        let mut j = key_end;
        while j > key_start && bytes[j] != b'.' {
            j -= 1;
        }
        key_end = j;
    }
    if key_end == key_start || bytes.get(key_end) != Some(&b'.') {
        return None;
    }

    let call = crate::function::match_call(text, key_end + 1)?;
    if bytes.get(call.params.r + 1) != Some(&b'}') {
        return None;
    }
    Some(Token {
        loc: Span::new(pos, call.params.r + 1),
        data: TokenData::SimpleMacro(SimpleMacroData {
            host,
            key: Span::new(key_start, key_end - 1),
            func: Span::new(call.name.l, call.params.r),
            func_param: call.params,
        }),
    })
}

/// `{var}` / `{var.func(args)}` in var-macro mode.
fn parse_var_macro(text: &str, pos: usize) -> Option<Token> {
    use crate::token::FuncMacroData;

    let bytes = text.as_bytes();
    let mut i = pos + 1;
    while i < bytes.len() && is_var_macro_char(bytes[i]) {
        i += 1;
    }
    if i == pos + 1 {
        return None;
    }
    let name = Span::new(pos + 1, i - 1);

    match bytes.get(i)? {
        b'}' => Some(Token { loc: Span::new(pos, i), data: TokenData::VarMacro { name } }),
        b'.' => {
            let call = crate::function::match_call(text, i + 1)?;
            if bytes.get(call.params.r + 1) != Some(&b'}') {
                return None;
            }
            Some(Token {
                loc: Span::new(pos, call.params.r + 1),
                data: TokenData::VarFuncMacro(FuncMacroData {
                    inner: name,
                    func: Span::new(call.name.l, call.params.r),
                    func_param: call.params,
                }),
            })
        }
        _ => None,
    }
}
