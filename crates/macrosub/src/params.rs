//! Bracketed parameter lists of item keys and SNMP OIDs.
//!
//! `parse_key_params` / `parse_oid_params` tokenize `name[a,"b", c[d,e]]`
//! into a prefix plus parameters, reporting each through a callback as a
//! byte-offset span. Lists nest at most two bracket levels deep; the inner
//! arguments of a compound parameter are reported at level 2 and the
//! compound itself once more at level 1 when its bracket closes.

use alloc::string::String;
use thiserror::Error;

use crate::search::TokenSearch;
use crate::span::Span;
use crate::token::TokenKind;

/// One parameter reported by the list parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedParam {
    /// 1-based position of the enclosing top-level parameter; 0 for the
    /// key/OID prefix.
    pub num: usize,
    /// Raw parameter text, quotes included when `quoted`.
    pub loc: Span,
    /// Bracket nesting depth the text lives at: 0 for the prefix, 1 for
    /// top-level parameters, 2 inside a compound parameter.
    pub level: u8,
    /// `true` when the parameter was double-quoted.
    pub quoted: bool,
}

/// Structural failure while walking a parameter list.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid parameter list at position {pos}")]
pub struct ParamsError {
    /// Byte offset where the walk stopped.
    pub pos: usize,
}

#[derive(Clone, Copy)]
enum KeyKind {
    Key,
    Oid,
}

#[derive(Clone, Copy)]
enum State {
    New,
    End,
    Unquoted,
    Quoted,
}

/// Tokenizes an item key with its parameter list.
///
/// The prefix must be a non-empty run of key characters followed by `[` or
/// the end of input.
///
/// # Errors
///
/// [`ParamsError`] with the stopping offset on unbalanced brackets, nesting
/// deeper than two levels, a malformed prefix or trailing garbage.
pub fn parse_key_params(text: &str, cb: impl FnMut(ParsedParam)) -> Result<(), ParamsError> {
    parse_params(text, KeyKind::Key, cb)
}

/// Tokenizes an SNMP OID with its parameter list.
///
/// Everything up to the first `[` is the prefix; embedded user, discovery
/// and discovery-function macros inside it are skipped verbatim rather than
/// decomposed, so a bracket inside a macro does not start the list.
///
/// # Errors
///
/// [`ParamsError`] as for [`parse_key_params`].
pub fn parse_oid_params(text: &str, cb: impl FnMut(ParsedParam)) -> Result<(), ParamsError> {
    parse_params(text, KeyKind::Oid, cb)
}

const fn is_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-'
}

fn prefix_end(text: &str, kind: KeyKind) -> Result<usize, ParamsError> {
    let bytes = text.as_bytes();
    match kind {
        KeyKind::Key => {
            let mut i = 0;
            while i < bytes.len() && is_key_char(bytes[i]) {
                i += 1;
            }
            if i == 0 {
                return Err(ParamsError { pos: 0 });
            }
            if i < bytes.len() && bytes[i] != b'[' {
                return Err(ParamsError { pos: i });
            }
            Ok(i)
        }
        KeyKind::Oid => {
            let mut i = 0;
            while i < bytes.len() && bytes[i] != b'[' {
                if bytes[i] == b'{' {
                    if let Some(token) = crate::scanner::find_token(text, i, TokenSearch::BASIC) {
                        let skip = token.loc.l == i
                            && matches!(
                                token.kind(),
                                TokenKind::UserMacro | TokenKind::DiscoveryMacro | TokenKind::DiscoveryFuncMacro
                            );
                        if skip {
                            i = token.loc.r + 1;
                            continue;
                        }
                    }
                }
                i += 1;
            }
            if i == 0 {
                return Err(ParamsError { pos: 0 });
            }
            Ok(i)
        }
    }
}

#[allow(clippy::too_many_lines)]
fn parse_params(text: &str, kind: KeyKind, mut cb: impl FnMut(ParsedParam)) -> Result<(), ParamsError> {
    let bytes = text.as_bytes();
    let prefix = prefix_end(text, kind)?;
    cb(ParsedParam { num: 0, loc: Span::new(0, prefix - 1), level: 0, quoted: false });

    let mut state = State::End;
    let mut level: u8 = 0;
    let mut num: usize = 0;
    let mut l = 0;
    let mut comp_l = 0;
    let mut i = prefix;
    while i < bytes.len() {
        let b = bytes[i];
        if level == 0 {
            // only another bracket group may follow a closed list
            if matches!(state, State::End) && b == b'[' {
                state = State::New;
            } else {
                return Err(ParamsError { pos: i });
            }
        }
        match state {
            State::New => match b {
                b' ' => {}
                b',' => {
                    cb(ParsedParam { num, loc: Span::new(i, i - 1), level, quoted: false });
                    if level == 1 {
                        num += 1;
                    }
                }
                b'[' => {
                    if level == 2 {
                        return Err(ParamsError { pos: i });
                    }
                    level += 1;
                    if level == 1 {
                        num += 1;
                    } else {
                        comp_l = i;
                    }
                }
                b']' => {
                    cb(ParsedParam { num, loc: Span::new(i, i - 1), level, quoted: false });
                    level -= 1;
                    if level == 1 {
                        cb(ParsedParam { num, loc: Span::new(comp_l, i), level: 1, quoted: false });
                    }
                    state = State::End;
                }
                b'"' => {
                    state = State::Quoted;
                    l = i;
                }
                _ => {
                    state = State::Unquoted;
                    l = i;
                }
            },
            State::End => match b {
                b' ' => {}
                b',' => {
                    state = State::New;
                    if level == 1 {
                        num += 1;
                    }
                }
                b']' => {
                    level -= 1;
                    if level == 1 {
                        cb(ParsedParam { num, loc: Span::new(comp_l, i), level: 1, quoted: false });
                    }
                }
                _ => return Err(ParamsError { pos: i }),
            },
            State::Unquoted => match b {
                b',' | b']' => {
                    cb(ParsedParam { num, loc: Span::new(l, i - 1), level, quoted: false });
                    state = State::End;
                    // the delimiter is handled again in End
                    continue;
                }
                b'[' => {
                    if level == 2 {
                        return Err(ParamsError { pos: i });
                    }
                    level += 1;
                    comp_l = l;
                    state = State::New;
                }
                _ => {}
            },
            State::Quoted => {
                if b == b'"' && bytes[i - 1] != b'\\' {
                    cb(ParsedParam { num, loc: Span::new(l, i), level, quoted: true });
                    state = State::End;
                }
            }
        }
        i += 1;
    }

    if level != 0 {
        return Err(ParamsError { pos: i });
    }
    Ok(())
}

/// Scans an item key with optional bracketed parameters starting at `pos`,
/// returning the offset just past the key. Unlike the list parsers, text
/// may continue after the key — the simple-macro grammar relies on this.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn parse_key(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && is_key_char(bytes[i]) {
        i += 1;
    }
    if i == pos {
        return None;
    }
    if bytes.get(i) != Some(&b'[') {
        return Some(i);
    }

    // 0 - between parameters, 1 - inside a quoted parameter, 2 - inside an
    // unquoted parameter
    let mut state = 0u8;
    let mut array = false;
    i += 1;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            0 => match b {
                b' ' | b',' => {}
                b'"' => state = 1,
                b'[' => {
                    if array {
                        return None; // multi-level arrays are not supported
                    }
                    array = true;
                }
                b']' => {
                    if array {
                        array = false;
                        while bytes.get(i + 1) == Some(&b' ') {
                            i += 1;
                        }
                        match bytes.get(i + 1) {
                            Some(&b']') => return Some(i + 2),
                            Some(&b',') => {}
                            _ => return None,
                        }
                    } else {
                        return Some(i + 1);
                    }
                }
                _ => state = 2,
            },
            1 => {
                if b == b'"' {
                    while bytes.get(i + 1) == Some(&b' ') {
                        i += 1;
                    }
                    match bytes.get(i + 1) {
                        Some(&b']') if !array => return Some(i + 2),
                        Some(&b']') | Some(&b',') => state = 0,
                        _ => return None,
                    }
                } else if b == b'\\' && bytes.get(i + 1) == Some(&b'"') {
                    i += 1;
                }
            }
            _ => {
                if b == b']' && !array {
                    return Some(i + 1);
                }
                if b == b',' || (b == b']' && array) {
                    state = 0;
                    continue;
                }
            }
        }
        i += 1;
    }
    None
}

/// Failure to render a key parameter in quoted form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteParamError {
    /// Quoting a value that ends with a backslash would leave an ambiguous
    /// escape before the closing quote.
    #[error("quoted parameter must not end with a backslash")]
    TrailingBackslash,
}

/// Renders a raw parameter value in its minimally-escaped stored form.
///
/// Quoting applies when `force` is set, or when the value starts with a
/// quote or space or contains `,` or `]`.
///
/// # Errors
///
/// [`QuoteParamError::TrailingBackslash`] when quoting applies and the
/// value ends with a backslash.
pub fn quote_param(value: &str, force: bool) -> Result<String, QuoteParamError> {
    let force =
        force || value.starts_with('"') || value.starts_with(' ') || value.contains(',') || value.contains(']');
    if !force {
        return Ok(String::from(value));
    }
    if value.ends_with('\\') {
        return Err(QuoteParamError::TrailingBackslash);
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

/// Recovers a parameter value from its raw (possibly quoted) form.
#[must_use]
pub fn unquote_param(raw: &str) -> String {
    match raw.strip_prefix('"') {
        Some(body) => body.strip_suffix('"').unwrap_or(body).replace("\\\"", "\""),
        None => String::from(raw),
    }
}
