//! Whole-string placeholder substitution.
//!
//! [`substitute`] rewrites a string in place: it scans for the next
//! placeholder, asks the caller's [`Resolver`] for its value, splices the
//! replacement over the token and continues scanning *after* the written
//! text. Spans never survive a splice — every iteration re-derives them
//! with a fresh scan — and resolver output is never re-scanned, so a value
//! containing `{...}` cannot inject further expansion.
//!
//! Discovery macros and numeric object ids are an upstream expansion
//! phase's business and pass through untouched.

use alloc::borrow::Cow;
use alloc::string::String;
use thiserror::Error;

use crate::scanner::find_token;
use crate::search::TokenSearch;
use crate::span::Span;
use crate::token::{FuncMacroData, Token, TokenData, TokenKind};

/// Placeholder written over macros the resolver cannot supply.
pub const UNRESOLVED_MACRO_VALUE: &str = "*UNKNOWN*";

/// Macro names that may carry a numeric suffix 1–9 selecting the Nth
/// function argument of the surrounding trigger expression.
const INDEXABLE_MACROS: &[&str] = &[
    "{HOST.HOST}",
    "{HOST.NAME}",
    "{HOST.IP}",
    "{IPADDRESS}",
    "{HOST.DNS}",
    "{HOST.CONN}",
    "{HOST.PORT}",
    "{ITEM.ID}",
    "{ITEM.NAME}",
    "{ITEM.KEY}",
    "{ITEM.DESCRIPTION}",
    "{ITEM.VALUE}",
    "{ITEM.LASTVALUE}",
    "{ITEM.STATE}",
    "{ITEM.VALUETYPE}",
    "{ITEM.LOG.DATE}",
    "{ITEM.LOG.TIME}",
    "{ITEM.LOG.AGE}",
    "{ITEM.LOG.SOURCE}",
    "{ITEM.LOG.SEVERITY}",
    "{ITEM.LOG.NSEVERITY}",
    "{ITEM.LOG.EVENTID}",
];

/// Outcome of a single resolver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The macro resolves to this value.
    Resolved(String),
    /// The macro has no value here; the engine degrades to
    /// [`UNRESOLVED_MACRO_VALUE`] unless the macro is strict.
    Unresolved,
}

/// One macro offered for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroRequest<'a> {
    /// Normalized macro text: the whole placeholder for most kinds, the
    /// wrapped inner macro for the function-macro kinds, with any numeric
    /// index stripped (`{HOST.NAME2}` arrives as `{HOST.NAME}`).
    pub macro_text: &'a str,
    /// Shape of the placeholder the request came from.
    pub kind: TokenKind,
    /// Index split off an indexable macro name; 1 when none was present.
    pub index: u8,
}

/// Caller-supplied value lookup consulted by [`substitute`].
///
/// Whatever state resolution needs — caches, event context, connection
/// handles — lives in the implementing type. A closure taking a
/// [`MacroRequest`] implements the trait for plain value lookup.
pub trait Resolver {
    /// Supplies the value for one recognized macro.
    fn resolve(&mut self, request: &MacroRequest<'_>) -> Resolution;

    /// Pipes a resolved value through the post-processing function attached
    /// to a function macro. `None` discards the value and the token counts
    /// as unresolved.
    fn apply_function(&mut self, func: &str, params: &str, value: &str) -> Option<String> {
        let _ = (func, params, value);
        None
    }

    /// Macros whose failed resolution aborts the whole call instead of
    /// degrading to [`UNRESOLVED_MACRO_VALUE`].
    fn is_strict(&self, macro_text: &str) -> bool {
        let _ = macro_text;
        false
    }

    /// Supplies the value for a `$N` back-reference. An unresolved
    /// reference stops reference search for the remainder of the call and
    /// leaves the text untouched.
    fn resolve_reference(&mut self, index: u8) -> Resolution {
        let _ = index;
        Resolution::Unresolved
    }
}

impl<F> Resolver for F
where
    F: FnMut(&MacroRequest<'_>) -> Resolution,
{
    fn resolve(&mut self, request: &MacroRequest<'_>) -> Resolution {
        self(request)
    }
}

/// Options for [`substitute`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstituteOptions {
    /// Also offer `$N` numeric back-references to the resolver.
    pub references: bool,
    /// Truncate the token text quoted in error messages to at most this
    /// many bytes, on a character boundary.
    pub error_limit: Option<usize>,
}

/// Fatal substitution failure. After an error the buffer content is
/// unspecified; only a success result licenses reading it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstituteError {
    /// A macro on the strict list could not be resolved.
    #[error("cannot resolve macro \"{macro_text}\"")]
    UnresolvedStrictMacro {
        /// The offending placeholder, possibly truncated.
        macro_text: String,
    },
}

/// Rewrites `text` in place, replacing every recognized placeholder with
/// the resolver's value or [`UNRESOLVED_MACRO_VALUE`].
///
/// # Errors
///
/// [`SubstituteError::UnresolvedStrictMacro`] when a macro the resolver
/// declares strict stays unresolved; the message names the offending token.
pub fn substitute<R: Resolver>(
    text: &mut String,
    resolver: &mut R,
    options: &SubstituteOptions,
) -> Result<(), SubstituteError> {
    let mut search = TokenSearch::BASIC | TokenSearch::SIMPLE_MACRO;
    if options.references {
        search |= TokenSearch::REFERENCES;
    }

    let mut pos = 0;
    while let Some(token) = find_token(text, pos, search) {
        match token.kind() {
            TokenKind::ObjectId | TokenKind::DiscoveryMacro | TokenKind::DiscoveryFuncMacro => {
                // expanded upstream; leave verbatim
                pos = token.loc.r + 1;
                continue;
            }
            TokenKind::Reference => {
                let TokenData::Reference { index } = token.data else { unreachable!() };
                match resolver.resolve_reference(index) {
                    Resolution::Resolved(value) => pos = splice(text, token.loc, &value),
                    Resolution::Unresolved => search = search.without(TokenSearch::REFERENCES),
                }
                continue;
            }
            _ => {}
        }

        let outcome = {
            let (macro_text, index) = request_text(text, &token);
            let request = MacroRequest { macro_text: &macro_text, kind: token.kind(), index };
            let resolved = match resolver.resolve(&request) {
                Resolution::Resolved(value) => match &token.data {
                    TokenData::FuncMacro(data) | TokenData::UserFuncMacro(data) => {
                        apply_function(text, data, resolver, &value)
                    }
                    _ => Some(value),
                },
                Resolution::Unresolved => None,
            };
            match resolved {
                Some(value) => Ok(value),
                None => {
                    if resolver.is_strict(&macro_text) {
                        Err(SubstituteError::UnresolvedStrictMacro {
                            macro_text: truncated(token.loc.slice(text), options.error_limit),
                        })
                    } else {
                        Ok(String::from(UNRESOLVED_MACRO_VALUE))
                    }
                }
            }
        };
        let value = outcome?;
        pos = splice(text, token.loc, &value);
    }
    Ok(())
}

/// Writes `value` over `loc` and returns the next scan position, placed
/// just past the written text so resolver output is never re-scanned.
fn splice(text: &mut String, loc: Span, value: &str) -> usize {
    text.replace_range(loc.l..=loc.r, value);
    loc.l + value.len()
}

fn apply_function<R: Resolver>(text: &str, data: &FuncMacroData, resolver: &mut R, value: &str) -> Option<String> {
    let func = &text[data.func.l..data.func_param.l];
    let params = Span::new(data.func_param.l + 1, data.func_param.r - 1);
    resolver.apply_function(func, params.slice(text), value)
}

/// The macro text a token offers for resolution, with any numeric index
/// split off.
fn request_text<'a>(text: &'a str, token: &Token) -> (Cow<'a, str>, u8) {
    match &token.data {
        TokenData::Macro { .. } => split_index(token.loc.slice(text)),
        TokenData::FuncMacro(data) => split_index(data.inner.slice(text)),
        TokenData::UserFuncMacro(data) => (Cow::Borrowed(data.inner.slice(text)), 1),
        _ => (Cow::Borrowed(token.loc.slice(text)), 1),
    }
}

/// `{HOST.NAME2}` → (`{HOST.NAME}`, 2) for names on the indexable
/// allow-list; anything else passes through with index 1.
fn split_index(macro_text: &str) -> (Cow<'_, str>, u8) {
    let bytes = macro_text.as_bytes();
    if bytes.len() >= 4 && bytes[bytes.len() - 1] == b'}' {
        let digit = bytes[bytes.len() - 2];
        if digit.is_ascii_digit() && digit != b'0' {
            let base = [&macro_text[..macro_text.len() - 2], "}"].concat();
            if INDEXABLE_MACROS.contains(&base.as_str()) {
                return (Cow::Owned(base), digit - b'0');
            }
        }
    }
    (Cow::Borrowed(macro_text), 1)
}

fn truncated(s: &str, limit: Option<usize>) -> String {
    let Some(limit) = limit else {
        return String::from(s);
    };
    if s.len() <= limit {
        return String::from(s);
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&s[..end])
}
