//! Shapes that wrap another placeholder: `{{...}` prefixed.
//!
//! The embedded placeholder is parsed first; the character after its
//! closing brace then decides the outer shape: `.` pipes the embedded
//! value through a function, `:` makes the embedded macro stand in for a
//! simple-macro host name. The first interpretation attempted wins — a `.`
//! continuation whose function fails to match fails the whole shape
//! without retrying as a simple macro.

use crate::context;
use crate::function::match_call;
use crate::search::TokenSearch;
use crate::span::Span;
use crate::token::{FuncMacroData, Token, TokenData};

#[derive(Clone, Copy)]
enum Inner {
    Plain,
    User,
    Discovery,
    Expression,
}

pub(super) fn parse(text: &str, pos: usize, search: TokenSearch) -> Option<Token> {
    let bytes = text.as_bytes();

    let (inner_r, inner) = match bytes.get(pos + 2)? {
        b'#' => (super::parse_discovery_macro(text, pos + 1)?.loc.r, Inner::Discovery),
        b'?' => {
            if !search.contains(TokenSearch::EXPRESSION_MACRO) {
                return None;
            }
            (super::parse_expression_macro(text, pos + 1, search)?.loc.r, Inner::Expression)
        }
        b'$' => (context::parse_user_macro_at(text, pos + 1)?.end, Inner::User),
        _ => (super::parse_macro(text, pos + 1)?.loc.r, Inner::Plain),
    };

    match bytes.get(inner_r + 1) {
        Some(&b'.') => parse_func_macro(text, pos, inner_r, inner),
        Some(&b':')
            if search.contains(TokenSearch::SIMPLE_MACRO)
                && matches!(inner, Inner::Plain | Inner::Discovery) =>
        {
            // the embedded macro, braces included, stands in for the host
            super::parse_simple_macro_key(text, pos, Span::new(pos + 1, inner_r), inner_r + 2)
        }
        _ => None,
    }
}

fn parse_func_macro(text: &str, pos: usize, inner_r: usize, inner: Inner) -> Option<Token> {
    let bytes = text.as_bytes();
    let call = match_call(text, inner_r + 2)?;

    // trailing spaces are allowed before the closing brace
    let mut end = call.params.r + 1;
    while bytes.get(end) == Some(&b' ') {
        end += 1;
    }
    if bytes.get(end) != Some(&b'}') {
        return None;
    }

    let data = FuncMacroData {
        inner: Span::new(pos + 1, inner_r),
        func: Span::new(call.name.l, call.params.r),
        func_param: call.params,
    };
    let data = match inner {
        Inner::Plain | Inner::Expression => TokenData::FuncMacro(data),
        Inner::User => TokenData::UserFuncMacro(data),
        Inner::Discovery => TokenData::DiscoveryFuncMacro(data),
    };
    Some(Token { loc: Span::new(pos, end), data })
}
