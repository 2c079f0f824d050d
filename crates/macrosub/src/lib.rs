//! Locate, classify and replace `{...}` placeholders embedded in monitoring
//! configuration strings — trigger expressions, item keys, SNMP object
//! identifiers, URLs and notification text.
//!
//! The engine has four cooperating parts:
//!
//! - [`find_token`] — a positional scanner that recognizes placeholder
//!   shapes inside arbitrary text and reports them as byte-offset spans,
//! - the nested-shape resolver behind it, for placeholders that wrap
//!   another placeholder (`{{#FSNAME}.regsub(...)}`),
//! - [`substitute`] — a driver that rewrites a whole string in place
//!   through a caller-supplied [`Resolver`],
//! - [`parse_key_params`] / [`parse_oid_params`] — a structured tokenizer
//!   for bracketed key and OID argument lists.
//!
//! Malformed placeholders are never errors: an opening brace that does not
//! parse is ordinary text and scanning resumes one character later.
//!
//! ```rust
//! use macrosub::{MacroRequest, Resolution, SubstituteOptions, substitute};
//!
//! let mut text = String::from("Load on {HOST.NAME}: {ITEM.VALUE}");
//! let mut resolver = |request: &MacroRequest<'_>| match request.macro_text {
//!     "{HOST.NAME}" => Resolution::Resolved("srv1".into()),
//!     "{ITEM.VALUE}" => Resolution::Resolved("0.95".into()),
//!     _ => Resolution::Unresolved,
//! };
//! substitute(&mut text, &mut resolver, &SubstituteOptions::default()).unwrap();
//! assert_eq!(text, "Load on srv1: 0.95");
//! ```

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod context;
mod function;
mod params;
mod scanner;
mod search;
mod span;
mod subst;
mod token;


pub use context::{ContextOp, QuoteContextError, UserMacroParts, parse_user_macro, quote_context, unquote_context};
pub use function::{FunctionCall, match_call};
pub use params::{
    ParamsError, ParsedParam, QuoteParamError, parse_key, parse_key_params, parse_oid_params, quote_param,
    unquote_param,
};
pub use scanner::find_token;
pub use search::TokenSearch;
pub use span::Span;
pub use subst::{
    MacroRequest, Resolution, Resolver, SubstituteError, SubstituteOptions, UNRESOLVED_MACRO_VALUE, substitute,
};
pub use token::{FuncMacroData, MacroContext, SimpleMacroData, Token, TokenData, TokenKind};
