//! Token descriptors produced by the scanner.
//!
//! A [`Token`] is a tagged description of one recognized placeholder: the
//! outer location plus kind-specific payload spans, all of them byte offsets
//! into the scanned string. Tokens own no text and are transient — any
//! mutation of the scanned string invalidates them.

use crate::context::ContextOp;
use crate::span::Span;

/// Shape classification of a recognized placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// `{123}` — numeric object id.
    ObjectId,
    /// `$1`..`$9` — numeric back-reference, no braces.
    Reference,
    /// `{NAME}` / `{NAME.SUB}` — plain macro.
    Macro,
    /// `{$NAME}` / `{$NAME:context}` — user macro.
    UserMacro,
    /// `{#NAME}` — low-level discovery macro.
    DiscoveryMacro,
    /// `{?expression}` — expression macro.
    ExpressionMacro,
    /// `{{NAME}.func(args)}` — macro piped through a function.
    FuncMacro,
    /// `{{$NAME}.func(args)}` — user macro piped through a function.
    UserFuncMacro,
    /// `{{#NAME}.func(args)}` — discovery macro piped through a function.
    DiscoveryFuncMacro,
    /// `{host:key.func(args)}` — key on a host, through a function.
    SimpleMacro,
    /// `{var}` — scripted-collector variable.
    VarMacro,
    /// `{var.func(args)}` — scripted-collector variable through a function.
    VarFuncMacro,
}

/// Context suffix of a user macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroContext {
    /// Raw context text, quotes included when `quoted`. Empty for `{$M:}`.
    pub loc: Span,
    /// `true` when the context was double-quoted.
    pub quoted: bool,
    /// Match operator announced by the context prefix.
    pub op: ContextOp,
}

/// Payload of the function-macro shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuncMacroData {
    /// The wrapped macro, braces included (for [`TokenData::VarFuncMacro`],
    /// the bare variable name).
    pub inner: Span,
    /// Function name through the closing parenthesis.
    pub func: Span,
    /// Argument list, parentheses included.
    pub func_param: Span,
}

/// Payload of a simple macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleMacroData {
    /// Host name, or a nested macro (braces included) standing in for one.
    pub host: Span,
    /// Item key, parameters included.
    pub key: Span,
    /// Function name through the closing parenthesis.
    pub func: Span,
    /// Argument list, parentheses included.
    pub func_param: Span,
}

/// Kind-specific payload of a [`Token`]. Payload spans are always
/// sub-ranges of the token's outer location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenData {
    /// See [`TokenKind::ObjectId`].
    ObjectId {
        /// The digits between the braces.
        id: Span,
    },
    /// See [`TokenKind::Reference`].
    Reference {
        /// The referenced position, 0–9.
        index: u8,
    },
    /// See [`TokenKind::Macro`].
    Macro {
        /// Name between the braces.
        name: Span,
    },
    /// See [`TokenKind::UserMacro`].
    UserMacro {
        /// Name between `{$` and the context separator or closing brace.
        name: Span,
        /// Context suffix, when a `:` separator was present.
        context: Option<MacroContext>,
    },
    /// See [`TokenKind::DiscoveryMacro`].
    DiscoveryMacro {
        /// Name between `{#` and the closing brace.
        name: Span,
    },
    /// See [`TokenKind::ExpressionMacro`].
    ExpressionMacro {
        /// The expression between `{?` and the closing brace.
        expression: Span,
    },
    /// See [`TokenKind::FuncMacro`].
    FuncMacro(FuncMacroData),
    /// See [`TokenKind::UserFuncMacro`].
    UserFuncMacro(FuncMacroData),
    /// See [`TokenKind::DiscoveryFuncMacro`].
    DiscoveryFuncMacro(FuncMacroData),
    /// See [`TokenKind::SimpleMacro`].
    SimpleMacro(SimpleMacroData),
    /// See [`TokenKind::VarMacro`].
    VarMacro {
        /// Name between the braces.
        name: Span,
    },
    /// See [`TokenKind::VarFuncMacro`].
    VarFuncMacro(FuncMacroData),
}

/// A placeholder recognized inside a string.
///
/// `loc` starts at the opening `{` and, except for [`TokenKind::Reference`],
/// ends at the matching `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// Outer span of the whole placeholder.
    pub loc: Span,
    /// Kind-specific payload.
    pub data: TokenData,
}

impl Token {
    /// Shape classification of this token.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        match self.data {
            TokenData::ObjectId { .. } => TokenKind::ObjectId,
            TokenData::Reference { .. } => TokenKind::Reference,
            TokenData::Macro { .. } => TokenKind::Macro,
            TokenData::UserMacro { .. } => TokenKind::UserMacro,
            TokenData::DiscoveryMacro { .. } => TokenKind::DiscoveryMacro,
            TokenData::ExpressionMacro { .. } => TokenKind::ExpressionMacro,
            TokenData::FuncMacro(_) => TokenKind::FuncMacro,
            TokenData::UserFuncMacro(_) => TokenKind::UserFuncMacro,
            TokenData::DiscoveryFuncMacro(_) => TokenKind::DiscoveryFuncMacro,
            TokenData::SimpleMacro(_) => TokenKind::SimpleMacro,
            TokenData::VarMacro { .. } => TokenKind::VarMacro,
            TokenData::VarFuncMacro(_) => TokenKind::VarFuncMacro,
        }
    }

    /// The full placeholder text.
    #[must_use]
    pub fn text<'a>(&self, text: &'a str) -> &'a str {
        self.loc.slice(text)
    }
}
