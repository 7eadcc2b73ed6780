//! Placeholder store that keeps formula source away from the Markdown parser.
//!
//! A formula found by one of the extractors is handed to [`ConversionContext::stash`]
//! and replaced in the text by the returned [`Token`]. The token is built from
//! characters the parser passes through untouched, so the formula source is
//! only seen again when the output pass resolves the token.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::catalog::{DelimiterRule, Scope};
use crate::error::LookupError;

/// Start of text, opens every placeholder.
pub const TOKEN_START: char = '\u{2}';
/// End of text, closes every placeholder.
pub const TOKEN_END: char = '\u{3}';
const TOKEN_TAG: &str = "mk";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A formula as the author typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaSpan {
    /// Formula body without its delimiters.
    pub source: String,
    pub scope: Scope,
    pub rule: &'static DelimiterRule,
}

impl FormulaSpan {
    pub fn new(source: impl Into<String>, rule: &'static DelimiterRule) -> Self {
        Self {
            source: source.into(),
            scope: rule.scope,
            rule,
        }
    }
}

/// Opaque marker standing in for a stashed formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    fn new(context: u64, index: usize) -> Self {
        Self(format!("{TOKEN_START}{TOKEN_TAG}{context}:{index}{TOKEN_END}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a token into its context id and index.
fn parse_token(token: &str) -> Option<(u64, usize)> {
    let body = token
        .strip_prefix(TOKEN_START)?
        .strip_suffix(TOKEN_END)?
        .strip_prefix(TOKEN_TAG)?;
    let (context, index) = body.split_once(':')?;
    Some((context.parse().ok()?, index.parse().ok()?))
}

/// Per-document placeholder map.
///
/// Create one per conversion and thread it through every hook for that
/// document. Contexts are never shared, so concurrent conversions need no
/// locking; a token minted by one context is rejected by every other.
#[derive(Debug)]
pub struct ConversionContext {
    id: u64,
    next: usize,
    spans: HashMap<usize, FormulaSpan>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            next: 0,
            spans: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registers `span` and returns the token that now stands in for it.
    pub fn stash(&mut self, span: FormulaSpan) -> Token {
        let index = self.next;
        self.next += 1;
        self.spans.insert(index, span);
        Token::new(self.id, index)
    }

    /// Takes the formula registered under `token` out of the store.
    ///
    /// Each token resolves exactly once; a second lookup is [`LookupError::Unknown`].
    pub fn resolve(&mut self, token: &str) -> Result<FormulaSpan, LookupError> {
        let Some((owner, index)) = parse_token(token) else {
            return Err(LookupError::Malformed {
                fragment: token.to_string(),
            });
        };
        if owner != self.id {
            return Err(LookupError::Foreign {
                token: token.to_string(),
                owner,
                context: self.id,
            });
        }
        self.spans.remove(&index).ok_or_else(|| LookupError::Unknown {
            token: token.to_string(),
        })
    }

    /// Number of stashed formulas not yet resolved.
    pub fn pending(&self) -> usize {
        self.spans.len()
    }
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the placeholder delimiters in user input so a document cannot forge a token.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.contains([TOKEN_START, TOKEN_END]) {
        Cow::Owned(text.replace([TOKEN_START, TOKEN_END], "\u{FFFD}"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BRACKET_BLOCK, BRACKET_INLINE};

    #[test]
    fn stash_then_resolve() {
        let mut ctx = ConversionContext::new();
        let token = ctx.stash(FormulaSpan::new("a_b*c*", &BRACKET_INLINE));
        assert_eq!(ctx.pending(), 1);

        let span = ctx.resolve(token.as_str()).unwrap();
        assert_eq!(span.source, "a_b*c*");
        assert_eq!(span.scope, Scope::Inline);
        assert_eq!(span.rule.name, "bracket-inline");
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn tokens_are_unique_within_a_context() {
        let mut ctx = ConversionContext::new();
        let a = ctx.stash(FormulaSpan::new("x", &BRACKET_INLINE));
        let b = ctx.stash(FormulaSpan::new("x", &BRACKET_INLINE));
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_are_inert_to_markdown() {
        let mut ctx = ConversionContext::new();
        let token = ctx.stash(FormulaSpan::new("", &BRACKET_BLOCK));
        let body = token.as_str().trim_matches([TOKEN_START, TOKEN_END]);
        assert!(body.chars().all(|c| c.is_ascii_alphanumeric() || c == ':'));
    }

    #[test]
    fn second_resolve_is_unknown() {
        let mut ctx = ConversionContext::new();
        let token = ctx.stash(FormulaSpan::new("x", &BRACKET_INLINE));
        ctx.resolve(token.as_str()).unwrap();
        assert!(matches!(
            ctx.resolve(token.as_str()),
            Err(LookupError::Unknown { .. })
        ));
    }

    #[test]
    fn foreign_token_is_rejected() {
        let mut first = ConversionContext::new();
        let mut second = ConversionContext::new();
        let token = first.stash(FormulaSpan::new("x", &BRACKET_INLINE));
        second.stash(FormulaSpan::new("y", &BRACKET_INLINE));

        let err = second.resolve(token.as_str()).unwrap_err();
        assert_eq!(
            err,
            LookupError::Foreign {
                token: token.to_string(),
                owner: first.id(),
                context: second.id(),
            }
        );
        // the owner can still resolve it
        assert_eq!(first.resolve(token.as_str()).unwrap().source, "x");
    }

    #[test]
    fn malformed_token_is_rejected() {
        let mut ctx = ConversionContext::new();
        let err = ctx.resolve("\u{2}mkbogus\u{3}").unwrap_err();
        assert!(matches!(err, LookupError::Malformed { .. }));
    }

    #[test]
    fn sanitize_strips_token_delimiters() {
        assert!(matches!(sanitize("plain"), Cow::Borrowed("plain")));
        assert_eq!(sanitize("a\u{2}mk1:0\u{3}b"), "a\u{FFFD}mk1:0\u{FFFD}b");
    }
}
