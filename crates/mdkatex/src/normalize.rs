//! Final pass: placeholders become KaTeX auto-render markup.

use std::fmt::Write;

use pulldown_cmark_escape::{FmtWriter, escape_html, escape_html_body_text};
use tracing::warn;

use crate::catalog::Scope;
use crate::error::LookupError;
use crate::shield::{ConversionContext, FormulaSpan, TOKEN_END, TOKEN_START};

/// Class on the element wrapping an inline formula.
pub const INLINE_CLASS: &str = "katex-inline";
/// Class on the element wrapping a display formula.
pub const BLOCK_CLASS: &str = "katex-block";

fn delimiters(scope: Scope) -> (&'static str, &'static str) {
    match scope {
        Scope::Inline => (r"\(", r"\)"),
        Scope::Block => (r"\[", r"\]"),
    }
}

/// Writes the wrapper element for `span` with its source in bracket delimiters.
pub fn write_formula(out: &mut String, span: &FormulaSpan) {
    let (tag, class) = match span.scope {
        Scope::Inline => ("span", INLINE_CLASS),
        Scope::Block => ("div", BLOCK_CLASS),
    };
    let (open, close) = delimiters(span.scope);
    // Writing to a String can't fail
    let _ = write!(out, r#"<{tag} class="{class}">{open}"#);
    let _ = escape_html_body_text(FmtWriter(&mut *out), &span.source);
    let _ = write!(out, "{close}</{tag}>");
}

/// Writes `span` as delimited text for an attribute value, such as image alt
/// text or a link title, where markup is not allowed.
pub fn write_formula_text(out: &mut String, span: &FormulaSpan) {
    let (open, close) = delimiters(span.scope);
    out.push_str(open);
    let _ = escape_html(FmtWriter(&mut *out), &span.source);
    out.push_str(close);
}

/// Whether the HTML written so far leaves us inside a tag.
fn ends_inside_tag(html: &str, inside: bool) -> bool {
    html.rfind(['<', '>'])
        .map_or(inside, |at| html.as_bytes()[at] == b'<')
}

/// Substitutes every placeholder in `html`.
///
/// A block placeholder that the parser wrapped in its own paragraph replaces
/// that paragraph. A placeholder inside a tag becomes plain delimited text.
/// Any lookup failure aborts the whole substitution.
pub fn normalize(ctx: &mut ConversionContext, html: &str) -> Result<String, LookupError> {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut in_tag = false;

    while let Some(start) = rest.find(TOKEN_START) {
        let Some(len) = rest[start..].find(TOKEN_END) else {
            return Err(LookupError::Malformed {
                fragment: rest[start..].chars().take(32).collect(),
            });
        };
        let end = start + len + TOKEN_END.len_utf8();
        let span = ctx.resolve(&rest[start..end])?;

        let mut before = &rest[..start];
        let mut after = &rest[end..];
        in_tag = ends_inside_tag(before, in_tag);
        if in_tag {
            out.push_str(before);
            write_formula_text(&mut out, &span);
            rest = after;
            continue;
        }
        if span.scope == Scope::Block {
            if let (Some(b), Some(a)) = (before.strip_suffix("<p>"), after.strip_prefix("</p>")) {
                before = b;
                after = a;
            }
        }
        out.push_str(before);
        write_formula(&mut out, &span);
        rest = after;
    }
    out.push_str(rest);

    if ctx.pending() > 0 {
        warn!(
            pending = ctx.pending(),
            "formulas were stashed but their placeholders never reached the output"
        );
    }
    Ok(out)
}
