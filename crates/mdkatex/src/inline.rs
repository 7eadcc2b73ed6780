//! Inline formula pass.
//!
//! Scans one fragment of running text left to right. At each position the
//! inline rules are tried in catalog order; the first opener with a closer
//! later on the same line wins and the whole delimited match is swapped for a
//! placeholder. Code spans, link destinations and backslash escapes are
//! stepped over so that none of them can open a formula. A fragment may hold
//! several lines: code spans continue across them, formulas do not.

use tracing::debug;

use crate::block::Seek;
use crate::catalog::{self, DelimiterRule, Scope};
use crate::shield::{ConversionContext, FormulaSpan};

/// A delimited formula starting at the scan position.
struct Match<'a> {
    rule: &'static DelimiterRule,
    body: &'a str,
    /// Bytes covered, delimiters included.
    len: usize,
}

fn match_formula<'a>(
    text: &'a str,
    pos: usize,
    line_end: usize,
    closers: &mut [Seek],
) -> Option<Match<'a>> {
    let rules = catalog::rules(Scope::Inline);
    rules.iter().copied().zip(closers).find_map(|(rule, closer)| {
        if !text[pos..].starts_with(rule.open) {
            return None;
        }
        let body_start = pos + rule.open.len();
        let close = closer
            .find_from(text, body_start)
            .filter(|close| close + rule.close.len() <= line_end)?;
        Some(Match {
            rule,
            body: &text[body_start..close],
            len: close + rule.close.len() - pos,
        })
    })
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| **b == b'`').count()
}

/// Position after the code span opening at `start`, or after the bare
/// backtick run when it has no matching closer.
fn skip_code_span(bytes: &[u8], start: usize) -> usize {
    let run = backtick_run(bytes, start);
    let mut i = start + run;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let closing = backtick_run(bytes, i);
            if closing == run {
                return i + closing;
            }
            i += closing;
        } else {
            i += 1;
        }
    }
    start + run
}

/// Position after the link destination starting at `start`, just past `](`.
///
/// The parser rejects control characters in a destination, so a placeholder
/// there would break the link.
fn skip_link_destination(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while bytes.get(i).is_some_and(|b| matches!(b, b' ' | b'\t')) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'<') {
        while i < bytes.len() && !matches!(bytes[i], b'>' | b'\n') {
            if bytes[i] == b'\\' {
                i += 1;
            }
            i += 1;
        }
        return (i + 1).min(bytes.len());
    }
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b if b.is_ascii_whitespace() => break,
            _ => {}
        }
        i += 1;
    }
    i.min(bytes.len())
}

fn char_len(text: &str, pos: usize) -> usize {
    text[pos..].chars().next().map_or(1, char::len_utf8)
}

fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map_or(text.len(), |n| pos + n)
}

/// Replaces every inline formula in `span` with a placeholder.
///
/// An opener without a closer on the same line is left as literal text.
pub fn extract_inline(ctx: &mut ConversionContext, span: &str) -> String {
    let bytes = span.as_bytes();
    let mut closers: Vec<Seek> = catalog::rules(Scope::Inline)
        .iter()
        .map(|rule| Seek::new(rule.close))
        .collect();
    let mut out = String::with_capacity(span.len());
    let mut copied = 0;
    let mut pos = 0;
    let mut end_of_line = line_end(span, 0);

    while pos < span.len() {
        if pos > end_of_line {
            end_of_line = line_end(span, pos);
        }
        if let Some(found) = match_formula(span, pos, end_of_line, &mut closers) {
            debug!(rule = found.rule.name, body = found.body, "stashing inline formula");
            out.push_str(&span[copied..pos]);
            let token = ctx.stash(FormulaSpan::new(found.body, found.rule));
            out.push_str(token.as_str());
            pos += found.len;
            copied = pos;
            continue;
        }
        pos = match bytes[pos] {
            b'\\' if pos + 1 < span.len() => pos + 1 + char_len(span, pos + 1),
            b'`' => skip_code_span(bytes, pos),
            b']' if bytes.get(pos + 1) == Some(&b'(') => skip_link_destination(bytes, pos + 2),
            _ => pos + char_len(span, pos),
        };
    }

    out.push_str(&span[copied..]);
    out
}
