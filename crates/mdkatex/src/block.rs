//! Document-wide pass for display formulas.
//!
//! Runs on the raw Markdown before block parsing. Recognizes `math` fences and
//! line-leading `\[ ... \]` pairs, stashes their bodies, and leaves a
//! placeholder paragraph in their place. Ordinary code fences are copied
//! through untouched so their content is never mistaken for math.

use tracing::debug;

use crate::catalog::{BRACKET_BLOCK, DelimiterRule, GITLAB_BLOCK};
use crate::shield::{ConversionContext, FormulaSpan};

/// An opening code fence line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    pub(crate) indent: &'a str,
    marker: char,
    len: usize,
    info: &'a str,
}

impl<'a> Fence<'a> {
    /// Parses `line` (without its line ending) as an opening fence.
    pub(crate) fn open(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        // a backtick in a backtick fence's info string makes it a code span
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Self {
            indent,
            marker,
            len,
            info,
        })
    }

    pub(crate) fn is_math(&self) -> bool {
        self.info == "math"
    }

    /// Whether `line` closes this fence.
    pub(crate) fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        !trimmed.is_empty()
            && trimmed.chars().all(|c| c == self.marker)
            && trimmed.len() >= self.len
    }

    /// Removes the fence's own indentation from a content line.
    fn dedent<'l>(&self, line: &'l str) -> &'l str {
        if let Some(rest) = line.strip_prefix(self.indent) {
            return rest;
        }
        let width = line
            .char_indices()
            .take(self.indent.len())
            .take_while(|(_, c)| c.is_whitespace())
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        &line[width..]
    }
}

/// Indentation, relative to the enclosing list item, that turns a line into
/// indented code.
pub(crate) const CODE_INDENT: usize = 4;

/// Column width of leading whitespace, with tabs stopping at multiples of four.
fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .fold(0, |col, c| if c == '\t' { col + 4 - col % 4 } else { col + 1 })
}

/// Bytes from the start of a list item marker to its content, if `rest`
/// starts a list item.
fn list_marker(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let marker = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || !matches!(bytes.get(digits), Some(b'.' | b')')) {
                return None;
            }
            digits + 1
        }
        _ => return None,
    };
    let spaces = bytes[marker..].iter().take_while(|b| **b == b' ').count();
    match spaces {
        0 if marker == bytes.len() => Some(marker + 1),
        0 => None,
        1..=4 => Some(marker + spaces),
        _ => Some(marker + 1),
    }
}

/// Content columns of the list items enclosing the current line.
///
/// Fences and bracket blocks may be indented at most three columns past the
/// innermost list item; anything deeper is indented code.
#[derive(Debug, Default)]
pub(crate) struct Containers {
    columns: Vec<usize>,
}

impl Containers {
    /// Feeds a non-blank line and returns its indentation relative to the
    /// list item it belongs to.
    pub(crate) fn relative_indent(&mut self, line: &str) -> usize {
        let rest = line.trim_start_matches([' ', '\t']);
        let width = indent_width(&line[..line.len() - rest.len()]);
        while self.columns.last().is_some_and(|col| *col > width) {
            self.columns.pop();
        }
        let relative = width - self.columns.last().copied().unwrap_or(0);
        if relative < CODE_INDENT {
            if let Some(marker) = list_marker(rest) {
                self.columns.push(width + marker);
            }
        }
        relative
    }
}

/// Forward search for one needle that remembers its last answer.
///
/// Scanners only move forward, so a search from a later position can reuse
/// the previous hit (or the previous miss) instead of rescanning the text.
#[derive(Debug)]
pub(crate) struct Seek {
    needle: &'static str,
    last: Option<(usize, Option<usize>)>,
}

impl Seek {
    pub(crate) fn new(needle: &'static str) -> Self {
        Self { needle, last: None }
    }

    /// Start of the first occurrence at or after `from`. Every call must pass
    /// the same `text`.
    pub(crate) fn find_from(&mut self, text: &str, from: usize) -> Option<usize> {
        if let Some((searched, hit)) = self.last {
            if from >= searched {
                match hit {
                    None => return None,
                    Some(hit) if hit >= from => return Some(hit),
                    Some(_) => {}
                }
            }
        }
        let hit = text[from..].find(self.needle).map(|at| from + at);
        self.last = Some((from, hit));
        hit
    }
}

/// Splits off the line starting at `pos`, returning `(line without ending, next pos)`.
pub(crate) fn next_line(text: &str, pos: usize) -> (&str, usize) {
    let end = text[pos..].find('\n').map_or(text.len(), |n| pos + n + 1);
    let line = text[pos..end].trim_end_matches('\n').trim_end_matches('\r');
    (line, end)
}

/// Replaces every display formula in `text` with a placeholder paragraph.
pub fn extract_blocks(ctx: &mut ConversionContext, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut containers = Containers::default();
    let mut brackets = BracketSearch::default();
    let mut pos = 0;

    while pos < text.len() {
        let (line, next) = next_line(text, pos);

        if line.trim().is_empty() || containers.relative_indent(line) >= CODE_INDENT {
            out.push_str(&text[pos..next]);
            pos = next;
            continue;
        }

        if let Some(fence) = Fence::open(line) {
            pos = if fence.is_math() {
                math_fence(ctx, &mut out, text, &fence, next)
            } else {
                code_fence(&mut out, text, &fence, pos, next)
            };
            continue;
        }

        if let Some(end) = bracket_block(ctx, &mut out, &mut brackets, text, line, pos) {
            pos = end;
            continue;
        }

        out.push_str(&text[pos..next]);
        pos = next;
    }

    out
}

/// Consumes a `math` fence whose content starts at `pos`. Returns the position after it.
fn math_fence(
    ctx: &mut ConversionContext,
    out: &mut String,
    text: &str,
    fence: &Fence<'_>,
    mut pos: usize,
) -> usize {
    let mut body = Vec::new();
    let mut closed = false;
    while pos < text.len() {
        let (line, next) = next_line(text, pos);
        pos = next;
        if fence.closes(line) {
            closed = true;
            break;
        }
        body.push(fence.dedent(line));
    }
    if !closed {
        debug!("unterminated math fence runs to end of document");
    }
    push_block(ctx, out, fence.indent, body.join("\n"), &GITLAB_BLOCK);
    pos
}

/// Copies an ordinary code fence through unchanged. Returns the position after it.
fn code_fence(out: &mut String, text: &str, fence: &Fence<'_>, start: usize, mut pos: usize) -> usize {
    while pos < text.len() {
        let (line, next) = next_line(text, pos);
        pos = next;
        if fence.closes(line) {
            break;
        }
    }
    out.push_str(&text[start..pos]);
    pos
}

/// Delimiter searches shared by every bracket block in one document.
#[derive(Debug)]
struct BracketSearch {
    open: Seek,
    close: Seek,
}

impl Default for BracketSearch {
    fn default() -> Self {
        Self {
            open: Seek::new(BRACKET_BLOCK.open),
            close: Seek::new(BRACKET_BLOCK.close),
        }
    }
}

/// Tries a `\[ ... \]` block opening on `line`. Returns the position after the
/// closing line, or `None` when the line does not start a complete block.
fn bracket_block(
    ctx: &mut ConversionContext,
    out: &mut String,
    search: &mut BracketSearch,
    text: &str,
    line: &str,
    pos: usize,
) -> Option<usize> {
    let rule = &BRACKET_BLOCK;
    let trimmed = line.trim_start();
    if !trimmed.starts_with(rule.open) {
        return None;
    }
    let indent = &line[..line.len() - trimmed.len()];
    let body_start = pos + indent.len() + rule.open.len();
    let close = search.close.find_from(text, body_start)?;
    if search.open.find_from(text, body_start).is_some_and(|open| open < close) {
        debug!("nested {} before closing {}, leaving as text", rule.open, rule.close);
        return None;
    }
    let body = &text[body_start..close];

    let after = close + rule.close.len();
    let (trailing, end) = next_line(text, after);
    push_block(ctx, out, indent, body.to_string(), rule);
    if !trailing.trim().is_empty() {
        out.push_str(indent);
        out.push_str(trailing.trim_start());
        out.push('\n');
    }
    Some(end)
}

/// Stashes a block formula and writes its placeholder as a paragraph of its own.
fn push_block(
    ctx: &mut ConversionContext,
    out: &mut String,
    indent: &str,
    source: String,
    rule: &'static DelimiterRule,
) {
    debug!(rule = rule.name, len = source.len(), "stashing block formula");
    let token = ctx.stash(FormulaSpan::new(source, rule));
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        if !out.ends_with("\n\n") {
            out.push('\n');
        }
    }
    out.push_str(indent);
    out.push_str(token.as_str());
    out.push_str("\n\n");
}
