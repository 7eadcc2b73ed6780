//! Host side of the extension: drives pulldown-cmark through the hooks.

use pulldown_cmark::{Options, Parser, html};
use tracing::instrument;

use crate::block::{CODE_INDENT, Containers, Fence, next_line};
use crate::error::LookupError;
use crate::extension::{KatexExtension, MarkdownExtension};
use crate::shield::ConversionContext;

/// Markdown features enabled by [`Pipeline::new`].
///
/// `ENABLE_MATH` is left off: single dollar math is not a recognized style,
/// and the parser must never see formula source in any case.
pub fn default_md_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Converts Markdown to an HTML fragment with normalized math.
pub struct Pipeline<E = KatexExtension> {
    extension: E,
    options: Options,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_options(default_md_options())
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_extension(KatexExtension, options)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MarkdownExtension> Pipeline<E> {
    pub fn with_extension(extension: E, options: Options) -> Self {
        Self { extension, options }
    }

    /// Converts one document with a fresh [`ConversionContext`].
    #[instrument(level = "debug", skip_all, fields(len = markdown.len()))]
    pub fn render(&self, markdown: &str) -> Result<String, LookupError> {
        let mut ctx = ConversionContext::new();
        self.render_with(&mut ctx, markdown)
    }

    /// Converts one document using `ctx`, which must not have been used for
    /// any other document.
    pub fn render_with(
        &self,
        ctx: &mut ConversionContext,
        markdown: &str,
    ) -> Result<String, LookupError> {
        let text = self.extension.transform_document(ctx, markdown);
        let text = self.transform_fragments(ctx, &text);

        let parser = Parser::new_ext(&text, self.options);
        let mut output = String::with_capacity(text.len() + text.len() / 2);
        html::push_html(&mut output, parser);

        self.extension.finalize(ctx, &output)
    }

    /// Hands each run of running text to the span hook: a paragraph as one
    /// fragment, a heading line on its own. Code fences and indented code are
    /// copied as they are.
    fn transform_fragments(&self, ctx: &mut ConversionContext, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut containers = Containers::default();
        let mut fence: Option<Fence<'_>> = None;
        let mut paragraph: Option<usize> = None;
        let mut pos = 0;

        while pos < text.len() {
            let (line, next) = next_line(text, pos);

            if let Some(open) = &fence {
                if open.closes(line) {
                    fence = None;
                }
                out.push_str(&text[pos..next]);
                pos = next;
                continue;
            }

            let verbatim = if line.trim().is_empty() {
                true
            } else if containers.relative_indent(line) >= CODE_INDENT {
                // indented code, unless it continues a paragraph
                paragraph.is_none()
            } else if let Some(open) = Fence::open(line) {
                fence = Some(open);
                true
            } else {
                false
            };

            if verbatim || is_heading(line) {
                self.flush_paragraph(ctx, &mut out, text, paragraph.take(), pos);
                let line_text = &text[pos..next];
                if verbatim {
                    out.push_str(line_text);
                } else {
                    out.push_str(&self.extension.transform_span(ctx, line_text));
                }
            } else if paragraph.is_none() {
                paragraph = Some(pos);
            }
            pos = next;
        }
        self.flush_paragraph(ctx, &mut out, text, paragraph, text.len());

        out
    }

    fn flush_paragraph(
        &self,
        ctx: &mut ConversionContext,
        out: &mut String,
        text: &str,
        start: Option<usize>,
        end: usize,
    ) {
        if let Some(start) = start {
            out.push_str(&self.extension.transform_span(ctx, &text[start..end]));
        }
    }
}

/// An ATX heading line. It ends any paragraph and cannot be continued.
fn is_heading(line: &str) -> bool {
    let rest = line.trim_start();
    let level = rest.bytes().take_while(|b| *b == b'#').count();
    (1..=6).contains(&level) && rest[level..].chars().next().is_none_or(char::is_whitespace)
}

/// Converts `markdown` with the default options.
pub fn markdown_to_html(markdown: &str) -> Result<String, LookupError> {
    Pipeline::new().render(markdown)
}
