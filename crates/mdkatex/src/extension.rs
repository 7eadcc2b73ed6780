use crate::block::extract_blocks;
use crate::error::LookupError;
use crate::inline::extract_inline;
use crate::normalize::normalize;
use crate::shield::{ConversionContext, sanitize};

/// Extension points a Markdown host calls while converting one document.
///
/// The host creates a [`ConversionContext`] per document and passes it to
/// every call for that document, in this order:
/// 1. [`transform_document`](Self::transform_document) once, on the raw source;
/// 2. [`transform_span`](Self::transform_span) on each fragment of running
///    text, before inline syntax is resolved;
/// 3. [`finalize`](Self::finalize) once, on the serialized HTML.
pub trait MarkdownExtension {
    fn transform_document(&self, ctx: &mut ConversionContext, text: &str) -> String;
    fn transform_span(&self, ctx: &mut ConversionContext, span: &str) -> String;
    fn finalize(&self, ctx: &mut ConversionContext, html: &str) -> Result<String, LookupError>;
}

/// Accepts GitLab and bracket style math and emits bracket style wrappers for
/// KaTeX auto-render.
#[derive(Debug, Default, Clone, Copy)]
pub struct KatexExtension;

impl MarkdownExtension for KatexExtension {
    /// Sanitizes the input and extracts display formulas.
    fn transform_document(&self, ctx: &mut ConversionContext, text: &str) -> String {
        extract_blocks(ctx, &sanitize(text))
    }

    fn transform_span(&self, ctx: &mut ConversionContext, span: &str) -> String {
        extract_inline(ctx, span)
    }

    fn finalize(&self, ctx: &mut ConversionContext, html: &str) -> Result<String, LookupError> {
        normalize(ctx, html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_share_one_context() {
        let ext = KatexExtension;
        let mut ctx = ConversionContext::new();
        let doc = ext.transform_document(&mut ctx, "```math\nx\n```\n");
        let span = ext.transform_span(&mut ctx, r"and \(y\)");
        assert_eq!(ctx.pending(), 2);

        let html = ext
            .finalize(&mut ctx, &format!("<p>{}</p>\n<p>{span}</p>\n", doc.trim()))
            .unwrap();
        assert_eq!(
            html,
            "<div class=\"katex-block\">\\[x\\]</div>\n<p>and <span class=\"katex-inline\">\\(y\\)</span></p>\n"
        );
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn forged_tokens_are_neutralized() {
        let ext = KatexExtension;
        let mut ctx = ConversionContext::new();
        let doc = ext.transform_document(&mut ctx, "\u{2}mk1:0\u{3}");
        assert_eq!(ext.finalize(&mut ctx, &doc).unwrap(), "\u{FFFD}mk1:0\u{FFFD}");
    }
}
