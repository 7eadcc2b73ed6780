//! mdkatex
//!
//! Finds math in Markdown written in GitLab style (`` $`...`$ ``, ```` ```math ````
//! fences) or bracket style (`\(...\)`, `\[...\]`), keeps it away from the
//! Markdown parser, and emits it in bracket style inside
//! `<span class="katex-inline">` / `<div class="katex-block">` wrappers for
//! KaTeX auto-render to pick up in the browser.
//!
//! The engine plugs into a host Markdown converter through three hooks (see
//! [`MarkdownExtension`]). [`Pipeline`] is such a host built on pulldown-cmark.
//!
//! ```ignore
//! let html = mdkatex::markdown_to_html("Energy: $`E=mc^2`$")?;
//! assert!(html.contains(r#"<span class="katex-inline">\(E=mc^2\)</span>"#));
//! ```

pub mod block;
pub mod catalog;
pub mod document;
pub mod error;
pub mod extension;
pub mod inline;
pub mod normalize;
pub mod pipeline;
pub mod shield;

pub use catalog::{DelimiterRule, Scope};
pub use document::{KatexSource, render_document, write_document};
pub use error::LookupError;
pub use extension::{KatexExtension, MarkdownExtension};
pub use pipeline::{Pipeline, default_md_options, markdown_to_html};
pub use shield::{ConversionContext, FormulaSpan, Token};

pub use pulldown_cmark::Options;
