//! Standalone HTML page around a converted fragment.

use std::path::PathBuf;

use pulldown_cmark_escape::{FmtWriter, StrWrite, escape_href, escape_html};

use crate::normalize::{BLOCK_CLASS, INLINE_CLASS};

const KATEX_VERSION: &str = "0.16.11";
const KATEX_CSS_SRI: &str = "sha384-nB0miv6/jRmo5UMMR1wu3Gz6NLsoTkbqJghGIsx//Rlm+ZU03BU6SQNC66uf4l5+";
const KATEX_JS_SRI: &str = "sha384-7zkQWkzuo3B5mTepMUcHkMB5jZaolc2xDwL6VFqjFALcbeS9Ggm/Yr2r3Dy4lfFg";
const AUTO_RENDER_SRI: &str = "sha384-43gviWU0YVjaDtb/GhzOouOXtZMP/7XUzwPTstBeZFe/+rCMvRwr4yROQP43s0Xk";

/// Where the page loads KaTeX from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KatexSource {
    #[default]
    Cdn,
    /// Directory holding `katex.min.css`, `katex.min.js` and `contrib/`.
    Local(PathBuf),
}

fn write_assets<W: StrWrite>(writer: &mut W, katex: &KatexSource) -> Result<(), W::Error> {
    match katex {
        KatexSource::Cdn => {
            let base = format!("https://cdn.jsdelivr.net/npm/katex@{KATEX_VERSION}/dist");
            write!(
                writer,
                "  <link rel=\"stylesheet\" href=\"{base}/katex.min.css\" integrity=\"{KATEX_CSS_SRI}\" crossorigin=\"anonymous\">\n"
            )?;
            write!(
                writer,
                "  <script defer src=\"{base}/katex.min.js\" integrity=\"{KATEX_JS_SRI}\" crossorigin=\"anonymous\"></script>\n"
            )?;
            write!(
                writer,
                "  <script defer src=\"{base}/contrib/auto-render.min.js\" integrity=\"{AUTO_RENDER_SRI}\" crossorigin=\"anonymous\"></script>\n"
            )?;
        }
        KatexSource::Local(path) => {
            let path = path.to_string_lossy();
            let base = path.trim_end_matches('/');
            writer.write_str("  <link rel=\"stylesheet\" href=\"")?;
            escape_href(&mut *writer, base)?;
            writer.write_str("/katex.min.css\">\n  <script defer src=\"")?;
            escape_href(&mut *writer, base)?;
            writer.write_str("/katex.min.js\"></script>\n  <script defer src=\"")?;
            escape_href(&mut *writer, base)?;
            writer.write_str("/contrib/auto-render.min.js\"></script>\n")?;
        }
    }

    // Only the wrappers emitted by the normalizer are handed to KaTeX.
    write!(
        writer,
        concat!(
            "  <script>\n",
            "    document.addEventListener(\"DOMContentLoaded\", function () {{\n",
            "      document.querySelectorAll(\".{inline}, .{block}\").forEach(function (el) {{\n",
            "        renderMathInElement(el, {{\n",
            "          delimiters: [\n",
            "            {{ left: \"\\\\(\", right: \"\\\\)\", display: false }},\n",
            "            {{ left: \"\\\\[\", right: \"\\\\]\", display: true }}\n",
            "          ],\n",
            "          throwOnError: false\n",
            "        }});\n",
            "      }});\n",
            "    }});\n",
            "  </script>\n",
        ),
        inline = INLINE_CLASS,
        block = BLOCK_CLASS,
    )
}

/// Writes a complete HTML5 document with `body` as its content.
pub fn write_document<W: StrWrite>(
    mut writer: W,
    title: &str,
    body: &str,
    katex: &KatexSource,
) -> Result<(), W::Error> {
    writer.write_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n")?;
    writer.write_str("  <meta charset=\"utf-8\">\n")?;
    writer.write_str(
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    )?;
    writer.write_str("  <title>")?;
    escape_html(&mut writer, title)?;
    writer.write_str("</title>\n")?;
    write_assets(&mut writer, katex)?;
    writer.write_str("</head>\n<body>\n")?;
    writer.write_str(body)?;
    if !body.is_empty() && !body.ends_with('\n') {
        writer.write_str("\n")?;
    }
    writer.write_str("</body>\n</html>\n")
}

/// [`write_document`] into a new string.
pub fn render_document(title: &str, body: &str, katex: &KatexSource) -> String {
    let mut output = String::with_capacity(body.len() + 2048);
    // Writing to a String can't fail
    let _ = write_document(FmtWriter(&mut output), title, body, katex);
    output
}
