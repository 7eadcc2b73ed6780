use mdkatex::{ConversionContext, KatexExtension, LookupError, MarkdownExtension, Pipeline};
use mdkatex::markdown_to_html;

const MIXED: &str = r#"# Md_KaTeX Math Example

$E=mc^2$

Gitlab style inline formula: $`E=mc^2`$

Brackets style inline formula: \(E=mc^2\)

Gitlab style block formula:

```math
\int_0^\infty e^{-x^2} dx = \frac{\sqrt{\pi}}{2}
```

Brackets style block formula:

\[
\int_0^\infty e^{-x^2} dx = \frac{\sqrt{\pi}}{2}
\]
"#;

fn convert(input: &str) -> String {
    let html = markdown_to_html(input).unwrap();
    assert!(
        !html.contains(['\u{2}', '\u{3}']),
        "placeholder leaked into {html:?}"
    );
    html
}

#[test]
fn mixed_style_document() {
    let html = convert(MIXED);
    assert_eq!(
        html,
        concat!(
            "<h1>Md_KaTeX Math Example</h1>\n",
            "<p>$E=mc^2$</p>\n",
            "<p>Gitlab style inline formula: <span class=\"katex-inline\">\\(E=mc^2\\)</span></p>\n",
            "<p>Brackets style inline formula: <span class=\"katex-inline\">\\(E=mc^2\\)</span></p>\n",
            "<p>Gitlab style block formula:</p>\n",
            "<div class=\"katex-block\">\\[\\int_0^\\infty e^{-x^2} dx = \\frac{\\sqrt{\\pi}}{2}\\]</div>\n",
            "<p>Brackets style block formula:</p>\n",
            "<div class=\"katex-block\">\\[\n\\int_0^\\infty e^{-x^2} dx = \\frac{\\sqrt{\\pi}}{2}\n\\]</div>\n",
        )
    );
}

#[test]
fn every_style_round_trips() {
    let body = r"a_b*c* + x^{2}";
    for (input, expected) in [
        (format!("$`{body}`$"), format!(r"\({body}\)")),
        (format!("$``{body}``$"), format!(r"\({body}\)")),
        (format!(r"\({body}\)"), format!(r"\({body}\)")),
        (format!("```math\n{body}\n```"), format!(r"\[{body}\]")),
        (format!("~~~math\n{body}\n~~~"), format!(r"\[{body}\]")),
        (format!(r"\[{body}\]"), format!(r"\[{body}\]")),
    ] {
        let html = convert(&input);
        assert!(html.contains(&expected), "{input:?} gave {html:?}");
    }
}

#[test]
fn only_markup_characters_are_escaped() {
    let html = convert(r#"\(a<b & c>d "e" 'f'\)"#);
    assert!(html.contains(r#"\(a&lt;b &amp; c&gt;d "e" 'f'\)"#), "{html}");
}

#[test]
fn unterminated_inline_is_literal() {
    assert_eq!(convert("$`unterminated"), "<p>$`unterminated</p>\n");
}

#[test]
fn empty_inline_formula() {
    assert_eq!(
        convert(r"\(\)"),
        "<p><span class=\"katex-inline\">\\(\\)</span></p>\n"
    );
}

#[test]
fn adjacent_formulas_stay_separate() {
    assert_eq!(
        convert("$`a`$ and $`b`$"),
        "<p><span class=\"katex-inline\">\\(a\\)</span> and <span class=\"katex-inline\">\\(b\\)</span></p>\n"
    );
}

#[test]
fn unterminated_fence_still_converts() {
    assert_eq!(
        convert("Text\n\n```math\nx"),
        "<p>Text</p>\n<div class=\"katex-block\">\\[x\\]</div>\n"
    );
}

#[test]
fn formula_in_table_cell() {
    let html = convert("| a | b |\n|---|---|\n| $`x_1`$ | \\(y\\) |\n");
    assert!(html.contains("<td><span class=\"katex-inline\">\\(x_1\\)</span></td>"));
    assert!(html.contains("<td><span class=\"katex-inline\">\\(y\\)</span></td>"));
}

#[test]
fn token_from_another_document_is_an_error() {
    let ext = KatexExtension;
    let mut first = ConversionContext::new();
    let stolen = ext.transform_span(&mut first, r"\(x\)");

    let mut second = ConversionContext::new();
    let err = ext.finalize(&mut second, &stolen).unwrap_err();
    assert!(matches!(err, LookupError::Foreign { .. }));
}

#[test]
fn concurrent_documents_are_isolated() {
    let pipeline = &Pipeline::new();
    let inputs: Vec<String> = (0..8)
        .map(|i| format!("doc {i}: $`x_{i}`$\n\n```math\ny_{i}\n```\n"))
        .collect();
    let expected: Vec<String> = inputs.iter().map(|input| convert(input)).collect();

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(move || pipeline.render(input).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(outputs, expected);
    assert!(outputs[3].contains(r"\(x_3\)"));
    assert!(outputs[3].contains(r"\[y_3\]"));
}

#[test]
fn formula_in_image_alt_is_plain_text() {
    assert_eq!(
        convert(r"![\(a\)](p.png)"),
        "<p><img src=\"p.png\" alt=\"\\(a\\)\" /></p>\n"
    );
}

#[test]
fn formula_in_link_title_is_plain_text() {
    assert_eq!(
        convert("[t](u \"$`x`$\")"),
        "<p><a href=\"u\" title=\"\\(x\\)\">t</a></p>\n"
    );
}

#[test]
fn link_destination_keeps_its_link() {
    let html = convert(r"[go](http://x/\(a\)) then \(b\)");
    assert!(html.contains("\">go</a>"), "{html}");
    assert!(!html.contains(r"\(a\)</span>"), "{html}");
    assert!(html.contains(r#"<span class="katex-inline">\(b\)</span>"#), "{html}");
}

#[test]
fn code_span_wrapped_over_lines() {
    assert_eq!(
        convert("see `a\n\\(b\\)` and \\(c\\)\n"),
        "<p>see <code>a \\(b\\)</code> and <span class=\"katex-inline\">\\(c\\)</span></p>\n"
    );
}

#[test]
fn deeply_indented_fence_is_code() {
    assert_eq!(
        convert("    ```math\n    x\n    ```\n"),
        "<pre><code>```math\nx\n```\n</code></pre>\n"
    );
}
