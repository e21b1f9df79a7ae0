use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    options::Options,
    parse_document,
};
use tracing::warn;

use crate::application::render::types::{ParsedDocument, RenderError};

use super::highlight::{HIGHLIGHT_CLASS, Highlighter, PLAINTEXT};

/// Markdown-to-HTML parser. Output is unsanitized.
pub trait MarkdownEngine: Send + Sync {
    fn parse(&self, markdown: &str) -> ParsedDocument;
}

/// Optional grammar extensions layered over GFM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownExtensions {
    /// `> [!NOTE]` style callouts.
    pub alerts: bool,
    pub footnotes: bool,
}

impl Default for MarkdownExtensions {
    fn default() -> Self {
        Self {
            alerts: true,
            footnotes: true,
        }
    }
}

/// Comrak parser whose code blocks are rendered by the [`Highlighter`].
pub struct ComrakEngine {
    options: Options<'static>,
    highlighter: Highlighter,
}

impl ComrakEngine {
    pub fn new(highlighter: Highlighter, extensions: MarkdownExtensions) -> Self {
        Self {
            options: markdown_options(extensions),
            highlighter,
        }
    }
}

impl MarkdownEngine for ComrakEngine {
    fn parse(&self, markdown: &str) -> ParsedDocument {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        highlight_code_blocks(root, &self.highlighter);

        match render_html(root, &self.options) {
            Ok(html) => ParsedDocument::new(html),
            Err(err) => {
                warn!(
                    target = "application::render::markdown",
                    error = %err,
                    "markdown formatting failed; rendering empty document"
                );
                ParsedDocument::new(String::new())
            }
        }
    }
}

pub(crate) fn markdown_options(extensions: MarkdownExtensions) -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = extensions.footnotes;
    ext.alerts = extensions.alerts;

    let render = &mut options.render;
    render.r#unsafe = true;
    render.tasklist_classes = true;

    options
}

fn render_html<'a>(root: &'a AstNode<'a>, options: &Options<'static>) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

/// Replace every code block with highlighted markup. Returns the number replaced.
fn highlight_code_blocks<'a>(node: &'a AstNode<'a>, highlighter: &Highlighter) -> usize {
    let mut replaced = 0;

    if let Some((info, literal)) = extract_code_block(node) {
        let html = render_code_block(&info, &literal, highlighter);
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: html,
        });
        replaced += 1;
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        replaced += highlight_code_blocks(next, highlighter);
        child = next.next_sibling();
    }

    replaced
}

fn render_code_block(info: &str, literal: &str, highlighter: &Highlighter) -> String {
    let language = info.split_whitespace().next();
    let fragment = highlighter.highlight(literal, language.unwrap_or(PLAINTEXT));

    let class = match language {
        Some(lang) => format!("{HIGHLIGHT_CLASS} language-{}", escape_attribute(lang)),
        None => HIGHLIGHT_CLASS.to_string(),
    };

    format!(
        "<pre><code class=\"{class}\">{}</code></pre>\n",
        fragment.as_html()
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}
