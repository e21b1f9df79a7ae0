//! Rendering pipeline: content-kind dispatch, syntax highlighting, markdown
//! parsing, HTML sanitization and relative-url rewriting.
//!
//! Every path ends at the sanitizer gate. Highlighted fragments and parsed
//! documents are distinct types from [`SanitizedOutput`], so unsanitized markup
//! cannot be committed to a display surface.

mod service;
mod types;

pub use service::{
    AmmoniaGate, BaseUrlRewrite, ComrakEngine, DefaultEngines, EngineProvider, HIGHLIGHT_CLASS,
    HighlightEngine, Highlighter, HtmlSanitizer, LinkNode, MarkdownEngine, MarkdownExtensions,
    PLAINTEXT, RenderPipeline, RewriteHook, SyntectEngine, URL_SCHEMES, render_code,
    render_markdown, resolve, strip_root,
};
pub use types::{
    ContentKind, HighlightedFragment, MARKDOWN, ParsedDocument, RenderError, RenderRequest,
    SanitizedOutput,
};
