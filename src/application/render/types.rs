use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content kind value that selects document rendering.
pub const MARKDOWN: &str = "markdown";

/// Discriminates markdown-document rendering from single-language code rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Markdown,
    /// Opaque grammar name; resolved (or defaulted) by the highlighter at use time.
    Code(String),
}

impl ContentKind {
    /// Interpret a `language`/`lang` attribute value. Blank values fall back to markdown.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Markdown,
            Some(MARKDOWN) => Self::Markdown,
            Some(language) => Self::Code(language.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Markdown => MARKDOWN,
            ContentKind::Code(language) => language.as_str(),
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self, ContentKind::Markdown)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the widget attributes taken at the start of a render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Source text; a missing attribute is an empty document.
    pub raw_text: String,
    pub content_kind: ContentKind,
    /// Base for anchor `href` rewriting (markdown mode only).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Base for media `src` rewriting; falls back to `base_url`.
    #[serde(default)]
    pub raw_base_url: Option<String>,
}

impl RenderRequest {
    pub fn new(raw_text: impl Into<String>, content_kind: ContentKind) -> Self {
        Self {
            raw_text: raw_text.into(),
            content_kind,
            base_url: None,
            raw_base_url: None,
        }
    }

    pub fn markdown(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, ContentKind::Markdown)
    }

    pub fn code(raw_text: impl Into<String>, language: impl Into<String>) -> Self {
        Self::new(raw_text, ContentKind::Code(language.into()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base(base_url.into());
        self
    }

    pub fn with_raw_base_url(mut self, raw_base_url: impl Into<String>) -> Self {
        self.raw_base_url = normalize_base(raw_base_url.into());
        self
    }

    /// Base used for `src` attributes, defaulting to the navigation base.
    /// `None` without a navigation base: media is never rewritten on its own.
    pub fn media_base(&self) -> Option<&str> {
        let navigation = self.base_url.as_deref()?;
        Some(self.raw_base_url.as_deref().unwrap_or(navigation))
    }
}

pub(crate) fn normalize_base(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Highlighter output for a single code unit. Not sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedFragment {
    language: String,
    html: String,
}

impl HighlightedFragment {
    pub(crate) fn new(language: impl Into<String>, html: String) -> Self {
        Self {
            language: language.into(),
            html,
        }
    }

    /// Canonical name of the grammar that produced the markup.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn as_html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }
}

/// Markdown engine output for a whole document. Not sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument(String);

impl ParsedDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }

    pub fn into_html(self) -> String {
        self.0
    }
}

/// HTML that has passed the sanitizer gate. Only the gate can build one, and it is
/// the only value a display surface accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanitizedOutput(String);

impl SanitizedOutput {
    pub(crate) fn new(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for SanitizedOutput {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures inside a render stage. These never reach the display surface: every
/// stage logs them and degrades to safe output.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("url rewrite failed: {message}")]
    Rewrite { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_language_defaults_to_markdown() {
        assert_eq!(ContentKind::from_attribute(None), ContentKind::Markdown);
        assert_eq!(ContentKind::from_attribute(Some("  ")), ContentKind::Markdown);
        assert_eq!(
            ContentKind::from_attribute(Some("markdown")),
            ContentKind::Markdown
        );
        assert_eq!(
            ContentKind::from_attribute(Some("rust")),
            ContentKind::Code("rust".to_string())
        );
    }

    #[test]
    fn media_base_falls_back_to_navigation_base() {
        let request = RenderRequest::markdown("![a](b.png)").with_base_url("https://example.com/");
        assert_eq!(request.media_base(), Some("https://example.com/"));

        let request = request.with_raw_base_url("https://raw.example.com/");
        assert_eq!(request.media_base(), Some("https://raw.example.com/"));
    }

    #[test]
    fn blank_base_url_is_absent() {
        let request = RenderRequest::markdown("x").with_base_url("   ");
        assert!(request.base_url.is_none());
        assert!(request.media_base().is_none());
    }

    #[test]
    fn raw_base_alone_is_not_a_media_base() {
        let request = RenderRequest::markdown("![a](b.png)").with_raw_base_url("https://raw.example.com/");
        assert_eq!(request.raw_base_url.as_deref(), Some("https://raw.example.com/"));
        assert!(request.media_base().is_none());
    }
}
