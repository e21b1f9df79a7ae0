use serde::Serialize;

use crate::application::render::{ContentKind, HIGHLIGHT_CLASS, SanitizedOutput};

/// Marker class for every committed render.
pub const BLOCK_CLASS: &str = "block";
/// Marker class for code-mode renders.
pub const PRE_CLASS: &str = "whitespace-pre";

/// The widget's own rendered subtree: inner HTML plus root class tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplaySurface {
    classes: Vec<String>,
    html: SanitizedOutput,
    #[serde(skip)]
    commits: u64,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content and classification in one step.
    pub(crate) fn commit(&mut self, html: SanitizedOutput, classes: Vec<String>) {
        self.html = html;
        self.classes = classes;
        self.commits = self.commits.saturating_add(1);
    }

    pub fn inner_html(&self) -> &str {
        self.html.as_str()
    }

    pub fn sanitized(&self) -> &SanitizedOutput {
        &self.html
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|existing| existing == class)
    }

    /// Number of commits since the widget was created.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Serialize as an element with the given tag name.
    pub fn outer_html(&self, tag: &str) -> String {
        if self.classes.is_empty() {
            format!("<{tag}>{}</{tag}>", self.html)
        } else {
            format!(
                "<{tag} class=\"{}\">{}</{tag}>",
                self.classes.join(" "),
                self.html
            )
        }
    }
}

/// Root classes for a render of `kind`.
pub(crate) fn classify(kind: &ContentKind) -> Vec<String> {
    match kind {
        ContentKind::Markdown => vec![BLOCK_CLASS.to_string()],
        ContentKind::Code(language) => vec![
            BLOCK_CLASS.to_string(),
            PRE_CLASS.to_string(),
            HIGHLIGHT_CLASS.to_string(),
            language_class(language),
        ],
    }
}

/// `language-<id>` with every character outside `[A-Za-z0-9_+#.-]` replaced,
/// so the token is safe inside a double- or single-quoted attribute.
fn language_class(language: &str) -> String {
    let token: String = language
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+' | '#' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    format!("language-{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_classification_carries_language() {
        let classes = classify(&ContentKind::Code("python".into()));
        assert_eq!(
            classes,
            vec!["block", "whitespace-pre", "syntax-highlight", "language-python"]
        );
    }

    #[test]
    fn language_class_is_a_single_token() {
        assert_eq!(language_class(" objective c "), "language-objective-c");
        assert_eq!(language_class("a\"b"), "language-a-b");
        assert_eq!(language_class("c++"), "language-c++");
        assert_eq!(language_class("c#"), "language-c#");
    }

    #[test]
    fn language_class_neutralizes_attribute_metacharacters() {
        assert_eq!(language_class("x&amp;y"), "language-x-amp-y");
        assert_eq!(language_class("a'onclick='b"), "language-a-onclick--b");

        let mut surface = DisplaySurface::new();
        surface.commit(
            SanitizedOutput::new(String::new()),
            classify(&ContentKind::Code("r\"><script>&'".into())),
        );
        let html = surface.outer_html("highlight-code");
        let open_tag = &html[..html.find('>').expect("open tag") + 1];

        assert_eq!(open_tag.matches('"').count(), 2, "{open_tag}");
        assert!(!html.contains("<script"));
        assert!(!html.contains('&'));
        assert!(!html.contains('\''));
    }

    #[test]
    fn outer_html_wraps_content() {
        let mut surface = DisplaySurface::new();
        surface.commit(SanitizedOutput::new("<p>x</p>".into()), classify(&ContentKind::Markdown));

        assert_eq!(
            surface.outer_html("highlight-code"),
            "<highlight-code class=\"block\"><p>x</p></highlight-code>"
        );
        assert_eq!(surface.commits(), 1);
    }
}
