use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::{
    dumps::from_uncompressed_data,
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::{debug, warn};

use crate::application::render::types::{HighlightedFragment, RenderError};

/// Canonical grammar substituted for unknown language ids.
pub const PLAINTEXT: &str = "plaintext";

/// Class carried by every highlighted container.
pub const HIGHLIGHT_CLASS: &str = "syntax-highlight";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
const PLAINTEXT_ALIASES: [&str; 4] = [PLAINTEXT, "text", "plain", "txt"];

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(|| {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid")
});

/// Grammar-aware tokenizer producing class-annotated HTML.
pub trait HighlightEngine: Send + Sync {
    /// Whether a grammar is registered for `language`.
    fn supports(&self, language: &str) -> bool;

    /// Highlight `code` with a grammar the engine supports.
    fn highlight(&self, code: &str, language: &str) -> Result<String, RenderError>;

    /// Display names of every known grammar.
    fn languages(&self) -> Vec<String>;
}

/// Syntect engine backed by the syntax pack generated at build time.
pub struct SyntectEngine {
    syntax_set: &'static SyntaxSet,
    class_style: ClassStyle,
}

impl SyntectEngine {
    pub fn new() -> Self {
        Self {
            syntax_set: &SYNTAX_SET,
            class_style: CLASS_STYLE,
        }
    }

    fn find_syntax(&self, token: &str) -> Option<&SyntaxReference> {
        let lowercase = token.trim().to_ascii_lowercase();
        if PLAINTEXT_ALIASES.contains(&lowercase.as_str()) {
            return Some(self.syntax_set.find_syntax_plain_text());
        }

        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(&lowercase))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }
}

impl Default for SyntectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightEngine for SyntectEngine {
    fn supports(&self, language: &str) -> bool {
        self.find_syntax(language).is_some()
    }

    fn highlight(&self, code: &str, language: &str) -> Result<String, RenderError> {
        let syntax = self
            .find_syntax(language)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        if code.is_empty() {
            return Ok(String::new());
        }

        let terminated = code.ends_with('\n');
        let mut code_with_newline = code.to_string();
        if !terminated {
            code_with_newline.push('\n');
        }

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, self.syntax_set, self.class_style);

        for line in LinesWithEndings::from(code_with_newline.as_str()) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| RenderError::Highlighting {
                    language: language.to_string(),
                    message: err.to_string(),
                })?;
        }

        let mut html = generator.finalize();
        if !terminated {
            // Only closing tags follow the newline appended above.
            if let Some(index) = html.rfind('\n') {
                html.remove(index);
            }
        }
        Ok(html)
    }

    fn languages(&self) -> Vec<String> {
        self.syntax_set
            .syntaxes()
            .iter()
            .map(|syntax| syntax.name.clone())
            .collect()
    }
}

/// Resolves language ids and never fails: unknown grammars become plaintext and
/// engine errors degrade to escaped source.
#[derive(Clone)]
pub struct Highlighter {
    engine: Arc<dyn HighlightEngine>,
}

impl Highlighter {
    pub fn new(engine: Arc<dyn HighlightEngine>) -> Self {
        Self { engine }
    }

    /// Highlighter over the process-wide syntect grammar table.
    pub fn syntect() -> Self {
        Self::new(Arc::new(SyntectEngine::new()))
    }

    pub fn engine(&self) -> &dyn HighlightEngine {
        self.engine.as_ref()
    }

    /// The grammar actually used for `language`.
    pub fn resolve<'a>(&self, language: &'a str) -> &'a str {
        let trimmed = language.trim();
        if !trimmed.is_empty() && self.engine.supports(trimmed) {
            trimmed
        } else {
            PLAINTEXT
        }
    }

    pub fn highlight(&self, text: &str, language: &str) -> HighlightedFragment {
        let resolved = self.resolve(language);
        if resolved == PLAINTEXT && !language.trim().eq_ignore_ascii_case(PLAINTEXT) {
            debug!(
                target = "application::render::highlight",
                requested = language,
                "unknown language, highlighting as plaintext"
            );
        }

        let html = match self.engine.highlight(text, resolved) {
            Ok(html) => html,
            Err(err) => {
                warn!(
                    target = "application::render::highlight",
                    language = resolved,
                    error = %err,
                    "highlighting degraded to escaped text"
                );
                ammonia::clean_text(text)
            }
        };

        HighlightedFragment::new(resolved, html)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::syntect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEngine;

    impl HighlightEngine for FailingEngine {
        fn supports(&self, language: &str) -> bool {
            language == "broken"
        }

        fn highlight(&self, _code: &str, language: &str) -> Result<String, RenderError> {
            Err(RenderError::Highlighting {
                language: language.to_string(),
                message: "grammar exploded".to_string(),
            })
        }

        fn languages(&self) -> Vec<String> {
            vec!["broken".to_string()]
        }
    }

    #[test]
    fn unknown_language_matches_plaintext() {
        let highlighter = Highlighter::syntect();
        let unknown = highlighter.highlight("x = 1", "not-a-real-language");
        let plain = highlighter.highlight("x = 1", "plaintext");

        assert_eq!(unknown.language(), PLAINTEXT);
        assert_eq!(unknown, plain);
    }

    #[test]
    fn known_language_produces_prefixed_spans() {
        let fragment = Highlighter::syntect().highlight("fn main() {}", "rust");
        assert_eq!(fragment.language(), "rust");
        assert!(fragment.as_html().contains("syntax-"));
        assert!(fragment.as_html().contains("main"));
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        let highlighter = Highlighter::syntect();
        assert_eq!(highlighter.resolve("Python"), "Python");
        assert!(highlighter.engine().supports("PY"));
    }

    #[test]
    fn source_markup_is_escaped() {
        let fragment = Highlighter::syntect().highlight("<script>alert(1)</script>", "html");
        assert!(!fragment.as_html().contains("<script"));
        assert!(fragment.as_html().contains("&lt;"));
    }

    #[test]
    fn engine_failure_degrades_to_escaped_text() {
        let highlighter = Highlighter::new(Arc::new(FailingEngine));
        let fragment = highlighter.highlight("a < b", "broken");
        assert_eq!(fragment.language(), "broken");
        assert!(fragment.as_html().contains("&lt;"));
        assert!(!fragment.as_html().contains('<'));
    }

    #[test]
    fn empty_source_highlights_to_nothing() {
        let fragment = Highlighter::syntect().highlight("", "rust");
        assert_eq!(fragment.as_html(), "");
    }

    #[test]
    fn trailing_newline_follows_source() {
        let highlighter = Highlighter::syntect();
        let bare = highlighter.highlight("let x = 1;", "rust");
        let terminated = highlighter.highlight("let x = 1;\n", "rust");

        assert!(!bare.as_html().contains('\n'), "{}", bare.as_html());
        assert_eq!(terminated.as_html().matches('\n').count(), 1);
    }

    #[test]
    fn syntect_lists_plain_text_grammar() {
        let languages = SyntectEngine::new().languages();
        assert!(languages.iter().any(|name| name == "Plain Text"));
    }
}
