mod highlight;
mod links;
mod markdown;
mod sanitize;

use metrics::counter;

use crate::application::render::types::{ContentKind, RenderRequest, SanitizedOutput};
use crate::config::RenderSettings;

pub use highlight::{HIGHLIGHT_CLASS, HighlightEngine, Highlighter, PLAINTEXT, SyntectEngine};
pub use links::{BaseUrlRewrite, resolve, strip_root};
pub use markdown::{ComrakEngine, MarkdownEngine, MarkdownExtensions};
pub use sanitize::{AmmoniaGate, HtmlSanitizer, LinkNode, RewriteHook, URL_SCHEMES};

/// Builds the engines a widget owns. Each widget asks at most once per engine.
pub trait EngineProvider: Send + Sync {
    fn highlighter(&self) -> Highlighter;
    fn markdown_engine(&self, highlighter: Highlighter) -> Box<dyn MarkdownEngine>;
    fn sanitizer(&self) -> Box<dyn HtmlSanitizer>;
}

/// Comrak, syntect and ammonia.
#[derive(Clone, Default)]
pub struct DefaultEngines {
    highlighter: Highlighter,
    extensions: MarkdownExtensions,
}

impl DefaultEngines {
    pub fn new(extensions: MarkdownExtensions) -> Self {
        Self {
            highlighter: Highlighter::syntect(),
            extensions,
        }
    }

    pub fn extensions(&self) -> MarkdownExtensions {
        self.extensions
    }
}

impl From<&RenderSettings> for DefaultEngines {
    fn from(settings: &RenderSettings) -> Self {
        Self::new(MarkdownExtensions {
            alerts: settings.alerts,
            footnotes: settings.footnotes,
        })
    }
}

impl EngineProvider for DefaultEngines {
    fn highlighter(&self) -> Highlighter {
        self.highlighter.clone()
    }

    fn markdown_engine(&self, highlighter: Highlighter) -> Box<dyn MarkdownEngine> {
        counter!("highlight_code_engine_constructions_total", "engine" => "markdown").increment(1);
        Box::new(ComrakEngine::new(highlighter, self.extensions))
    }

    fn sanitizer(&self) -> Box<dyn HtmlSanitizer> {
        counter!("highlight_code_engine_constructions_total", "engine" => "sanitizer").increment(1);
        Box::new(AmmoniaGate::new())
    }
}

/// Code path: highlight, then sanitize without a rewrite hook.
pub fn render_code(
    highlighter: &Highlighter,
    sanitizer: &dyn HtmlSanitizer,
    text: &str,
    language: &str,
) -> SanitizedOutput {
    let fragment = highlighter.highlight(text, language);
    sanitizer.sanitize(fragment.as_html(), None)
}

/// Markdown path: parse, then sanitize with the base-url hook when a base is present.
pub fn render_markdown(
    engine: &dyn MarkdownEngine,
    sanitizer: &dyn HtmlSanitizer,
    request: &RenderRequest,
) -> SanitizedOutput {
    let hook = BaseUrlRewrite::for_request(request);
    let document = engine.parse(&request.raw_text);
    sanitizer.sanitize(
        document.as_html(),
        hook.as_ref().map(|hook| hook as &dyn RewriteHook),
    )
}

/// Stateless `RenderRequest -> SanitizedOutput` over a fixed set of engines.
pub struct RenderPipeline {
    highlighter: Highlighter,
    markdown: Box<dyn MarkdownEngine>,
    sanitizer: Box<dyn HtmlSanitizer>,
}

impl RenderPipeline {
    pub fn new(provider: &dyn EngineProvider) -> Self {
        let highlighter = provider.highlighter();
        Self {
            markdown: provider.markdown_engine(highlighter.clone()),
            sanitizer: provider.sanitizer(),
            highlighter,
        }
    }

    pub fn render(&self, request: &RenderRequest) -> SanitizedOutput {
        match &request.content_kind {
            ContentKind::Markdown => {
                render_markdown(self.markdown.as_ref(), self.sanitizer.as_ref(), request)
            }
            ContentKind::Code(language) => render_code(
                &self.highlighter,
                self.sanitizer.as_ref(),
                &request.raw_text,
                language,
            ),
        }
    }
}
