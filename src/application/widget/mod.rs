//! The `highlight-code` display widget.
//!
//! A widget owns its attribute state, a display surface and, once first needed,
//! one markdown engine and one sanitizer. Lifecycle events drive renders:
//! `Attached` and changes to observed attributes render, nothing else does.

mod attributes;
pub mod runtime;
mod surface;

use metrics::counter;
use once_cell::unsync::OnceCell;
use tracing::{debug, trace};

use crate::application::render::{
    ContentKind, DefaultEngines, EngineProvider, Highlighter, HtmlSanitizer, MarkdownEngine,
    RenderRequest, SanitizedOutput, render_code, render_markdown,
};

pub use attributes::{Attributes, OBSERVED_ATTRIBUTES};
pub use runtime::{WidgetHandle, WidgetRuntimeError, spawn_widget};
pub use surface::{BLOCK_CLASS, DisplaySurface, PRE_CLASS};

/// Element name used when serializing the widget.
pub const TAG_NAME: &str = "highlight-code";

/// Lifecycle notifications delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Attached,
    /// `None` removes the attribute.
    AttributeChanged {
        name: String,
        value: Option<String>,
    },
    Detached,
}

impl WidgetEvent {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttributeChanged {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self::AttributeChanged {
            name: name.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Attached,
    Detached,
}

pub struct HighlightCode<P: EngineProvider = DefaultEngines> {
    provider: P,
    attributes: Attributes,
    lifecycle: Lifecycle,
    highlighter: Highlighter,
    markdown: OnceCell<Box<dyn MarkdownEngine>>,
    sanitizer: OnceCell<Box<dyn HtmlSanitizer>>,
    surface: DisplaySurface,
}

impl HighlightCode<DefaultEngines> {
    pub fn new() -> Self {
        Self::with_provider(DefaultEngines::default())
    }
}

impl Default for HighlightCode<DefaultEngines> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: EngineProvider> HighlightCode<P> {
    pub fn with_provider(provider: P) -> Self {
        let highlighter = provider.highlighter();
        Self {
            provider,
            attributes: Attributes::new(),
            lifecycle: Lifecycle::Created,
            highlighter,
            markdown: OnceCell::new(),
            sanitizer: OnceCell::new(),
            surface: DisplaySurface::new(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Apply an event and render when it calls for one. Returns whether a render ran.
    pub fn handle(&mut self, event: WidgetEvent) -> bool {
        let needs_render = self.apply(event);
        if needs_render {
            self.render();
        }
        needs_render
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.handle(WidgetEvent::set(name, value))
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        self.handle(WidgetEvent::remove(name))
    }

    /// Update state for an event without rendering. Returns whether it calls for a render.
    pub fn apply(&mut self, event: WidgetEvent) -> bool {
        match event {
            WidgetEvent::Attached => {
                self.lifecycle = Lifecycle::Attached;
                true
            }
            WidgetEvent::Detached => {
                self.lifecycle = Lifecycle::Detached;
                false
            }
            WidgetEvent::AttributeChanged { name, value } => {
                match value {
                    Some(value) => self.attributes.set(&name, value),
                    None => self.attributes.remove(&name),
                }
                let observed = Attributes::is_observed(&name);
                if !observed {
                    trace!(
                        target = "application::widget",
                        attribute = %name,
                        "ignoring unobserved attribute"
                    );
                }
                observed
            }
        }
    }

    /// Render the current attributes and commit the sanitized result.
    pub fn render(&mut self) -> &DisplaySurface {
        let request = self.attributes.request();
        let output = self.render_request(&request);
        let classes = surface::classify(&request.content_kind);

        debug!(
            target = "application::widget",
            kind = %request.content_kind,
            bytes = output.as_str().len(),
            "committing render"
        );
        self.surface.commit(output, classes);
        &self.surface
    }

    fn render_request(&self, request: &RenderRequest) -> SanitizedOutput {
        let sanitizer = self.sanitizer.get_or_init(|| self.provider.sanitizer());
        match &request.content_kind {
            ContentKind::Markdown => {
                counter!("highlight_code_renders_total", "mode" => "markdown").increment(1);
                let engine = self
                    .markdown
                    .get_or_init(|| self.provider.markdown_engine(self.highlighter.clone()));
                render_markdown(engine.as_ref(), sanitizer.as_ref(), request)
            }
            ContentKind::Code(language) => {
                counter!("highlight_code_renders_total", "mode" => "code").increment(1);
                render_code(
                    &self.highlighter,
                    sanitizer.as_ref(),
                    &request.raw_text,
                    language,
                )
            }
        }
    }
}
