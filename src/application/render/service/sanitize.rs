use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::warn;
use url::Url;

use crate::application::render::types::{RenderError, SanitizedOutput};

/// Schemes allowed in `href`/`src`, both by the sanitizer and after rewriting.
pub const URL_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

/// URL-bearing view of an element handed to a [`RewriteHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    tag_name: String,
    pub href: Option<String>,
    pub src: Option<String>,
}

impl LinkNode {
    pub fn new(tag_name: impl Into<String>, href: Option<String>, src: Option<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            href,
            src,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }
}

/// Per-call callback run on every sanitized element carrying `href` or `src`.
pub trait RewriteHook {
    fn after_sanitize_attributes(&self, node: &mut LinkNode);
}

impl<F> RewriteHook for F
where
    F: Fn(&mut LinkNode),
{
    fn after_sanitize_attributes(&self, node: &mut LinkNode) {
        self(node)
    }
}

/// HTML allow-list gate. The only producer of [`SanitizedOutput`].
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str, hook: Option<&dyn RewriteHook>) -> SanitizedOutput;
}

/// Ammonia-backed sanitizer gate.
pub struct AmmoniaGate {
    builder: AmmoniaBuilder<'static>,
}

impl AmmoniaGate {
    pub fn new() -> Self {
        Self {
            builder: build_sanitizer(),
        }
    }
}

impl Default for AmmoniaGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSanitizer for AmmoniaGate {
    fn sanitize(&self, html: &str, hook: Option<&dyn RewriteHook>) -> SanitizedOutput {
        let cleaned = self.builder.clean(html).to_string();

        let Some(hook) = hook else {
            return SanitizedOutput::new(cleaned);
        };

        match apply_rewrite_hook(&cleaned, hook) {
            Ok(rewritten) => SanitizedOutput::new(rewritten),
            Err(err) => {
                warn!(
                    target = "application::render::sanitize",
                    error = %err,
                    "rewrite hook failed; committing unrewritten output"
                );
                SanitizedOutput::new(cleaned)
            }
        }
    }
}

fn apply_rewrite_hook(html: &str, hook: &dyn RewriteHook) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[href], [src]", move |el| {
                let href = el.get_attribute("href");
                let src = el.get_attribute("src");
                let mut node = LinkNode::new(el.tag_name(), href.clone(), src.clone());
                hook.after_sanitize_attributes(&mut node);

                for (name, before, after) in [("href", href, node.href), ("src", src, node.src)] {
                    if before == after {
                        continue;
                    }
                    match after {
                        Some(value) if is_allowed_url(&value) => el.set_attribute(name, &value)?,
                        Some(value) => {
                            warn!(
                                target = "application::render::sanitize",
                                attribute = name,
                                url = %value,
                                "dropping rewritten url with disallowed scheme"
                            );
                            el.remove_attribute(name);
                        }
                        None => el.remove_attribute(name),
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Rewrite {
        message: err.to_string(),
    })
}

fn is_allowed_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => URL_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "dd",
        "del",
        "details",
        "div",
        "dl",
        "dt",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["title", "width", "height", "alt", "loading"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.url_schemes(HashSet::from(URL_SCHEMES));

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str) -> String {
        AmmoniaGate::new().sanitize(html, None).to_string()
    }

    #[test]
    fn strips_script_tags_and_handlers() {
        let html = sanitize("<p onclick=\"x()\">hi</p><script>alert(1)</script><img src=x onerror=alert(1)>");
        assert!(!html.contains("<script"));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("onerror"));
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn strips_javascript_urls() {
        let html = sanitize("<a href=\"javascript:alert(1)\">x</a>");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn keeps_highlight_and_alert_classes() {
        let html = sanitize(
            "<div class=\"markdown-alert markdown-alert-note\"><p class=\"markdown-alert-title\">Note</p></div>\
             <pre><code class=\"syntax-highlight language-rust\"><span class=\"syntax-keyword\">fn</span></code></pre>",
        );
        assert!(html.contains("markdown-alert-note"));
        assert!(html.contains("language-rust"));
        assert!(html.contains("syntax-keyword"));
    }

    #[test]
    fn sanitization_is_idempotent() {
        let gate = AmmoniaGate::new();
        let once = gate.sanitize(
            "<a href=\"/x\" target=_blank>x</a><img src=a.png onerror=y><table><tr><td>1</td></tr></table>",
            None,
        );
        let twice = gate.sanitize(once.as_str(), None);
        assert_eq!(once, twice);
    }

    #[test]
    fn hook_sees_each_url_bearing_element_once() {
        let seen = std::cell::RefCell::new(Vec::new());
        let hook = |node: &mut LinkNode| seen.borrow_mut().push(node.tag_name().to_string());

        AmmoniaGate::new().sanitize(
            "<p><a href=\"a\">a</a> <img src=\"b.png\"> <em>c</em></p>",
            Some(&hook),
        );

        assert_eq!(*seen.borrow(), vec!["a".to_string(), "img".to_string()]);
    }

    #[test]
    fn hook_rewrites_attributes_in_place() {
        let hook = |node: &mut LinkNode| {
            if let Some(href) = node.href.as_mut() {
                href.insert_str(0, "https://example.com/");
            }
        };

        let html = AmmoniaGate::new()
            .sanitize("<a href=\"page.md\">p</a>", Some(&hook))
            .to_string();
        assert!(html.contains("href=\"https://example.com/page.md\""));
    }

    #[test]
    fn hook_cannot_introduce_script_urls() {
        let hook = |node: &mut LinkNode| node.href = Some("javascript:alert(1)".to_string());

        let html = AmmoniaGate::new()
            .sanitize("<a href=\"page.md\">p</a>", Some(&hook))
            .to_string();
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("href="));
    }

    #[test]
    fn only_listed_schemes_survive() {
        let html = sanitize(
            "<a href=\"mailto:a@example.com\">m</a><a href=\"ftp://example.com/f\">f</a>\
             <a href=\"data:text/html,x\">d</a><a href=\"docs/a.md\">r</a>",
        );
        assert!(html.contains("href=\"mailto:a@example.com\""));
        assert!(html.contains("href=\"docs/a.md\""));
        assert!(!html.contains("ftp:"));
        assert!(!html.contains("data:"));
    }

    #[test]
    fn absent_hook_leaves_urls_as_sanitized() {
        let html = sanitize("<a href=\"/docs/a.md\">a</a>");
        assert!(html.contains("href=\"/docs/a.md\""));
    }
}
