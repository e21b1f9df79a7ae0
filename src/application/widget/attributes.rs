use std::collections::BTreeMap;

use crate::application::render::{ContentKind, RenderRequest};

/// Attribute names whose changes trigger a render.
pub const OBSERVED_ATTRIBUTES: [&str; 7] = [
    "code",
    "markdown",
    "content",
    "lang",
    "language",
    "baseurl",
    "rawbaseurl",
];

/// Raw-text attributes, highest priority first.
const TEXT_ATTRIBUTES: [&str; 3] = ["code", "markdown", "content"];
/// Content-kind attributes, highest priority first.
const KIND_ATTRIBUTES: [&str; 2] = ["language", "lang"];

/// Attribute state of a widget. Names are stored ASCII-lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<String, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_observed(name: &str) -> bool {
        OBSERVED_ATTRIBUTES.contains(&normalize_name(name).as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&normalize_name(name)).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(normalize_name(name), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(&normalize_name(name));
    }

    /// Snapshot the current values as a render request.
    pub fn request(&self) -> RenderRequest {
        let raw_text = self.first_of(&TEXT_ATTRIBUTES).unwrap_or_default();
        let content_kind = ContentKind::from_attribute(self.first_of(&KIND_ATTRIBUTES));

        let mut request = RenderRequest::new(raw_text, content_kind);
        if let Some(base) = self.get("baseurl") {
            request = request.with_base_url(base);
        }
        if let Some(raw_base) = self.get("rawbaseurl") {
            request = request.with_raw_base_url(raw_base);
        }
        request
    }

    fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_build_an_empty_markdown_request() {
        let request = Attributes::new().request();
        assert_eq!(request, RenderRequest::markdown(""));
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut attributes = Attributes::new();
        attributes.set("baseUrl", "https://example.com/");
        attributes.set("rawBaseUrl", "https://raw.example.com/");

        assert_eq!(attributes.get("BASEURL"), Some("https://example.com/"));
        assert!(Attributes::is_observed("rawBaseUrl"));
        assert!(!Attributes::is_observed("class"));

        let request = attributes.request();
        assert_eq!(request.base_url.as_deref(), Some("https://example.com/"));
        assert_eq!(request.media_base(), Some("https://raw.example.com/"));
    }

    #[test]
    fn text_and_kind_follow_priority() {
        let mut attributes = Attributes::new();
        attributes.set("content", "from content");
        attributes.set("lang", "rust");
        assert_eq!(attributes.request().raw_text, "from content");
        assert_eq!(
            attributes.request().content_kind,
            ContentKind::Code("rust".into())
        );

        attributes.set("code", "from code");
        attributes.set("language", "markdown");
        assert_eq!(attributes.request().raw_text, "from code");
        assert_eq!(attributes.request().content_kind, ContentKind::Markdown);
    }

    #[test]
    fn set_replaces_and_remove_clears() {
        let mut attributes = Attributes::new();
        attributes.set("code", "a");
        attributes.set("CODE", "b");
        assert_eq!(attributes.get("code"), Some("b"));

        attributes.remove("Code");
        assert_eq!(attributes.get("code"), None);
        assert_eq!(attributes.request().raw_text, "");
    }
}
