use tracing::warn;
use url::Url;

use crate::application::render::types::{RenderError, RenderRequest};

use super::sanitize::{LinkNode, RewriteHook};

/// Drop exactly one leading `/` so root-relative paths resolve under the base
/// instead of the embedding page's origin.
pub fn strip_root(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Resolve `path` against `base` with standard URL-join semantics.
pub fn resolve(path: &str, base: &str) -> Result<String, RenderError> {
    let base = parse_base(base)?;
    join(&base, path)
}

fn join(base: &Url, path: &str) -> Result<String, RenderError> {
    base.join(strip_root(path))
        .map(String::from)
        .map_err(|err| RenderError::Rewrite {
            message: format!("cannot join `{path}` onto `{base}`: {err}"),
        })
}

fn parse_base(base: &str) -> Result<Url, RenderError> {
    let parsed = Url::parse(base).map_err(|err| RenderError::Rewrite {
        message: format!("invalid base url `{base}`: {err}"),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(RenderError::Rewrite {
            message: format!("base url `{base}` cannot be used as a base"),
        });
    }
    Ok(parsed)
}

/// Rewrite hook resolving `href` against the navigation base and `src` against
/// the media base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlRewrite {
    navigation: Url,
    media: Url,
}

impl BaseUrlRewrite {
    /// `media` defaults to `navigation` when absent or unparsable.
    pub fn new(navigation: &str, media: Option<&str>) -> Result<Self, RenderError> {
        let navigation = parse_base(navigation)?;
        let media = match media {
            Some(raw) => parse_base(raw).unwrap_or_else(|err| {
                warn!(
                    target = "application::render::links",
                    error = %err,
                    "media base rejected; using navigation base"
                );
                navigation.clone()
            }),
            None => navigation.clone(),
        };
        Ok(Self { navigation, media })
    }

    /// Hook for a markdown render, or `None` when the request carries no base url.
    pub fn for_request(request: &RenderRequest) -> Option<Self> {
        let navigation = request.base_url.as_deref()?;
        match Self::new(navigation, request.media_base()) {
            Ok(hook) => Some(hook),
            Err(err) => {
                warn!(
                    target = "application::render::links",
                    error = %err,
                    "link rewriting disabled for this render"
                );
                None
            }
        }
    }

    pub fn navigation(&self) -> &Url {
        &self.navigation
    }

    pub fn media(&self) -> &Url {
        &self.media
    }

    fn rewrite(base: &Url, value: &mut Option<String>) {
        let Some(current) = value.as_deref() else {
            return;
        };
        match join(base, current) {
            Ok(resolved) => *value = Some(resolved),
            Err(err) => warn!(
                target = "application::render::links",
                error = %err,
                "leaving url unchanged"
            ),
        }
    }
}

impl RewriteHook for BaseUrlRewrite {
    fn after_sanitize_attributes(&self, node: &mut LinkNode) {
        Self::rewrite(&self.navigation, &mut node.href);
        Self::rewrite(&self.media, &mut node.src);
    }
}
