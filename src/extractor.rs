use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use select::document::Document;
use select::predicate::Element;
use serde::Serialize;
use url::Url;

/// Kind of asset a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Stylesheet,
    Script,
    Image,
    Font,
    Other,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Stylesheet,
        AssetCategory::Script,
        AssetCategory::Image,
        AssetCategory::Font,
        AssetCategory::Other,
    ];

    /// Classifies a URL path by its file extension.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        let extension = match lower.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext,
            _ => return AssetCategory::Other,
        };

        match extension {
            "css" => AssetCategory::Stylesheet,
            "js" | "jsx" | "ts" | "tsx" => AssetCategory::Script,
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "ico" => AssetCategory::Image,
            "woff" | "woff2" | "ttf" | "eot" | "otf" => AssetCategory::Font,
            _ => AssetCategory::Other,
        }
    }

    /// Directory of the site tree that holds assets of this kind.
    pub fn subdirectory(self) -> &'static str {
        match self {
            AssetCategory::Stylesheet => "css",
            AssetCategory::Script => "js",
            AssetCategory::Image => "images",
            AssetCategory::Font => "fonts",
            AssetCategory::Other => "assets",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetCategory::Stylesheet => "stylesheet",
            AssetCategory::Script => "script",
            AssetCategory::Image => "image",
            AssetCategory::Font => "font",
            AssetCategory::Other => "other",
        };
        f.write_str(label)
    }
}

/// An absolute asset URL found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub remote_url: Url,
    pub category: AssetCategory,
}

/// Which attribute of an HTML element carries an asset reference, and what kind.
///
/// Shared by extraction and rewriting so both always agree on the element set.
pub fn element_reference(tag: &str, rel: Option<&str>) -> Option<(&'static str, AssetCategory)> {
    match tag {
        "link" => {
            let rel = rel?.to_ascii_lowercase();
            let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
            if tokens.contains(&"stylesheet") {
                Some(("href", AssetCategory::Stylesheet))
            } else if tokens.iter().any(|t| *t == "icon" || *t == "apple-touch-icon") {
                Some(("href", AssetCategory::Image))
            } else {
                None
            }
        }
        "script" => Some(("src", AssetCategory::Script)),
        "img" => Some(("src", AssetCategory::Image)),
        _ => None,
    }
}

/// Resolves a raw reference against `base`.
///
/// Returns `None` for empty values, `data:` URIs and anything that is not
/// http(s) after resolution. The fragment is dropped.
pub fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || is_data_uri(raw) {
        return None;
    }

    let mut url = base.join(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

pub(crate) fn is_data_uri(raw: &str) -> bool {
    raw.get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Matches `url(...)` with double, single or no quotes.
pub(crate) static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'")\s][^)]*?))\s*\)"#)
        .expect("css url() pattern")
});

/// The raw, unresolved value of a `url(...)` match.
pub(crate) fn css_url_value<'t>(caps: &regex::Captures<'t>) -> Option<&'t str> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

/// Lists every asset URL referenced by `url(...)` in a stylesheet.
///
/// Relative references are resolved against `base_url`; `data:` URIs and
/// unresolvable entries are dropped.
pub fn extract_css_assets(css: &str, base_url: &Url) -> Vec<Url> {
    CSS_URL
        .captures_iter(css)
        .filter_map(|caps| css_url_value(&caps))
        .filter_map(|raw| resolve_reference(base_url, raw))
        .collect()
}

/// Lists the assets an HTML document references: stylesheets, scripts,
/// images, icons, and `url(...)` values in `style` attributes and `<style>`
/// blocks. Duplicates are kept.
pub fn extract_html_assets(html: &str, base_url: &Url) -> Vec<AssetReference> {
    let document = Document::from(html);
    let mut assets = Vec::new();

    for node in document.find(Element) {
        let Some(tag) = node.name() else { continue };
        let tag = tag.to_ascii_lowercase();

        if let Some((attribute, category)) = element_reference(&tag, node.attr("rel")) {
            if let Some(url) = node.attr(attribute).and_then(|raw| resolve_reference(base_url, raw)) {
                assets.push(AssetReference {
                    remote_url: url,
                    category,
                });
            }
        }

        if let Some(style) = node.attr("style") {
            assets.extend(
                extract_css_assets(style, base_url)
                    .into_iter()
                    .map(|remote_url| AssetReference {
                        remote_url,
                        category: AssetCategory::Image,
                    }),
            );
        }

        if tag == "style" {
            assets.extend(
                extract_css_assets(&node.text(), base_url)
                    .into_iter()
                    .map(|remote_url| {
                        let category = AssetCategory::from_path(remote_url.path());
                        AssetReference {
                            remote_url,
                            category,
                        }
                    }),
            );
        }
    }

    assets
}
