use std::io;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::parse_document;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use regex::Captures;
use url::Url;

use crate::extractor::{css_url_value, element_reference, resolve_reference, CSS_URL};
use crate::path_mapper::relative_link;

/// Where a rewritten reference should point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A file in the site tree, relative to the site root.
    Local(String),
    /// Keep pointing at the remote asset, as an absolute URL.
    Remote(Url),
}

type Resolve<'a> = &'a dyn Fn(&Url) -> Option<LinkTarget>;

struct Rewrite<'a> {
    base_url: &'a Url,
    document_path: &'a str,
    resolve: Resolve<'a>,
}

impl Rewrite<'_> {
    /// New value for one raw reference, or `None` to leave it alone.
    fn replacement(&self, raw: &str) -> Option<String> {
        let url = resolve_reference(self.base_url, raw)?;
        let link = match (self.resolve)(&url)? {
            LinkTarget::Local(path) => relative_link(self.document_path, &path),
            LinkTarget::Remote(_) if Url::parse(raw.trim()).is_ok() => return None,
            LinkTarget::Remote(remote) => remote.to_string(),
        };

        match raw.trim().split_once('#') {
            Some((_, fragment)) if !fragment.is_empty() => Some(format!("{}#{}", link, fragment)),
            _ => Some(link),
        }
    }

    fn css(&self, css: &str) -> String {
        CSS_URL
            .replace_all(css, |caps: &Captures| {
                match css_url_value(caps).and_then(|raw| self.replacement(raw)) {
                    Some(link) => format!("url(\"{}\")", link),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn node(&self, handle: &Handle) {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = handle.data
        {
            let tag = name.local.to_ascii_lowercase().to_string();
            let mut attrs = attrs.borrow_mut();

            let rel = attrs
                .iter()
                .find(|a| &*a.name.local == "rel")
                .map(|a| a.value.to_string());
            if let Some((attribute, _)) = element_reference(&tag, rel.as_deref()) {
                if let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == attribute) {
                    if let Some(link) = self.replacement(&attr.value) {
                        attr.value = StrTendril::from(link);
                    }
                }
            }

            if let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == "style") {
                let rewritten = self.css(&attr.value);
                if rewritten != *attr.value {
                    attr.value = StrTendril::from(rewritten);
                }
            }
            drop(attrs);

            if tag == "style" {
                for child in handle.children.borrow().iter() {
                    if let NodeData::Text { ref contents } = child.data {
                        let rewritten = self.css(&contents.borrow());
                        *contents.borrow_mut() = StrTendril::from(rewritten);
                    }
                }
            }
        }

        for child in handle.children.borrow().iter() {
            self.node(child);
        }
    }
}

/// Rewrites every `url(...)` in a stylesheet stored at `document_path`.
///
/// References `resolve` returns `None` for, and `data:` URIs, are left
/// byte-for-byte as they were.
pub fn rewrite_css<F>(css: &str, base_url: &Url, document_path: &str, resolve: F) -> String
where
    F: Fn(&Url) -> Option<LinkTarget>,
{
    Rewrite {
        base_url,
        document_path,
        resolve: &resolve,
    }
    .css(css)
}

/// Rewrites the asset references of an HTML document stored at
/// `document_path`, then serializes the parsed tree.
pub fn rewrite_html<F>(html: &str, base_url: &Url, document_path: &str, resolve: F) -> io::Result<String>
where
    F: Fn(&Url) -> Option<LinkTarget>,
{
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    Rewrite {
        base_url,
        document_path,
        resolve: &resolve,
    }
    .node(&dom.document);

    let document: SerializableHandle = dom.document.clone().into();
    let mut output = Vec::new();
    serialize(&mut output, &document, SerializeOpts::default())?;

    String::from_utf8(output).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolver(entries: &[(&str, LinkTarget)]) -> impl Fn(&Url) -> Option<LinkTarget> {
        let map: HashMap<String, LinkTarget> = entries
            .iter()
            .map(|(url, target)| (url.to_string(), target.clone()))
            .collect();
        move |url: &Url| map.get(url.as_str()).cloned()
    }

    fn local(path: &str) -> LinkTarget {
        LinkTarget::Local(path.to_string())
    }

    #[test]
    fn test_rewrite_css_relative_to_stylesheet() {
        let base = Url::parse("https://ex.com/static/s.css").unwrap();
        let resolve = resolver(&[
            ("https://ex.com/bg.jpg", local("images/bg.jpg")),
            ("https://ex.com/static/f.woff2", local("fonts/f.woff2")),
        ]);

        let css = "body{background:url(/bg.jpg)} @font-face{src:url('f.woff2') format('woff2')}";
        let out = rewrite_css(css, &base, "css/s.css", resolve);

        assert_eq!(
            out,
            r#"body{background:url("../images/bg.jpg")} @font-face{src:url("../fonts/f.woff2") format('woff2')}"#
        );
    }

    #[test]
    fn test_rewrite_css_leaves_data_and_unknown_untouched() {
        let base = Url::parse("https://ex.com/s.css").unwrap();
        let css = ".a{background:url(data:image/png;base64,iVBORw0KGgo=)} .b{background:url( 'https://other.org/x.png' )}";
        let out = rewrite_css(css, &base, "css/s.css", resolver(&[]));
        assert_eq!(out, css);
    }

    #[test]
    fn test_rewrite_css_keeps_fragment_and_remote_fallback() {
        let base = Url::parse("https://ex.com/s.css").unwrap();
        let resolve = resolver(&[
            ("https://ex.com/icons.svg", local("images/icons.svg")),
            (
                "https://ex.com/gone.png",
                LinkTarget::Remote(Url::parse("https://ex.com/gone.png").unwrap()),
            ),
        ]);

        let css = ".i{background:url(icons.svg#star)} .g{background:url(/gone.png)}";
        let out = rewrite_css(css, &base, "css/s.css", resolve);

        assert!(out.contains(r#"url("../images/icons.svg#star")"#));
        assert!(out.contains(r#"url("https://ex.com/gone.png")"#));
    }

    #[test]
    fn test_rewrite_html_points_at_local_files() {
        let base = Url::parse("https://ex.com/").unwrap();
        let resolve = resolver(&[
            ("https://ex.com/s.css", local("css/s.css")),
            ("https://ex.com/a.png", local("images/a.png")),
            ("https://ex.com/app.js", local("js/app.js")),
            ("https://ex.com/favicon.ico", local("images/favicon.ico")),
            ("https://ex.com/hero.jpg", local("images/hero.jpg")),
        ]);

        let html = r#"<html><head>
            <link rel="stylesheet" href="/s.css">
            <link rel="icon" href="favicon.ico">
            <script src="app.js"></script>
            </head><body>
            <img src="https://ex.com/a.png" alt="a">
            <div style="background-image: url(/hero.jpg)"></div>
            <a href="/s.css">not an asset link</a>
            </body></html>"#;

        let out = rewrite_html(html, &base, "index.html", resolve).unwrap();

        assert!(out.contains(r#"href="css/s.css""#));
        assert!(out.contains(r#"href="images/favicon.ico""#));
        assert!(out.contains(r#"src="js/app.js""#));
        assert!(out.contains(r#"src="images/a.png""#));
        assert!(out.contains(r#"url(&quot;images/hero.jpg&quot;)"#));
        assert!(out.contains(r#"<a href="/s.css">"#));
    }

    #[test]
    fn test_rewrite_html_style_block() {
        let base = Url::parse("https://ex.com/").unwrap();
        let resolve = resolver(&[("https://ex.com/f.woff", local("fonts/f.woff"))]);

        let html = "<html><head><style>@font-face{src:url(/f.woff)}</style></head><body></body></html>";
        let out = rewrite_html(html, &base, "index.html", resolve).unwrap();

        assert!(out.contains(r#"@font-face{src:url("fonts/f.woff")}"#));
    }

    #[test]
    fn test_rewrite_html_leaves_unresolved_references() {
        let base = Url::parse("https://ex.com/").unwrap();
        let html = r#"<html><head></head><body><img src="/missing.png"></body></html>"#;
        let out = rewrite_html(html, &base, "index.html", resolver(&[])).unwrap();
        assert!(out.contains(r#"<img src="/missing.png">"#));
    }
}
