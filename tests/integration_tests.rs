use std::collections::HashMap;
use std::fs;

use tempfile::tempdir;
use url::Url;
use web_cloner::{
    extract_css_assets, extract_html_assets, map_to_local_path, relative_link, rewrite_css, rewrite_html,
    sanitize_filename, AssetCategory, LinkTarget, SiteTree,
};

const PAGE: &str = r#"
    <html>
        <head>
            <link rel="stylesheet" href="/static/site.css">
            <link rel="shortcut icon" href="favicon.ico">
            <link rel="canonical" href="https://example.com/">
            <script src="https://cdn.example.net/lib/jquery.min.js"></script>
            <script>var inline = true;</script>
        </head>
        <body>
            <img src="photos/team%20photo.jpg#top" alt="Team">
            <img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=">
            <a href="/about">About</a>
            <div style="background: url('/img/banner.png') no-repeat"></div>
        </body>
    </html>
"#;

fn base() -> Url {
    Url::parse("https://example.com/company/").unwrap()
}

/// Local paths the way a run would assign them, with `failed` left remote.
fn targets(urls: &[Url], failed: &[&str]) -> HashMap<String, LinkTarget> {
    urls.iter()
        .map(|url| {
            let target = if failed.contains(&url.as_str()) {
                LinkTarget::Remote(url.clone())
            } else {
                LinkTarget::Local(map_to_local_path(url, None))
            };
            (url.to_string(), target)
        })
        .collect()
}

#[test]
fn test_extract_page_assets() {
    let assets = extract_html_assets(PAGE, &base());

    let found: Vec<(String, AssetCategory)> = assets
        .iter()
        .map(|a| (a.remote_url.to_string(), a.category))
        .collect();

    assert_eq!(
        found,
        vec![
            ("https://example.com/static/site.css".to_string(), AssetCategory::Stylesheet),
            ("https://example.com/company/favicon.ico".to_string(), AssetCategory::Image),
            ("https://cdn.example.net/lib/jquery.min.js".to_string(), AssetCategory::Script),
            ("https://example.com/company/photos/team%20photo.jpg".to_string(), AssetCategory::Image),
            ("https://example.com/img/banner.png".to_string(), AssetCategory::Image),
        ]
    );
}

#[test]
fn test_local_paths_for_page_assets() {
    let paths: Vec<String> = extract_html_assets(PAGE, &base())
        .iter()
        .map(|a| map_to_local_path(&a.remote_url, None))
        .collect();

    assert_eq!(
        paths,
        vec![
            "css/site.css",
            "images/favicon.ico",
            "js/jquery.min.js",
            "images/team photo.jpg",
            "images/banner.png",
        ]
    );
}

#[test]
fn test_rewrite_page_against_mapped_paths() {
    let urls: Vec<Url> = extract_html_assets(PAGE, &base())
        .into_iter()
        .map(|a| a.remote_url)
        .collect();
    let targets = targets(&urls, &["https://cdn.example.net/lib/jquery.min.js"]);

    let html = rewrite_html(PAGE, &base(), "index.html", |u| targets.get(u.as_str()).cloned()).unwrap();

    assert!(html.contains(r#"href="css/site.css""#));
    assert!(html.contains(r#"href="images/favicon.ico""#));
    // Already absolute, so the failed script keeps its original value.
    assert!(html.contains(r#"src="https://cdn.example.net/lib/jquery.min.js""#));
    assert!(html.contains(r#"src="images/team%20photo.jpg#top""#));
    assert!(html.contains("images/banner.png"));
    assert!(html.contains("data:image/gif;base64,R0lGODlhAQABAAAAACw="));
    assert!(html.contains(r#"href="https://example.com/""#));
    assert!(html.contains(r#"href="/about""#));
    assert!(html.contains("var inline = true;"));
}

#[test]
fn test_stylesheet_pipeline() {
    let css_url = Url::parse("https://example.com/static/site.css").unwrap();
    let css = r#"
        @font-face { font-family: Inter; src: url("../fonts/Inter.woff2") format("woff2"); }
        .hero { background-image: url(/img/hero.jpg); }
        .icon { background: url('sprites/icons.svg#home'); }
        .dot { background: url(data:image/png;base64,AAAA); }
    "#;

    let urls = extract_css_assets(css, &css_url);
    assert_eq!(
        urls.iter().map(Url::as_str).collect::<Vec<_>>(),
        vec![
            "https://example.com/fonts/Inter.woff2",
            "https://example.com/img/hero.jpg",
            "https://example.com/static/sprites/icons.svg",
        ]
    );

    let document_path = map_to_local_path(&css_url, None);
    let targets = targets(&urls, &["https://example.com/img/hero.jpg"]);
    let rewritten = rewrite_css(css, &css_url, &document_path, |u| targets.get(u.as_str()).cloned());

    assert!(rewritten.contains(r#"url("../fonts/Inter.woff2")"#));
    assert!(rewritten.contains(r#"url("https://example.com/img/hero.jpg")"#));
    assert!(rewritten.contains(r#"url("../images/icons.svg#home")"#));
    assert!(rewritten.contains("url(data:image/png;base64,AAAA)"));
    assert!(rewritten.contains(r#"format("woff2")"#));
}

#[test]
fn test_links_resolve_inside_site_tree() {
    let temp_dir = tempdir().unwrap();
    let tree = SiteTree::create(&temp_dir.path().join("example.com")).unwrap();

    for category in AssetCategory::ALL {
        assert!(tree.root().join(category.subdirectory()).is_dir());
    }

    let image = map_to_local_path(&Url::parse("https://example.com/a/b/logo.png").unwrap(), None);
    tree.write(&image, b"png").unwrap();
    tree.write("css/site.css", b"body{}").unwrap();

    let from_css = relative_link("css/site.css", &image);
    assert_eq!(from_css, "../images/logo.png");
    let resolved = tree.root().join("css").join(&from_css);
    assert_eq!(fs::read(resolved).unwrap(), b"png");

    let from_index = relative_link("index.html", &image);
    assert_eq!(fs::read(tree.root().join(from_index)).unwrap(), b"png");
}

#[test]
fn test_sanitized_names_are_safe() {
    let hostile = [
        "con:fig?.css",
        "..",
        "   ",
        "a\\b/c.png",
        "pipe|star*quote\".js",
        "tab\tnewline\n.gif",
    ];

    for name in hostile {
        let sanitized = sanitize_filename(name);
        assert!(!sanitized.is_empty(), "empty name for {:?}", name);
        assert!(sanitized.chars().count() <= 200);
        assert!(
            !sanitized.contains(|c: char| "<>:\"/\\|?*".contains(c) || c.is_control()),
            "unsafe name {:?} for {:?}",
            sanitized,
            name
        );
        assert_ne!(sanitized, "..");
    }
}

#[test]
fn test_same_url_always_maps_to_same_path() {
    let from_html = Url::parse("https://example.com/company/").unwrap().join("../img/x.png").unwrap();
    let from_css = Url::parse("https://example.com/static/site.css")
        .unwrap()
        .join("/img/x.png")
        .unwrap();

    assert_eq!(from_html, from_css);
    assert_eq!(map_to_local_path(&from_html, None), map_to_local_path(&from_css, None));
}
