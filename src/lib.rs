pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod localizer;
pub mod logger;
pub mod manifest;
pub mod path_mapper;
pub mod progress;
pub mod rewriter;
pub mod site_tree;

// Re-export main types for convenience
pub use cli::CloneCommand;
pub use config::{ClientConfig, ClonerConfig, RetryPolicy};
pub use error::{CloneError, FetchError, FetchErrorKind};
pub use extractor::{extract_css_assets, extract_html_assets, AssetCategory, AssetReference};
pub use fetcher::Fetcher;
pub use localizer::{AssetLocalizer, DownloadRecord, DownloadStatus, RunSummary};
pub use path_mapper::{map_to_local_path, relative_link, sanitize_filename};
pub use progress::{LogProgress, Outcome, ProgressSink, SilentProgress, SpinnerProgress};
pub use rewriter::{rewrite_css, rewrite_html, LinkTarget};
pub use site_tree::SiteTree;
