use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use url::Url;

use crate::config::{normalize_url, ClonerConfig};
use crate::error::CloneError;
use crate::extractor::{extract_css_assets, extract_html_assets, AssetCategory, AssetReference};
use crate::fetcher::Fetcher;
use crate::manifest::{render_manifest, MANIFEST_FILE};
use crate::path_mapper::{map_to_local_path, site_directory_name, DEFAULT_DOCUMENT};
use crate::progress::{Outcome, ProgressSink};
use crate::rewriter::{rewrite_css, rewrite_html, LinkTarget};
use crate::site_tree::SiteTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One attempted asset download. Terminal once it leaves `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    pub remote_url: String,
    /// Relative to the site root, forward slashes.
    pub local_path: String,
    pub category: AssetCategory,
    pub status: DownloadStatus,
    pub error: Option<String>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub root_url: String,
    pub cloned_at: DateTime<Local>,
    pub site_dir: PathBuf,
    pub index_path: PathBuf,
    pub manifest_path: PathBuf,
    pub total_assets_discovered: usize,
    pub downloaded_count: usize,
    pub failed_count: usize,
    pub failures: Vec<DownloadRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    FetchRoot,
    ExtractFirstLevel,
    DownloadAndExpand,
    Rewrite,
    Persist,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::FetchRoot => "fetch-root",
            Stage::ExtractFirstLevel => "extract",
            Stage::DownloadAndExpand => "download",
            Stage::Rewrite => "rewrite",
            Stage::Persist => "persist",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A stylesheet that was downloaded and still needs its own references rewritten.
struct LocalStylesheet {
    remote_url: Url,
    local_path: String,
}

/// Turns one remote page into a self-contained local copy.
///
/// The root document is fetched first; if that fails the run is over and
/// nothing is written. Every asset after that is downloaded at most once per
/// run, and an asset that cannot be fetched is recorded rather than raised.
pub struct AssetLocalizer {
    fetcher: Fetcher,
    config: ClonerConfig,
    progress: Box<dyn ProgressSink>,
    records: Vec<DownloadRecord>,
    by_url: HashMap<String, usize>,
}

impl AssetLocalizer {
    pub fn new(config: ClonerConfig, progress: Box<dyn ProgressSink>) -> Result<Self, CloneError> {
        let fetcher = Fetcher::new(&config.client, config.retry)?;
        Ok(Self::with_fetcher(fetcher, config, progress))
    }

    pub fn with_fetcher(fetcher: Fetcher, config: ClonerConfig, progress: Box<dyn ProgressSink>) -> Self {
        Self {
            fetcher,
            config,
            progress,
            records: Vec::new(),
            by_url: HashMap::new(),
        }
    }

    /// Every download attempted by the last run, in the order they were attempted.
    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }

    pub async fn clone_site(&mut self, url: &str) -> Result<RunSummary, CloneError> {
        self.records.clear();
        self.by_url.clear();

        match self.run(url).await {
            Ok(summary) => {
                self.progress.on_finish(Outcome::Success(format!(
                    "Cloned {} ({} downloaded, {} failed)",
                    summary.root_url, summary.downloaded_count, summary.failed_count
                )));
                Ok(summary)
            }
            Err(e) => {
                log::error!("Cloning {} failed: {}", url, e);
                self.progress.on_finish(Outcome::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(&mut self, input: &str) -> Result<RunSummary, CloneError> {
        self.enter(Stage::Init);
        let url = normalize_url(input)?;

        self.enter(Stage::FetchRoot);
        self.progress.on_progress(&format!("Fetching {}", url));
        let root = self.fetcher.fetch(&url).await.map_err(CloneError::RootFetch)?;
        let base_url = root.final_url.clone();
        let html = String::from_utf8_lossy(&root.body).into_owned();
        match root.content_type.as_deref() {
            Some(content_type) if !content_type.to_ascii_lowercase().contains("html") => {
                log::warn!("{} is served as {}, treating it as HTML anyway", base_url, content_type)
            }
            _ => {}
        }
        if base_url != url {
            log::info!("{} redirected to {}", url, base_url);
        }

        let tree = SiteTree::create(&self.config.output_root.join(site_directory_name(&url)))?;
        log::info!("Writing site tree to {:?}", tree.root());

        self.enter(Stage::ExtractFirstLevel);
        self.progress.on_progress("Analyzing assets");
        let references = extract_html_assets(&html, &base_url);
        log::info!("Found {} asset references in {}", references.len(), base_url);

        self.enter(Stage::DownloadAndExpand);
        let stylesheets = self.download_all(&tree, &references).await;

        self.enter(Stage::Rewrite);
        self.progress.on_progress("Rewriting references");
        let index_html = match rewrite_html(&html, &base_url, DEFAULT_DOCUMENT, |u| self.link_target(u)) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                log::warn!("Could not rewrite {}, saving it unchanged: {}", base_url, e);
                html
            }
        };
        for stylesheet in &stylesheets {
            self.rewrite_stylesheet(&tree, stylesheet)?;
        }

        self.enter(Stage::Persist);
        let index_path = tree.write(DEFAULT_DOCUMENT, index_html.as_bytes())?;
        let summary = self.summarize(&url, &tree, index_path);
        tree.write(MANIFEST_FILE, render_manifest(&summary).as_bytes())?;

        self.enter(Stage::Done);
        Ok(summary)
    }

    /// Stylesheets first (their own references join the queue), then scripts,
    /// then everything else. Second-level references are not expanded further.
    async fn download_all(&mut self, tree: &SiteTree, references: &[AssetReference]) -> Vec<LocalStylesheet> {
        let mut stylesheets = Vec::new();
        let mut from_stylesheets = Vec::new();

        for reference in references.iter().filter(|r| r.category == AssetCategory::Stylesheet) {
            let Some(local_path) = self.download(tree, reference).await else { continue };
            from_stylesheets.extend(self.expand_stylesheet(tree, &reference.remote_url, &local_path));
            stylesheets.push(LocalStylesheet {
                remote_url: reference.remote_url.clone(),
                local_path,
            });
        }

        for reference in references.iter().filter(|r| r.category == AssetCategory::Script) {
            self.download(tree, reference).await;
        }

        let rest = references
            .iter()
            .filter(|r| !matches!(r.category, AssetCategory::Stylesheet | AssetCategory::Script))
            .cloned()
            .chain(from_stylesheets);
        for reference in rest.collect::<Vec<_>>() {
            self.download(tree, &reference).await;
        }

        stylesheets
    }

    /// Downloads one asset unless this run has already attempted it.
    ///
    /// Returns the local path only when this call fetched the asset.
    async fn download(&mut self, tree: &SiteTree, reference: &AssetReference) -> Option<String> {
        let key = reference.remote_url.as_str();
        if self.by_url.contains_key(key) {
            log::debug!("Already handled {}", key);
            return None;
        }

        let local_path = map_to_local_path(&reference.remote_url, None);
        let idx = self.records.len();
        self.records.push(DownloadRecord {
            remote_url: key.to_string(),
            local_path: local_path.clone(),
            category: reference.category,
            status: DownloadStatus::Pending,
            error: None,
        });
        self.by_url.insert(key.to_string(), idx);

        self.progress
            .on_progress(&format!("Downloading {}: {}", reference.category, local_path));
        let result = self
            .fetcher
            .fetch_to_file(&reference.remote_url, &tree.path_of(&local_path))
            .await;

        let outcome = match result {
            Ok(file) => {
                log::debug!("Saved {} ({} bytes) to {}", key, file.bytes_written, local_path);
                let final_path = self.settle_extension(tree, reference, &local_path, file.content_type.as_deref());
                let record = &mut self.records[idx];
                record.local_path = final_path.clone();
                record.status = DownloadStatus::Succeeded;
                Some(final_path)
            }
            Err(e) => {
                log::warn!("⚠️  Failed to download {}: {}", key, e);
                let record = &mut self.records[idx];
                record.status = DownloadStatus::Failed;
                record.error = Some(e.to_string());
                None
            }
        };

        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
        outcome
    }

    /// Gives an extensionless download the extension its `Content-Type` implies.
    fn settle_extension(
        &self,
        tree: &SiteTree,
        reference: &AssetReference,
        local_path: &str,
        content_type: Option<&str>,
    ) -> String {
        let inferred = map_to_local_path(&reference.remote_url, content_type);
        if inferred == local_path {
            return inferred;
        }

        match tree.rename(local_path, &inferred) {
            Ok(_) => inferred,
            Err(e) => {
                log::warn!("Keeping {} without extension: {:#}", local_path, e);
                local_path.to_string()
            }
        }
    }

    /// References inside a freshly downloaded stylesheet.
    fn expand_stylesheet(&self, tree: &SiteTree, css_url: &Url, local_path: &str) -> Vec<AssetReference> {
        let css = match tree.read(local_path).map(String::from_utf8) {
            Ok(Ok(css)) => css,
            Ok(Err(_)) => {
                log::warn!("{} is not valid UTF-8, not scanning it for assets", css_url);
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Could not read back {}: {:#}", local_path, e);
                return Vec::new();
            }
        };

        let found: Vec<AssetReference> = extract_css_assets(&css, css_url)
            .into_iter()
            .map(|remote_url| {
                let category = AssetCategory::from_path(remote_url.path());
                AssetReference {
                    remote_url,
                    category,
                }
            })
            .collect();
        log::debug!("{} references {} assets", css_url, found.len());
        found
    }

    fn rewrite_stylesheet(&self, tree: &SiteTree, stylesheet: &LocalStylesheet) -> Result<(), CloneError> {
        let Ok(css) = String::from_utf8(tree.read(&stylesheet.local_path)?) else {
            log::warn!("Leaving {} as downloaded", stylesheet.local_path);
            return Ok(());
        };

        let rewritten = rewrite_css(&css, &stylesheet.remote_url, &stylesheet.local_path, |u| {
            self.link_target(u)
        });
        if rewritten != css {
            tree.write(&stylesheet.local_path, rewritten.as_bytes())?;
        }
        Ok(())
    }

    /// Where a reference to `url` should point after rewriting.
    fn link_target(&self, url: &Url) -> Option<LinkTarget> {
        let record = &self.records[*self.by_url.get(url.as_str())?];
        match record.status {
            DownloadStatus::Succeeded => Some(LinkTarget::Local(record.local_path.clone())),
            DownloadStatus::Failed => Some(LinkTarget::Remote(url.clone())),
            DownloadStatus::Pending => None,
        }
    }

    fn summarize(&self, url: &Url, tree: &SiteTree, index_path: PathBuf) -> RunSummary {
        let failures: Vec<DownloadRecord> = self
            .records
            .iter()
            .filter(|r| r.status == DownloadStatus::Failed)
            .cloned()
            .collect();
        let downloaded_count = self
            .records
            .iter()
            .filter(|r| r.status == DownloadStatus::Succeeded)
            .count();

        RunSummary {
            root_url: url.to_string(),
            cloned_at: Local::now(),
            site_dir: tree.root().to_path_buf(),
            index_path,
            manifest_path: tree.path_of(MANIFEST_FILE),
            total_assets_discovered: self.records.len(),
            downloaded_count,
            failed_count: failures.len(),
            failures,
        }
    }

    fn enter(&self, stage: Stage) {
        log::debug!("stage: {}", stage);
    }
}
