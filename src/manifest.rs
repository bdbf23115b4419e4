use std::fmt::Write;

use crate::localizer::RunSummary;

pub const MANIFEST_FILE: &str = "clone_info.md";

/// Renders the human-readable `clone_info.md` for a finished run.
pub fn render_manifest(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Website Clone Info");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Original URL:** {}", summary.root_url);
    let _ = writeln!(out, "**Clone Date:** {}", summary.cloned_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Total Assets Found:** {}", summary.total_assets_discovered);
    let _ = writeln!(out, "**Successfully Downloaded:** {}", summary.downloaded_count);
    let _ = writeln!(out, "**Failed Downloads:** {}", summary.failed_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "## How to View");
    let _ = writeln!(out, "1. Open `index.html` in your web browser");
    let _ = writeln!(out, "2. Or serve this folder with any static file server for better compatibility");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Failed Downloads");

    if summary.failures.is_empty() {
        let _ = writeln!(out, "None - All assets downloaded successfully!");
    } else {
        for failed in &summary.failures {
            let error = failed.error.as_deref().unwrap_or("unknown error");
            let _ = writeln!(out, "- {} - {}", failed.remote_url, error);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "---");
    let _ = write!(out, "*Generated by web-cloner v{}*", env!("CARGO_PKG_VERSION"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::AssetCategory;
    use crate::localizer::{DownloadRecord, DownloadStatus};
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    fn summary(failures: Vec<DownloadRecord>) -> RunSummary {
        RunSummary {
            root_url: "https://example.com/".to_string(),
            cloned_at: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            site_dir: PathBuf::from("result/example.com"),
            index_path: PathBuf::from("result/example.com/index.html"),
            manifest_path: PathBuf::from("result/example.com/clone_info.md"),
            total_assets_discovered: 3,
            downloaded_count: 3 - failures.len(),
            failed_count: failures.len(),
            failures,
        }
    }

    #[test]
    fn test_manifest_all_succeeded() {
        let text = render_manifest(&summary(Vec::new()));

        assert!(text.contains("**Original URL:** https://example.com/"));
        assert!(text.contains("**Clone Date:** 2024-05-01 12:30:00"));
        assert!(text.contains("**Total Assets Found:** 3"));
        assert!(text.contains("**Successfully Downloaded:** 3"));
        assert!(text.contains("**Failed Downloads:** 0"));
        assert!(text.contains("None - All assets downloaded successfully!"));
    }

    #[test]
    fn test_manifest_lists_failures() {
        let failed = DownloadRecord {
            remote_url: "https://example.com/broken.png".to_string(),
            local_path: "images/broken.png".to_string(),
            category: AssetCategory::Image,
            status: DownloadStatus::Failed,
            error: Some("HTTP status 500 Internal Server Error".to_string()),
        };
        let text = render_manifest(&summary(vec![failed]));

        assert!(text.contains("**Successfully Downloaded:** 2"));
        assert!(text.contains("**Failed Downloads:** 1"));
        assert!(text.contains("- https://example.com/broken.png - HTTP status 500 Internal Server Error"));
        assert!(!text.contains("None - All assets"));
    }
}
