use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractor::AssetCategory;

/// The on-disk copy of one cloned site: `index.html` plus a fixed set of
/// asset directories.
#[derive(Debug, Clone)]
pub struct SiteTree {
    root: PathBuf,
}

impl SiteTree {
    /// Creates `root` and every asset subdirectory.
    pub fn create(root: &Path) -> Result<Self> {
        let root = root.to_path_buf();
        for category in AssetCategory::ALL {
            let dir = root.join(category.subdirectory());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a forward-slash path relative to the root.
    pub fn path_of(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.path_of(relative);
        fs::read(&path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    pub fn write(&self, relative: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.path_of(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path))?;

        Ok(path)
    }

    /// Moves a file within the tree, replacing whatever is at `to`.
    pub fn rename(&self, from: &str, to: &str) -> Result<PathBuf> {
        let source = self.path_of(from);
        let destination = self.path_of(to);
        fs::rename(&source, &destination)
            .with_context(|| format!("Failed to move {:?} to {:?}", source, destination))?;

        Ok(destination)
    }
}
