//! Container image version lookup from version-manifest files.
//!
//! Each `<image>.version` file under the manifest root pins one image; its
//! first line is the version deployed for that image.

use anyhow::{Context as _, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Version pins discovered from a version-manifest tree.
#[derive(Debug, Default)]
pub struct VersionFinder {
    versions: HashMap<String, String>,
}

impl VersionFinder {
    /// Scan a version-manifest tree.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut versions = HashMap::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("version")
            {
                continue;
            }
            let Some(image) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let Some(version) = text.lines().next().map(str::trim) else {
                continue;
            };
            if version.is_empty() {
                continue;
            }
            debug!("image {image} pinned to {version}");
            versions.insert(image.to_string(), version.to_string());
        }
        Ok(Self { versions })
    }

    /// Version pinned for an image, if any.
    pub fn version_for(&self, image: &str) -> Option<&str> {
        self.versions.get(image).map(String::as_str)
    }

    /// Number of pinned images.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the scan found any pins.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
