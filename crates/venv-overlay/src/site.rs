// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Site-packages discovery and `.pth` file handling.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./site_test.rs"]
mod site_test;

/// Location of site-packages directories relative to an environment root.
pub const SITE_PACKAGES_PATTERN: &str = "lib*/python*/site-packages";

/// Extension of path configuration files inside a site directory.
const PTH_EXTENSION: &str = "pth";

/// Find the site-packages directories of the environment at `root`.
///
/// Directories come back in descending lexical order, so registering them
/// one after the other yields the conventional `lib64`, `lib32`, `lib`
/// priority once the new entries are moved to the front.
pub fn discover_site_dirs<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let root_str = root
        .to_str()
        .ok_or_else(|| Error::NonUnicodePath(root.to_path_buf()))?;
    let pattern = Path::new(&glob::Pattern::escape(root_str))
        .join(SITE_PACKAGES_PATTERN)
        .display()
        .to_string();

    let paths = glob::glob(&pattern).map_err(|error| Error::InvalidPattern {
        root: root.to_path_buf(),
        error,
    })?;

    let mut dirs = Vec::new();
    for path in paths {
        let path = path?;
        if path.is_dir() {
            dirs.push(path);
        }
    }

    dirs.sort_by(|a, b| b.as_os_str().cmp(a.as_os_str()));
    tracing::debug!(root = %root.display(), count = dirs.len(), "discovered site directories");
    Ok(dirs)
}

/// A meaningful line of a `.pth` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PthEntry {
    /// A directory, resolved against the site directory.
    Path(PathBuf),
    /// An `import` statement. These are never executed here.
    Import(String),
}

/// Parse the contents of a `.pth` file found in `site_dir`.
pub fn parse_pth(site_dir: &Path, content: &str) -> Vec<PthEntry> {
    let mut entries = Vec::new();
    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if line.starts_with("import ") || line.starts_with("import\t") {
            entries.push(PthEntry::Import(line.to_string()));
            continue;
        }
        let dir = normalize_lexically(&site_dir.join(line.trim_end()));
        entries.push(PthEntry::Path(dir));
    }
    entries
}

/// Paths the interpreter site mechanism would add for `site_dir`, in order.
///
/// That is the directory itself followed by every existing directory named
/// in its `.pth` files. Files are processed in name order and hidden files
/// are skipped. Duplicates are left for the caller to filter against its
/// own search path.
pub fn site_dir_additions(site_dir: &Path) -> Result<Vec<PathBuf>> {
    let site_dir = normalize_lexically(site_dir);
    let mut additions = vec![site_dir.clone()];

    let read_dir = std::fs::read_dir(&site_dir).map_err(|error| Error::SiteRegistration {
        dir: site_dir.clone(),
        error,
    })?;

    let mut pth_files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|error| Error::SiteRegistration {
            dir: site_dir.clone(),
            error,
        })?;
        let name = entry.file_name();
        let is_hidden = name.to_string_lossy().starts_with('.');
        let path = entry.path();
        if !is_hidden && path.extension().is_some_and(|ext| ext == PTH_EXTENSION) {
            pth_files.push(path);
        }
    }
    pth_files.sort();

    for pth in pth_files {
        let content = std::fs::read_to_string(&pth).map_err(|error| Error::SiteRegistration {
            dir: site_dir.clone(),
            error,
        })?;
        for entry in parse_pth(&site_dir, &content) {
            match entry {
                PthEntry::Path(dir) => {
                    if dir.exists() {
                        additions.push(dir);
                    }
                }
                PthEntry::Import(line) => {
                    tracing::warn!(
                        file = %pth.display(),
                        "skipping import line in .pth file: {line}"
                    );
                }
            }
        }
    }

    Ok(additions)
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
