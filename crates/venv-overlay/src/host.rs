// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The embedded interpreter state touched by an overlay.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_SPECIAL_PATH, Result};

#[cfg(test)]
#[path = "./host_test.rs"]
mod host_test;

/// The interpreter's installation roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prefixes {
    /// Primary installation prefix.
    pub prefix: String,
    /// Prefix of platform-specific files and the executable.
    pub exec_prefix: String,
}

impl Prefixes {
    pub fn new<P: Into<String>, E: Into<String>>(prefix: P, exec_prefix: E) -> Self {
        Self {
            prefix: prefix.into(),
            exec_prefix: exec_prefix.into(),
        }
    }

    /// Both prefixes pointing at the same root.
    pub fn uniform<P: Into<String>>(root: P) -> Self {
        let root = root.into();
        Self {
            prefix: root.clone(),
            exec_prefix: root,
        }
    }
}

/// Access to the environment-sensitive state of an embedded interpreter.
///
/// The overlay manager only reads and replaces these values wholesale; it
/// never relies on how the host stores them.
pub trait InterpreterHost {
    /// Current module search path, in lookup order.
    fn search_path(&self) -> Vec<String>;

    /// Replace the module search path.
    fn set_search_path(&mut self, entries: Vec<String>);

    fn prefixes(&self) -> Prefixes;

    fn set_prefixes(&mut self, prefixes: Prefixes);

    /// The legacy "real prefix" marker, set while a virtual environment is
    /// active so that tools can find the base installation.
    fn real_prefix(&self) -> Option<String>;

    fn set_real_prefix(&mut self, value: Option<String>);

    /// Register a site directory with the interpreter.
    ///
    /// This may append any number of entries to the search path.
    fn add_site_dir(&mut self, dir: &Path) -> Result<()>;

    /// Host-injected search path entry that must survive synchronization.
    fn special_path(&self) -> &str;
}

/// An interpreter whose state lives in memory.
///
/// Site registration follows the interpreter rules: the directory is
/// appended unless already present, then its `.pth` files are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryInterpreter {
    search_path: Vec<String>,
    prefixes: Prefixes,
    real_prefix: Option<String>,
    special_path: String,
}

impl InMemoryInterpreter {
    /// Create an interpreter installed at `prefix` with the given search path.
    pub fn new<P: Into<String>>(search_path: Vec<String>, prefix: P) -> Self {
        Self {
            search_path,
            prefixes: Prefixes::uniform(prefix),
            real_prefix: None,
            special_path: DEFAULT_SPECIAL_PATH.to_string(),
        }
    }

    pub fn with_exec_prefix<E: Into<String>>(mut self, exec_prefix: E) -> Self {
        self.prefixes.exec_prefix = exec_prefix.into();
        self
    }

    pub fn with_special_path<S: Into<String>>(mut self, special_path: S) -> Self {
        self.special_path = special_path.into();
        self
    }

    /// Borrow the search path without copying it.
    pub fn entries(&self) -> &[String] {
        &self.search_path
    }
}

impl Default for InMemoryInterpreter {
    fn default() -> Self {
        Self::new(Vec::new(), "")
    }
}

impl InterpreterHost for InMemoryInterpreter {
    fn search_path(&self) -> Vec<String> {
        self.search_path.clone()
    }

    fn set_search_path(&mut self, entries: Vec<String>) {
        self.search_path = entries;
    }

    fn prefixes(&self) -> Prefixes {
        self.prefixes.clone()
    }

    fn set_prefixes(&mut self, prefixes: Prefixes) {
        self.prefixes = prefixes;
    }

    fn real_prefix(&self) -> Option<String> {
        self.real_prefix.clone()
    }

    fn set_real_prefix(&mut self, value: Option<String>) {
        self.real_prefix = value;
    }

    fn add_site_dir(&mut self, dir: &Path) -> Result<()> {
        for addition in crate::site::site_dir_additions(dir)? {
            let entry = addition.to_string_lossy().into_owned();
            if !self.search_path.contains(&entry) {
                tracing::trace!(%entry, "appending to search path");
                self.search_path.push(entry);
            }
        }
        Ok(())
    }

    fn special_path(&self) -> &str {
        &self.special_path
    }
}
