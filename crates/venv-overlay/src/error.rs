// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for overlay operations.

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

use crate::OverlayMode;

/// Convenience Result type with venv-overlay Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during overlay operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// An overlay is already applied and the reentrancy policy rejects another
    #[error("A virtual environment overlay is already active ({mode})")]
    #[diagnostic(
        code(venv_overlay::already_active),
        help("Deactivate the current environment first, or set 'reentrancy: replace'")
    )]
    AlreadyActive { mode: OverlayMode },

    /// Externally supplied search path is not a plain list of strings
    #[error("Invalid search path list: {reason}")]
    #[diagnostic(
        code(venv_overlay::invalid_search_path),
        help("Only a list of quoted strings is accepted, e.g. ['/usr/lib/python3.11', '/venv/lib']")
    )]
    InvalidSearchPath {
        reason: String,
        #[source_code]
        input: String,
        #[label("here")]
        span: SourceSpan,
    },

    /// Site-packages glob pattern could not be built
    #[error("Invalid site-packages pattern for {root:?}")]
    #[diagnostic(
        code(venv_overlay::invalid_pattern),
        help("The environment root could not be turned into a search pattern")
    )]
    InvalidPattern {
        root: PathBuf,
        #[source]
        error: glob::PatternError,
    },

    /// Failed while listing site-packages directories
    #[error("Failed to discover site-packages directories")]
    #[diagnostic(code(venv_overlay::site_discovery))]
    SiteDiscovery(#[from] glob::GlobError),

    /// Failed to register a site-packages directory with the interpreter
    #[error("Failed to register site directory {dir:?}")]
    #[diagnostic(code(venv_overlay::site_registration))]
    SiteRegistration {
        dir: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Environment variable holds a value that is not valid unicode
    #[error("Environment variable {0} is not valid unicode")]
    #[diagnostic(
        code(venv_overlay::non_unicode_variable),
        help("The variable cannot be saved and restored losslessly")
    )]
    NonUnicodeVariable(String),

    /// Path that cannot be represented in the interpreter's string state
    #[error("Path is not valid unicode: {0:?}")]
    #[diagnostic(
        code(venv_overlay::non_unicode_path),
        help("Virtual environment roots must be valid unicode to be exported to the interpreter")
    )]
    NonUnicodePath(PathBuf),

    /// Invalid YAML in configuration file
    #[error("Invalid configuration file: {error}")]
    #[diagnostic(
        code(venv_overlay::invalid_yaml),
        help("Check YAML syntax and ensure 'api: venv-overlay/v0' is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(venv_overlay::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(venv_overlay::io_error))]
    Io(#[from] std::io::Error),
}
