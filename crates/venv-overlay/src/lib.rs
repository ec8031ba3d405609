// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! venv-overlay - Virtual Environment Overlay Manager
//!
//! This crate lets a host process with an embedded Python interpreter switch
//! the interpreter's notion of "current installation" to a virtual
//! environment, and later restore the previous state exactly.
//!
//! # Overview
//!
//! The [`OverlayManager`] owns a snapshot of everything it changes:
//!
//! - the interpreter search path and installation prefixes, through an
//!   [`InterpreterHost`];
//! - the `PATH`, `PYTHONPATH` and `VIRTUAL_ENV` variables, through an
//!   [`EnvStore`].
//!
//! An overlay is either applied by the manager itself ([`OverlayManager::activate`])
//! or mirrored from a shell that already activated the environment
//! ([`OverlayManager::externally_synchronize`]). In both cases
//! [`OverlayManager::deactivate`] undoes exactly what was changed.
//!
//! # Example
//!
//! ```no_run
//! use venv_overlay::{InMemoryInterpreter, MemoryEnv, OverlayManager};
//!
//! let host = InMemoryInterpreter::new(vec!["/usr/lib/python3.11".into()], "/usr");
//! let mut manager = OverlayManager::new(host, MemoryEnv::new());
//!
//! manager.activate("/home/me/.venvs/project")?;
//! // ... run code against the virtual environment ...
//! manager.deactivate();
//! # Ok::<(), venv_overlay::Error>(())
//! ```
//!
//! The state is meant to be driven by a single control thread; see
//! [`OverlayService`] for a mutex-guarded wrapper.

pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod overlay;
pub mod search_path;
pub mod service;
pub mod site;

pub use config::{ConfigApiVersion, OverlayConfig, ReentrancyPolicy};
pub use env::{EnvStore, MemoryEnv, ProcessEnv};
pub use error::{Error, Result};
pub use host::{InMemoryInterpreter, InterpreterHost, Prefixes};
pub use overlay::{ActivateOptions, OverlayManager, OverlayMode, OverlayStatus};
pub use search_path::parse_search_path;
pub use service::OverlayService;
pub use site::discover_site_dirs;

/// Variable marking the active virtual environment for external tools.
pub const VIRTUAL_ENV_VAR: &str = "VIRTUAL_ENV";

/// Executable search path variable.
pub const PATH_VAR: &str = "PATH";

/// Module search path variable read by child Python processes.
pub const PYTHONPATH_VAR: &str = "PYTHONPATH";

/// Sentinel search path entry injected by the editor host.
pub const DEFAULT_SPECIAL_PATH: &str = "_vim_path_";

/// Separator used by list-like environment variables on this platform.
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

/// Directory of a virtual environment holding its executables.
#[cfg(windows)]
pub const VENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const VENV_BIN_DIR: &str = "bin";
