// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The overlay manager: snapshot, apply and restore.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env::join_list;
use crate::search_path::{ensure_entry, introduced_entries, move_new_entries_first};
use crate::{
    EnvStore, Error, InterpreterHost, OverlayConfig, PATH_VAR, PYTHONPATH_VAR, Prefixes,
    ReentrancyPolicy, Result, VENV_BIN_DIR, VIRTUAL_ENV_VAR,
};

#[cfg(test)]
#[path = "./overlay_test.rs"]
mod overlay_test;

/// Which kind of overlay, if any, is currently applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Nothing is applied.
    Inactive,
    /// Applied by [`OverlayManager::activate`]; variables are owned too.
    Internal,
    /// Mirrored by [`OverlayManager::externally_synchronize`].
    External,
}

impl std::fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Internal => "internal",
            Self::External => "external",
        };
        f.write_str(name)
    }
}

/// Options for a single activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOptions {
    /// Export the search path entries added by the environment through
    /// `PYTHONPATH`, ahead of its previous value.
    pub update_pythonpath: bool,
}

impl Default for ActivateOptions {
    fn default() -> Self {
        Self {
            update_pythonpath: true,
        }
    }
}

impl From<&OverlayConfig> for ActivateOptions {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            update_pythonpath: config.update_pythonpath,
        }
    }
}

/// Observable state of the manager and its interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayStatus {
    pub mode: OverlayMode,
    /// Root of an internally activated environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub prefixes: Prefixes,
    pub search_path: Vec<String>,
}

#[derive(Debug, Clone)]
struct InterpreterSnapshot {
    search_path: Vec<String>,
    prefixes: Prefixes,
    real_prefix: Option<String>,
}

impl InterpreterSnapshot {
    fn capture<H: InterpreterHost>(host: &H) -> Self {
        Self {
            search_path: host.search_path(),
            prefixes: host.prefixes(),
            real_prefix: host.real_prefix(),
        }
    }

    fn restore<H: InterpreterHost>(self, host: &mut H) {
        host.set_search_path(self.search_path);
        host.set_prefixes(self.prefixes);
        host.set_real_prefix(self.real_prefix);
    }
}

/// Variables as read before an internal activation. `None` means unset.
#[derive(Debug, Clone)]
struct VariableSnapshot {
    path: Option<String>,
    pythonpath: Option<String>,
    virtual_env: Option<String>,
}

impl VariableSnapshot {
    fn capture<E: EnvStore>(env: &E) -> Result<Self> {
        Ok(Self {
            path: env.get(PATH_VAR)?,
            pythonpath: env.get(PYTHONPATH_VAR)?,
            virtual_env: env.get(VIRTUAL_ENV_VAR)?,
        })
    }

    /// Undo an overlay. The marker is removed whatever it was before.
    fn restore<E: EnvStore>(self, env: &mut E) {
        env.restore(PATH_VAR, self.path.as_deref());
        env.restore(PYTHONPATH_VAR, self.pythonpath.as_deref());
        env.remove(VIRTUAL_ENV_VAR);
    }

    /// Undo a partially applied activation exactly.
    fn roll_back<E: EnvStore>(self, env: &mut E) {
        let virtual_env = self.virtual_env.clone();
        self.restore(env);
        env.restore(VIRTUAL_ENV_VAR, virtual_env.as_deref());
    }
}

#[derive(Debug)]
enum OverlayState {
    Inactive,
    Internal {
        root: PathBuf,
        interpreter: InterpreterSnapshot,
        variables: VariableSnapshot,
    },
    External {
        interpreter: InterpreterSnapshot,
    },
}

/// Applies a virtual environment overlay to an interpreter and undoes it.
///
/// The manager owns the interpreter host and the variable store it mutates.
/// Every mutating operation takes `&mut self`, so a restoration can never
/// interleave with other use of the same manager. Sharing one manager
/// between threads requires an external lock, see [`crate::OverlayService`].
#[derive(Debug)]
pub struct OverlayManager<H, E> {
    host: H,
    env: E,
    reentrancy: ReentrancyPolicy,
    defaults: ActivateOptions,
    state: OverlayState,
}

impl<H: InterpreterHost, E: EnvStore> OverlayManager<H, E> {
    /// Create an inactive manager with default settings.
    pub fn new(host: H, env: E) -> Self {
        Self {
            host,
            env,
            reentrancy: ReentrancyPolicy::default(),
            defaults: ActivateOptions::default(),
            state: OverlayState::Inactive,
        }
    }

    /// Create an inactive manager using the given configuration.
    pub fn with_config(host: H, env: E, config: &OverlayConfig) -> Self {
        Self {
            reentrancy: config.reentrancy,
            defaults: ActivateOptions::from(config),
            ..Self::new(host, env)
        }
    }

    pub fn with_reentrancy(mut self, policy: ReentrancyPolicy) -> Self {
        self.reentrancy = policy;
        self
    }

    pub fn mode(&self) -> OverlayMode {
        match self.state {
            OverlayState::Inactive => OverlayMode::Inactive,
            OverlayState::Internal { .. } => OverlayMode::Internal,
            OverlayState::External { .. } => OverlayMode::External,
        }
    }

    pub fn is_active(&self) -> bool {
        self.mode() != OverlayMode::Inactive
    }

    /// Root of the internally activated environment, if any.
    pub fn active_root(&self) -> Option<&Path> {
        match &self.state {
            OverlayState::Internal { root, .. } => Some(root),
            _ => None,
        }
    }

    pub fn reentrancy(&self) -> ReentrancyPolicy {
        self.reentrancy
    }

    pub fn status(&self) -> OverlayStatus {
        OverlayStatus {
            mode: self.mode(),
            root: self.active_root().map(Path::to_path_buf),
            prefixes: self.host.prefixes(),
            search_path: self.host.search_path(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Give back the host and variable store, leaving any overlay applied.
    pub fn into_parts(self) -> (H, E) {
        (self.host, self.env)
    }

    /// Activate the virtual environment at `root` with the default options.
    pub fn activate<P: AsRef<Path>>(&mut self, root: P) -> Result<()> {
        let options = self.defaults.clone();
        self.activate_with(root, &options)
    }

    /// Activate the virtual environment at `root`.
    ///
    /// Sets `VIRTUAL_ENV`, puts the environment's executables first on
    /// `PATH`, registers its site-packages directories with the interpreter
    /// and points the installation prefixes at `root`. The entries the
    /// environment adds come first on the search path, followed by the
    /// previous entries. `root` is not validated.
    ///
    /// A root that is not valid unicode is refused before anything is
    /// applied. If a later step fails, everything applied so far is rolled
    /// back before the error is returned.
    pub fn activate_with<P: AsRef<Path>>(
        &mut self,
        root: P,
        options: &ActivateOptions,
    ) -> Result<()> {
        let root = root.as_ref();
        let root_str = root
            .to_str()
            .ok_or_else(|| Error::NonUnicodePath(root.to_path_buf()))?
            .to_string();
        self.make_room()?;

        let interpreter = InterpreterSnapshot::capture(&self.host);
        let variables = VariableSnapshot::capture(&self.env)?;
        tracing::debug!(
            entries = interpreter.search_path.len(),
            prefix = %interpreter.prefixes.prefix,
            "captured interpreter state"
        );

        // Record the overlay before touching anything, so that a host
        // panicking halfway leaves a state `deactivate` can still undo.
        self.state = OverlayState::Internal {
            root: root.to_path_buf(),
            interpreter: interpreter.clone(),
            variables: variables.clone(),
        };

        if let Err(err) = self.apply(root, &root_str, options, &interpreter, &variables) {
            tracing::warn!(root = %root.display(), "activation failed, rolling back");
            self.state = OverlayState::Inactive;
            interpreter.restore(&mut self.host);
            variables.roll_back(&mut self.env);
            return Err(err);
        }

        tracing::info!(root = %root.display(), "activated virtual environment");
        Ok(())
    }

    fn apply(
        &mut self,
        root: &Path,
        root_str: &str,
        options: &ActivateOptions,
        interpreter: &InterpreterSnapshot,
        variables: &VariableSnapshot,
    ) -> Result<()> {
        self.env.set(VIRTUAL_ENV_VAR, root_str);

        // Both parts are unicode, so displaying the join is lossless.
        let bin_dir = Path::new(root_str).join(VENV_BIN_DIR).display().to_string();
        let path = match variables.path.as_deref() {
            Some(previous) if !previous.is_empty() => join_list([bin_dir.as_str(), previous]),
            _ => bin_dir,
        };
        self.env.set(PATH_VAR, &path);

        for site_dir in crate::site::discover_site_dirs(root)? {
            tracing::debug!(dir = %site_dir.display(), "registering site directory");
            self.host.add_site_dir(&site_dir)?;
        }

        let reordered =
            move_new_entries_first(self.host.search_path(), interpreter.search_path.len());
        let introduced = introduced_entries(&interpreter.search_path, &reordered);
        self.host.set_search_path(reordered);

        self.host.set_prefixes(Prefixes::uniform(root_str));
        self.host
            .set_real_prefix(Some(interpreter.prefixes.prefix.clone()));

        // Site registration only appends, so the entries it introduced are
        // the whole difference between the two search paths.
        if options.update_pythonpath && !introduced.is_empty() {
            let previous = variables.pythonpath.as_deref().filter(|v| !v.is_empty());
            let value = join_list(introduced.iter().map(String::as_str).chain(previous));
            self.env.set(PYTHONPATH_VAR, &value);
        }

        Ok(())
    }

    /// Mirror a virtual environment that an external process activated.
    ///
    /// The search path is replaced by `search_path`, with the host's
    /// special entry appended if missing, and the prefixes are set. No
    /// variable is touched, now or on deactivation.
    pub fn externally_synchronize<P, X>(
        &mut self,
        search_path: Vec<String>,
        prefix: P,
        exec_prefix: X,
    ) -> Result<()>
    where
        P: Into<String>,
        X: Into<String>,
    {
        self.make_room()?;

        let interpreter = InterpreterSnapshot::capture(&self.host);

        let mut entries = search_path;
        ensure_entry(&mut entries, self.host.special_path());
        self.host.set_search_path(entries);

        let prefixes = Prefixes::new(prefix, exec_prefix);
        tracing::info!(prefix = %prefixes.prefix, "synchronized with external virtual environment");
        self.host.set_prefixes(prefixes);
        self.host
            .set_real_prefix(Some(interpreter.prefixes.prefix.clone()));

        self.state = OverlayState::External { interpreter };
        Ok(())
    }

    /// Like [`Self::externally_synchronize`], taking the search path in its
    /// textual list form. See [`crate::parse_search_path`].
    pub fn externally_synchronize_str<P, X>(
        &mut self,
        search_path: &str,
        prefix: P,
        exec_prefix: X,
    ) -> Result<()>
    where
        P: Into<String>,
        X: Into<String>,
    {
        let entries = crate::parse_search_path(search_path)?;
        self.externally_synchronize(entries, prefix, exec_prefix)
    }

    /// Undo the current overlay. Does nothing when none is applied.
    ///
    /// Search path and prefixes are always restored. Variables are only
    /// restored for an internal activation: `PATH` and `PYTHONPATH` get
    /// their saved values back (or are removed if they were unset) and
    /// `VIRTUAL_ENV` is removed.
    pub fn deactivate(&mut self) {
        match std::mem::replace(&mut self.state, OverlayState::Inactive) {
            OverlayState::Inactive => {
                tracing::debug!("no active overlay to deactivate");
            }
            OverlayState::External { interpreter } => {
                interpreter.restore(&mut self.host);
                tracing::info!("deactivated external virtual environment");
            }
            OverlayState::Internal {
                root,
                interpreter,
                variables,
            } => {
                interpreter.restore(&mut self.host);
                variables.restore(&mut self.env);
                tracing::info!(root = %root.display(), "deactivated virtual environment");
            }
        }
    }

    /// Apply the reentrancy policy before a new overlay.
    fn make_room(&mut self) -> Result<()> {
        let mode = self.mode();
        if mode == OverlayMode::Inactive {
            return Ok(());
        }
        match self.reentrancy {
            ReentrancyPolicy::Reject => Err(Error::AlreadyActive { mode }),
            ReentrancyPolicy::Replace => {
                tracing::debug!(%mode, "replacing active overlay");
                self.deactivate();
                Ok(())
            }
        }
    }
}
