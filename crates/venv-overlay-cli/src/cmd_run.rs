// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `venv-overlay run` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;
use venv_overlay::{ActivateOptions, InMemoryInterpreter, OverlayConfig, OverlayManager, ProcessEnv};

/// Run a command inside an environment
#[derive(Debug, Args)]
pub struct CmdRun {
    /// Root of the virtual environment
    root: PathBuf,

    /// Do not export new search path entries through PYTHONPATH
    #[clap(long)]
    no_pythonpath: bool,

    /// Command to run
    #[clap(last = true, required = true)]
    command: Vec<String>,
}

impl CmdRun {
    pub async fn run(&mut self, config: &OverlayConfig) -> Result<i32> {
        let root = crate::resolve_root(&self.root)?;

        let Some((program, args)) = self.command.split_first() else {
            return Err(miette::miette!("No command given"));
        };

        let host = InMemoryInterpreter::default().with_special_path(config.special_path.clone());
        let mut manager = OverlayManager::with_config(host, ProcessEnv::new(), config);

        let mut options = ActivateOptions::from(config);
        if self.no_pythonpath {
            options.update_pythonpath = false;
        }
        manager.activate_with(&root, &options)?;

        tracing::info!("Running {program} in {}", root.display());
        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await;

        // Restore before reporting, whether or not the command started.
        manager.deactivate();

        let status =
            status.map_err(|e| miette::miette!("Failed to execute command '{program}': {e}"))?;
        tracing::debug!(?status, "command finished");
        Ok(status.code().unwrap_or(1))
    }
}
