// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `venv-overlay show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;
use venv_overlay::{
    ActivateOptions, EnvStore, MemoryEnv, OverlayConfig, OverlayManager, OverlayStatus, PATH_VAR,
    PYTHONPATH_VAR, ProcessEnv, VIRTUAL_ENV_VAR,
};

#[cfg(test)]
#[path = "./cmd_show_test.rs"]
mod cmd_show_test;

/// Variables an overlay may change.
pub const OVERLAY_VARS: &[&str] = &[VIRTUAL_ENV_VAR, PATH_VAR, PYTHONPATH_VAR];

/// Preview the overlay an environment would apply
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Root of the virtual environment
    root: PathBuf,

    /// Do not export new search path entries through PYTHONPATH
    #[clap(long)]
    no_pythonpath: bool,

    /// Interpreter state before activation
    #[clap(flatten)]
    host: crate::HostFlags,

    /// Output format: table, yaml, json
    #[clap(long, default_value = "table")]
    format: String,
}

impl CmdShow {
    pub async fn run(&mut self, config: &OverlayConfig) -> Result<i32> {
        let root = crate::resolve_root(&self.root)?;

        // Work on a copy so the preview never touches this process.
        let env = MemoryEnv::capture(&ProcessEnv::new(), OVERLAY_VARS)?;
        let host = self.host.interpreter(config);
        let mut manager = OverlayManager::with_config(host, env.clone(), config);

        let mut options = ActivateOptions::from(config);
        if self.no_pythonpath {
            options.update_pythonpath = false;
        }

        manager.activate_with(&root, &options)?;
        let report = render_report(&manager.status(), manager.env(), &self.format)?;
        manager.deactivate();

        if manager.env() != &env {
            tracing::warn!("variables were not restored to their previous values");
        }

        print!("{report}");
        Ok(0)
    }
}

/// Render the overlay status and variables in the requested format.
pub fn render_report<E: EnvStore>(status: &OverlayStatus, env: &E, format: &str) -> Result<String> {
    let mut variables = serde_json::Map::new();
    for name in OVERLAY_VARS {
        let value = env.get(name)?;
        variables.insert(name.to_string(), serde_json::json!(value));
    }
    let value = serde_json::json!({
        "status": status,
        "variables": variables,
    });

    match format {
        "json" => serde_json::to_string_pretty(&value)
            .map(|s| s + "\n")
            .map_err(|e| miette::miette!("Failed to serialize report: {e}")),
        "yaml" => serde_yaml::to_string(&value)
            .map_err(|e| miette::miette!("Failed to serialize report: {e}")),
        "table" => render_table(status, env),
        other => Err(miette::miette!(
            "Unknown format '{other}', expected one of: table, yaml, json"
        )),
    }
}

fn render_table<E: EnvStore>(status: &OverlayStatus, env: &E) -> Result<String> {
    let mut variables = Vec::with_capacity(OVERLAY_VARS.len());
    for name in OVERLAY_VARS {
        variables.push((*name, env.get(name)?));
    }

    let mut out = String::new();
    write_table(&mut out, status, &variables)
        .map_err(|e| miette::miette!("Failed to render table: {e}"))?;
    Ok(out)
}

fn write_table(
    out: &mut String,
    status: &OverlayStatus,
    variables: &[(&str, Option<String>)],
) -> std::fmt::Result {
    use std::fmt::Write;

    writeln!(out, "{} {}", "Mode:".bold(), status.mode.to_string().green())?;
    if let Some(root) = &status.root {
        writeln!(out, "{} {}", "Root:".bold(), root.display())?;
    }
    writeln!(
        out,
        "{} {} (exec: {})",
        "Prefix:".bold(),
        status.prefixes.prefix,
        status.prefixes.exec_prefix
    )?;

    writeln!(out)?;
    writeln!(out, "{}", "Variables:".bold())?;
    for (name, value) in variables {
        match value {
            Some(value) => writeln!(out, "  {name}={value}")?,
            None => writeln!(out, "  {name} {}", "(unset)".dimmed())?,
        }
    }

    writeln!(out)?;
    writeln!(out, "{} ({}):", "Search path".bold(), status.search_path.len())?;
    for entry in &status.search_path {
        writeln!(out, "  - {}", entry.cyan())?;
    }
    Ok(())
}
