// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `venv-overlay session` command.
//!
//! Reads one overlay command per line from stdin and applies it to a single
//! long-lived overlay service, the way an editor's command layer would:
//!
//! ```text
//! activate ROOT [--no-pythonpath]
//! sync PREFIX EXEC_PREFIX ['/path', ...]
//! deactivate
//! status
//! quit
//! ```

use std::path::PathBuf;

use clap::Args;
use miette::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use venv_overlay::{
    ActivateOptions,
    MemoryEnv,
    OverlayConfig,
    OverlayManager,
    OverlayService,
    ProcessEnv,
};

#[cfg(test)]
#[path = "./cmd_session_test.rs"]
mod cmd_session_test;

/// Read overlay commands from stdin
#[derive(Debug, Args)]
pub struct CmdSession {
    /// Interpreter state before activation
    #[clap(flatten)]
    host: crate::HostFlags,

    /// Output format for status: table, yaml, json
    #[clap(long, default_value = "table")]
    format: String,
}

/// A single parsed session line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Activate {
        root: PathBuf,
        update_pythonpath: bool,
    },
    Sync {
        prefix: String,
        exec_prefix: String,
        search_path: String,
    },
    Deactivate,
    Status,
    Quit,
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "activate" => {
            // The flag may lead or trail; everything else is the root,
            // spaces included.
            let (root, update_pythonpath) = match rest.strip_prefix("--no-pythonpath") {
                Some(after) if after.is_empty() || after.starts_with(char::is_whitespace) => {
                    (after.trim(), false)
                }
                _ => match rest.strip_suffix("--no-pythonpath") {
                    Some(before) if before.ends_with(char::is_whitespace) => (before.trim(), false),
                    _ => (rest, true),
                },
            };
            if root.is_empty() {
                return Err(miette::miette!("Usage: activate ROOT [--no-pythonpath]"));
            }
            SessionCommand::Activate {
                root: PathBuf::from(root),
                update_pythonpath,
            }
        }
        "sync" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(prefix), Some(exec_prefix), Some(search_path)) if !prefix.is_empty() => {
                    SessionCommand::Sync {
                        prefix: prefix.to_string(),
                        exec_prefix: exec_prefix.to_string(),
                        search_path: search_path.trim().to_string(),
                    }
                }
                _ => return Err(miette::miette!("Usage: sync PREFIX EXEC_PREFIX LIST")),
            }
        }
        "deactivate" => SessionCommand::Deactivate,
        "status" => SessionCommand::Status,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(miette::miette!("Unknown command '{other}'")),
    };
    Ok(Some(command))
}

impl CmdSession {
    pub async fn run(&mut self, config: &OverlayConfig) -> Result<i32> {
        let env = MemoryEnv::capture(&ProcessEnv::new(), crate::cmd_show::OVERLAY_VARS)?;
        let manager = OverlayManager::with_config(self.host.interpreter(config), env, config);
        let service = OverlayService::new(manager);
        let defaults = ActivateOptions::from(config);

        let mut failures = 0;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| miette::miette!("Failed to read stdin: {e}"))?
        {
            let outcome = match parse_line(&line) {
                Ok(Some(SessionCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(&service, &defaults, command),
                Ok(None) => continue,
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                failures += 1;
                eprintln!("{err:?}");
            }
        }

        // Leave the process the way we found it.
        service.deactivate();
        Ok(if failures == 0 { 0 } else { 1 })
    }

    fn execute(
        &self,
        service: &OverlayService<venv_overlay::InMemoryInterpreter, MemoryEnv>,
        defaults: &ActivateOptions,
        command: SessionCommand,
    ) -> Result<()> {
        match command {
            SessionCommand::Activate {
                root,
                update_pythonpath,
            } => {
                let root = crate::resolve_root(&root)?;
                let options = ActivateOptions {
                    update_pythonpath: defaults.update_pythonpath && update_pythonpath,
                };
                service.activate(root, &options)?;
            }
            SessionCommand::Sync {
                prefix,
                exec_prefix,
                search_path,
            } => service.externally_synchronize(&search_path, &prefix, &exec_prefix)?,
            SessionCommand::Deactivate => service.deactivate(),
            SessionCommand::Status => {
                let manager = service.lock();
                let report =
                    crate::cmd_show::render_report(&manager.status(), manager.env(), &self.format)?;
                print!("{report}");
            }
            SessionCommand::Quit => {}
        }
        Ok(())
    }
}
