// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! venv-overlay - Virtual Environment Overlay Manager CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_run;
mod cmd_session;
mod cmd_show;

use cmd_run::CmdRun;
use cmd_session::CmdSession;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "venv-overlay",
    about = "Virtual Environment Overlay Manager",
    version,
    long_about = "Apply a Python virtual environment to an interpreter and restore it afterwards"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    /// Configuration file (default: $VENV_OVERLAY_CONFIG or the user config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Starting state of the in-memory interpreter.
#[derive(Parser, Clone, Debug)]
pub struct HostFlags {
    /// Interpreter search path entry before activation (repeatable)
    #[clap(long = "search-path", short = 's')]
    pub search_path: Vec<String>,

    /// Interpreter installation prefix before activation
    #[clap(long, default_value = "/usr")]
    pub prefix: String,
}

impl HostFlags {
    pub fn interpreter(
        &self,
        config: &venv_overlay::OverlayConfig,
    ) -> venv_overlay::InMemoryInterpreter {
        venv_overlay::InMemoryInterpreter::new(self.search_path.clone(), self.prefix.clone())
            .with_special_path(config.special_path.clone())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Preview the overlay an environment would apply
    Show(CmdShow),

    /// Run a command inside an environment
    Run(CmdRun),

    /// Read overlay commands from stdin
    Session(CmdSession),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        let config = venv_overlay::OverlayConfig::discover(self.config.as_deref())?;

        // Dispatch to command
        match self.cmd {
            Command::Show(mut cmd) => cmd.run(&config).await,
            Command::Run(mut cmd) => cmd.run(&config).await,
            Command::Session(mut cmd) => cmd.run(&config).await,
        }
    }
}

/// Canonicalize a virtual environment root given on the command line.
pub fn resolve_root(root: &std::path::Path) -> Result<PathBuf> {
    dunce::canonicalize(root)
        .map_err(|e| miette::miette!("Virtual environment not found at {}: {e}", root.display()))
}

// The process environment is mutated by `run`, so everything stays on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
