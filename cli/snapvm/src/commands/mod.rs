//! CLI commands.

mod config;
mod distros;
mod exec;
mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use snapvm_remote::SshRunner;
use snapvm_vm::Settings;

use crate::output::OutputFormat;

/// snapvm - disposable test-client VMs on a snap-guest provisioning server.
#[derive(Debug, Parser)]
#[command(name = "snapvm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML). Defaults to settings.toml in the user config directory.
    #[arg(long, global = true, env = "SNAPVM_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List supported distros and their base images.
    Distros,

    /// Show effective settings after file and environment overrides.
    Config,

    /// Run a command on any host over SSH.
    Exec(exec::ExecCommand),

    /// Create a VM, bootstrap it, run a command on it, destroy it.
    Run(run::RunCommand),
}

impl Cli {
    /// Run the CLI command and return the process exit code.
    pub fn run(self) -> Result<i32> {
        let format = OutputFormat::parse(&self.format);

        let settings = Settings::load(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("Failed to load settings from {}", path.display()),
            None => "Failed to load settings".to_string(),
        })?;

        let ctx = CommandContext { settings, format };

        match self.command {
            Commands::Distros => distros::run(ctx),
            Commands::Config => config::run(ctx),
            Commands::Exec(cmd) => cmd.run(ctx),
            Commands::Run(cmd) => cmd.run(ctx),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub settings: Settings,
    pub format: OutputFormat,
}

impl CommandContext {
    /// SSH runner configured from the [ssh] settings.
    pub fn runner(&self) -> SshRunner {
        SshRunner::new(self.settings.ssh.clone())
    }
}
