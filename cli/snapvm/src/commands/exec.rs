//! `snapvm exec`: one command on an arbitrary host.

use anyhow::{bail, Result};
use clap::Args;
use snapvm_remote::{CommandResult, CommandRunner};

use crate::output::{print_json, OutputFormat};

use super::CommandContext;

/// Run a command on any host over SSH.
#[derive(Debug, Args)]
pub struct ExecCommand {
    /// Target host name or address.
    #[arg(long)]
    host: String,

    /// Command to run; joined with spaces and passed to the remote shell.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

impl ExecCommand {
    pub fn run(self, ctx: CommandContext) -> Result<i32> {
        let command = self.command.join(" ");
        if command.trim().is_empty() {
            bail!("No command given");
        }

        let result = ctx.runner().run(&self.host, &command)?;
        print_result(&result, ctx.format);
        Ok(result.return_code)
    }
}

/// Echo a command's output the way a local shell would, or as JSON.
pub fn print_result(result: &CommandResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            for line in &result.stdout {
                println!("{line}");
            }
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
        }
    }
}
