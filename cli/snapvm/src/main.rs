//! snapvm - disposable test-client VMs on a snap-guest provisioning server.
//!
//! Every VM the CLI creates is destroyed before it exits, including when a
//! bootstrap step or the command fails or the user hits Ctrl+C.

use clap::Parser;

mod commands;
mod error;
mod logging;
mod output;

use commands::Cli;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match cli.run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error::print_error(&e);
            std::process::exit(1);
        }
    }
}
