//! waitlock - cross-process advisory locking for shell pipelines and scripts
//!
//! A thin CLI over `waitlock-core`'s slot engine: acquire, check, list,
//! done, and exec modes backed by a shared lock directory.

use clap::error::ErrorKind;
use clap::Parser;

mod commands;
mod cpu;
mod env;
mod format;

use commands::Cli;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::DisplayVersion => 0,
                _ => 3,
            };
            std::process::exit(code);
        }
    };

    match cli.execute() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("waitlock: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
