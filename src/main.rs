//! MUN Connect entry point
//!
//! Parses arguments, dispatches to the CLI and exits non-zero on failure.
//! All logic lives in the CLI module.

use munconnect::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
