//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use agrisite_cli::CliError;

fn main() {
    pretty_env_logger::init();
    match agrisite_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("agrisite: {err}");
            std::process::exit(1);
        }
    }
}
