//! Sitepipe - command-line static site asset builder and dev server

use std::process::ExitCode;

use sitepipe::cli;

fn main() -> ExitCode {
    cli::run()
}
