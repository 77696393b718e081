//! Rigatlas - layered frame art to packed sprite atlas with pivot and offset rigging data

use std::process::ExitCode;

use rigatlas::cli;

fn main() -> ExitCode {
    cli::run()
}
