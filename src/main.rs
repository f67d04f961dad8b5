#![forbid(unsafe_code)]

//! mpe, the metric profile editor CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("mpe: {e}");
        std::process::exit(e.exit_code());
    }
}
