use clap::Parser;
use fxlab::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
