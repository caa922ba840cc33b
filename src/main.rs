use clap::Parser;
use trademo::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
