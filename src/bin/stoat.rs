// src/bin/stoat.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use stoat::cli::{Cli, Commands};
use stoat::commands::build::build_file;
use stoat::commands::check::check_files;
use stoat::commands::version::print_version;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { files, include } => check_files(&files, &include),
        Commands::Build {
            file,
            include,
            target,
            mode,
        } => build_file(&file, &include, target, mode),
        Commands::Version => print_version(),
    }
}
