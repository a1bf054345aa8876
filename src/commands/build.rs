// src/commands/build.rs

use crate::cli::ModeArg;
use crate::commands::report_diagnostics;
use crate::compiler::compile_main;
use crate::state::Config;
use std::path::PathBuf;
use std::process::ExitCode;

/// Compile a file and its imports, leaving the result for the emitter.
pub fn build_file(
    file: &PathBuf,
    include: &[PathBuf],
    target: Option<PathBuf>,
    mode: ModeArg,
) -> ExitCode {
    let mut config = Config::new(mode.into());
    config.include = include.to_vec();
    if let Some(target) = target {
        config.target = target;
    }

    match compile_main(file, config) {
        Ok(result) => {
            report_diagnostics(&result.state);
            if result.is_success() {
                let modules = result.state.module_order.len();
                tracing::info!(modules, "compiled successfully");
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("{}: error: {}", file.display(), error);
            ExitCode::FAILURE
        }
    }
}
