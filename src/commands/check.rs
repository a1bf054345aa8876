// src/commands/check.rs

use crate::commands::report_diagnostics;
use crate::compiler::compile_main;
use crate::state::{Config, Mode};
use std::path::PathBuf;
use std::process::ExitCode;

/// Check files for errors without keeping any output.
pub fn check_files(files: &[PathBuf], include: &[PathBuf]) -> ExitCode {
    let mut failed = false;

    for file in files {
        let mut config = Config::new(Mode::Debug);
        config.include = include.to_vec();
        // Checking should not create build directories
        config.target = std::env::temp_dir().join("stoat-check");

        match compile_main(file, config) {
            Ok(result) => {
                report_diagnostics(&result.state);
                failed |= !result.is_success();
            }
            Err(error) => {
                eprintln!("{}: error: {}", file.display(), error);
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
