// src/compiler.rs
//! The compile driver: parse the main module, run the semantic passes
//! transitively, then generate TIR for every module in dependency order.
//! Emission stops before TIR when any pass produced an error.

use crate::sema::passes::{self, loading};
use crate::state::{CompileState, Config};
use crate::tir::Generator;
use std::path::Path;
use std::rc::Rc;

/// The qualified name the entry module is registered under
pub const MAIN_MODULE: &str = "main";

#[derive(Debug)]
pub struct CompileResult {
    pub state: CompileState,
    /// Qualified name of the compiled entry module
    pub main: String,
}

impl CompileResult {
    /// True when the compile produced no error diagnostics and every
    /// module has a generated body.
    pub fn is_success(&self) -> bool {
        !self.state.diagnostics.has_errors()
    }
}

/// Compile the module at `path` and everything it imports.
pub fn compile_main(path: &Path, config: Config) -> std::io::Result<CompileResult> {
    let mut state = CompileState::new(config);
    state.config.create_directories()?;

    tracing::debug!(path = %path.display(), "compiling main module");
    let source = std::fs::read_to_string(path)?;
    let ast = loading::parse_source(&mut state, &source, path);
    state.register_module(MAIN_MODULE, path.to_path_buf(), Rc::new(ast));
    passes::analyse_module(&mut state, MAIN_MODULE);

    if !state.diagnostics.has_errors() {
        let order = state.module_order.clone();
        for qualified_name in &order {
            Generator::run(&mut state, qualified_name);
            if state.diagnostics.has_errors() {
                break;
            }
        }
    }

    Ok(CompileResult {
        state,
        main: MAIN_MODULE.to_string(),
    })
}

/// Compile source text directly, without touching the filesystem for the
/// main module. Imports still resolve through the configured include
/// directories.
pub fn compile_source(source: &str, path: &Path, config: Config) -> CompileResult {
    let mut state = CompileState::new(config);
    let ast = loading::parse_source(&mut state, source, path);
    state.register_module(MAIN_MODULE, path.to_path_buf(), Rc::new(ast));
    passes::analyse_module(&mut state, MAIN_MODULE);

    if !state.diagnostics.has_errors() {
        let order = state.module_order.clone();
        for qualified_name in &order {
            Generator::run(&mut state, qualified_name);
            if state.diagnostics.has_errors() {
                break;
            }
        }
    }

    CompileResult {
        state,
        main: MAIN_MODULE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compile(source: &str) -> CompileResult {
        compile_source(source, &PathBuf::from("main.stoat"), Config::default())
    }

    #[test]
    fn a_clean_compile_produces_a_body_and_no_diagnostics() {
        let result = compile("def main { 1 + 2 }");
        assert!(result.is_success());
        let module = result.state.module(MAIN_MODULE).unwrap();
        assert!(module.body.is_some());
    }

    #[test]
    fn errors_stop_tir_generation() {
        let result = compile("10.launch");
        assert!(!result.is_success());
        let module = result.state.module(MAIN_MODULE).unwrap();
        assert!(module.body.is_none());
    }

    #[test]
    fn the_main_module_is_last_in_dependency_order() {
        let result = compile("1");
        assert_eq!(result.state.module_order.last().map(String::as_str), Some("main"));
    }
}
