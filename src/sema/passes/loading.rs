// src/sema/passes/loading.rs
//! Pass 2: load imported modules, depth-first.
//!
//! A module is registered on first import and marked in-progress while its
//! own passes run; re-entering an in-progress module is an import cycle.

use crate::errors::SemanticError;
use crate::frontend::Parser;
use crate::frontend::ast::ModuleAst;
use crate::module::loader::ModuleLoader;
use crate::sema::passes::analyse_module;
use crate::state::CompileState;
use std::path::Path;
use std::rc::Rc;

pub fn load_imports(state: &mut CompileState, qualified_name: &str) {
    let Ok(module) = state.module(qualified_name) else {
        return;
    };
    let imports = module.imports.clone();
    let source_path = module.source_path.clone();
    let loader = ModuleLoader::new(state.config.include.clone());

    for import in imports {
        let dependency = import.qualified_name();

        if state.has_module(&dependency) {
            if state.module(&dependency).unwrap().loading {
                state.error(
                    SemanticError::ImportCycle { name: dependency },
                    &source_path,
                    import.location,
                );
            }
            continue;
        }

        let Some(path) = loader.resolve(&dependency) else {
            state.error(
                SemanticError::UnknownModule { name: dependency },
                &source_path,
                import.location,
            );
            continue;
        };

        let source = match loader.read(&path) {
            Ok(source) => source,
            Err(error) => {
                state.error(
                    SemanticError::SourceReadFailed {
                        name: dependency,
                        error: error.to_string(),
                    },
                    &source_path,
                    import.location,
                );
                continue;
            }
        };

        let ast = parse_source(state, &source, &path);
        state.register_module(&dependency, path, Rc::new(ast));
        analyse_module(state, &dependency);
    }
}

/// Parse a module source, recording lexer and parser diagnostics. A failed
/// parse produces an empty body so later passes can keep going.
pub fn parse_source(state: &mut CompileState, source: &str, path: &Path) -> ModuleAst {
    let mut parser = Parser::new(source);
    let result = parser.parse_module();
    for (error, span) in parser.take_lexer_errors() {
        state.diagnostics.error(error, path, span);
    }
    match result {
        Ok(ast) => ast,
        Err(error) => {
            state.diagnostics.error(error.error, path, error.span);
            ModuleAst {
                body: Vec::new(),
                location: error.span,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::passes::imports;
    use crate::state::Config;
    use std::path::PathBuf;

    fn state_for(source: &str) -> CompileState {
        let mut state = CompileState::new(Config::default());
        let ast = parse_source(&mut state, source, Path::new("main.stoat"));
        state.register_module("main", PathBuf::from("main.stoat"), Rc::new(ast));
        state
    }

    #[test]
    fn missing_modules_are_reported_at_the_import_site() {
        let mut state = state_for("import std::missing");
        imports::collect(&mut state, "main");
        load_imports(&mut state, "main");

        assert!(state.diagnostics.has_errors());
        let diagnostic = state.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code.as_deref(), Some("E2001"));
        assert_eq!(diagnostic.path, PathBuf::from("main.stoat"));
    }

    #[test]
    fn reentering_a_loading_module_is_a_cycle() {
        let mut state = state_for("import main");
        state.module_mut("main").unwrap().loading = true;
        imports::collect(&mut state, "main");
        load_imports(&mut state, "main");

        let diagnostic = state.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code.as_deref(), Some("E2002"));
    }

    #[test]
    fn parse_failures_leave_an_empty_placeholder_body() {
        let mut state = CompileState::new(Config::default());
        let ast = parse_source(&mut state, "object {", Path::new("bad.stoat"));
        assert!(ast.body.is_empty());
        assert!(state.diagnostics.has_errors());
    }
}
