// src/sema/passes/imports.rs
//! Pass 1: gather `import` nodes into the module, in source order.
//!
//! Every module outside the bootstrap set also receives implicit glob
//! imports of the bootstrap and prelude modules, prepended before its own
//! imports. The implicit imports only apply when the module is actually
//! resolvable, so bare programs compile without a standard library on the
//! search path.

use crate::frontend::ast::{Import, ImportSymbol, Node, NodeId};
use crate::module::loader::ModuleLoader;
use crate::state::CompileState;

/// The modules every other module implicitly glob-imports, in order.
pub const IMPLICIT_IMPORTS: &[&str] = &["std::bootstrap", "std::prelude"];

pub fn collect(state: &mut CompileState, qualified_name: &str) {
    let Ok(module) = state.module(qualified_name) else {
        return;
    };
    let ast = module.ast.clone();
    let location = ast.location;
    let implicit = module.define_module;

    let mut imports = Vec::new();

    if implicit {
        let loader = ModuleLoader::new(state.config.include.clone());
        for &name in IMPLICIT_IMPORTS {
            if name == qualified_name {
                continue;
            }
            if !state.has_module(name) && loader.resolve(name).is_none() {
                continue;
            }
            imports.push(Import {
                id: NodeId::default(),
                path: name.split("::").map(str::to_string).collect(),
                symbols: vec![ImportSymbol::Glob { location }],
                location,
            });
        }
    }

    for node in &ast.body {
        if let Node::Import(import) = node {
            let mut import = import.clone();
            // A bare `import a::b` binds the module under its short name
            if import.symbols.is_empty() {
                let alias = import.path.last().cloned();
                import.symbols.push(ImportSymbol::SelfModule {
                    alias,
                    location: import.location,
                });
            }
            imports.push(import);
        }
    }

    if let Ok(module) = state.module_mut(qualified_name) {
        module.imports = imports;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::ModuleAst;
    use crate::frontend::{Parser, Span};
    use crate::state::{CompileState, Config};
    use std::path::PathBuf;
    use std::rc::Rc;

    fn state_with(qualified_name: &str, source: &str) -> CompileState {
        let mut state = CompileState::new(Config::default());
        let ast = Rc::new(Parser::new(source).parse_module().unwrap());
        state.register_module(qualified_name, PathBuf::from("test.stoat"), ast);
        state
    }

    #[test]
    fn explicit_imports_are_collected_in_source_order() {
        let mut state = state_with("main", "import std::fs\nimport std::net::(self as net)");
        collect(&mut state, "main");

        let module = state.module("main").unwrap();
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.imports[0].qualified_name(), "std::fs");
        assert_eq!(module.imports[1].qualified_name(), "std::net");
    }

    #[test]
    fn bare_imports_become_self_symbols_with_short_aliases() {
        let mut state = state_with("main", "import std::fs");
        collect(&mut state, "main");

        let module = state.module("main").unwrap();
        assert!(matches!(
            &module.imports[0].symbols[0],
            ImportSymbol::SelfModule { alias: Some(alias), .. } if alias == "fs"
        ));
    }

    #[test]
    fn implicit_imports_are_skipped_without_a_standard_library() {
        let mut state = state_with("main", "1");
        collect(&mut state, "main");
        assert!(state.module("main").unwrap().imports.is_empty());
    }

    #[test]
    fn bootstrap_modules_get_no_implicit_imports() {
        let mut state = CompileState::new(Config::default());
        let ast = Rc::new(ModuleAst {
            body: Vec::new(),
            location: Span::default(),
        });
        state.register_module("std::bootstrap", PathBuf::from("bootstrap.stoat"), ast);
        // Even with the prelude loaded, bootstrap imports nothing
        let prelude = Rc::new(ModuleAst {
            body: Vec::new(),
            location: Span::default(),
        });
        state.register_module("std::prelude", PathBuf::from("prelude.stoat"), prelude);

        collect(&mut state, "std::bootstrap");
        assert!(state.module("std::bootstrap").unwrap().imports.is_empty());
    }

    #[test]
    fn loaded_prelude_is_implicitly_imported() {
        let mut state = state_with("main", "1");
        let prelude = Rc::new(ModuleAst {
            body: Vec::new(),
            location: Span::default(),
        });
        state.register_module("std::prelude", PathBuf::from("prelude.stoat"), prelude);

        collect(&mut state, "main");
        let module = state.module("main").unwrap();
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].qualified_name(), "std::prelude");
        assert!(matches!(
            module.imports[0].symbols[0],
            ImportSymbol::Glob { .. }
        ));
    }
}
