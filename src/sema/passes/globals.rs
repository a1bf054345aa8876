// src/sema/passes/globals.rs
//! Pass 3: register module globals.
//!
//! Every module starts with the built-in prototype globals and, unless it
//! is a bootstrap module, the `MODULE` global. Import symbols come next,
//! then a provisional global per top-level declaration. Inference later
//! replaces provisional entries with properly typed ones.

use crate::errors::SemanticError;
use crate::frontend::ast::{ImportSymbol, Node};
use crate::module::MODULE_GLOBAL;
use crate::sema::database::BUILTIN_GLOBALS;
use crate::sema::types::{ObjectType, TraitType, TypeId, TypeKind, TypeParameterType};
use crate::state::CompileState;

/// True for globals a glob import re-exports; the built-ins and the module
/// object are defined per module instead.
pub fn exported(name: &str) -> bool {
    name != MODULE_GLOBAL && !BUILTIN_GLOBALS.contains(&name)
}

pub fn define(state: &mut CompileState, qualified_name: &str) {
    let Ok(module) = state.module(qualified_name) else {
        return;
    };
    let ast = module.ast.clone();
    let globals = module.globals;
    let self_type = module.self_type;
    let define_module = module.define_module;
    let imports = module.imports.clone();
    let source_path = module.source_path.clone();

    for &name in BUILTIN_GLOBALS {
        if let Some(builtin) = state.types.builtin(name) {
            state.tables.get_mut(globals).define(name, builtin, false);
        }
    }
    if define_module {
        state
            .tables
            .get_mut(globals)
            .define(MODULE_GLOBAL, self_type, false);
    }

    for import in &imports {
        let dependency = import.qualified_name();
        let Ok(dependency_module) = state.module(&dependency) else {
            // Already diagnosed by the loading pass
            continue;
        };
        let dependency_globals = dependency_module.globals;
        let dependency_self = dependency_module.self_type;

        for symbol in &import.symbols {
            match symbol {
                ImportSymbol::SelfModule { alias, .. } => {
                    let name = alias.clone().unwrap_or_else(|| dependency.clone());
                    state
                        .tables
                        .get_mut(globals)
                        .define(name, dependency_self, false);
                }
                ImportSymbol::Glob { .. } => {
                    let exports: Vec<(String, TypeId)> = state
                        .tables
                        .get(dependency_globals)
                        .iter()
                        .filter(|symbol| exported(&symbol.name))
                        .map(|symbol| (symbol.name.clone(), symbol.value_type))
                        .collect();
                    for (name, value_type) in exports {
                        state.tables.get_mut(globals).define(name, value_type, false);
                    }
                }
                ImportSymbol::Named {
                    name,
                    alias,
                    location,
                } => {
                    let found = state.tables.get(dependency_globals).lookup(name);
                    if !found.any() {
                        state.error(
                            SemanticError::UndefinedImportSymbol {
                                name: dependency.clone(),
                                symbol: name.clone(),
                            },
                            &source_path,
                            *location,
                        );
                    }
                    let global_name = alias.clone().unwrap_or_else(|| name.clone());
                    state
                        .tables
                        .get_mut(globals)
                        .define(global_name, found.value_type, false);
                }
            }
        }
    }

    for node in &ast.body {
        match node {
            Node::DefineVariable(define) => {
                state
                    .tables
                    .get_mut(globals)
                    .define(&define.name, TypeId::DYNAMIC, define.mutable);
            }
            Node::MethodDef(method) => {
                state
                    .tables
                    .get_mut(globals)
                    .define(&method.name, TypeId::DYNAMIC, false);
                state
                    .types
                    .arena
                    .define_attribute(self_type, &method.name, TypeId::DYNAMIC);
            }
            Node::ObjectDef(object) => {
                let prototype = state.types.object;
                let mut object_type = ObjectType::new(&object.name, Some(prototype));
                for parameter in &object.type_parameters {
                    let parameter_type =
                        state
                            .types
                            .arena
                            .alloc(TypeKind::TypeParameter(TypeParameterType {
                                name: parameter.name.clone(),
                                required_traits: Vec::new(),
                            }));
                    object_type
                        .type_parameters
                        .define(&parameter.name, parameter_type);
                }
                let type_id = state.types.arena.alloc(TypeKind::Object(object_type));
                state
                    .tables
                    .get_mut(globals)
                    .define(&object.name, type_id, false);
                state
                    .types
                    .arena
                    .define_attribute(self_type, &object.name, type_id);
            }
            Node::TraitDef(trait_def) => {
                let prototype = state.types.trait_prototype;
                let mut trait_type = TraitType::new(&trait_def.name, Some(prototype));
                for parameter in &trait_def.type_parameters {
                    let parameter_type =
                        state
                            .types
                            .arena
                            .alloc(TypeKind::TypeParameter(TypeParameterType {
                                name: parameter.name.clone(),
                                required_traits: Vec::new(),
                            }));
                    trait_type
                        .type_parameters
                        .define(&parameter.name, parameter_type);
                }
                let type_id = state.types.arena.alloc(TypeKind::Trait(trait_type));
                state
                    .tables
                    .get_mut(globals)
                    .define(&trait_def.name, type_id, false);
                state
                    .types
                    .arena
                    .define_attribute(self_type, &trait_def.name, type_id);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;
    use crate::sema::passes::imports;
    use crate::state::Config;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn analysed(source: &str) -> CompileState {
        let mut state = CompileState::new(Config::default());
        let ast = Rc::new(Parser::new(source).parse_module().unwrap());
        state.register_module("main", PathBuf::from("main.stoat"), ast);
        imports::collect(&mut state, "main");
        define(&mut state, "main");
        state
    }

    #[test]
    fn builtins_and_module_are_always_defined() {
        let state = analysed("");
        let module = state.module("main").unwrap();
        let globals = state.tables.get(module.globals);

        assert!(globals.lookup("Integer").any());
        assert!(globals.lookup("Array").any());
        let module_global = globals.lookup(MODULE_GLOBAL);
        assert_eq!(module_global.value_type, module.self_type);
    }

    #[test]
    fn top_level_declarations_get_globals() {
        let state = analysed("let x = 10\ndef run {}\nobject Person {}\ntrait ToString {}");
        let module = state.module("main").unwrap();
        let globals = state.tables.get(module.globals);

        assert!(globals.lookup("x").any());
        assert!(globals.lookup("run").any());

        let person = globals.lookup("Person");
        assert!(state.types.arena.object(person.value_type).is_some());
        let to_string = globals.lookup("ToString");
        assert!(state.types.arena.trait_type(to_string.value_type).is_some());
    }

    #[test]
    fn object_type_parameters_are_declared() {
        let state = analysed("object Pair!(A, B) {}");
        let module = state.module("main").unwrap();
        let pair = state.tables.get(module.globals).lookup("Pair");
        let object = state.types.arena.object(pair.value_type).unwrap();
        let names: Vec<_> = object.type_parameters.names().cloned().collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn exported_filters_builtins_and_module() {
        assert!(exported("Person"));
        assert!(exported("run"));
        assert!(!exported("Integer"));
        assert!(!exported(MODULE_GLOBAL));
    }
}
