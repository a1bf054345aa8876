// src/sema/passes/traits.rs
//! Pass 5: verify trait implementations.
//!
//! For every `impl Trait for Object`, each method the trait requires must
//! exist on the object with a compatible signature.

use crate::errors::SemanticError;
use crate::frontend::ast::{Node, TraitImpl};
use crate::state::CompileState;

pub fn check(state: &mut CompileState, qualified_name: &str) {
    let Ok(module) = state.module(qualified_name) else {
        return;
    };
    let ast = module.ast.clone();
    let globals = module.globals;
    let source_path = module.source_path.clone();

    let mut implementations = Vec::new();
    collect_implementations(&ast.body, &mut implementations);

    for implementation in implementations {
        let trait_symbol = state
            .tables
            .get(globals)
            .lookup(&implementation.trait_name);
        let object_symbol = state
            .tables
            .get(globals)
            .lookup(&implementation.object_name);
        if !trait_symbol.any() || !object_symbol.any() {
            // Unresolved names were diagnosed during inference
            continue;
        }

        let Some(trait_type) = state.types.arena.trait_type(trait_symbol.value_type) else {
            continue;
        };
        let required = trait_type.required_methods.clone();

        for method_name in required {
            let found = state
                .types
                .arena
                .lookup_method(object_symbol.value_type, &method_name);
            let compatible = found.any()
                && signatures_compatible(
                    state,
                    trait_symbol.value_type,
                    found.value_type,
                    &method_name,
                );
            if !compatible {
                state.error(
                    SemanticError::MissingImplementation {
                        object: implementation.object_name.clone(),
                        trait_name: implementation.trait_name.clone(),
                        method: method_name,
                    },
                    &source_path,
                    implementation.location,
                );
            }
        }
    }
}

fn signatures_compatible(
    state: &CompileState,
    trait_id: crate::sema::types::TypeId,
    found_block: crate::sema::types::TypeId,
    method_name: &str,
) -> bool {
    let arena = &state.types.arena;
    let required_symbol = arena.lookup_attribute(trait_id, method_name);
    let (Some(required), Some(found)) = (
        arena.block(required_symbol.value_type),
        arena.block(found_block),
    ) else {
        // Nothing to compare against; existence is enough
        return true;
    };

    required.caller_arguments().count() == found.caller_arguments().count()
        && arena.type_compatible(found.returns, required.returns)
}

fn collect_implementations<'ast>(body: &'ast [Node], found: &mut Vec<&'ast TraitImpl>) {
    for node in body {
        match node {
            Node::TraitImpl(implementation) => found.push(implementation),
            Node::ObjectDef(object) => collect_implementations(&object.body, found),
            Node::TraitDef(trait_def) => collect_implementations(&trait_def.body, found),
            Node::Reopen(reopen) => collect_implementations(&reopen.body, found),
            _ => {}
        }
    }
}
