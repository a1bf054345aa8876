// src/sema/passes/mod.rs
//! The semantic passes, run in declared order per module:
//!
//! 1. import collection
//! 2. module loading (recursive, depth-first)
//! 3. global definition
//! 4. type inference and name resolution
//! 5. trait requirement checking
//!
//! Passes record diagnostics and keep going; unresolved names become
//! Nil/Dynamic placeholders so one run surfaces many problems.

pub mod globals;
pub mod imports;
pub mod infer;
pub mod loading;
pub mod traits;

use crate::state::CompileState;

/// Run passes 1-5 on a module and, depth-first, on everything it imports.
/// Modules land in `state.module_order` after their dependencies, giving
/// the TIR generator its dependency-first order.
pub fn analyse_module(state: &mut CompileState, qualified_name: &str) {
    tracing::debug!(module = qualified_name, "analysing module");

    if let Ok(module) = state.module_mut(qualified_name) {
        module.loading = true;
    }

    imports::collect(state, qualified_name);
    loading::load_imports(state, qualified_name);
    globals::define(state, qualified_name);
    infer::run(state, qualified_name);
    traits::check(state, qualified_name);

    if let Ok(module) = state.module_mut(qualified_name) {
        module.loading = false;
    }
    state.module_order.push(qualified_name.to_string());
}
