// src/commands/mod.rs
pub mod build;
pub mod check;
pub mod version;

use crate::state::CompileState;

/// Print accumulated diagnostics to standard error, in source order.
pub fn report_diagnostics(state: &CompileState) {
    for diagnostic in state.diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
}
