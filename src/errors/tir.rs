// src/errors/tir.rs
//! TIR generation errors (E3xxx).
//!
//! Unlike the semantic passes, the generator stops lowering the current
//! module on the first of these: instructions emitted after an invalid
//! lookup could not be trusted by the emitter.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum GeneratorError {
    #[error("the global '{name}' is undefined")]
    #[diagnostic(code(E3001))]
    UndefinedGlobal { name: String },

    #[error("'{name}' is not a known intrinsic")]
    #[diagnostic(code(E3002), help("intrinsic names map 1:1 onto VM opcodes"))]
    UnknownIntrinsic { name: String },
}
