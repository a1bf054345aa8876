// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("the module '{name}' could not be found")]
    #[diagnostic(code(E2001), help("check the include directories passed to the compiler"))]
    UnknownModule { name: String },

    #[error("the import of '{name}' completes an import cycle")]
    #[diagnostic(code(E2002))]
    ImportCycle { name: String },

    #[error("the receiver of type '{receiver}' does not respond to '{message}'")]
    #[diagnostic(code(E2003))]
    UndefinedMethod { receiver: String, message: String },

    #[error("'{message}' expects {expected} arguments, but {found} were given")]
    #[diagnostic(code(E2004))]
    ArityMismatch {
        message: String,
        expected: String,
        found: usize,
    },

    #[error("'{message}' does not define the keyword argument '{keyword}'")]
    #[diagnostic(code(E2005))]
    UnknownKeyword { message: String, keyword: String },

    #[error("expected a value of type '{expected}', found '{found}'")]
    #[diagnostic(code(E2006))]
    TypeMismatch { expected: String, found: String },

    #[error("'{object}' does not implement '{method}', required by trait '{trait_name}'")]
    #[diagnostic(code(E2007))]
    MissingImplementation {
        object: String,
        trait_name: String,
        method: String,
    },

    #[error("the constant '{name}' is undefined")]
    #[diagnostic(code(E2008))]
    UndefinedConstant { name: String },

    #[error("the import '{name}' is never used")]
    #[diagnostic(code(E2009))]
    UnusedImport { name: String },

    #[error("'{name}' does not export the symbol '{symbol}'")]
    #[diagnostic(code(E2010))]
    UndefinedImportSymbol { name: String, symbol: String },

    #[error("the source of module '{name}' could not be read: {error}")]
    #[diagnostic(code(E2011))]
    SourceReadFailed { name: String, error: String },
}
