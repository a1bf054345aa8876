// src/errors/parser.rs
//! Parser errors (E1xxx).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected {expected}, found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedToken { expected: String, found: String },

    #[error("expected an expression, found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedExpression { found: String },

    #[error("expected a constant name, found '{found}'")]
    #[diagnostic(code(E1003), help("constants start with an uppercase letter"))]
    ExpectedConstant { found: String },

    #[error("'{name}' is not valid in this position")]
    #[diagnostic(code(E1004))]
    InvalidTopLevel { name: String },

    #[error("a rest argument must be the last argument")]
    #[diagnostic(code(E1005))]
    RestArgumentNotLast,

    #[error("methods without a body are only valid inside a trait")]
    #[diagnostic(code(E1006))]
    RequiredMethodOutsideTrait,
}
