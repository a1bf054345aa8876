// src/errors/lexer.rs
//! Lexer errors (E0xxx).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexerError {
    #[error("unexpected character '{character}'")]
    #[diagnostic(code(E0001))]
    UnexpectedCharacter { character: char },

    #[error("unterminated string literal")]
    #[diagnostic(code(E0002), help("add a closing quote to terminate the string"))]
    UnterminatedString,

    #[error("invalid number literal '{literal}'")]
    #[diagnostic(code(E0003))]
    InvalidNumber { literal: String },
}
