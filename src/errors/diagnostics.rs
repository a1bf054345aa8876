// src/errors/diagnostics.rs
//! Accumulated per-compile diagnostics.
//!
//! Every pass appends to one `Diagnostics` list instead of aborting, so a
//! single run surfaces as many problems as possible. The driver checks
//! `has_errors` between passes and stops emission once an error exists.

use crate::frontend::Span;
use std::fmt;
use std::path::{Path, PathBuf};

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single recorded diagnostic tied to a source location
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable code such as "E2003", if the source error carried one
    pub code: Option<String>,
    pub message: String,
    pub path: PathBuf,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.path.display(),
            self.span.line,
            self.span.column,
            self.severity,
            self.message
        )
    }
}

/// Append-only diagnostic collection shared by all passes
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, error: impl miette::Diagnostic + fmt::Display, path: &Path, span: Span) {
        self.push(Severity::Error, error, path, span);
    }

    pub fn warn(&mut self, error: impl miette::Diagnostic + fmt::Display, path: &Path, span: Span) {
        self.push(Severity::Warning, error, path, span);
    }

    fn push(
        &mut self,
        severity: Severity,
        error: impl miette::Diagnostic + fmt::Display,
        path: &Path,
        span: Span,
    ) {
        let code = error.code().map(|c| c.to_string());
        tracing::debug!(?severity, ?code, %error, "diagnostic");
        self.entries.push(Diagnostic {
            severity,
            code,
            message: error.to_string(),
            path: path.to_path_buf(),
            span,
        });
    }

    /// True iff at least one error-severity entry exists.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SemanticError;
    use std::path::Path;

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());

        diagnostics.warn(
            SemanticError::UnusedImport {
                name: "std::fs".to_string(),
            },
            Path::new("a.stoat"),
            Span::new(1, 1),
        );
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);

        diagnostics.error(
            SemanticError::UnknownModule {
                name: "std::missing".to_string(),
            },
            Path::new("a.stoat"),
            Span::new(2, 1),
        );
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn display_matches_wrapper_format() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(
            SemanticError::UnknownModule {
                name: "std::missing".to_string(),
            },
            Path::new("src/a.stoat"),
            Span::new(3, 7),
        );
        let rendered = diagnostics.iter().next().unwrap().to_string();
        assert_eq!(
            rendered,
            "src/a.stoat:3:7: error: the module 'std::missing' could not be found"
        );
    }
}
