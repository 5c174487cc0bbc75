//! Compile-time diagnostics.

use thiserror::Error;

/// A fatal compile diagnostic: one message plus the 1-based source position
/// it was raised at. Rendered as `<message> : <row> <col>`, which is the
/// single-line form the CLI prints to stderr.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} : {row} {col}")]
pub struct CompileError {
    /// Human-readable description of the failure.
    pub message: String,
    /// 1-based source row.
    pub row: u32,
    /// 1-based source column.
    pub col: u32,
}

impl CompileError {
    /// Diagnostic at an explicit position.
    pub fn new(message: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            message: message.into(),
            row,
            col,
        }
    }

    /// Diagnostic with no meaningful position: an emitter-internal
    /// inconsistency rather than a fault in the source text.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_single_line_form() {
        let err = CompileError::new("Identifier is not defined.", 3, 14);
        assert_eq!(err.to_string(), "Identifier is not defined. : 3 14");
    }
}
