//! Transpiler error types.
//!
//! Everything is reduced to values at the crate boundary: unsupported
//! constructs degrade to inline placeholders (they are not errors), and
//! hard parse failures plus internal panics surface as `TranspileError`.
//! The rendered message carries the `Transpile error:` prefix the host
//! shows next to the failing query block.

use thiserror::Error;

/// Hard transpilation failure
#[derive(Debug, Error)]
pub enum TranspileError {
    /// The parser hit a token it cannot make sense of
    #[error("Transpile error: unexpected {found} at token {position}")]
    UnexpectedToken { found: String, position: usize },

    /// Input ended in the middle of a construct (unbalanced bracket,
    /// unterminated block)
    #[error("Transpile error: unexpected end of input while parsing {context}")]
    UnexpectedEof { context: String },

    /// A literal never closed (the tokenizer keeps the raw text; the
    /// parser refuses it)
    #[error("Transpile error: unterminated {kind} literal")]
    UnterminatedLiteral { kind: &'static str },

    /// A panic escaped an internal stage and was caught at the boundary
    #[error("Transpile error: internal failure: {0}")]
    Internal(String),
}

impl TranspileError {
    pub fn unexpected(found: impl Into<String>, position: usize) -> Self {
        Self::UnexpectedToken {
            found: found.into(),
            position,
        }
    }

    pub fn eof(context: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            context: context.into(),
        }
    }

    /// True for failures caused by the input script rather than by the
    /// transpiler itself.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Specialized Result type for transpiler operations
pub type TranspileResult<T> = Result<T, TranspileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefix() {
        let err = TranspileError::unexpected("')'", 4);
        assert!(err.to_string().starts_with("Transpile error: "));

        let err = TranspileError::eof("block");
        assert_eq!(
            err.to_string(),
            "Transpile error: unexpected end of input while parsing block"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(TranspileError::eof("block").is_input_error());
        assert!(!TranspileError::Internal("boom".into()).is_input_error());
    }
}
