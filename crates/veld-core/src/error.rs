//! Compilation error types.
//!
//! Two classes of failure (and nothing in between):
//!
//! - **User-facing semantic faults** carry the offending span and abort
//!   the current method, not the whole run.
//! - [`CompileError::Internal`] marks an operator/type-kind combination
//!   outside the closed set the core handles. It signals a bug in an
//!   earlier phase, never user error, and is not meant to be recovered.

use thiserror::Error;

use crate::span::Span;

/// A semantic fault that aborts compilation of the current method.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// No candidate survived applicability filtering.
    #[error("no eligible overload for '{name}' at {span}")]
    NoMatchingOverload { name: String, span: Span },

    /// More than one applicable candidate with no best match.
    #[error("ambiguous call to '{name}' at {span}")]
    AmbiguousOverload { name: String, span: Span },

    /// A method group matched more than one member of a delegate shape.
    #[error("ambiguous member '{name}' for invocable type at {span}")]
    AmbiguousMember { name: String, span: Span },

    #[error("break statement is not inside a loop or switch at {span}")]
    BreakOutsideLoop { span: Span },

    #[error("continue statement is not inside a loop at {span}")]
    ContinueOutsideLoop { span: Span },

    #[error("unresolved label '{label}' at {span}")]
    UnresolvedLabel { label: String, span: Span },

    /// `goto case`/`goto default` found no matching section.
    #[error("no matching case for goto at {span}")]
    UnresolvedCase { span: Span },

    /// Two case labels normalize to the same constant.
    #[error("duplicate case label {label} at {span}")]
    DuplicateCase { label: String, span: Span },

    #[error("not all code paths return a value at {span}")]
    MissingReturn { span: Span },

    /// A non-empty switch section whose end point is reachable.
    #[error("control cannot fall through to the next case section at {span}")]
    CaseFallthrough { span: Span },

    /// A handle named a type the catalog does not know.
    #[error("unknown type '{name}' at {span}")]
    UnknownType { name: String, span: Span },

    /// Invariant violation inside the core. Log and abort; never caught.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompileError {
    /// The source location of the fault, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::NoMatchingOverload { span, .. }
            | CompileError::AmbiguousOverload { span, .. }
            | CompileError::AmbiguousMember { span, .. }
            | CompileError::BreakOutsideLoop { span }
            | CompileError::ContinueOutsideLoop { span }
            | CompileError::UnresolvedLabel { span, .. }
            | CompileError::UnresolvedCase { span }
            | CompileError::DuplicateCase { span, .. }
            | CompileError::MissingReturn { span }
            | CompileError::CaseFallthrough { span }
            | CompileError::UnknownType { span, .. } => Some(*span),
            CompileError::Internal { .. } => None,
        }
    }

    /// Build an internal fault with context.
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_exposed() {
        let e = CompileError::BreakOutsideLoop {
            span: Span::new(4, 2, 5),
        };
        assert_eq!(e.span(), Some(Span::new(4, 2, 5)));
        assert_eq!(CompileError::internal("boom").span(), None);
    }

    #[test]
    fn display_names_the_fault() {
        let e = CompileError::NoMatchingOverload {
            name: "f".into(),
            span: Span::new(1, 1, 1),
        };
        assert!(e.to_string().contains("no eligible overload"));
    }
}
