//! Diagnostics sink.
//!
//! Errors are fatal for the current method; warnings are advisory.
//! Rendering beyond `Display` is someone else's job. Probing operations
//! (speculative resolution during inference) simply do not hold a sink,
//! so nothing they try ever surfaces here.

use thiserror::Error;

use crate::error::CompileError;
use crate::span::Span;

/// An advisory finding that does not stop compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("unreachable code at {span}")]
    UnreachableCode { span: Span },

    /// Declared, never written, never read.
    #[error("variable '{name}' is never used ({span})")]
    UnusedVariable { name: String, span: Span },

    /// Read on some visited path before any write.
    #[error("variable '{name}' is used before it is assigned ({span})")]
    UseBeforeAssignment { name: String, span: Span },

    /// Assigned but its value is never read.
    #[error("variable '{name}' is assigned but its value is never used ({span})")]
    AssignedNeverRead { name: String, span: Span },
}

/// Collecting sink for one compilation run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fatal fault for the current method.
    pub fn report_error(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    /// Record an advisory finding.
    pub fn report_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of errors recorded so far; used to detect whether a pass
    /// added any.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
