//! Diagnostic types shared across the lowering and monomorphization passes.
//!
//! Recoverable problems are collected on a [`Diagnostics`] sink and lowering
//! continues with the fallback prescribed for that error kind. Internal
//! invariant violations are fatal and propagate as `Result::Err` up to the
//! pipeline driver instead.

use mlc_intern::Symbol;
use mlc_span::FileSpan;
use thiserror::Error;

/// Recoverable lowering errors: the four non-fatal error kinds.
#[derive(Debug, Error, Clone)]
pub enum LowerError {
    #[error("expression has no resolvable type")]
    IllTyped { span: FileSpan },

    #[error("unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: String, span: FileSpan },

    #[error("left-hand side of assignment is not a valid place")]
    IllFormedLvalue { span: FileSpan },

    #[error("could not infer type for generic parameter `{parameter}` of `{function}`")]
    UnresolvedGenericParameter { function: String, parameter: String, span: FileSpan },

    #[error("enum `{enum_name}` has duplicate tag {tag} on variants {variants:?}")]
    DuplicateEnumTag { enum_name: String, variants: Vec<String>, tag: i64, span: FileSpan },
}

/// Internal invariant violations. These abort the whole pipeline.
#[derive(Debug, Error, Clone)]
pub enum InternalError {
    #[error("COMPILER BUG: function `{function}` block {block} has no terminator")]
    MissingTerminator { function: String, block: usize },

    #[error("COMPILER BUG: function `{function}` block {block} jumps to nonexistent block {target}")]
    DanglingJumpTarget { function: String, block: usize, target: usize },

    #[error("COMPILER BUG: function `{function}` place has out-of-range projection: {detail}")]
    MalformedPlace { function: String, detail: String },

    #[error("COMPILER BUG: call to runtime symbol `{symbol}` has wrong arity: expected {expected}, got {got}")]
    RuntimeSymbolArity { symbol: String, expected: usize, got: usize },

    #[error("COMPILER BUG: function_ref `{name}` does not resolve to an emitted function, extern decl, or runtime symbol")]
    UnresolvedFunctionRef { name: String },

    #[error("COMPILER BUG: function `{function}` has an invalid virtual call: {detail}")]
    InvalidVirtualCall { function: String, detail: String },
}

/// Non-fatal warnings, e.g. an unrecognized builtin method name.
#[derive(Debug, Error, Clone)]
pub enum Warning {
    #[error("unrecognized builtin method `{method}` on `{receiver_type}`, leaving call unresolved")]
    UnrecognizedBuiltinMethod { receiver_type: String, method: String, span: FileSpan },

    #[error("match has no wildcard arm and no explicit default; using zero value for `{scrutinee_type}`")]
    MissingMatchDefault { scrutinee_type: String, span: FileSpan },
}

/// Severity of a collected diagnostic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One entry in the diagnostics sink.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: FileSpan,
    /// Function the diagnostic was raised while lowering, if any.
    pub function: Option<Symbol>,
}

/// Accumulates recoverable diagnostics across an entire lowering run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn report_error(&mut self, error: &LowerError, span: FileSpan, function: Option<Symbol>) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message: error.to_string(),
            span,
            function,
        });
    }

    pub fn report_warning(&mut self, warning: &Warning, span: FileSpan, function: Option<Symbol>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: warning.to_string(),
            span,
            function,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|entry| entry.severity == Severity::Error)
    }
}
