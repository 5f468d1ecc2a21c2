//! Error types for the wiki engine.
//!
//! Compile-time errors ([`CompileError`]) are never fatal: the driver records
//! them as diagnostics and emits a literal fallback. Registration errors
//! ([`PrototypeError`]) happen at startup and are returned to the caller.

use crate::prototype::FunctionKind;

/// Recoverable error raised while compiling a single construct.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Function name has no registered prototype.
    #[error("Function {kind}{name} is not defined")]
    PrototypeNotDefined {
        /// Kind selected by the call sigil.
        kind: FunctionKind,
        /// Name as written in the source.
        name: String,
    },
    /// Arguments do not satisfy the prototype.
    #[error("Syntax error in call to {name}: {message}")]
    PrototypeSyntaxError {
        /// Function name.
        name: String,
        /// What went wrong (missing argument, bad integer, ...).
        message: String,
    },
    /// Lookup key (emoji shortcode, snippet name, ...) did not resolve.
    #[error("Unresolved {kind} reference: {key}")]
    UnresolvedReference {
        /// What kind of thing was looked up.
        kind: &'static str,
        /// The key as written.
        key: String,
    },
    /// Opening sequence found without a matching closer.
    #[error("Malformed {construct}: {message}")]
    MalformedConstruct {
        /// Construct name (e.g. "scoped function").
        construct: &'static str,
        /// Details.
        message: String,
    },
    /// Recursive compilation went deeper than the configured limit.
    #[error("Maximum nesting depth ({depth}) exceeded")]
    RecursionLimit {
        /// The configured limit.
        depth: usize,
    },
}

impl CompileError {
    pub(crate) fn syntax(name: &str, message: impl Into<String>) -> Self {
        Self::PrototypeSyntaxError {
            name: name.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(construct: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedConstruct {
            construct,
            message: message.into(),
        }
    }

    pub(crate) fn unresolved(kind: &'static str, key: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            key: key.into(),
        }
    }
}

/// Error returned when a prototype definition or registration is invalid.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PrototypeError {
    /// The definition string could not be parsed.
    #[error("Invalid prototype `{definition}`: {message}")]
    InvalidDefinition {
        /// The offending definition.
        definition: String,
        /// Why it was rejected.
        message: String,
    },
    /// A prototype with the same kind and name is already registered.
    #[error("Function {kind}{name} is already registered")]
    Duplicate {
        /// Function kind.
        kind: FunctionKind,
        /// Lowercased name.
        name: String,
    },
    /// The definition sigil does not match the handler kind.
    #[error("Prototype {name} declares {found} but was registered as {expected}")]
    KindMismatch {
        /// Function name.
        name: String,
        /// Kind of the handler being registered.
        expected: FunctionKind,
        /// Kind declared by the definition sigil.
        found: FunctionKind,
    },
}

impl PrototypeError {
    pub(crate) fn invalid(definition: &str, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            definition: definition.to_owned(),
            message: message.into(),
        }
    }
}

/// Error reported by a [`MetricsSink`](crate::MetricsSink).
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// I/O error writing statistics.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other sink failure.
    #[error("{0}")]
    Other(String),
}
