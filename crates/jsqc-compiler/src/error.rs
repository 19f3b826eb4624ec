//! Compilation errors.
//!
//! Two distinct failure modes live here: one that aborts compilation
//! (returned as `Err` from [`CompileError`] producers), and one that does
//! not — legal JavaScript that is statically known to always throw at
//! runtime is compiled successfully, emitting a `THROW_ERROR` opcode
//! carrying a [`RuntimeErrorKind`] instead of aborting.

use thiserror::Error;

/// Errors that abort compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The underlying parser rejected the source outright.
    #[error("parse error: {0}")]
    Parse(String),

    /// A syntax error detected during lowering, at a resolved location.
    #[error("syntax error at {location}: {message}")]
    Syntax {
        /// Error message.
        message: String,
        /// `line:column` source location.
        location: String,
    },

    /// A construct this engine does not lower.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An invariant the lowering engine relies on was violated; indicates a
    /// bug in this crate or a mismatch with the parser's AST shape.
    #[error("internal compiler error: {0}")]
    Internal(String),

    /// A function body declared more local slots than a `u16` can index.
    #[error("too many local variables (max 65535)")]
    TooManyLocals,

    /// A unit's constant pool grew past `u32::MAX` entries.
    #[error("too many constants (max 4294967295)")]
    TooManyConstants,

    /// An expression was used as an assignment target but is not one.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    /// An early (static semantics) error: valid grammar, ruled out by a
    /// static-semantics clause (e.g. a duplicate `let` binding in one scope).
    #[error("early error at {location}: {message}")]
    EarlyError {
        /// Error message.
        message: String,
        /// `line:column` source location.
        location: String,
    },

    /// Legacy (Annex B / sloppy-mode-only) syntax used under strict mode.
    #[error("legacy syntax not allowed in strict mode at {location}: {message}")]
    LegacySyntax {
        /// Error message.
        message: String,
        /// `line:column` source location.
        location: String,
    },

    /// A malformed literal: legacy octal under strict mode, an invalid
    /// regular expression, or an invalid template escape.
    #[error("invalid literal syntax at {location}: {message}")]
    InvalidLiteral {
        /// Error message.
        message: String,
        /// `line:column` source location.
        location: String,
    },
}

impl CompileError {
    /// Create a syntax error at a resolved location.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            location: format!("{line}:{column}"),
        }
    }

    /// Create an unsupported-construct error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported(feature.into())
    }

    /// Create an internal-invariant error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an early (static semantics) error.
    pub fn early_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::EarlyError {
            message: message.into(),
            location: format!("{line}:{column}"),
        }
    }

    /// Create a legacy-syntax-under-strict-mode error.
    pub fn legacy_syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::LegacySyntax {
            message: message.into(),
            location: format!("{line}:{column}"),
        }
    }

    /// Create an invalid-literal error.
    pub fn invalid_literal(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::InvalidLiteral {
            message: message.into(),
            location: format!("{line}:{column}"),
        }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The kind of error a `THROW_ERROR` opcode synthesizes at runtime.
///
/// Unlike [`CompileError`], producing one of these never aborts
/// compilation: the surrounding position is valid JavaScript that provably
/// always throws (e.g. a labeled `continue` whose target turns out not to
/// be a loop, or a `super()` call reachable from a derived constructor that
/// cannot statically resolve its base). The compiler emits `THROW_ERROR`
/// carrying this tag plus a message atom rather than stopping compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// `ReferenceError`.
    ReferenceError,
    /// `SyntaxError`.
    SyntaxError,
    /// `TypeError`.
    TypeError,
}

impl RuntimeErrorKind {
    /// The one-byte tag `THROW_ERROR` carries as its trailing operand.
    pub const fn tag(self) -> u8 {
        match self {
            RuntimeErrorKind::ReferenceError => 0,
            RuntimeErrorKind::SyntaxError => 1,
            RuntimeErrorKind::TypeError => 2,
        }
    }
}
