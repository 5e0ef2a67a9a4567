//! Define error types for IDL → Rust emission.
//!
//! These errors represent fatal emission failures; any of them aborts the run
//! for the current program. Prefer actionable messages: users should know what
//! IDL construct is unsupported.

use thiserror::Error;

/// Error raised while emitting a program.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The IDL declares a constant the generator cannot express.
    #[error("cannot generate const `{name}` of type {ty}")]
    UnsupportedConst { name: String, ty: String },

    /// A constant literal does not match its declared type.
    #[error("const `{name}` has a literal that does not fit type {ty}")]
    ConstValueMismatch { name: String, ty: String },

    /// A service-call result struct was built without the conventional suffix.
    #[error("result struct `{0}` is missing the `Result` suffix")]
    MissingResultSuffix(String),

    /// Unions with no fields may be valid IDL, but they are invalid Rust.
    #[error("cannot generate a rust enum for zero-field union `{0}`")]
    EmptyUnion(String),

    /// `void` appeared somewhere other than a function return type.
    #[error("cannot {0} for a void value")]
    Void(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
