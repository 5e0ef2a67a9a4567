//! Provide shared, pure vocabulary for the quipu bindings generator.
//!
//! This crate is intentionally small and dependency-light. It contains the fixed
//! string tables that the generator (and any future tooling around it) must agree
//! on: the target language's reserved-word set and the well-known identifiers
//! that appear in emitted bindings.
//!
//! ## Notes
//!
//! - This is a vocabulary crate: **no IO**, no global state, and no generator-specific types.

pub mod lang;
