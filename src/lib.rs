//! quipu — generate synchronous Rust client/server bindings from a
//! Thrift-style IDL tree.
//!
//! The generator consumes a validated, in-memory [`model::Program`] (types,
//! constants, structs, unions, exceptions, services) and produces one Rust
//! source file per program containing data definitions, wire codecs against
//! the `quipu_rt` protocol traits, a synchronous RPC client, and a synchronous
//! processor.
//!
//! Parsing IDL text and the runtime library referenced by emitted code are
//! external collaborators; this crate is only the emission engine.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quipu::{Generator, GeneratorOptions};
//!
//! let generator = Generator::new(GeneratorOptions::default().out_dir("src/gen"));
//! generator.generate(&program)?;
//! ```

pub mod backend;
pub mod model;

pub use backend::{EmitError, Generator, GeneratorOptions, PlannedFile};
