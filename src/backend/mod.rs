//! quipu generator backend
//!
//! This module turns a validated IDL tree into a single generated Rust source
//! file per program.
//!
//! ## Architecture
//!
//! The backend is a single-pass, depth-first walker:
//!
//! ```text
//! model::Program → ProgramEmitter (emit/*) → RustEmitter buffer → PlannedFile → disk
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quipu::{Generator, GeneratorOptions};
//!
//! let generator = Generator::new(GeneratorOptions::default().out_dir("gen"));
//! let written = generator.generate(&program)?;
//! ```

mod emit;
pub mod errors;
pub mod mangle;
pub mod rust_emitter;

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Program;
use emit::ProgramEmitter;
use mangle::Mangler;

pub use errors::EmitError;

/// Options controlling generation.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Directory the generated file is written into.
    pub out_dir: PathBuf,
    /// Reserved-word set of the target language; `None` uses the Rust set.
    pub reserved_words: Option<Vec<String>>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            out_dir: PathBuf::from("."),
            reserved_words: None,
        }
    }
}

impl GeneratorOptions {
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn reserved_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_words = Some(words.into_iter().map(Into::into).collect());
        self
    }
}

/// A generated file that has not yet been written to disk.
///
/// Separating "what to write" from "writing it" keeps emission pure and
/// testable; only [`Generator::generate`] touches the filesystem.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub content: String,
}

/// The bindings generator.
pub struct Generator {
    options: GeneratorOptions,
    mangler: Mangler,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Self {
        let mangler = match &options.reserved_words {
            Some(words) => Mangler::new(words.iter().cloned()),
            None => Mangler::default(),
        };
        Generator { options, mangler }
    }

    /// Emit `program` to an in-memory [`PlannedFile`] without touching disk.
    pub fn plan(&self, program: &Program) -> Result<PlannedFile, EmitError> {
        let content = ProgramEmitter::new(program, &self.mangler).emit()?;
        let file_name = format!("{}.rs", self.mangler.snake(&program.name));
        Ok(PlannedFile {
            path: self.options.out_dir.join(file_name),
            content,
        })
    }

    /// Emit `program` and write the result under the output directory.
    ///
    /// The file is only rewritten when its content actually changed, so
    /// downstream build tools see stable timestamps across no-op runs.
    pub fn generate(&self, program: &Program) -> Result<PathBuf, EmitError> {
        let planned = self.plan(program)?;
        fs::create_dir_all(&self.options.out_dir)?;
        if !is_unchanged(&planned.path, &planned.content) {
            fs::write(&planned.path, &planned.content)?;
            tracing::debug!(path = %planned.path.display(), "wrote generated bindings");
        } else {
            tracing::debug!(path = %planned.path.display(), "bindings unchanged, skipping write");
        }
        Ok(planned.path)
    }
}

fn is_unchanged(path: &Path, content: &str) -> bool {
    match fs::read_to_string(path) {
        Ok(existing) => existing == content,
        Err(_) => false,
    }
}
