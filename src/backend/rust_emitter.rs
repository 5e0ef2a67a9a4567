//! Rust code emitter - builds generated source code strings
//!
//! This module provides the buffer all emission code writes through. It keeps
//! exactly two pieces of state: the current indentation level and a monotonic
//! counter for temporary-variable names.

/// A buffer for building Rust source code with proper indentation.
#[derive(Debug, Default)]
pub struct RustEmitter {
    buffer: String,
    indent_level: usize,
    /// Counter backing [`RustEmitter::tmp`]; monotonic per generated file.
    tmp_count: usize,
}

const INDENT_STR: &str = "    "; // 4 spaces for Rust

impl RustEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the generated code.
    pub fn finish(self) -> String {
        self.buffer
    }

    /// Get current buffer as string slice.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Write a line with current indentation.
    pub fn line(&mut self, s: &str) {
        self.write_indent();
        self.buffer.push_str(s);
        self.buffer.push('\n');
    }

    /// Write text without indentation or newline.
    pub fn write(&mut self, s: &str) {
        self.buffer.push_str(s);
    }

    /// Write a blank line.
    pub fn blank_line(&mut self) {
        self.buffer.push('\n');
    }

    /// Write indentation only.
    pub fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.buffer.push_str(INDENT_STR);
        }
    }

    /// Increase indent level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indent level.
    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Write a `/// text` doc comment line.
    pub fn doc_comment(&mut self, text: &str) {
        self.line(&format!("/// {}", text));
    }

    /// Return a fresh temporary-variable name with the given prefix.
    ///
    /// The counter is shared across all prefixes so every temporary in a
    /// generated file is distinct.
    pub fn tmp(&mut self, prefix: &str) -> String {
        let name = format!("{}{}", prefix, self.tmp_count);
        self.tmp_count += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_lines() {
        let mut e = RustEmitter::new();
        e.line("fn main() {");
        e.indent();
        e.line("let x = 1;");
        e.dedent();
        e.line("}");
        assert_eq!(e.finish(), "fn main() {\n    let x = 1;\n}\n");
    }

    #[test]
    fn test_tmp_counter_is_monotonic_across_prefixes() {
        let mut e = RustEmitter::new();
        assert_eq!(e.tmp("list_elem_"), "list_elem_0");
        assert_eq!(e.tmp("map_key_"), "map_key_1");
        assert_eq!(e.tmp("map_val_"), "map_val_2");
        assert_eq!(e.tmp("list_elem_"), "list_elem_3");
    }

    #[test]
    fn test_dedent_saturates_at_zero() {
        let mut e = RustEmitter::new();
        e.dedent();
        e.line("x");
        assert_eq!(e.as_str(), "x\n");
    }
}
