//! Identifier mangling for generated Rust.
//!
//! Every string-shape decision lives here; emission code defers to
//! [`Mangler`]. Wire-visible names are never mangled — these transforms apply
//! only to the Rust identifiers in the generated file.

use std::collections::HashSet;

use quipu_core::lang::rust_keywords::RUST_KEYWORDS;

/// Mangles IDL identifiers into valid Rust identifiers.
///
/// Constructed with the reserved-word set of the target language; the default
/// set is [`quipu_core::lang::rust_keywords::RUST_KEYWORDS`].
#[derive(Debug, Clone)]
pub struct Mangler {
    reserved: HashSet<String>,
}

impl Default for Mangler {
    fn default() -> Self {
        Mangler {
            reserved: RUST_KEYWORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl Mangler {
    /// Build a mangler around an explicit reserved-word set.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Mangler {
            reserved: reserved.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is reserved in the target language.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Append a trailing `_` iff `name` is reserved.
    pub fn safe(&self, name: &str) -> String {
        if self.is_reserved(name) {
            format!("{}_", name)
        } else {
            name.to_string()
        }
    }

    /// Snake-case a name: decapitalize, insert underscores before capitals,
    /// collapse runs of `_`.
    pub fn snake(&self, name: &str) -> String {
        collapse_underscores(&underscore(name))
    }

    /// Camel-case a name: capitalize segments, remove underscores.
    pub fn camel(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut capitalize_next = true;
        for ch in name.chars() {
            if ch == '_' {
                capitalize_next = true;
            } else if capitalize_next {
                out.push(ch.to_ascii_uppercase());
                capitalize_next = false;
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Uppercase a name with underscore segmentation. Names that are already
    /// fully uppercase pass through untouched.
    pub fn upper(&self, name: &str) -> String {
        if !name.chars().any(|c| c.is_ascii_lowercase()) {
            return name.to_string();
        }
        collapse_underscores(&underscore(name)).to_ascii_uppercase()
    }

    /// Variant name for a generated enum.
    pub fn enum_variant_name(&self, name: &str) -> String {
        self.upper(name)
    }

    /// Rust name for a struct, union, exception or enum type.
    pub fn struct_name(&self, name: &str) -> String {
        self.safe(&self.camel(name))
    }

    /// Rust name for a struct field, parameter or function.
    pub fn field_name(&self, name: &str) -> String {
        self.safe(&self.snake(name))
    }

    /// Rust name for a union variant.
    pub fn union_variant_name(&self, name: &str) -> String {
        self.safe(&self.camel(name))
    }

    /// Rust name for a constant.
    pub fn const_name(&self, name: &str) -> String {
        self.upper(name)
    }

    /// Identifier tail for a field id. Negative and zero ids are legal in the
    /// IDL, so negatives are spelled `neg<abs>`.
    pub fn safe_field_id(&self, id: i32) -> String {
        if id >= 0 {
            id.to_string()
        } else {
            format!("neg{}", id.unsigned_abs())
        }
    }
}

/// Decapitalize and insert `_` before every capital letter.
fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Collapse runs of `_` down to a single `_`.
fn collapse_underscores(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for ch in name.chars() {
        if ch == '_' {
            if !last_was_underscore {
                out.push(ch);
            }
            last_was_underscore = true;
        } else {
            out.push(ch);
            last_was_underscore = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        let m = Mangler::default();
        assert_eq!(m.snake("MyStruct"), "my_struct");
        assert_eq!(m.snake("already_snake"), "already_snake");
        assert_eq!(m.snake("Mixed_Case"), "mixed_case");
        assert_eq!(m.snake("double__under"), "double_under");
        assert_eq!(m.snake("triple___under"), "triple_under");
    }

    #[test]
    fn test_camel_case() {
        let m = Mangler::default();
        assert_eq!(m.camel("my_struct"), "MyStruct");
        assert_eq!(m.camel("myStruct"), "MyStruct");
        assert_eq!(m.camel("add"), "Add");
        assert_eq!(m.camel("add_args"), "AddArgs");
    }

    #[test]
    fn test_upper_case() {
        let m = Mangler::default();
        assert_eq!(m.upper("FooBar"), "FOO_BAR");
        assert_eq!(m.upper("foo_bar"), "FOO_BAR");
        assert_eq!(m.upper("version2"), "VERSION2");
        // already-uppercase names pass through, underscores and all
        assert_eq!(m.upper("MAX__VALUE"), "MAX__VALUE");
    }

    #[test]
    fn test_reserved_word_suffixing() {
        let m = Mangler::default();
        assert_eq!(m.safe("type"), "type_");
        assert_eq!(m.safe("self"), "self_");
        assert_eq!(m.safe("point"), "point");
        assert_eq!(m.field_name("Type"), "type_");
        assert_eq!(m.struct_name("self"), "Self_");
    }

    #[test]
    fn test_safe_field_id() {
        let m = Mangler::default();
        assert_eq!(m.safe_field_id(0), "0");
        assert_eq!(m.safe_field_id(42), "42");
        assert_eq!(m.safe_field_id(-1), "neg1");
        assert_eq!(m.safe_field_id(i32::MIN), "neg2147483648");
    }

    #[test]
    fn test_custom_reserved_set() {
        let m = Mangler::new(["banana"]);
        assert_eq!(m.safe("banana"), "banana_");
        assert_eq!(m.safe("type"), "type");
    }
}
