//! Property-based tests for the quipu generator
//!
//! These tests use proptest to verify invariants across many randomly
//! generated identifiers, catching edge cases that hand-written tests might
//! miss. Every Rust identifier the generator emits is produced by the
//! mangler, so these invariants cover the whole emitted surface.

use proptest::prelude::*;
use quipu::backend::mangle::Mangler;

fn ident_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,24}"
}

proptest! {
    /// Property: snake case output never contains uppercase letters or
    /// runs of underscores.
    #[test]
    fn snake_output_is_flat(name in ident_strategy()) {
        let m = Mangler::default();
        let out = m.snake(&name);
        prop_assert!(!out.chars().any(|c| c.is_ascii_uppercase()));
        prop_assert!(!out.contains("__"));
    }

    /// Property: snake casing is idempotent (snake(snake(x)) == snake(x)).
    #[test]
    fn snake_is_idempotent(name in ident_strategy()) {
        let m = Mangler::default();
        let once = m.snake(&name);
        prop_assert_eq!(m.snake(&once), once);
    }

    /// Property: camel case output contains no underscores.
    #[test]
    fn camel_removes_underscores(name in ident_strategy()) {
        let m = Mangler::default();
        prop_assert!(!m.camel(&name).contains('_'));
    }

    /// Property: upper case output contains no lowercase letters.
    #[test]
    fn upper_output_is_uppercase(name in ident_strategy()) {
        let m = Mangler::default();
        prop_assert!(!m.upper(&name).chars().any(|c| c.is_ascii_lowercase()));
    }

    /// Property: safe names are never reserved words.
    #[test]
    fn safe_output_is_never_reserved(name in ident_strategy()) {
        let m = Mangler::default();
        prop_assert!(!m.is_reserved(&m.safe(&name)));
    }

    /// Property: emitted field and struct names are never reserved words.
    #[test]
    fn mangled_names_are_never_reserved(name in ident_strategy()) {
        let m = Mangler::default();
        prop_assert!(!m.is_reserved(&m.field_name(&name)));
        prop_assert!(!m.is_reserved(&m.struct_name(&name)));
    }

    /// Property: every field id maps to a valid identifier tail, negatives
    /// included.
    #[test]
    fn safe_field_id_is_identifier_safe(id in any::<i32>()) {
        let m = Mangler::default();
        let out = m.safe_field_id(id);
        prop_assert!(!out.is_empty());
        prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric()));
        if id < 0 {
            prop_assert!(out.starts_with("neg"));
        } else {
            prop_assert_eq!(out.parse::<i64>().ok(), Some(id as i64));
        }
    }

    /// Property: distinct field ids never collide after mangling.
    #[test]
    fn safe_field_ids_are_injective(a in any::<i32>(), b in any::<i32>()) {
        let m = Mangler::default();
        if a != b {
            prop_assert_ne!(m.safe_field_id(a), m.safe_field_id(b));
        }
    }
}
