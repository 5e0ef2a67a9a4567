//! Map IDL types onto Rust type strings and wire tags.
//!
//! Containers map to the ordered collections (`Vec`, `BTreeSet`, `BTreeMap`)
//! so that every generated type can derive `Hash` and `Ord`; doubles map to
//! `OrderedFloat<f64>` for the same reason.

use crate::backend::errors::EmitError;
use crate::model::{BaseType, IdlType};

use super::ProgramEmitter;

impl<'a> ProgramEmitter<'a> {
    /// The Rust type a value of `ty` has in generated code.
    pub(super) fn rust_type(&self, ty: &IdlType) -> String {
        match ty {
            IdlType::Base(base) => match base {
                BaseType::Void => "()".to_string(),
                BaseType::Bool => "bool".to_string(),
                BaseType::I8 => "i8".to_string(),
                BaseType::I16 => "i16".to_string(),
                BaseType::I32 => "i32".to_string(),
                BaseType::I64 => "i64".to_string(),
                BaseType::Double => "OrderedFloat<f64>".to_string(),
                BaseType::String => "String".to_string(),
                BaseType::Binary => "Vec<u8>".to_string(),
                BaseType::Uuid => "uuid::Uuid".to_string(),
            },
            IdlType::Typedef(td) => {
                let name = format!(
                    "{}{}",
                    self.type_namespace(&td.program),
                    self.mangler.safe(&td.symbolic)
                );
                if td.forward {
                    // heap indirection breaks the recursive type
                    format!("Box<{}>", name)
                } else {
                    name
                }
            }
            IdlType::Enum(r) | IdlType::Struct(r) => format!(
                "{}{}",
                self.type_namespace(&r.program),
                self.mangler.struct_name(&r.name)
            ),
            IdlType::List(elem) => format!("Vec<{}>", self.rust_type(elem)),
            IdlType::Set(elem) => format!("BTreeSet<{}>", self.rust_type(elem)),
            IdlType::Map(key, val) => {
                format!("BTreeMap<{}, {}>", self.rust_type(key), self.rust_type(val))
            }
        }
    }

    /// The Rust type used when `ty` appears in a `pub const` position.
    pub(super) fn rust_const_type(&self, ty: &IdlType) -> String {
        match ty.true_type() {
            IdlType::Base(BaseType::String) => "&str".to_string(),
            IdlType::Base(BaseType::Binary) => "&[u8]".to_string(),
            _ => self.rust_type(ty),
        }
    }

    /// The wire tag written before a field of `ty`.
    pub(super) fn wire_type(&self, ty: &IdlType) -> Result<&'static str, EmitError> {
        Ok(match ty {
            IdlType::Typedef(td) => return self.wire_type(&td.target),
            IdlType::Base(base) => match base {
                BaseType::Void => return Err(EmitError::Void("generate a wire type")),
                // both strings and binary are encoded as WireType::String
                BaseType::String | BaseType::Binary => "WireType::String",
                BaseType::Uuid => "WireType::Uuid",
                BaseType::Bool => "WireType::Bool",
                BaseType::I8 => "WireType::I08",
                BaseType::I16 => "WireType::I16",
                BaseType::I32 => "WireType::I32",
                BaseType::I64 => "WireType::I64",
                BaseType::Double => "WireType::Double",
            },
            IdlType::Enum(_) => "WireType::I32",
            IdlType::Struct(_) => "WireType::Struct",
            IdlType::Map(_, _) => "WireType::Map",
            IdlType::Set(_) => "WireType::Set",
            IdlType::List(_) => "WireType::List",
        })
    }

    /// The initializer for a read slot of an `OptInReqOut` field: a
    /// type-specific zero default, or `None` for types without one.
    pub(super) fn zero_default(&self, ty: &IdlType) -> Result<String, EmitError> {
        Ok(match ty {
            IdlType::Typedef(td) => return self.zero_default(&td.target),
            IdlType::Base(base) => match base {
                BaseType::Void => return Err(EmitError::Void("generate a zero default")),
                BaseType::String => "Some(\"\".to_owned())".to_string(),
                BaseType::Binary => "Some(Vec::new())".to_string(),
                BaseType::Uuid => "Some(uuid::Uuid::nil())".to_string(),
                BaseType::Bool => "Some(false)".to_string(),
                BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64 => {
                    "Some(0)".to_string()
                }
                BaseType::Double => "Some(OrderedFloat::from(0.0))".to_string(),
            },
            IdlType::Enum(_) | IdlType::Struct(_) => "None".to_string(),
            IdlType::List(_) => "Some(Vec::new())".to_string(),
            IdlType::Set(_) => "Some(BTreeSet::new())".to_string(),
            IdlType::Map(_, _) => "Some(BTreeMap::new())".to_string(),
        })
    }

    /// Whether a `pub const` can hold a value of `ty` directly.
    ///
    /// Doubles are excluded because `OrderedFloat::from` is not a const fn;
    /// UUIDs because they are parsed from text at runtime.
    pub(super) fn can_generate_simple_const(&self, ty: &IdlType) -> bool {
        matches!(
            ty.true_type(),
            IdlType::Base(
                BaseType::Bool
                    | BaseType::I8
                    | BaseType::I16
                    | BaseType::I32
                    | BaseType::I64
                    | BaseType::String
                    | BaseType::Binary
            )
        )
    }

    /// Whether `ty` must be emitted through a value-holder struct.
    pub(super) fn can_generate_const_holder(&self, ty: &IdlType) -> bool {
        !self.can_generate_simple_const(ty) && !ty.is_void()
    }

    /// Whether container iteration yields references that must be
    /// dereferenced before writing. Iteration is `for v in &values { … }`,
    /// and the protocol takes base scalars by value.
    pub(super) fn needs_deref_on_container_write(&self, ty: &IdlType) -> bool {
        ty.is_base() && !ty.is_string_like()
    }

    /// The exact expression used to write one container element, including
    /// any dereferences.
    pub(super) fn container_write_variable(&self, ty: &IdlType, base_var: &str) -> String {
        let needs_deref = self.needs_deref_on_container_write(ty);
        if ty.is_double() && needs_deref {
            // parenthesized so the .into() in the write call binds to the value
            format!("(*{})", base_var)
        } else if needs_deref {
            format!("*{}", base_var)
        } else {
            base_var.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mangle::Mangler;
    use crate::model::{Program, TypeRef, TypedefRef};

    fn emitter_fixture() -> (Program, Mangler) {
        (
            Program {
                name: "demo".to_string(),
                namespace: None,
                includes: vec![],
                declarations: vec![],
                services: vec![],
            },
            Mangler::default(),
        )
    }

    #[test]
    fn base_types_map_one_to_one() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        assert_eq!(e.rust_type(&IdlType::Base(BaseType::I64)), "i64");
        assert_eq!(e.rust_type(&IdlType::Base(BaseType::Binary)), "Vec<u8>");
        assert_eq!(
            e.rust_type(&IdlType::Base(BaseType::Double)),
            "OrderedFloat<f64>"
        );
        assert_eq!(
            e.rust_type(&IdlType::map(
                IdlType::Base(BaseType::String),
                IdlType::list(IdlType::Base(BaseType::I32)),
            )),
            "BTreeMap<String, Vec<i32>>"
        );
    }

    #[test]
    fn foreign_types_are_qualified() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        assert_eq!(
            e.rust_type(&IdlType::Struct(TypeRef::foreign("SharedTypes", "Blob"))),
            "shared_types::Blob"
        );
        assert_eq!(
            e.rust_type(&IdlType::Enum(TypeRef::foreign("demo", "Color"))),
            "Color"
        );
    }

    #[test]
    fn forward_typedefs_are_boxed() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        let forward = IdlType::Typedef(TypedefRef {
            symbolic: "Nodes".to_string(),
            program: None,
            target: Box::new(IdlType::list(IdlType::Struct(TypeRef::local("Node")))),
            forward: true,
        });
        assert_eq!(e.rust_type(&forward), "Box<Nodes>");
    }

    #[test]
    fn wire_type_merges_string_and_binary() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        assert_eq!(
            e.wire_type(&IdlType::Base(BaseType::String)).unwrap(),
            "WireType::String"
        );
        assert_eq!(
            e.wire_type(&IdlType::Base(BaseType::Binary)).unwrap(),
            "WireType::String"
        );
        assert_eq!(
            e.wire_type(&IdlType::Enum(TypeRef::local("Color"))).unwrap(),
            "WireType::I32"
        );
        assert!(e.wire_type(&IdlType::Base(BaseType::Void)).is_err());
    }

    #[test]
    fn zero_defaults_for_opt_in_req_out() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        assert_eq!(
            e.zero_default(&IdlType::Base(BaseType::I16)).unwrap(),
            "Some(0)"
        );
        assert_eq!(
            e.zero_default(&IdlType::Base(BaseType::Uuid)).unwrap(),
            "Some(uuid::Uuid::nil())"
        );
        assert_eq!(
            e.zero_default(&IdlType::Struct(TypeRef::local("S"))).unwrap(),
            "None"
        );
        assert_eq!(
            e.zero_default(&IdlType::set(IdlType::Base(BaseType::I32)))
                .unwrap(),
            "Some(BTreeSet::new())"
        );
    }

    #[test]
    fn container_write_variable_dereferences_scalars() {
        let (program, mangler) = emitter_fixture();
        let e = ProgramEmitter::new(&program, &mangler);
        assert_eq!(
            e.container_write_variable(&IdlType::Base(BaseType::I32), "e"),
            "*e"
        );
        assert_eq!(
            e.container_write_variable(&IdlType::Base(BaseType::Double), "e"),
            "(*e)"
        );
        assert_eq!(
            e.container_write_variable(&IdlType::Base(BaseType::String), "e"),
            "e"
        );
        assert_eq!(
            e.container_write_variable(&IdlType::Struct(TypeRef::local("S")), "e"),
            "e"
        );
    }
}
