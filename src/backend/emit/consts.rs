//! Emit IDL constants.
//!
//! Scalars that Rust can hold in a `pub const` are emitted inline; anything
//! that needs allocation or runtime work (doubles, UUIDs, containers, enums)
//! is emitted as a holder struct with a zero-argument `const_value()`
//! producer. Struct and union constants are deliberately unsupported: the
//! producer body is `unimplemented!()`.

use crate::backend::errors::EmitError;
use crate::model::{BaseType, ConstDecl, ConstValue, IdlType};

use super::ProgramEmitter;

impl<'a> ProgramEmitter<'a> {
    pub(super) fn generate_const(&mut self, decl: &ConstDecl) -> Result<(), EmitError> {
        if self.can_generate_simple_const(&decl.ty) {
            self.render_const_decl(decl)
        } else if self.can_generate_const_holder(&decl.ty) {
            self.render_const_holder(decl)
        } else {
            Err(EmitError::UnsupportedConst {
                name: decl.name.clone(),
                ty: self.rust_type(&decl.ty),
            })
        }
    }

    fn render_const_decl(&mut self, decl: &ConstDecl) -> Result<(), EmitError> {
        self.render_rustdoc(&decl.doc);
        self.out.write(&format!(
            "pub const {}: {} = ",
            self.mangler.const_name(&decl.name),
            self.rust_const_type(&decl.ty)
        ));
        self.render_const_expr(&decl.name, &decl.ty, &decl.value, false, true)?;
        self.out.write(";\n");
        self.out.blank_line();
        Ok(())
    }

    fn render_const_holder(&mut self, decl: &ConstDecl) -> Result<(), EmitError> {
        let holder_name = format!("Const{}", self.mangler.camel(&decl.name));

        self.render_rustdoc(&decl.doc);
        self.out.line(&format!("pub struct {};", holder_name));
        self.out.line(&format!("impl {} {{", holder_name));
        self.out.indent();

        self.out.line(&format!(
            "pub fn const_value() -> {} {{",
            self.rust_type(&decl.ty)
        ));
        self.out.indent();
        self.render_const_expr(&decl.name, &decl.ty, &decl.value, true, false)?;
        self.out.dedent();
        self.out.line("}");

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    /// Render the right-hand side of a const definition.
    ///
    /// `is_owned` picks the owned rendering for strings/binary; `is_inline`
    /// means the caller has already positioned the cursor and will finish the
    /// line.
    fn render_const_expr(
        &mut self,
        const_name: &str,
        ty: &IdlType,
        value: &ConstValue,
        is_owned: bool,
        is_inline: bool,
    ) -> Result<(), EmitError> {
        if !is_inline {
            self.out.write_indent();
        }

        match ty {
            IdlType::Base(base) => self.render_base_const_expr(const_name, *base, value, is_owned)?,
            IdlType::Typedef(td) => {
                self.render_const_expr(const_name, td.target.true_type(), value, is_owned, true)?
            }
            IdlType::Enum(_) => {
                let int = self.const_int(const_name, ty, value)?;
                self.out.write("{\n");
                self.out.indent();
                self.out.write_indent();
                self.out
                    .write(&format!("{}::from({})\n", self.rust_type(ty), int));
                self.out.dedent();
                self.out.write_indent();
                self.out.write("}");
            }
            IdlType::Struct(_) => self.render_const_struct(),
            IdlType::List(elem) | IdlType::Set(elem) => {
                let ConstValue::List(values) = value else {
                    return Err(self.const_mismatch(const_name, ty));
                };
                let opener = if matches!(ty, IdlType::List(_)) {
                    "vec![\n"
                } else {
                    "BTreeSet::from([\n"
                };
                let closer = if matches!(ty, IdlType::List(_)) { "]" } else { "])" };
                self.out.write(opener);
                self.out.indent();
                for elem_value in values {
                    self.out.write_indent();
                    self.render_const_expr(const_name, elem, elem_value, true, true)?;
                    self.out.write(",\n");
                }
                self.out.dedent();
                self.out.write_indent();
                self.out.write(closer);
            }
            IdlType::Map(key_ty, val_ty) => {
                let ConstValue::Map(pairs) = value else {
                    return Err(self.const_mismatch(const_name, ty));
                };
                self.out.write("BTreeMap::from([\n");
                self.out.indent();
                for (key_value, val_value) in pairs {
                    self.out.write_indent();
                    self.out.write("(\n");
                    self.out.indent();
                    self.out.write_indent();
                    self.render_const_expr(const_name, key_ty, key_value, true, true)?;
                    self.out.write(",\n");
                    self.out.write_indent();
                    self.render_const_expr(const_name, val_ty, val_value, true, true)?;
                    self.out.write(",\n");
                    self.out.dedent();
                    self.out.write_indent();
                    self.out.write("),\n");
                }
                self.out.dedent();
                self.out.write_indent();
                self.out.write("])");
            }
        }

        if !is_inline {
            self.out.write("\n");
        }
        Ok(())
    }

    fn render_base_const_expr(
        &mut self,
        const_name: &str,
        base: BaseType,
        value: &ConstValue,
        is_owned: bool,
    ) -> Result<(), EmitError> {
        let ty = IdlType::Base(base);
        match base {
            BaseType::String => {
                let s = self.const_str(const_name, &ty, value)?;
                self.out.write(&format!("\"{}\"", s.escape_default()));
                if is_owned {
                    self.out.write(".to_owned()");
                }
            }
            BaseType::Binary => {
                let s = self.const_str(const_name, &ty, value)?;
                if is_owned {
                    self.out
                        .write(&format!("\"{}\".to_owned().into_bytes()", s.escape_default()));
                } else {
                    self.out.write(&format!("b\"{}\"", s.escape_default()));
                }
            }
            BaseType::Uuid => {
                let s = self.const_str(const_name, &ty, value)?;
                self.out.write(&format!(
                    "Uuid::parse_str(\"{}\").unwrap()",
                    s.escape_default()
                ));
            }
            BaseType::Bool => {
                let truthy = match value {
                    ConstValue::Bool(b) => *b,
                    ConstValue::Int(i) => *i != 0,
                    _ => return Err(self.const_mismatch(const_name, &ty)),
                };
                self.out.write(if truthy { "true" } else { "false" });
            }
            BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64 => {
                let int = self.const_int(const_name, &ty, value)?;
                self.out.write(&int.to_string());
            }
            BaseType::Double => {
                let double = match value {
                    ConstValue::Double(d) => *d,
                    ConstValue::Int(i) => *i as f64,
                    _ => return Err(self.const_mismatch(const_name, &ty)),
                };
                self.out
                    .write(&format!("OrderedFloat::from({}_f64)", double));
            }
            BaseType::Void => {
                return Err(EmitError::UnsupportedConst {
                    name: const_name.to_string(),
                    ty: "()".to_string(),
                })
            }
        }
        Ok(())
    }

    // The IDL admits struct literals as constants; the generator deliberately
    // does not. Users get a producer that panics at first use.
    fn render_const_struct(&mut self) {
        self.out.write("{\n");
        self.out.indent();
        self.out.write_indent();
        self.out.write("unimplemented!()\n");
        self.out.dedent();
        self.out.write_indent();
        self.out.write("}");
    }

    fn const_str(
        &self,
        const_name: &str,
        ty: &IdlType,
        value: &ConstValue,
    ) -> Result<String, EmitError> {
        match value {
            ConstValue::Str(s) => Ok(s.clone()),
            _ => Err(self.const_mismatch(const_name, ty)),
        }
    }

    fn const_int(
        &self,
        const_name: &str,
        ty: &IdlType,
        value: &ConstValue,
    ) -> Result<i64, EmitError> {
        match value {
            ConstValue::Int(i) => Ok(*i),
            _ => Err(self.const_mismatch(const_name, ty)),
        }
    }

    fn const_mismatch(&self, const_name: &str, ty: &IdlType) -> EmitError {
        EmitError::ConstValueMismatch {
            name: const_name.to_string(),
            ty: self.rust_type(ty),
        }
    }
}
