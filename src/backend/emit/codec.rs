//! Emit the wire codec: `write_to_out_protocol` / `read_from_in_protocol`.
//!
//! Write order is ascending field id, headers carry the *original* IDL names,
//! and reads skip unknown fields. Required fields are verified after the read
//! loop; `OptInReqOut` slots start from a type-specific zero default instead
//! of `None`.

use quipu_core::lang::conventions::RUNTIME_CRATE;

use crate::backend::errors::EmitError;
use crate::model::{BaseType, Field, FieldReq, IdlType, StructDecl};

use super::{ProgramEmitter, StructKind};

impl<'a> ProgramEmitter<'a> {
    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    pub(super) fn render_struct_sync_write(
        &mut self,
        wire_name: &str,
        fields: &[&Field],
        kind: StructKind,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "fn write_to_out_protocol(&self, o_prot: &mut dyn OutputProtocol) -> {} {{",
            self.rt_result("()")
        ));
        self.out.indent();

        // the *original* struct name goes on the wire
        self.out.line(&format!(
            "let struct_ident = StructIdentifier::new(\"{}\");",
            wire_name
        ));
        self.out.line("o_prot.write_struct_begin(&struct_ident)?;");

        for field in fields {
            let req = self.actual_field_req(field, kind);
            let member_var = format!("self.{}", self.mangler.field_name(&field.name));
            self.render_struct_field_sync_write(&member_var, false, field, req)?;
        }

        self.out.line("o_prot.write_field_stop()?;");
        self.out.line("o_prot.write_struct_end()");

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    pub(super) fn render_union_sync_write(
        &mut self,
        union_name: &str,
        decl: &StructDecl,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "fn write_to_out_protocol(&self, o_prot: &mut dyn OutputProtocol) -> {} {{",
            self.rt_result("()")
        ));
        self.out.indent();

        // the *original* union name goes on the wire
        self.out.line(&format!(
            "let struct_ident = StructIdentifier::new(\"{}\");",
            decl.name
        ));
        self.out.line("o_prot.write_struct_begin(&struct_ident)?;");

        let fields = decl.sorted_fields();
        if !fields.is_empty() {
            self.out.line("match *self {");
            self.out.indent();
            for field in &fields {
                // base scalars are matched by value, everything else by ref
                let match_var = if field.ty.is_base() && !field.ty.is_string_like() {
                    "f"
                } else {
                    "ref f"
                };
                self.out.line(&format!(
                    "{}::{}({}) => {{",
                    union_name,
                    self.mangler.union_variant_name(&field.name),
                    match_var
                ));
                self.out.indent();
                self.render_struct_field_sync_write("f", true, field, FieldReq::Required)?;
                self.out.dedent();
                self.out.line("},");
            }
            self.out.dedent();
            self.out.line("}");
        }

        self.out.line("o_prot.write_field_stop()?;");
        self.out.line("o_prot.write_struct_end()");

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    /// Write a single field: header, value, field end. Optional fields are
    /// guarded on presence.
    fn render_struct_field_sync_write(
        &mut self,
        field_var: &str,
        field_var_is_ref: bool,
        field: &Field,
        req: FieldReq,
    ) -> Result<(), EmitError> {
        // the *original* field name goes in the header
        let field_ident = format!(
            "FieldIdentifier::new(\"{}\", {}, {})",
            field.name,
            self.wire_type(&field.ty)?,
            field.id
        );

        if self.is_optional(req) {
            let let_var = if field.ty.is_base() && !field.ty.is_string_like() {
                "fld_var"
            } else {
                "ref fld_var"
            };
            self.out
                .line(&format!("if let Some({}) = {} {{", let_var, field_var));
            self.out.indent();
            self.out
                .line(&format!("o_prot.write_field_begin(&{})?;", field_ident));
            self.render_type_sync_write("fld_var", true, &field.ty)?;
            self.out.line("o_prot.write_field_end()?");
            self.out.dedent();
            self.out.line("}");
        } else {
            self.out
                .line(&format!("o_prot.write_field_begin(&{})?;", field_ident));
            self.render_type_sync_write(field_var, field_var_is_ref, &field.ty)?;
            self.out.line("o_prot.write_field_end()?;");
        }
        Ok(())
    }

    /// Write a single value of `ty` held in `type_var`.
    fn render_type_sync_write(
        &mut self,
        type_var: &str,
        type_var_is_ref: bool,
        ty: &IdlType,
    ) -> Result<(), EmitError> {
        match ty {
            IdlType::Base(base) => {
                let amp = if type_var_is_ref { "" } else { "&" };
                match base {
                    BaseType::Void => return Err(EmitError::Void("generate a write")),
                    BaseType::String => self
                        .out
                        .line(&format!("o_prot.write_string({}{})?;", amp, type_var)),
                    BaseType::Binary => self
                        .out
                        .line(&format!("o_prot.write_bytes({}{})?;", amp, type_var)),
                    BaseType::Uuid => self
                        .out
                        .line(&format!("o_prot.write_uuid(&{})?;", type_var)),
                    BaseType::Bool => self
                        .out
                        .line(&format!("o_prot.write_bool({})?;", type_var)),
                    BaseType::I8 => self.out.line(&format!("o_prot.write_i8({})?;", type_var)),
                    BaseType::I16 => self.out.line(&format!("o_prot.write_i16({})?;", type_var)),
                    BaseType::I32 => self.out.line(&format!("o_prot.write_i32({})?;", type_var)),
                    BaseType::I64 => self.out.line(&format!("o_prot.write_i64({})?;", type_var)),
                    // the protocol takes the unwrapped f64
                    BaseType::Double => self
                        .out
                        .line(&format!("o_prot.write_double({}.into())?;", type_var)),
                }
            }
            IdlType::Typedef(td) => {
                self.render_type_sync_write(type_var, type_var_is_ref, &td.target)?
            }
            IdlType::Enum(_) | IdlType::Struct(_) => self
                .out
                .line(&format!("{}.write_to_out_protocol(o_prot)?;", type_var)),
            IdlType::Map(key, val) => {
                self.render_map_sync_write(type_var, type_var_is_ref, key, val)?
            }
            IdlType::Set(elem) => self.render_set_sync_write(type_var, type_var_is_ref, elem)?,
            IdlType::List(elem) => self.render_list_sync_write(type_var, type_var_is_ref, elem)?,
        }
        Ok(())
    }

    fn render_list_sync_write(
        &mut self,
        list_var: &str,
        list_var_is_ref: bool,
        elem: &IdlType,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "o_prot.write_list_begin(&ListIdentifier::new({}, {}.len() as i32))?;",
            self.wire_type(elem)?,
            list_var
        ));

        let amp = if list_var_is_ref { "" } else { "&" };
        self.out.line(&format!("for e in {}{} {{", amp, list_var));
        self.out.indent();
        let elem_var = self.container_write_variable(elem, "e");
        self.render_type_sync_write(&elem_var, true, elem)?;
        self.out.dedent();
        self.out.line("}");
        self.out.line("o_prot.write_list_end()?;");
        Ok(())
    }

    fn render_set_sync_write(
        &mut self,
        set_var: &str,
        set_var_is_ref: bool,
        elem: &IdlType,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "o_prot.write_set_begin(&SetIdentifier::new({}, {}.len() as i32))?;",
            self.wire_type(elem)?,
            set_var
        ));

        let amp = if set_var_is_ref { "" } else { "&" };
        self.out.line(&format!("for e in {}{} {{", amp, set_var));
        self.out.indent();
        let elem_var = self.container_write_variable(elem, "e");
        self.render_type_sync_write(&elem_var, true, elem)?;
        self.out.dedent();
        self.out.line("}");
        self.out.line("o_prot.write_set_end()?;");
        Ok(())
    }

    fn render_map_sync_write(
        &mut self,
        map_var: &str,
        map_var_is_ref: bool,
        key: &IdlType,
        val: &IdlType,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "o_prot.write_map_begin(&MapIdentifier::new({}, {}, {}.len() as i32))?;",
            self.wire_type(key)?,
            self.wire_type(val)?,
            map_var
        ));

        let amp = if map_var_is_ref { "" } else { "&" };
        self.out.line(&format!("for (k, v) in {}{} {{", amp, map_var));
        self.out.indent();
        let key_var = self.container_write_variable(key, "k");
        self.render_type_sync_write(&key_var, true, key)?;
        let val_var = self.container_write_variable(val, "v");
        self.render_type_sync_write(&val_var, true, val)?;
        self.out.dedent();
        self.out.line("}");
        self.out.line("o_prot.write_map_end()?;");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    pub(super) fn render_struct_sync_read(
        &mut self,
        struct_name: &str,
        fields: &[&Field],
        kind: StructKind,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "fn read_from_in_protocol(i_prot: &mut dyn InputProtocol) -> {} {{",
            self.rt_result(struct_name)
        ));
        self.out.indent();

        self.out.line("i_prot.read_struct_begin()?;");

        // one slot per declared field
        for field in fields {
            let req = self.actual_field_req(field, kind);
            let init = if req == FieldReq::OptInReqOut {
                self.zero_default(&field.ty)?
            } else {
                "None".to_string()
            };
            self.out.line(&format!(
                "let mut {}: Option<{}> = {};",
                self.field_read_temp(field),
                self.rust_type(&field.ty),
                init
            ));
        }

        self.out.line("loop {");
        self.out.indent();
        self.out.line("let field_ident = i_prot.read_field_begin()?;");
        self.out.line("if field_ident.field_type == WireType::Stop {");
        self.out.indent();
        self.out.line("break;");
        self.out.dedent();
        self.out.line("}");

        if fields.is_empty() {
            self.out.line("i_prot.skip(field_ident.field_type)?;");
        } else {
            self.out.line("let field_id = field_id(&field_ident)?;");
            self.out.line("match field_id {");
            self.out.indent();

            for field in fields {
                self.out
                    .line(&format!("{} => {{", self.mangler.safe_field_id(field.id)));
                self.out.indent();
                self.render_type_sync_read("val", &field.ty, false)?;
                self.out
                    .line(&format!("{} = Some(val);", self.field_read_temp(field)));
                self.out.dedent();
                self.out.line("},");
            }

            // unknown fields are skipped
            self.out.line("_ => {");
            self.out.indent();
            self.out.line("i_prot.skip(field_ident.field_type)?;");
            self.out.dedent();
            self.out.line("},");

            self.out.dedent();
            self.out.line("};");
        }

        self.out.line("i_prot.read_field_end()?;");
        self.out.dedent();
        self.out.line("}");
        self.out.line("i_prot.read_struct_end()?;");

        // verify that all required fields exist
        for field in fields {
            let req = self.actual_field_req(field, kind);
            if !self.is_optional(req) {
                self.out.line(&format!(
                    "verify_required_field_exists(\"{}.{}\", &{})?;",
                    struct_name,
                    self.mangler.field_name(&field.name),
                    self.field_read_temp(field)
                ));
            }
        }

        // materialize the struct
        if fields.is_empty() {
            self.out
                .line(&format!("let ret = {} {{}};", struct_name));
        } else {
            self.out.line(&format!("let ret = {} {{", struct_name));
            self.out.indent();
            for field in fields {
                let req = self.actual_field_req(field, kind);
                let field_name = self.mangler.field_name(&field.name);
                let slot = self.field_read_temp(field);
                if self.is_optional(req) {
                    self.out.line(&format!("{}: {},", field_name, slot));
                } else {
                    self.out.line(&format!(
                        "{}: {}.expect(\"auto-generated code should have checked for presence of \
                         required fields\"),",
                        field_name, slot
                    ));
                }
            }
            self.out.dedent();
            self.out.line("};");
        }

        self.out.line("Ok(ret)");
        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    pub(super) fn render_union_sync_read(
        &mut self,
        union_name: &str,
        decl: &StructDecl,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "fn read_from_in_protocol(i_prot: &mut dyn InputProtocol) -> {} {{",
            self.rt_result(union_name)
        ));
        self.out.indent();

        // the completed union plus a count of fields seen; the first
        // populated variant wins, anything more is a protocol error
        self.out
            .line(&format!("let mut ret: Option<{}> = None;", union_name));
        self.out.line("let mut received_field_count = 0;");

        self.out.line("i_prot.read_struct_begin()?;");
        self.out.line("loop {");
        self.out.indent();
        self.out.line("let field_ident = i_prot.read_field_begin()?;");
        self.out.line("if field_ident.field_type == WireType::Stop {");
        self.out.indent();
        self.out.line("break;");
        self.out.dedent();
        self.out.line("}");
        self.out.line("let field_id = field_id(&field_ident)?;");
        self.out.line("match field_id {");
        self.out.indent();

        for field in &decl.sorted_fields() {
            self.out
                .line(&format!("{} => {{", self.mangler.safe_field_id(field.id)));
            self.out.indent();
            self.render_type_sync_read("val", &field.ty, false)?;
            self.out.line("if ret.is_none() {");
            self.out.indent();
            self.out.line(&format!(
                "ret = Some({}::{}(val));",
                union_name,
                self.mangler.union_variant_name(&field.name)
            ));
            self.out.dedent();
            self.out.line("}");
            self.out.line("received_field_count += 1;");
            self.out.dedent();
            self.out.line("},");
        }

        self.out.line("_ => {");
        self.out.indent();
        self.out.line("i_prot.skip(field_ident.field_type)?;");
        self.out.line("received_field_count += 1;");
        self.out.dedent();
        self.out.line("},");

        self.out.dedent();
        self.out.line("};");
        self.out.line("i_prot.read_field_end()?;");
        self.out.dedent();
        self.out.line("}");
        self.out.line("i_prot.read_struct_end()?;");

        self.out.line("if received_field_count == 0 {");
        self.out.indent();
        self.render_error_expr(
            "Protocol",
            "ProtocolError",
            "ProtocolErrorKind::InvalidData",
            &format!("\"received empty union from remote {}\"", union_name),
        );
        self.out.dedent();
        self.out.line("} else if received_field_count > 1 {");
        self.out.indent();
        self.render_error_expr(
            "Protocol",
            "ProtocolError",
            "ProtocolErrorKind::InvalidData",
            &format!(
                "\"received multiple fields for union from remote {}\"",
                union_name
            ),
        );
        self.out.dedent();
        self.out.line("} else if let Some(ret) = ret {");
        self.out.indent();
        self.out.line("Ok(ret)");
        self.out.dedent();
        self.out.line("} else {");
        self.out.indent();
        self.out.line("Err(");
        self.out.indent();
        self.out
            .line(&format!("{}::Error::Protocol(", RUNTIME_CRATE));
        self.out.line(
            "  ProtocolError::new(ProtocolErrorKind::InvalidData, \"return value should have been \
             constructed\")",
        );
        self.out.line(")");
        self.out.dedent();
        self.out.line(")");
        self.out.dedent();
        self.out.line("}");

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    /// Read a single value of `ty` into `type_var`.
    ///
    /// `is_boxed` is set when the static type of the value being read is a
    /// forward typedef; the produced value is boxed so it matches the
    /// recursive-safe declared shape.
    fn render_type_sync_read(
        &mut self,
        type_var: &str,
        ty: &IdlType,
        is_boxed: bool,
    ) -> Result<(), EmitError> {
        match ty {
            IdlType::Base(base) => {
                let read_expr = match base {
                    BaseType::Void => return Err(EmitError::Void("generate a read")),
                    BaseType::String => "i_prot.read_string()?".to_string(),
                    BaseType::Binary => "i_prot.read_bytes()?".to_string(),
                    BaseType::Uuid => "i_prot.read_uuid()?".to_string(),
                    BaseType::Bool => "i_prot.read_bool()?".to_string(),
                    BaseType::I8 => "i_prot.read_i8()?".to_string(),
                    BaseType::I16 => "i_prot.read_i16()?".to_string(),
                    BaseType::I32 => "i_prot.read_i32()?".to_string(),
                    BaseType::I64 => "i_prot.read_i64()?".to_string(),
                    BaseType::Double => "OrderedFloat::from(i_prot.read_double()?)".to_string(),
                };
                let read_expr = if is_boxed {
                    format!("Box::new({})", read_expr)
                } else {
                    read_expr
                };
                self.out
                    .line(&format!("let {} = {};", type_var, read_expr));
            }
            IdlType::Typedef(td) => {
                // the forward flag is the only place the recursive-safe shape
                // is visible, so it rides along on the recursive call
                self.render_type_sync_read(type_var, &td.target, td.forward)?;
            }
            IdlType::Enum(_) | IdlType::Struct(_) => {
                let read_call = format!("{}::read_from_in_protocol(i_prot)?", self.rust_type(ty));
                let read_call = if is_boxed {
                    format!("Box::new({})", read_call)
                } else {
                    read_call
                };
                self.out
                    .line(&format!("let {} = {};", type_var, read_call));
            }
            IdlType::Map(key, val) => {
                self.render_map_sync_read(ty, key, val, type_var)?;
                if is_boxed {
                    self.out
                        .line(&format!("let {} = Box::new({});", type_var, type_var));
                }
            }
            IdlType::Set(elem) => {
                self.render_set_sync_read(ty, elem, type_var)?;
                if is_boxed {
                    self.out
                        .line(&format!("let {} = Box::new({});", type_var, type_var));
                }
            }
            IdlType::List(elem) => {
                self.render_list_sync_read(ty, elem, type_var)?;
                if is_boxed {
                    self.out
                        .line(&format!("let {} = Box::new({});", type_var, type_var));
                }
            }
        }
        Ok(())
    }

    fn render_list_sync_read(
        &mut self,
        list_ty: &IdlType,
        elem: &IdlType,
        list_var: &str,
    ) -> Result<(), EmitError> {
        self.out.line("let list_ident = i_prot.read_list_begin()?;");
        self.out.line(&format!(
            "let mut {}: {} = Vec::with_capacity(list_ident.size as usize);",
            list_var,
            self.rust_type(list_ty)
        ));
        self.out.line("for _ in 0..list_ident.size {");
        self.out.indent();

        let elem_var = self.out.tmp("list_elem_");
        self.render_type_sync_read(&elem_var, elem, false)?;
        self.out
            .line(&format!("{}.push({});", list_var, elem_var));

        self.out.dedent();
        self.out.line("}");
        self.out.line("i_prot.read_list_end()?;");
        Ok(())
    }

    fn render_set_sync_read(
        &mut self,
        set_ty: &IdlType,
        elem: &IdlType,
        set_var: &str,
    ) -> Result<(), EmitError> {
        self.out.line("let set_ident = i_prot.read_set_begin()?;");
        self.out.line(&format!(
            "let mut {}: {} = BTreeSet::new();",
            set_var,
            self.rust_type(set_ty)
        ));
        self.out.line("for _ in 0..set_ident.size {");
        self.out.indent();

        let elem_var = self.out.tmp("set_elem_");
        self.render_type_sync_read(&elem_var, elem, false)?;
        self.out
            .line(&format!("{}.insert({});", set_var, elem_var));

        self.out.dedent();
        self.out.line("}");
        self.out.line("i_prot.read_set_end()?;");
        Ok(())
    }

    fn render_map_sync_read(
        &mut self,
        map_ty: &IdlType,
        key: &IdlType,
        val: &IdlType,
        map_var: &str,
    ) -> Result<(), EmitError> {
        self.out.line("let map_ident = i_prot.read_map_begin()?;");
        self.out.line(&format!(
            "let mut {}: {} = BTreeMap::new();",
            map_var,
            self.rust_type(map_ty)
        ));
        self.out.line("for _ in 0..map_ident.size {");
        self.out.indent();

        let key_var = self.out.tmp("map_key_");
        self.render_type_sync_read(&key_var, key, false)?;
        let val_var = self.out.tmp("map_val_");
        self.render_type_sync_read(&val_var, val, false)?;
        self.out
            .line(&format!("{}.insert({}, {});", map_var, key_var, val_var));

        self.out.dedent();
        self.out.line("}");
        self.out.line("i_prot.read_map_end()?;");
        Ok(())
    }

    /// The local slot a field is read into.
    fn field_read_temp(&self, field: &Field) -> String {
        format!("f_{}", self.mangler.safe_field_id(field.id))
    }
}
