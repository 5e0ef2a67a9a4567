//! Emit struct, union and exception definitions with their impl blocks.
//!
//! The same renderer covers user-declared structs/exceptions and the
//! synthetic args/result structs for service calls; the [`StructKind`]
//! controls visibility, effective optionality and which extras are emitted.

use quipu_core::lang::conventions::{RESULT_STRUCT_SUFFIX, RUNTIME_CRATE, SERVICE_RESULT_VARIABLE};

use crate::backend::errors::EmitError;
use crate::model::{Field, FieldReq, Function, Service, StructDecl};

use super::{ProgramEmitter, StructKind};

impl<'a> ProgramEmitter<'a> {
    /// Render a struct or exception: banner, definition, impl blocks and (for
    /// exceptions) the error-trait impls.
    ///
    /// `struct_name` is the Rust name; `wire_name` is the original IDL name,
    /// which is what goes on the wire.
    pub(super) fn render_struct(
        &mut self,
        struct_name: &str,
        wire_name: &str,
        fields: &[&Field],
        kind: StructKind,
        doc: &Option<String>,
    ) -> Result<(), EmitError> {
        self.render_type_comment(struct_name);
        self.render_struct_definition(struct_name, fields, kind, doc);
        self.render_struct_impl(struct_name, wire_name, fields, kind)?;
        if kind == StructKind::Exception {
            self.render_exception_error_impls(struct_name, wire_name);
        }
        Ok(())
    }

    fn render_struct_definition(
        &mut self,
        struct_name: &str,
        fields: &[&Field],
        kind: StructKind,
        doc: &Option<String>,
    ) {
        self.render_rustdoc(doc);

        let need_default = kind != StructKind::Args
            && fields
                .iter()
                .all(|f| self.is_optional(self.actual_field_req(f, kind)));
        self.out.line(&format!(
            "#[derive(Clone, Debug{}, Eq, Hash, Ord, PartialEq, PartialOrd)]",
            if need_default { ", Default" } else { "" }
        ));

        let vis = self.visibility(kind);
        self.out
            .line(&format!("{}struct {} {{", vis, struct_name));

        if !fields.is_empty() {
            self.out.indent();
            for field in fields {
                let req = self.actual_field_req(field, kind);
                let mut rust_type = self.rust_type(&field.ty);
                if self.is_optional(req) {
                    rust_type = format!("Option<{}>", rust_type);
                }
                self.render_rustdoc(&field.doc);
                self.out.line(&format!(
                    "{}{}: {},",
                    vis,
                    self.mangler.field_name(&field.name),
                    rust_type
                ));
            }
            self.out.dedent();
        }

        self.out.line("}");
        self.out.blank_line();
    }

    fn render_struct_impl(
        &mut self,
        struct_name: &str,
        wire_name: &str,
        fields: &[&Field],
        kind: StructKind,
    ) -> Result<(), EmitError> {
        self.out.line(&format!("impl {} {{", struct_name));
        self.out.indent();

        if kind == StructKind::Regular || kind == StructKind::Exception {
            self.render_struct_constructor(struct_name, fields, kind);
        }

        if kind == StructKind::Result {
            self.render_result_struct_ok_or(struct_name, fields)?;
        }

        // user-visible structs get their codec through the Serializable
        // trait; args/result structs keep it as inherent methods so nothing
        // leaks from the module
        if kind == StructKind::Regular || kind == StructKind::Exception {
            self.out.dedent();
            self.out.line("}");
            self.out.blank_line();

            self.out
                .line(&format!("impl Serializable for {} {{", struct_name));
            self.out.indent();
        }

        self.render_struct_sync_read(struct_name, fields, kind)?;
        self.render_struct_sync_write(wire_name, fields, kind)?;

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    fn render_struct_constructor(
        &mut self,
        struct_name: &str,
        fields: &[&Field],
        kind: StructKind,
    ) {
        // optional fields accept any `Into<Option<T>>` so callers can pass
        // unwrapped values
        let mut type_parameters: Vec<String> = Vec::new();
        let mut type_qualifiers: Vec<String> = Vec::new();
        for field in fields {
            let req = self.actual_field_req(field, kind);
            if self.is_optional(req) {
                let param = format!("F{}", self.mangler.safe_field_id(field.id));
                type_qualifiers.push(format!(
                    "{}: Into<Option<{}>>",
                    param,
                    self.rust_type(&field.ty)
                ));
                type_parameters.push(param);
            }
        }

        let type_parameter_string = if type_parameters.is_empty() {
            String::new()
        } else {
            format!("<{}>", type_parameters.join(", "))
        };
        let type_qualifier_string = if type_qualifiers.is_empty() {
            String::new()
        } else {
            format!("where {} ", type_qualifiers.join(", "))
        };

        let mut args: Vec<String> = Vec::new();
        for field in fields {
            let req = self.actual_field_req(field, kind);
            let member_name = self.mangler.field_name(&field.name);
            if self.is_optional(req) {
                args.push(format!(
                    "{}: F{}",
                    member_name,
                    self.mangler.safe_field_id(field.id)
                ));
            } else {
                args.push(format!("{}: {}", member_name, self.rust_type(&field.ty)));
            }
        }

        self.out.line(&format!(
            "{}fn new{}({}) -> {} {}{{",
            self.visibility(kind),
            type_parameter_string,
            args.join(", "),
            struct_name,
            type_qualifier_string
        ));
        self.out.indent();

        if fields.is_empty() {
            self.out.line(&format!("{} {{}}", struct_name));
        } else {
            self.out.line(&format!("{} {{", struct_name));
            self.out.indent();
            for field in fields {
                let req = self.actual_field_req(field, kind);
                let member_name = self.mangler.field_name(&field.name);
                if self.is_optional(req) {
                    self.out
                        .line(&format!("{}: {}.into(),", member_name, member_name));
                } else {
                    self.out.line(&format!("{},", member_name));
                }
            }
            self.out.dedent();
            self.out.line("}");
        }

        self.out.dedent();
        self.out.line("}");
    }

    /// The `ok_or` method on result structs: return value if present, first
    /// present exception otherwise, missing-result error as a last resort.
    fn render_result_struct_ok_or(
        &mut self,
        struct_name: &str,
        fields: &[&Field],
    ) -> Result<(), EmitError> {
        let service_call_name = struct_name
            .strip_suffix(RESULT_STRUCT_SUFFIX)
            .ok_or_else(|| EmitError::MissingResultSuffix(struct_name.to_string()))?
            .to_string();

        let rust_return_type = fields
            .iter()
            .find(|f| f.name == SERVICE_RESULT_VARIABLE)
            .map(|f| self.rust_type(&f.ty))
            .unwrap_or_else(|| "()".to_string());

        self.out.line(&format!(
            "fn ok_or(self) -> {} {{",
            self.rt_result(&rust_return_type)
        ));
        self.out.indent();

        let mut rendered_branch_count = 0;

        // the exception branches
        for field in fields {
            if field.name == SERVICE_RESULT_VARIABLE {
                continue;
            }
            let field_name = format!("self.{}", self.mangler.field_name(&field.name));
            let branch_statement = if rendered_branch_count == 0 {
                "if"
            } else {
                "} else if"
            };
            self.out.line(&format!(
                "{} {}.is_some() {{",
                branch_statement, field_name
            ));
            self.out.indent();
            self.out.line(&format!(
                "Err({}::Error::User(Box::new({}.unwrap())))",
                RUNTIME_CRATE, field_name
            ));
            self.out.dedent();
            rendered_branch_count += 1;
        }

        // the return-value branches
        if rust_return_type == "()" {
            if rendered_branch_count == 0 {
                // unit return and no user-defined exceptions: trivial return
                self.out.line("Ok(())");
            } else {
                self.out.line("} else {");
                self.out.indent();
                self.out.line("Ok(())");
                self.out.dedent();
                self.out.line("}");
            }
        } else {
            let branch_statement = if rendered_branch_count == 0 {
                "if"
            } else {
                "} else if"
            };
            self.out.line(&format!(
                "{} self.{}.is_some() {{",
                branch_statement, SERVICE_RESULT_VARIABLE
            ));
            self.out.indent();
            self.out
                .line(&format!("Ok(self.{}.unwrap())", SERVICE_RESULT_VARIABLE));
            self.out.dedent();
            self.out.line("} else {");
            self.out.indent();
            // neither a return value nor a user exception arrived
            self.render_error_expr(
                "Application",
                "ApplicationError",
                "ApplicationErrorKind::MissingResult",
                &format!("\"no result received for {}\"", service_call_name),
            );
            self.out.dedent();
            self.out.line("}");
        }

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    fn render_exception_error_impls(&mut self, struct_name: &str, original_name: &str) {
        // error::Error trait
        self.out.line(&format!("impl Error for {} {{}}", struct_name));
        self.out.blank_line();

        // convert::From trait
        self.out.line(&format!(
            "impl From<{}> for {}::Error {{",
            struct_name, RUNTIME_CRATE
        ));
        self.out.indent();
        self.out
            .line(&format!("fn from(e: {}) -> Self {{", struct_name));
        self.out.indent();
        self.out
            .line(&format!("{}::Error::User(Box::new(e))", RUNTIME_CRATE));
        self.out.dedent();
        self.out.line("}");
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();

        // fmt::Display trait; uses the *original* name
        self.out
            .line(&format!("impl Display for {} {{", struct_name));
        self.out.indent();
        self.out
            .line("fn fmt(&self, f: &mut Formatter) -> fmt::Result {");
        self.out.indent();
        self.out.line(&format!(
            "write!(f, \"remote service threw {}\")",
            original_name
        ));
        self.out.dedent();
        self.out.line("}");
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
    }

    // ------------------------------------------------------------------
    // Unions
    // ------------------------------------------------------------------

    pub(super) fn render_union(&mut self, decl: &StructDecl) -> Result<(), EmitError> {
        let union_name = self.mangler.struct_name(&decl.name);
        self.render_type_comment(&union_name);
        self.render_union_definition(&union_name, decl)?;
        self.render_union_impl(&union_name, decl)?;
        Ok(())
    }

    fn render_union_definition(
        &mut self,
        union_name: &str,
        decl: &StructDecl,
    ) -> Result<(), EmitError> {
        let fields = decl.sorted_fields();
        if fields.is_empty() {
            // may be valid IDL, but it's invalid rust
            return Err(EmitError::EmptyUnion(decl.name.clone()));
        }

        self.render_rustdoc(&decl.doc);
        self.out
            .line("#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]");
        self.out.line(&format!("pub enum {} {{", union_name));
        self.out.indent();

        for field in &fields {
            self.out.line(&format!(
                "{}({}),",
                self.mangler.union_variant_name(&field.name),
                self.rust_type(&field.ty)
            ));
        }

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    fn render_union_impl(&mut self, union_name: &str, decl: &StructDecl) -> Result<(), EmitError> {
        self.out
            .line(&format!("impl Serializable for {} {{", union_name));
        self.out.indent();

        self.render_union_sync_read(union_name, decl)?;
        self.render_union_sync_write(union_name, decl)?;

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Service-call structs
    // ------------------------------------------------------------------

    /// Render the synthetic structs carrying each call's arguments and its
    /// return value/exceptions over the wire.
    pub(super) fn render_service_call_structs(
        &mut self,
        service: &Service,
    ) -> Result<(), EmitError> {
        for func in &service.functions {
            self.render_service_call_args_struct(service, func)?;
            if !func.oneway {
                self.render_service_call_result_struct(service, func)?;
            }
        }
        Ok(())
    }

    fn render_service_call_args_struct(
        &mut self,
        service: &Service,
        func: &Function,
    ) -> Result<(), EmitError> {
        let struct_name = self.args_struct_name(&service.name, func);
        // the frontend names every arglist `<function>_args`
        let wire_name = format!("{}_args", func.name);
        self.render_struct(
            &struct_name,
            &wire_name,
            &func.sorted_args(),
            StructKind::Args,
            &None,
        )
    }

    fn render_service_call_result_struct(
        &mut self,
        service: &Service,
        func: &Function,
    ) -> Result<(), EmitError> {
        let struct_name = self.result_struct_name(&service.name, func);

        let mut fields: Vec<Field> = Vec::new();
        if !func.return_type.is_void() {
            fields.push(Field {
                id: 0,
                name: SERVICE_RESULT_VARIABLE.to_string(),
                ty: func.return_type.clone(),
                req: FieldReq::Optional,
                doc: None,
            });
        }
        for exception in &func.exceptions {
            let mut field = exception.clone();
            field.req = FieldReq::Optional;
            fields.push(field);
        }
        fields.sort_by_key(|f| f.id);

        let field_refs: Vec<&Field> = fields.iter().collect();
        self.render_struct(
            &struct_name,
            &struct_name,
            &field_refs,
            StructKind::Result,
            &None,
        )
    }
}
