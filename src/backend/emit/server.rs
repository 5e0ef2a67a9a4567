//! Emit the synchronous service processor.
//!
//! Dispatch is by the literal (original) function name. The per-function
//! bodies live as static functions on an auxiliary `T<Svc>ProcessFunctions`
//! type so that processors for extending services can delegate to their
//! ancestors' implementations instead of re-emitting them.

use quipu_core::lang::conventions::RUNTIME_CRATE;

use crate::backend::errors::EmitError;
use crate::model::{Function, ParentService, Service};

use super::ProgramEmitter;

impl<'a> ProgramEmitter<'a> {
    pub(super) fn render_sync_processor(&mut self, service: &Service) -> Result<(), EmitError> {
        // note: the banner uses the *original* service name
        self.render_type_comment(&format!("{} service processor", service.name));
        self.render_sync_handler_trait(service);
        self.render_sync_processor_definition_and_impl(service)?;
        Ok(())
    }

    fn render_sync_handler_trait(&mut self, service: &Service) {
        let extension = match &service.extends {
            Some(parent) => format!(
                " : {}{}",
                self.parent_namespace(parent),
                self.handler_trait_name(&parent.service.name)
            ),
            None => String::new(),
        };

        self.render_rustdoc(&service.doc);
        self.out.line(&format!(
            "pub trait {}{} {{",
            self.handler_trait_name(&service.name),
            extension
        ));
        self.out.indent();
        for func in &service.functions {
            self.render_rustdoc(&func.doc);
            self.out.line(&format!(
                "fn {}{} -> {};",
                self.handler_function_name(func),
                self.sync_service_call_declaration(func, false),
                self.rt_result(&self.rust_type(&func.return_type))
            ));
        }
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
    }

    fn render_sync_processor_definition_and_impl(
        &mut self,
        service: &Service,
    ) -> Result<(), EmitError> {
        let processor_name = self.processor_name(&service.name);
        let handler_trait_name = self.handler_trait_name(&service.name);

        // the processor owns its handler by value
        self.out.line(&format!(
            "pub struct {}<H: {}> {{",
            processor_name, handler_trait_name
        ));
        self.out.indent();
        self.out.line("handler: H,");
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();

        // delegating impl
        self.out.line(&format!(
            "impl <H: {}> {}<H> {{",
            handler_trait_name, processor_name
        ));
        self.out.indent();
        self.out.line(&format!(
            "pub fn new(handler: H) -> {}<H> {{",
            processor_name
        ));
        self.out.indent();
        self.out.line(&format!("{} {{", processor_name));
        self.out.indent();
        self.out.line("handler,");
        self.out.dedent();
        self.out.line("}");
        self.out.dedent();
        self.out.line("}");
        self.render_sync_process_delegation_functions(service);
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();

        // actual impl
        let process_functions_name = self.process_functions_name(&service.name);
        self.out
            .line(&format!("pub struct {};", process_functions_name));
        self.out.blank_line();
        self.out
            .line(&format!("impl {} {{", process_functions_name));
        self.out.indent();

        for func in &service.functions {
            self.render_sync_process_function(service, func, &handler_trait_name)?;
        }

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();

        // processor impl
        self.out.line(&format!(
            "impl <H: {}> Processor for {}<H> {{",
            handler_trait_name, processor_name
        ));
        self.out.indent();

        self.out.line(&format!(
            "fn process(&self, i_prot: &mut dyn InputProtocol, o_prot: &mut dyn OutputProtocol) \
             -> {} {{",
            self.rt_result("()")
        ));
        self.out.indent();

        self.out
            .line("let message_ident = i_prot.read_message_begin()?;");

        self.out.line("let res = match &*message_ident.name {");
        self.out.indent();
        self.render_process_match_statements(service);
        self.out.line("method => {");
        self.out.indent();
        self.render_error_expr(
            "Application",
            "ApplicationError",
            "ApplicationErrorKind::UnknownMethod",
            "format!(\"unknown method {}\", method)",
        );
        self.out.dedent();
        self.out.line("},");

        self.out.dedent();
        self.out.line("};");
        self.out.line(&format!(
            "{}::server::handle_process_result(&message_ident, res, o_prot)",
            RUNTIME_CRATE
        ));

        self.out.dedent();
        self.out.line("}");

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    /// One thin `process_<name>` per function in the whole extension chain,
    /// each delegating to the declaring service's process-functions type.
    fn render_sync_process_delegation_functions(&mut self, service: &Service) {
        let actual_processor = self.process_functions_name(&service.name);

        for func in &service.functions {
            let function_name = format!("process_{}", self.mangler.snake(&func.name));
            self.out.line(&format!(
                "fn {}(&self, incoming_sequence_number: i32, i_prot: &mut dyn InputProtocol, \
                 o_prot: &mut dyn OutputProtocol) -> {} {{",
                function_name,
                self.rt_result("()")
            ));
            self.out.indent();
            self.out.line(&format!(
                "{}::{}(&self.handler, incoming_sequence_number, i_prot, o_prot)",
                actual_processor, function_name
            ));
            self.out.dedent();
            self.out.line("}");
        }

        if let Some(parent) = &service.extends {
            self.render_parent_delegation_functions(parent.as_ref());
        }
    }

    fn render_parent_delegation_functions(&mut self, parent: &ParentService) {
        let actual_processor = format!(
            "{}{}",
            self.parent_namespace(parent),
            self.process_functions_name(&parent.service.name)
        );

        for func in &parent.service.functions {
            let function_name = format!("process_{}", self.mangler.snake(&func.name));
            self.out.line(&format!(
                "fn {}(&self, incoming_sequence_number: i32, i_prot: &mut dyn InputProtocol, \
                 o_prot: &mut dyn OutputProtocol) -> {} {{",
                function_name,
                self.rt_result("()")
            ));
            self.out.indent();
            self.out.line(&format!(
                "{}::{}(&self.handler, incoming_sequence_number, i_prot, o_prot)",
                actual_processor, function_name
            ));
            self.out.dedent();
            self.out.line("}");
        }

        if let Some(grandparent) = &parent.service.extends {
            self.render_parent_delegation_functions(grandparent.as_ref());
        }
    }

    /// Match arms for every function in the chain, dispatched by the
    /// *original* IDL name.
    fn render_process_match_statements(&mut self, service: &Service) {
        for func in &service.functions {
            self.out.line(&format!("\"{}\" => {{", func.name));
            self.out.indent();
            self.out.line(&format!(
                "self.process_{}(message_ident.sequence_number, i_prot, o_prot)",
                self.mangler.snake(&func.name)
            ));
            self.out.dedent();
            self.out.line("},");
        }

        let mut parent = service.extends.as_deref();
        while let Some(p) = parent {
            for func in &p.service.functions {
                self.out.line(&format!("\"{}\" => {{", func.name));
                self.out.indent();
                self.out.line(&format!(
                    "self.process_{}(message_ident.sequence_number, i_prot, o_prot)",
                    self.mangler.snake(&func.name)
                ));
                self.out.dedent();
                self.out.line("},");
            }
            parent = p.service.extends.as_deref();
        }
    }

    fn render_sync_process_function(
        &mut self,
        service: &Service,
        func: &Function,
        handler_type: &str,
    ) -> Result<(), EmitError> {
        // oneway calls never touch the output protocol on success
        let sequence_number_param = if func.oneway { "_" } else { "incoming_sequence_number" };
        let output_protocol_param = if func.oneway { "_" } else { "o_prot" };

        self.out.line(&format!(
            "pub fn process_{}<H: {}>(handler: &H, {}: i32, i_prot: &mut dyn InputProtocol, {}: \
             &mut dyn OutputProtocol) -> {} {{",
            self.mangler.snake(&func.name),
            handler_type,
            sequence_number_param,
            output_protocol_param,
            self.rt_result("()")
        ));
        self.out.indent();

        // *always* read arguments from the input protocol
        self.out.line(&format!(
            "let {} = {}::read_from_in_protocol(i_prot)?;",
            if func.has_args() { "args" } else { "_" },
            self.args_struct_name(&service.name, func)
        ));

        self.out.line(&format!(
            "match handler.{}{} {{",
            self.handler_function_name(func),
            self.sync_service_call_invocation(func, "args.")
        ));
        self.out.indent();

        // handler succeeded
        let handler_return_variable = if func.oneway || func.return_type.is_void() {
            "_"
        } else {
            "handler_return"
        };
        self.out
            .line(&format!("Ok({}) => {{", handler_return_variable));
        self.out.indent();
        self.render_sync_handler_succeeded(service, func);
        self.out.dedent();
        self.out.line("},");

        // handler failed
        self.out.line("Err(e) => {");
        self.out.indent();
        self.render_sync_handler_failed(service, func);
        self.out.dedent();
        self.out.line("},");

        self.out.dedent();
        self.out.line("}");

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    fn render_sync_handler_succeeded(&mut self, service: &Service, func: &Function) {
        if func.oneway {
            self.out.line("Ok(())");
            return;
        }

        // note: the *original* function name goes in the reply header
        self.out.line(&format!(
            "let message_ident = MessageIdentifier::new(\"{}\", MessageType::Reply, \
             incoming_sequence_number);",
            func.name
        ));
        self.out
            .line("o_prot.write_message_begin(&message_ident)?;");
        self.out.line(&format!(
            "let ret = {};",
            self.handler_successful_return_struct(service, func)
        ));
        self.out.line("ret.write_to_out_protocol(o_prot)?;");
        self.out.line("o_prot.write_message_end()?;");
        self.out.line("o_prot.flush()");
    }

    fn handler_successful_return_struct(&self, service: &Service, func: &Function) -> String {
        let mut members: Vec<String> = Vec::new();

        if !func.return_type.is_void() {
            members.push("result_value: Some(handler_return)".to_string());
        }
        for exception in func.sorted_exceptions() {
            members.push(format!("{}: None", self.mangler.field_name(&exception.name)));
        }

        format!(
            "{} {{ {} }}",
            self.result_struct_name(&service.name, func),
            members.join(", ")
        )
    }

    fn render_sync_handler_failed(&mut self, service: &Service, func: &Function) {
        self.out.line("match e {");
        self.out.indent();

        // declared exceptions are tried first, in declaration order
        if !func.exceptions.is_empty() {
            self.out
                .line(&format!("{}::Error::User(usr_err) => {{", RUNTIME_CRATE));
            self.out.indent();
            self.render_sync_handler_failed_user_exception_branch(service, func);
            self.out.dedent();
            self.out.line("},");
        }

        // application error
        self.out.line(&format!(
            "{}::Error::Application(app_err) => {{",
            RUNTIME_CRATE
        ));
        self.out.indent();
        self.render_sync_handler_failed_application_exception_branch(func, "app_err");
        self.out.dedent();
        self.out.line("},");

        // anything else is wrapped into an unknown application error
        self.out.line("_ => {");
        self.out.indent();
        self.render_sync_handler_failed_default_exception_branch(func);
        self.out.dedent();
        self.out.line("},");

        self.out.dedent();
        self.out.line("}");
    }

    fn render_sync_handler_failed_user_exception_branch(
        &mut self,
        service: &Service,
        func: &Function,
    ) {
        let exceptions = func.sorted_exceptions();
        let mut branches_rendered = 0;

        // run through all user-defined exceptions
        for exception_field in &exceptions {
            let if_statement = if branches_rendered == 0 {
                "if usr_err"
            } else {
                "} else if usr_err"
            };
            let exception_type = self.rust_type(&exception_field.ty);
            self.out.line(&format!(
                "{}.downcast_ref::<{}>().is_some() {{",
                if_statement, exception_type
            ));
            self.out.indent();

            self.out.line(&format!(
                "let err = usr_err.downcast::<{}>().expect(\"downcast already checked\");",
                exception_type
            ));

            let mut members: Vec<String> = Vec::new();
            if !(func.oneway || func.return_type.is_void()) {
                members.push("result_value: None".to_string());
            }
            for member in &exceptions {
                let member_name = self.mangler.field_name(&member.name);
                if member.id == exception_field.id {
                    members.push(format!("{}: Some(*err)", member_name));
                } else {
                    members.push(format!("{}: None", member_name));
                }
            }

            self.out.line(&format!(
                "let ret_err = {}{{ {} }};",
                self.result_struct_name(&service.name, func),
                members.join(", ")
            ));

            // a declared exception still travels in a Reply message
            self.out.line(&format!(
                "let message_ident = MessageIdentifier::new(\"{}\", MessageType::Reply, \
                 incoming_sequence_number);",
                func.name
            ));
            self.out
                .line("o_prot.write_message_begin(&message_ident)?;");
            self.out.line("ret_err.write_to_out_protocol(o_prot)?;");
            self.out.line("o_prot.write_message_end()?;");
            self.out.line("o_prot.flush()");

            self.out.dedent();
            branches_rendered += 1;
        }

        // the catch-all, if somehow it was a user exception we don't know
        self.out.line("} else {");
        self.out.indent();

        self.out.line("let ret_err = {");
        self.out.indent();
        self.render_error_struct_expr(
            "ApplicationError",
            "ApplicationErrorKind::Unknown",
            "usr_err.to_string()",
        );
        self.out.dedent();
        self.out.line("};");
        self.render_sync_handler_send_exception_response(func, "ret_err");

        self.out.dedent();
        self.out.line("}");
    }

    fn render_sync_handler_failed_application_exception_branch(
        &mut self,
        func: &Function,
        app_err_var: &str,
    ) {
        if func.oneway {
            self.out.line(&format!(
                "Err({}::Error::Application({}))",
                RUNTIME_CRATE, app_err_var
            ));
        } else {
            self.render_sync_handler_send_exception_response(func, app_err_var);
        }
    }

    fn render_sync_handler_failed_default_exception_branch(&mut self, func: &Function) {
        self.out.line("let ret_err = {");
        self.out.indent();
        self.render_error_struct_expr(
            "ApplicationError",
            "ApplicationErrorKind::Unknown",
            "e.to_string()",
        );
        self.out.dedent();
        self.out.line("};");
        if func.oneway {
            self.out.line(&format!(
                "Err({}::Error::Application(ret_err))",
                RUNTIME_CRATE
            ));
        } else {
            self.render_sync_handler_send_exception_response(func, "ret_err");
        }
    }

    fn render_sync_handler_send_exception_response(&mut self, func: &Function, err_var: &str) {
        // note: the *original* function name goes in the exception header
        self.out.line(&format!(
            "let message_ident = MessageIdentifier::new(\"{}\", MessageType::Exception, \
             incoming_sequence_number);",
            func.name
        ));
        self.out
            .line("o_prot.write_message_begin(&message_ident)?;");
        self.out.line(&format!(
            "{}::Error::write_application_error_to_out_protocol(&{}, o_prot)?;",
            RUNTIME_CRATE, err_var
        ));
        self.out.line("o_prot.write_message_end()?;");
        self.out.line("o_prot.flush()");
    }
}
