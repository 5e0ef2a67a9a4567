//! Emit the synchronous service client.
//!
//! The method set lives in a blanket impl over any type satisfying the
//! runtime client contract plus the service's marker trait (and every
//! ancestor's marker trait). That is how an extending service's client picks
//! up its parents' methods without trait objects: the concrete client type
//! implements the whole marker chain.

use quipu_core::lang::conventions::{RUNTIME_CRATE, SYNC_CLIENT_BOUNDS, SYNC_CLIENT_BOUND_VARS};

use crate::backend::errors::EmitError;
use crate::model::{Function, Service};

use super::ProgramEmitter;

impl<'a> ProgramEmitter<'a> {
    pub(super) fn render_sync_client(&mut self, service: &Service) -> Result<(), EmitError> {
        let client_impl_name = self.client_impl_name(&service.name);

        // note: the banner uses the *original* service name
        self.render_type_comment(&format!("{} service client", service.name));
        self.render_sync_client_trait(service);
        self.render_sync_client_marker_trait(service);
        self.render_sync_client_definition_and_impl(&client_impl_name);
        self.render_sync_client_rpc_client_impl(&client_impl_name);
        self.render_sync_client_marker_trait_impls(service, &client_impl_name);
        self.out.blank_line();
        self.render_sync_client_process_impl(service)?;
        Ok(())
    }

    fn render_sync_client_trait(&mut self, service: &Service) {
        let extension = match &service.extends {
            Some(parent) => format!(
                " : {}{}",
                self.parent_namespace(parent),
                self.client_trait_name(&parent.service.name)
            ),
            None => String::new(),
        };

        self.render_rustdoc(&service.doc);
        self.out.line(&format!(
            "pub trait {}{} {{",
            self.client_trait_name(&service.name),
            extension
        ));
        self.out.indent();

        for func in &service.functions {
            self.render_rustdoc(&func.doc);
            self.out.line(&format!(
                "fn {}{} -> {};",
                self.client_function_name(func),
                self.sync_service_call_declaration(func, true),
                self.rt_result(&self.rust_type(&func.return_type))
            ));
        }

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
    }

    fn render_sync_client_marker_trait(&mut self, service: &Service) {
        self.out.line(&format!(
            "pub trait {} {{}}",
            self.client_marker_trait_name(&service.name)
        ));
        self.out.blank_line();
    }

    fn render_sync_client_definition_and_impl(&mut self, client_impl_name: &str) {
        // the client struct owns its two protocol endpoints by value and a
        // per-client sequence counter
        self.out.line(&format!(
            "pub struct {}{} {} {{",
            client_impl_name, SYNC_CLIENT_BOUND_VARS, SYNC_CLIENT_BOUNDS
        ));
        self.out.indent();
        self.out.line("_i_prot: IP,");
        self.out.line("_o_prot: OP,");
        self.out.line("_sequence_number: i32,");
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();

        self.out.line(&format!(
            "impl {} {}{} {} {{",
            SYNC_CLIENT_BOUND_VARS, client_impl_name, SYNC_CLIENT_BOUND_VARS, SYNC_CLIENT_BOUNDS
        ));
        self.out.indent();
        self.out.line(&format!(
            "pub fn new(input_protocol: IP, output_protocol: OP) -> {}{} {{",
            client_impl_name, SYNC_CLIENT_BOUND_VARS
        ));
        self.out.indent();
        self.out.line(&format!(
            "{} {{ _i_prot: input_protocol, _o_prot: output_protocol, _sequence_number: 0 }}",
            client_impl_name
        ));
        self.out.dedent();
        self.out.line("}");
        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
    }

    fn render_sync_client_rpc_client_impl(&mut self, client_impl_name: &str) {
        self.out.line(&format!(
            "impl {} RpcClient for {}{} {} {{",
            SYNC_CLIENT_BOUND_VARS, client_impl_name, SYNC_CLIENT_BOUND_VARS, SYNC_CLIENT_BOUNDS
        ));
        self.out.indent();

        self.out
            .line("fn i_prot_mut(&mut self) -> &mut dyn InputProtocol { &mut self._i_prot }");
        self.out
            .line("fn o_prot_mut(&mut self) -> &mut dyn OutputProtocol { &mut self._o_prot }");
        self.out
            .line("fn sequence_number(&self) -> i32 { self._sequence_number }");
        self.out.line(
            "fn increment_sequence_number(&mut self) -> i32 { self._sequence_number += 1; \
             self._sequence_number }",
        );

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
    }

    /// The concrete client implements its own marker trait and every
    /// ancestor's, so every blanket impl in the chain applies to it.
    fn render_sync_client_marker_trait_impls(&mut self, service: &Service, impl_name: &str) {
        self.out.line(&format!(
            "impl {} {} for {}{} {} {{}}",
            SYNC_CLIENT_BOUND_VARS,
            self.client_marker_trait_name(&service.name),
            impl_name,
            SYNC_CLIENT_BOUND_VARS,
            SYNC_CLIENT_BOUNDS
        ));

        let mut parent = service.extends.as_deref();
        while let Some(p) = parent {
            self.out.line(&format!(
                "impl {} {}{} for {}{} {} {{}}",
                SYNC_CLIENT_BOUND_VARS,
                self.parent_namespace(p),
                self.client_marker_trait_name(&p.service.name),
                impl_name,
                SYNC_CLIENT_BOUND_VARS,
                SYNC_CLIENT_BOUNDS
            ));
            parent = p.service.extends.as_deref();
        }
    }

    /// All ancestor marker traits, rendered as extra `+` bounds.
    fn sync_client_marker_traits_for_extension(&self, service: &Service) -> String {
        let mut extension = String::new();
        let mut parent = service.extends.as_deref();
        while let Some(p) = parent {
            extension.push_str(&format!(
                " + {}{}",
                self.parent_namespace(p),
                self.client_marker_trait_name(&p.service.name)
            ));
            parent = p.service.extends.as_deref();
        }
        extension
    }

    fn render_sync_client_process_impl(&mut self, service: &Service) -> Result<(), EmitError> {
        let marker_extension = self.sync_client_marker_traits_for_extension(service);

        self.out.line(&format!(
            "impl <C: RpcClient + {}{}> {} for C {{",
            self.client_marker_trait_name(&service.name),
            marker_extension,
            self.client_trait_name(&service.name)
        ));
        self.out.indent();

        for func in &service.functions {
            self.render_sync_send_recv_wrapper(service, func)?;
        }

        self.out.dedent();
        self.out.line("}");
        self.out.blank_line();
        Ok(())
    }

    fn render_sync_send_recv_wrapper(
        &mut self,
        service: &Service,
        func: &Function,
    ) -> Result<(), EmitError> {
        self.out.line(&format!(
            "fn {}{} -> {} {{",
            self.client_function_name(func),
            self.sync_service_call_declaration(func, true),
            self.rt_result(&self.rust_type(&func.return_type))
        ));
        self.out.indent();

        self.out.line("(");
        self.out.indent();
        self.render_sync_send(service, func);
        self.out.dedent();
        self.out.line(")?;");

        if func.oneway {
            self.out.line("Ok(())");
        } else {
            self.render_sync_recv(service, func);
        }

        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    fn render_sync_send(&mut self, service: &Service, func: &Function) {
        self.out.line("{");
        self.out.indent();

        let message_type = if func.oneway {
            "MessageType::OneWay"
        } else {
            "MessageType::Call"
        };
        self.out.line("self.increment_sequence_number();");
        // note: the *original* function name goes in the message header
        self.out.line(&format!(
            "let message_ident = MessageIdentifier::new(\"{}\", {}, self.sequence_number());",
            func.name, message_type
        ));

        // pack the arguments into the args struct; it is written even when
        // the call has no arguments
        let struct_fields: Vec<String> = func
            .sorted_args()
            .iter()
            .map(|arg| self.mangler.field_name(&arg.name))
            .collect();
        self.out.line(&format!(
            "let call_args = {} {{ {} }};",
            self.args_struct_name(&service.name, func),
            struct_fields.join(", ")
        ));

        self.out
            .line("self.o_prot_mut().write_message_begin(&message_ident)?;");
        self.out
            .line("call_args.write_to_out_protocol(self.o_prot_mut())?;");
        self.out
            .line("self.o_prot_mut().write_message_end()?;");
        self.out.line("self.o_prot_mut().flush()");

        self.out.dedent();
        self.out.line("}");
    }

    fn render_sync_recv(&mut self, service: &Service, func: &Function) {
        self.out.line("{");
        self.out.indent();

        self.out
            .line("let message_ident = self.i_prot_mut().read_message_begin()?;");
        self.out.line(
            "verify_expected_sequence_number(self.sequence_number(), \
             message_ident.sequence_number)?;",
        );
        // note: the *original* function name is verified
        self.out.line(&format!(
            "verify_expected_service_call(\"{}\", &message_ident.name)?;",
            func.name
        ));
        self.out
            .line("if message_ident.message_type == MessageType::Exception {");
        self.out.indent();
        self.out.line(&format!(
            "let remote_error = \
             {}::Error::read_application_error_from_in_protocol(self.i_prot_mut())?;",
            RUNTIME_CRATE
        ));
        self.out
            .line("self.i_prot_mut().read_message_end()?;");
        self.out.line(&format!(
            "return Err({}::Error::Application(remote_error))",
            RUNTIME_CRATE
        ));
        self.out.dedent();
        self.out.line("}");
        self.out
            .line("verify_expected_message_type(MessageType::Reply, message_ident.message_type)?;");
        self.out.line(&format!(
            "let result = {}::read_from_in_protocol(self.i_prot_mut())?;",
            self.result_struct_name(&service.name, func)
        ));
        self.out
            .line("self.i_prot_mut().read_message_end()?;");
        self.out.line("result.ok_or()");

        self.out.dedent();
        self.out.line("}");
    }
}
