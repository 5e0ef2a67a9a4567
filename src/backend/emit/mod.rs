//! Emit Rust source code from a validated IDL program.
//!
//! This module defines [`ProgramEmitter`] and wires together the focused
//! submodules that implement tree → Rust emission. The heavy lifting lives in
//! those submodules; `mod.rs` holds the emitter state and the small helpers
//! every submodule leans on.
//!
//! ## See also
//! - [`program`]: file framing, imports and declaration dispatch
//! - [`types`]: IDL type → Rust type / wire tag mapping
//! - [`consts`]: constant emission
//! - [`structs`]: struct/union/exception definitions
//! - [`codec`]: wire read/write emission
//! - [`client`]: sync client emission
//! - [`server`]: sync processor emission

mod client;
mod codec;
mod consts;
mod program;
mod server;
mod structs;
mod types;

use quipu_core::lang::conventions::{RESULT_STRUCT_SUFFIX, RUNTIME_CRATE};

use crate::backend::mangle::Mangler;
use crate::backend::rust_emitter::RustEmitter;
use crate::model::{Field, FieldReq, Function, ParentService, Program};

/// Flavor of struct being emitted.
///
/// `Args` and `Result` are the synthetic structs that carry a service call's
/// parameters and its return/exceptions over the wire. They have module
/// visibility, and they override the declared optionality of their fields:
/// args fields are always required, result fields always optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StructKind {
    Regular,
    Args,
    Result,
    Exception,
}

/// Emit one generated Rust source file from an IDL program.
///
/// The emitter is a stateful walker: the only mutable state is the output
/// buffer (with its indentation level and temp-variable counter). Everything
/// else it reads from the borrowed program and mangler.
pub(crate) struct ProgramEmitter<'a> {
    program: &'a Program,
    mangler: &'a Mangler,
    out: RustEmitter,
}

impl<'a> ProgramEmitter<'a> {
    pub(crate) fn new(program: &'a Program, mangler: &'a Mangler) -> Self {
        ProgramEmitter {
            program,
            mangler,
            out: RustEmitter::new(),
        }
    }

    /// The optionality used for emission, which may differ from the declared
    /// optionality for the synthetic args/result flavors.
    fn actual_field_req(&self, field: &Field, kind: StructKind) -> FieldReq {
        match kind {
            StructKind::Args => FieldReq::Required,
            StructKind::Result => FieldReq::Optional,
            _ => field.req,
        }
    }

    /// Whether fields with this requiredness are wrapped in `Option<_>`.
    fn is_optional(&self, req: FieldReq) -> bool {
        matches!(req, FieldReq::Optional | FieldReq::OptInReqOut)
    }

    /// `pub ` (note trailing space) for user-visible structs, nothing for the
    /// module-internal args/result flavors.
    fn visibility(&self, kind: StructKind) -> &'static str {
        match kind {
            StructKind::Args | StructKind::Result => "",
            _ => "pub ",
        }
    }

    /// Namespace prefix for a type declared in `program`, empty when that is
    /// the program currently being emitted.
    fn type_namespace(&self, program: &Option<String>) -> String {
        match program {
            Some(p) if p != &self.program.name => format!("{}::", self.mangler.snake(p)),
            _ => String::new(),
        }
    }

    /// Namespace prefix for a parent service in an extension chain.
    fn parent_namespace(&self, parent: &ParentService) -> String {
        self.type_namespace(&parent.program)
    }

    /// Render an IDL doc comment. Rust docs have to abut the item they
    /// document, so no blank line follows.
    fn render_rustdoc(&mut self, doc: &Option<String>) {
        if let Some(doc) = doc {
            for line in doc.trim().lines() {
                self.out.doc_comment(line.trim_end());
            }
        }
    }

    /// Render the comment banner preceding a type or service block.
    fn render_type_comment(&mut self, name: &str) {
        self.out.line("//");
        self.out.line(&format!("// {}", name));
        self.out.line("//");
        self.out.blank_line();
    }

    /// `quipu_rt::Result<{ty}>` as it appears in generated signatures.
    fn rt_result(&self, ty: &str) -> String {
        format!("{}::Result<{}>", RUNTIME_CRATE, ty)
    }

    /// Render an `Err(quipu_rt::Error::…(…))` expression.
    ///
    /// `error_kind` is the `Error` variant name, `error_struct` the runtime
    /// error type, `sub_error_kind` its kind tag and `error_message` an
    /// already-rendered Rust expression.
    fn render_error_expr(
        &mut self,
        error_kind: &str,
        error_struct: &str,
        sub_error_kind: &str,
        error_message: &str,
    ) {
        self.out.line("Err(");
        self.out.indent();
        self.out
            .line(&format!("{}::Error::{}(", RUNTIME_CRATE, error_kind));
        self.out.indent();
        self.render_error_struct_expr(error_struct, sub_error_kind, error_message);
        self.out.dedent();
        self.out.line(")");
        self.out.dedent();
        self.out.line(")");
    }

    /// Render a runtime error-struct constructor expression.
    fn render_error_struct_expr(
        &mut self,
        error_struct: &str,
        sub_error_kind: &str,
        error_message: &str,
    ) {
        self.out.line(&format!("{}::new(", error_struct));
        self.out.indent();
        self.out.line(&format!("{},", sub_error_kind));
        self.out.line(error_message);
        self.out.dedent();
        self.out.line(")");
    }

    // ------------------------------------------------------------------
    // Service naming
    // ------------------------------------------------------------------

    fn client_trait_name(&self, service_name: &str) -> String {
        format!("T{}SyncClient", self.mangler.camel(service_name))
    }

    fn client_marker_trait_name(&self, service_name: &str) -> String {
        format!("T{}SyncClientMarker", self.mangler.camel(service_name))
    }

    fn client_impl_name(&self, service_name: &str) -> String {
        format!("{}SyncClient", self.mangler.camel(service_name))
    }

    fn handler_trait_name(&self, service_name: &str) -> String {
        format!("{}SyncHandler", self.mangler.camel(service_name))
    }

    fn processor_name(&self, service_name: &str) -> String {
        format!("{}SyncProcessor", self.mangler.camel(service_name))
    }

    fn process_functions_name(&self, service_name: &str) -> String {
        format!("T{}ProcessFunctions", self.mangler.camel(service_name))
    }

    /// Name of the function users invoke to make an outgoing service call.
    fn client_function_name(&self, func: &Function) -> String {
        self.mangler.field_name(&func.name)
    }

    /// Name of the function users implement to handle an incoming call.
    fn handler_function_name(&self, func: &Function) -> String {
        format!("handle_{}", self.mangler.snake(&func.name))
    }

    /// Rust name of the struct packing a call's arguments. The IDL frontend
    /// names the arglist `<function>_args`, hence the camel-cased suffix.
    fn args_struct_name(&self, service_name: &str, func: &Function) -> String {
        format!(
            "{}{}",
            self.mangler.camel(service_name),
            self.mangler.camel(&format!("{}_args", func.name))
        )
    }

    /// Rust name of the struct packing a call's return value and exceptions.
    fn result_struct_name(&self, service_name: &str, func: &Function) -> String {
        format!(
            "{}{}{}",
            self.mangler.camel(service_name),
            self.mangler.camel(&func.name),
            RESULT_STRUCT_SUFFIX
        )
    }

    // ------------------------------------------------------------------
    // Service-call parameter lists
    // ------------------------------------------------------------------

    /// The full parameter list for a service-call method, `self` included,
    /// e.g. `(&mut self, a: i32, b: i32)`.
    fn sync_service_call_declaration(&self, func: &Function, self_is_mutable: bool) -> String {
        let mut decl = String::from(if self_is_mutable { "(&mut self" } else { "(&self" });
        for arg in func.sorted_args() {
            decl.push_str(&format!(
                ", {}: {}",
                self.mangler.field_name(&arg.name),
                self.rust_type(&arg.ty)
            ));
        }
        decl.push(')');
        decl
    }

    /// The matching argument list for invoking a service-call method, each
    /// argument optionally prefixed (e.g. `(args.a, args.b)`).
    fn sync_service_call_invocation(&self, func: &Function, field_prefix: &str) -> String {
        let args: Vec<String> = func
            .sorted_args()
            .iter()
            .map(|arg| format!("{}{}", field_prefix, self.mangler.field_name(&arg.name)))
            .collect();
        format!("({})", args.join(", "))
    }
}
