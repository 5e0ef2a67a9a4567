//! End-to-end codegen tests
//!
//! These tests build IDL trees in memory, run the generator, and assert on
//! the emitted Rust source. This keeps codegen changes reviewed and
//! intentional without touching the filesystem (the one disk test uses a
//! throwaway temp directory).

use std::time::{SystemTime, UNIX_EPOCH};

use quipu::model::{
    BaseType, ConstDecl, ConstValue, Declaration, EnumDecl, EnumValue, Field, FieldReq, Function,
    IdlType, Include, ParentService, Program, Service, StructDecl, StructFlavor, TypeRef,
    TypedefDecl, TypedefRef,
};
use quipu::{Generator, GeneratorOptions};

/// Generate Rust source for a program, without writing anything to disk.
fn generate(program: &Program) -> String {
    Generator::new(GeneratorOptions::default())
        .plan(program)
        .expect("emission failed")
        .content
}

fn empty_program(name: &str) -> Program {
    Program {
        name: name.to_string(),
        namespace: None,
        includes: vec![],
        declarations: vec![],
        services: vec![],
    }
}

fn field(id: i32, name: &str, ty: IdlType, req: FieldReq) -> Field {
    Field {
        id,
        name: name.to_string(),
        ty,
        req,
        doc: None,
    }
}

fn struct_decl(name: &str, flavor: StructFlavor, fields: Vec<Field>) -> StructDecl {
    StructDecl {
        name: name.to_string(),
        flavor,
        fields,
        doc: None,
    }
}

fn i32_ty() -> IdlType {
    IdlType::Base(BaseType::I32)
}

fn string_ty() -> IdlType {
    IdlType::Base(BaseType::String)
}

/// The Calc service fixture: `i32 add(1: i32 a, 2: i32 b) throws (1: Overflow o)`.
fn calc_program() -> Program {
    let mut program = empty_program("calc");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Overflow",
        StructFlavor::Exception,
        vec![field(1, "message", string_ty(), FieldReq::Required)],
    )));
    program.services.push(Service {
        name: "Calc".to_string(),
        extends: None,
        functions: vec![Function {
            name: "add".to_string(),
            return_type: i32_ty(),
            args: vec![
                field(1, "a", i32_ty(), FieldReq::Required),
                field(2, "b", i32_ty(), FieldReq::Required),
            ],
            exceptions: vec![field(
                1,
                "o",
                IdlType::Struct(TypeRef::local("Overflow")),
                FieldReq::Required,
            )],
            oneway: false,
            doc: None,
        }],
        doc: None,
    });
    program
}

// ============================================================================
// File framing
// ============================================================================

#[test]
fn test_file_framing() {
    let out = generate(&empty_program("demo"));
    assert!(out.starts_with("// Generated by the quipu IDL compiler v"));
    assert!(out.contains("// DO NOT EDIT UNLESS YOU ARE SURE THAT YOU KNOW WHAT YOU ARE DOING"));
    assert!(out.contains("#![allow(dead_code)]"));
    assert!(out.contains("#![allow(unused_imports)]"));
    assert!(out.contains("#![cfg_attr(rustfmt, rustfmt_skip)]"));
    assert!(out.contains("use quipu_rt::OrderedFloat;"));
    assert!(out.contains("use quipu_rt::server::Processor;"));
    assert!(out.contains("use quipu_rt::protocol::verify_required_field_exists;"));
}

#[test]
fn test_include_imports() {
    let mut program = empty_program("demo");
    program.includes.push(Include {
        name: "SharedTypes".to_string(),
        namespace: None,
    });
    program.includes.push(Include {
        name: "accounts".to_string(),
        namespace: Some("mycompany.rpc".to_string()),
    });
    let out = generate(&program);
    assert!(out.contains("use crate::shared_types;"));
    assert!(out.contains("use crate::mycompany::rpc::accounts;"));
}

#[test]
fn test_extension_closure_pulls_in_foreign_modules() {
    let mut program = empty_program("demo");
    // no direct include of `base_idl`; only the extends chain references it
    program.services.push(Service {
        name: "Child".to_string(),
        extends: Some(Box::new(ParentService {
            program: Some("base_idl".to_string()),
            namespace: None,
            service: Service {
                name: "Parent".to_string(),
                extends: None,
                functions: vec![],
                doc: None,
            },
        })),
        functions: vec![],
        doc: None,
    });
    let out = generate(&program);
    assert!(out.contains("use crate::base_idl;"));
    assert!(out.contains("pub trait TChildSyncClient : base_idl::TParentSyncClient {"));
}

// ============================================================================
// Typedefs and enums
// ============================================================================

#[test]
fn test_typedef_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Typedef(TypedefDecl {
        name: "UserId".to_string(),
        ty: IdlType::Base(BaseType::I64),
        doc: None,
    }));
    let out = generate(&program);
    assert!(out.contains("pub type UserId = i64;"));
}

#[test]
fn test_enum_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Enum(EnumDecl {
        name: "Color".to_string(),
        values: vec![
            EnumValue {
                name: "RED".to_string(),
                value: 0,
                doc: None,
            },
            EnumValue {
                name: "kind_of_blue".to_string(),
                value: 2,
                doc: None,
            },
        ],
        doc: None,
    }));
    let out = generate(&program);
    assert!(out.contains("pub struct Color(pub i32);"));
    assert!(out.contains("pub const RED: Color = Color(0);"));
    assert!(out.contains("pub const KIND_OF_BLUE: Color = Color(2);"));
    assert!(out.contains("pub const ENUM_VALUES: &'static [Self] = &["));
    assert!(out.contains("impl Serializable for Color {"));
    assert!(out.contains("o_prot.write_i32(self.0)"));
    assert!(out.contains("0 => Color::RED,"));
    assert!(out.contains("2 => Color::KIND_OF_BLUE,"));
    assert!(out.contains("_ => Color(i)"));
    assert!(out.contains("impl From<&Color> for i32 {"));
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn test_simple_const_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Const(ConstDecl {
        name: "max_retries".to_string(),
        ty: i32_ty(),
        value: ConstValue::Int(5),
        doc: None,
    }));
    program.declarations.push(Declaration::Const(ConstDecl {
        name: "greeting".to_string(),
        ty: string_ty(),
        value: ConstValue::Str("hello".to_string()),
        doc: None,
    }));
    let out = generate(&program);
    assert!(out.contains("pub const MAX_RETRIES: i32 = 5;"));
    assert!(out.contains("pub const GREETING: &str = \"hello\";"));
}

#[test]
fn test_const_holder_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Const(ConstDecl {
        name: "seeds".to_string(),
        ty: IdlType::list(i32_ty()),
        value: ConstValue::List(vec![ConstValue::Int(1), ConstValue::Int(2)]),
        doc: None,
    }));
    program.declarations.push(Declaration::Const(ConstDecl {
        name: "pi".to_string(),
        ty: IdlType::Base(BaseType::Double),
        value: ConstValue::Double(3.14),
        doc: None,
    }));
    let out = generate(&program);
    assert!(out.contains("pub struct ConstSeeds;"));
    assert!(out.contains("impl ConstSeeds {"));
    assert!(out.contains("pub fn const_value() -> Vec<i32> {"));
    assert!(out.contains("vec!["));
    assert!(out.contains("pub struct ConstPi;"));
    assert!(out.contains("pub fn const_value() -> OrderedFloat<f64> {"));
    assert!(out.contains("OrderedFloat::from(3.14_f64)"));
}

#[test]
fn test_struct_const_is_deliberately_unimplemented() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Point",
        StructFlavor::Regular,
        vec![field(1, "x", i32_ty(), FieldReq::Required)],
    )));
    program.declarations.push(Declaration::Const(ConstDecl {
        name: "origin".to_string(),
        ty: IdlType::Struct(TypeRef::local("Point")),
        value: ConstValue::Map(vec![]),
        doc: None,
    }));
    let out = generate(&program);
    assert!(out.contains("pub struct ConstOrigin;"));
    assert!(out.contains("unimplemented!()"));
}

// ============================================================================
// Structs
// ============================================================================

#[test]
fn test_point_struct_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Point",
        StructFlavor::Regular,
        vec![
            field(1, "x", i32_ty(), FieldReq::Required),
            field(2, "y", i32_ty(), FieldReq::Required),
        ],
    )));
    let out = generate(&program);

    // definition: all-required struct derives no Default
    assert!(out.contains("#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]"));
    assert!(out.contains("pub struct Point {"));
    assert!(out.contains("pub x: i32,"));
    assert!(out.contains("pub fn new(x: i32, y: i32) -> Point {"));
    assert!(out.contains("impl Serializable for Point {"));

    // write path: original names and ascending ids on the wire
    assert!(out.contains("let struct_ident = StructIdentifier::new(\"Point\");"));
    assert!(out.contains("o_prot.write_field_begin(&FieldIdentifier::new(\"x\", WireType::I32, 1))?;"));
    assert!(out.contains("o_prot.write_i32(self.x)?;"));
    assert!(out.contains("o_prot.write_field_stop()?;"));

    // read path: slots, skipping, required-field verification
    assert!(out.contains("let mut f_1: Option<i32> = None;"));
    assert!(out.contains("let field_id = field_id(&field_ident)?;"));
    assert!(out.contains("i_prot.skip(field_ident.field_type)?;"));
    assert!(out.contains("verify_required_field_exists(\"Point.x\", &f_1)?;"));
    assert!(out.contains("verify_required_field_exists(\"Point.y\", &f_2)?;"));
    assert!(out.contains(
        "x: f_1.expect(\"auto-generated code should have checked for presence of required \
         fields\"),"
    ));
}

#[test]
fn test_optional_field_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "S",
        StructFlavor::Regular,
        vec![field(1, "x", i32_ty(), FieldReq::Optional)],
    )));
    let out = generate(&program);

    // all-optional struct is default-constructible
    assert!(out.contains("#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]"));
    assert!(out.contains("pub x: Option<i32>,"));
    // ergonomic constructor
    assert!(out.contains("pub fn new<F1>(x: F1) -> S where F1: Into<Option<i32>> {"));
    assert!(out.contains("x: x.into(),"));
    // absent fields are simply not written
    assert!(out.contains("if let Some(fld_var) = self.x {"));
    // absent on the wire decodes to None, no verification
    assert!(out.contains("x: f_1,"));
    assert!(!out.contains("verify_required_field_exists(\"S.x\""));
}

#[test]
fn test_opt_in_req_out_zero_defaults() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Prefs",
        StructFlavor::Regular,
        vec![
            field(1, "motd", string_ty(), FieldReq::OptInReqOut),
            field(2, "retries", i32_ty(), FieldReq::OptInReqOut),
            field(3, "tags", IdlType::set(string_ty()), FieldReq::OptInReqOut),
        ],
    )));
    let out = generate(&program);
    assert!(out.contains("let mut f_1: Option<String> = Some(\"\".to_owned());"));
    assert!(out.contains("let mut f_2: Option<i32> = Some(0);"));
    assert!(out.contains("let mut f_3: Option<BTreeSet<String>> = Some(BTreeSet::new());"));
    // written only when present
    assert!(out.contains("if let Some(ref fld_var) = self.motd {"));
}

#[test]
fn test_reserved_name_mangling_keeps_wire_names() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "self",
        StructFlavor::Regular,
        vec![field(1, "match", i32_ty(), FieldReq::Required)],
    )));
    let out = generate(&program);
    // rust identifiers are suffixed
    assert!(out.contains("pub struct Self_ {"));
    assert!(out.contains("pub match_: i32,"));
    // the wire keeps the original spellings
    assert!(out.contains("let struct_ident = StructIdentifier::new(\"self\");"));
    assert!(out.contains("FieldIdentifier::new(\"match\", WireType::I32, 1)"));
}

#[test]
fn test_negative_and_zero_field_ids() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Legacy",
        StructFlavor::Regular,
        vec![
            field(-1, "old", i32_ty(), FieldReq::Optional),
            field(0, "zero", i32_ty(), FieldReq::Required),
        ],
    )));
    let out = generate(&program);
    assert!(out.contains("let mut f_neg1: Option<i32> = None;"));
    assert!(out.contains("let mut f_0: Option<i32> = None;"));
    assert!(out.contains("neg1 => {"));
    assert!(out.contains("pub fn new<Fneg1>(old: Fneg1, zero: i32) -> Legacy where Fneg1: Into<Option<i32>> {"));
    assert!(out.contains("FieldIdentifier::new(\"old\", WireType::I32, -1)"));
}

#[test]
fn test_doc_comments_are_rendered() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(StructDecl {
        name: "Point".to_string(),
        flavor: StructFlavor::Regular,
        fields: vec![Field {
            id: 1,
            name: "x".to_string(),
            ty: i32_ty(),
            req: FieldReq::Required,
            doc: Some("Horizontal position.".to_string()),
        }],
        doc: Some("A point on the plane.".to_string()),
    }));
    let out = generate(&program);
    assert!(out.contains("/// A point on the plane."));
    assert!(out.contains("/// Horizontal position."));
}

#[test]
fn test_exception_codegen() {
    let out = generate(&calc_program());
    assert!(out.contains("pub struct Overflow {"));
    assert!(out.contains("impl Error for Overflow {}"));
    assert!(out.contains("impl From<Overflow> for quipu_rt::Error {"));
    assert!(out.contains("quipu_rt::Error::User(Box::new(e))"));
    // display uses the *original* IDL name
    assert!(out.contains("write!(f, \"remote service threw Overflow\")"));
}

// ============================================================================
// Unions
// ============================================================================

#[test]
fn test_union_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "U",
        StructFlavor::Union,
        vec![
            field(1, "a", i32_ty(), FieldReq::Required),
            field(2, "b", string_ty(), FieldReq::Required),
        ],
    )));
    let out = generate(&program);

    assert!(out.contains("pub enum U {"));
    assert!(out.contains("A(i32),"));
    assert!(out.contains("B(String),"));

    // write: scalar variants match by value, the rest by ref
    assert!(out.contains("U::A(f) => {"));
    assert!(out.contains("U::B(ref f) => {"));

    // read: first populated variant wins; zero or several is a protocol error
    assert!(out.contains("let mut ret: Option<U> = None;"));
    assert!(out.contains("let mut received_field_count = 0;"));
    assert!(out.contains("if ret.is_none() {"));
    assert!(out.contains("ret = Some(U::A(val));"));
    assert!(out.contains("\"received empty union from remote U\""));
    assert!(out.contains("\"received multiple fields for union from remote U\""));
    assert!(out.contains("\"return value should have been constructed\""));
}

#[test]
fn test_zero_field_union_is_rejected() {
    let mut program = empty_program("demo");
    program
        .declarations
        .push(Declaration::Struct(struct_decl("Nothing", StructFlavor::Union, vec![])));
    let err = Generator::new(GeneratorOptions::default())
        .plan(&program)
        .unwrap_err();
    assert!(err.to_string().contains("zero-field union `Nothing`"));
}

// ============================================================================
// Recursive types via forward typedefs
// ============================================================================

#[test]
fn test_recursive_forward_typedef_codegen() {
    let node_list = IdlType::list(IdlType::Struct(TypeRef::local("Node")));
    let forward_nodes = IdlType::Typedef(TypedefRef {
        symbolic: "Nodes".to_string(),
        program: None,
        target: Box::new(node_list.clone()),
        forward: true,
    });

    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Typedef(TypedefDecl {
        name: "Nodes".to_string(),
        ty: node_list,
        doc: None,
    }));
    program.declarations.push(Declaration::Struct(struct_decl(
        "Node",
        StructFlavor::Regular,
        vec![
            field(1, "v", i32_ty(), FieldReq::Required),
            field(2, "children", forward_nodes, FieldReq::Required),
        ],
    )));
    let out = generate(&program);

    assert!(out.contains("pub type Nodes = Vec<Node>;"));
    // the field type is the heap-owned alias
    assert!(out.contains("pub children: Box<Nodes>,"));
    // the read expression is boxed to match
    assert!(out.contains("let mut val: Vec<Node> = Vec::with_capacity(list_ident.size as usize);"));
    assert!(out.contains("val.push(list_elem_0);"));
    assert!(out.contains("let val = Box::new(val);"));
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_nested_container_codegen() {
    let mut program = empty_program("demo");
    program.declarations.push(Declaration::Struct(struct_decl(
        "Graph",
        StructFlavor::Regular,
        vec![field(
            1,
            "edges",
            IdlType::map(string_ty(), IdlType::list(i32_ty())),
            FieldReq::Required,
        )],
    )));
    let out = generate(&program);

    assert!(out.contains("pub edges: BTreeMap<String, Vec<i32>>,"));
    // write side: identifiers carry both wire tags, elements deref as needed
    assert!(out.contains(
        "o_prot.write_map_begin(&MapIdentifier::new(WireType::String, WireType::List, \
         self.edges.len() as i32))?;"
    ));
    assert!(out.contains("for (k, v) in &self.edges {"));
    assert!(out.contains("o_prot.write_string(k)?;"));
    // read side: monotonic temp names, one per nesting level
    assert!(out.contains("let map_ident = i_prot.read_map_begin()?;"));
    assert!(out.contains("let map_key_0 = i_prot.read_string()?;"));
    assert!(out.contains("let mut map_val_1: Vec<i32> = Vec::with_capacity(list_ident.size as usize);"));
    assert!(out.contains("let list_elem_2 = i_prot.read_i32()?;"));
    assert!(out.contains("map_val_1.push(list_elem_2);"));
}

// ============================================================================
// Services
// ============================================================================

#[test]
fn test_service_client_codegen() {
    let out = generate(&calc_program());

    assert!(out.contains("pub trait TCalcSyncClient {"));
    assert!(out.contains("fn add(&mut self, a: i32, b: i32) -> quipu_rt::Result<i32>;"));
    assert!(out.contains("pub trait TCalcSyncClientMarker {}"));
    assert!(out
        .contains("pub struct CalcSyncClient<IP, OP> where IP: InputProtocol, OP: OutputProtocol {"));
    assert!(out.contains("pub fn new(input_protocol: IP, output_protocol: OP) -> CalcSyncClient<IP, OP> {"));
    assert!(out.contains("fn i_prot_mut(&mut self) -> &mut dyn InputProtocol { &mut self._i_prot }"));
    assert!(out.contains("impl <C: RpcClient + TCalcSyncClientMarker> TCalcSyncClient for C {"));

    // send: original name, call message, args struct shorthand
    assert!(out.contains("self.increment_sequence_number();"));
    assert!(out.contains(
        "let message_ident = MessageIdentifier::new(\"add\", MessageType::Call, \
         self.sequence_number());"
    ));
    assert!(out.contains("let call_args = CalcAddArgs { a, b };"));
    assert!(out.contains("call_args.write_to_out_protocol(self.o_prot_mut())?;"));
    assert!(out.contains("self.o_prot_mut().flush()"));

    // recv: verification, exception path, result decoding
    assert!(out.contains("verify_expected_sequence_number(self.sequence_number(), message_ident.sequence_number)?;"));
    assert!(out.contains("verify_expected_service_call(\"add\", &message_ident.name)?;"));
    assert!(out.contains("if message_ident.message_type == MessageType::Exception {"));
    assert!(out.contains("return Err(quipu_rt::Error::Application(remote_error))"));
    assert!(out.contains("verify_expected_message_type(MessageType::Reply, message_ident.message_type)?;"));
    assert!(out.contains("let result = CalcAddResult::read_from_in_protocol(self.i_prot_mut())?;"));
    assert!(out.contains("result.ok_or()"));
}

#[test]
fn test_service_call_structs_codegen() {
    let out = generate(&calc_program());

    // module-internal visibility: no `pub` on the synthetic structs
    assert!(out.contains("struct CalcAddArgs {"));
    assert!(!out.contains("pub struct CalcAddArgs"));
    assert!(out.contains("struct CalcAddResult {"));
    assert!(!out.contains("pub struct CalcAddResult"));

    // args fields are forced required; result fields forced optional
    assert!(out.contains("a: i32,"));
    assert!(out.contains("result_value: Option<i32>,"));
    assert!(out.contains("o: Option<Overflow>,"));

    // wire names: `<function>_args` for args, the rust name for results
    assert!(out.contains("let struct_ident = StructIdentifier::new(\"add_args\");"));
    assert!(out.contains("let struct_ident = StructIdentifier::new(\"CalcAddResult\");"));

    // args reads verify every field regardless of declared optionality
    assert!(out.contains("verify_required_field_exists(\"CalcAddArgs.a\", &f_1)?;"));

    // ok_or: exceptions first, then the return value, then missing-result
    assert!(out.contains("fn ok_or(self) -> quipu_rt::Result<i32> {"));
    assert!(out.contains("if self.o.is_some() {"));
    assert!(out.contains("Err(quipu_rt::Error::User(Box::new(self.o.unwrap())))"));
    assert!(out.contains("} else if self.result_value.is_some() {"));
    assert!(out.contains("Ok(self.result_value.unwrap())"));
    assert!(out.contains("ApplicationErrorKind::MissingResult,"));
    assert!(out.contains("\"no result received for CalcAdd\""));
}

#[test]
fn test_service_processor_codegen() {
    let out = generate(&calc_program());

    assert!(out.contains("pub trait CalcSyncHandler {"));
    assert!(out.contains("fn handle_add(&self, a: i32, b: i32) -> quipu_rt::Result<i32>;"));
    assert!(out.contains("pub struct CalcSyncProcessor<H: CalcSyncHandler> {"));
    assert!(out.contains("pub struct TCalcProcessFunctions;"));
    assert!(out.contains("let args = CalcAddArgs::read_from_in_protocol(i_prot)?;"));
    assert!(out.contains("match handler.handle_add(args.a, args.b) {"));

    // success: a Reply carrying the result struct
    assert!(out.contains(
        "let message_ident = MessageIdentifier::new(\"add\", MessageType::Reply, \
         incoming_sequence_number);"
    ));
    assert!(out.contains("let ret = CalcAddResult { result_value: Some(handler_return), o: None };"));

    // a declared user exception still answers with a Reply
    assert!(out.contains("quipu_rt::Error::User(usr_err) => {"));
    assert!(out.contains("if usr_err.downcast_ref::<Overflow>().is_some() {"));
    assert!(out.contains("let err = usr_err.downcast::<Overflow>().expect(\"downcast already checked\");"));
    assert!(out.contains("let ret_err = CalcAddResult{ result_value: None, o: Some(*err) };"));

    // application and unknown errors answer with Exception messages
    assert!(out.contains("quipu_rt::Error::Application(app_err) => {"));
    assert!(out.contains(
        "let message_ident = MessageIdentifier::new(\"add\", MessageType::Exception, \
         incoming_sequence_number);"
    ));
    assert!(out.contains("quipu_rt::Error::write_application_error_to_out_protocol(&app_err, o_prot)?;"));
    assert!(out.contains("ApplicationErrorKind::Unknown,"));
    assert!(out.contains("e.to_string()"));

    // dispatch is by original name; unknown methods get UnknownMethod
    assert!(out.contains("let res = match &*message_ident.name {"));
    assert!(out.contains("\"add\" => {"));
    assert!(out.contains("self.process_add(message_ident.sequence_number, i_prot, o_prot)"));
    assert!(out.contains("method => {"));
    assert!(out.contains("ApplicationErrorKind::UnknownMethod,"));
    assert!(out.contains("format!(\"unknown method {}\", method)"));
    assert!(out.contains("quipu_rt::server::handle_process_result(&message_ident, res, o_prot)"));
}

#[test]
fn test_oneway_codegen() {
    let mut program = empty_program("demo");
    program.services.push(Service {
        name: "Log".to_string(),
        extends: None,
        functions: vec![Function {
            name: "ping".to_string(),
            return_type: IdlType::Base(BaseType::Void),
            args: vec![],
            exceptions: vec![],
            oneway: true,
            doc: None,
        }],
        doc: None,
    });
    let out = generate(&program);

    // client: OneWay message, no recv, trivial Ok
    assert!(out.contains("MessageType::OneWay"));
    assert!(!out.contains("LogPingResult"));

    // processor: unused sequence/output params, nothing written on success
    assert!(out.contains(
        "pub fn process_ping<H: LogSyncHandler>(handler: &H, _: i32, i_prot: &mut dyn \
         InputProtocol, _: &mut dyn OutputProtocol) -> quipu_rt::Result<()> {"
    ));
    assert!(out.contains("let _ = LogPingArgs::read_from_in_protocol(i_prot)?;"));
    // oneway failures surface to the caller instead of the wire
    assert!(out.contains("Err(quipu_rt::Error::Application(ret_err))"));
}

#[test]
fn test_service_extension_codegen() {
    let base = Service {
        name: "Base".to_string(),
        extends: None,
        functions: vec![Function {
            name: "ping".to_string(),
            return_type: IdlType::Base(BaseType::Void),
            args: vec![],
            exceptions: vec![],
            oneway: false,
            doc: None,
        }],
        doc: None,
    };
    let derived = Service {
        name: "Derived".to_string(),
        extends: Some(Box::new(ParentService {
            program: None,
            namespace: None,
            service: base.clone(),
        })),
        functions: vec![Function {
            name: "extra".to_string(),
            return_type: i32_ty(),
            args: vec![],
            exceptions: vec![],
            oneway: false,
            doc: None,
        }],
        doc: None,
    };
    let mut program = empty_program("demo");
    program.services.push(base);
    program.services.push(derived);
    let out = generate(&program);

    // trait inheritance and the transitive marker chain
    assert!(out.contains("pub trait TDerivedSyncClient : TBaseSyncClient {"));
    assert!(out.contains(
        "impl <IP, OP> TDerivedSyncClientMarker for DerivedSyncClient<IP, OP> where IP: \
         InputProtocol, OP: OutputProtocol {}"
    ));
    assert!(out.contains(
        "impl <IP, OP> TBaseSyncClientMarker for DerivedSyncClient<IP, OP> where IP: \
         InputProtocol, OP: OutputProtocol {}"
    ));
    assert!(out.contains(
        "impl <C: RpcClient + TDerivedSyncClientMarker + TBaseSyncClientMarker> \
         TDerivedSyncClient for C {"
    ));

    // the derived handler extends the base handler
    assert!(out.contains("pub trait DerivedSyncHandler : BaseSyncHandler {"));

    // the derived processor dispatches inherited methods by original name,
    // delegating to the declaring service's process functions
    let derived_processor = out
        .split("pub struct DerivedSyncProcessor")
        .nth(1)
        .expect("derived processor emitted");
    assert!(derived_processor.contains("\"ping\" => {"));
    assert!(derived_processor.contains("\"extra\" => {"));
    assert!(derived_processor
        .contains("TBaseProcessFunctions::process_ping(&self.handler, incoming_sequence_number, i_prot, o_prot)"));
}

// ============================================================================
// Output planning
// ============================================================================

#[test]
fn test_generate_writes_snake_cased_file() {
    let mut dir = std::env::temp_dir();
    let uniq = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("quipu_gen_test_{}", uniq));

    let program = empty_program("MyDemo");
    let generator = Generator::new(GeneratorOptions::default().out_dir(&dir));
    let path = generator.generate(&program).expect("generate failed");
    assert!(path.ends_with("my_demo.rs"));
    let on_disk = std::fs::read_to_string(&path).expect("generated file readable");
    assert_eq!(on_disk, generator.plan(&program).unwrap().content);

    // second run is a no-op rewrite
    let path2 = generator.generate(&program).expect("regenerate failed");
    assert_eq!(path, path2);

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_mangling_snapshot() {
    use quipu::backend::mangle::Mangler;
    let m = Mangler::default();
    let table = [
        format!("snake(MyStruct) = {}", m.snake("MyStruct")),
        format!("camel(add_args) = {}", m.camel("add_args")),
        format!("upper(FooBar) = {}", m.upper("FooBar")),
        format!("safe(type) = {}", m.safe("type")),
        format!("field(Match) = {}", m.field_name("Match")),
        format!("variant(kind_of_blue) = {}", m.enum_variant_name("kind_of_blue")),
        format!("id(-42) = {}", m.safe_field_id(-42)),
        format!("id(7) = {}", m.safe_field_id(7)),
    ]
    .join("\n");
    insta::assert_snapshot!(table, @r"
    snake(MyStruct) = my_struct
    camel(add_args) = AddArgs
    upper(FooBar) = FOO_BAR
    safe(type) = type_
    field(Match) = match_
    variant(kind_of_blue) = KIND_OF_BLUE
    id(-42) = neg42
    id(7) = 7
    ");
}

#[test]
fn test_typedef_emission_snapshot() {
    let mut program = empty_program("tiny");
    program.declarations.push(Declaration::Typedef(TypedefDecl {
        name: "UserId".to_string(),
        ty: IdlType::Base(BaseType::I64),
        doc: Some("Stable account identifier.".to_string()),
    }));
    let out = generate(&program);
    let typedef_section = out
        .split("use quipu_rt::server::Processor;\n\n")
        .nth(1)
        .expect("declarations follow the import block");
    insta::assert_snapshot!(typedef_section, @r"
    /// Stable account identifier.
    pub type UserId = i64;
    ");
}
