//! In-memory IDL tree consumed by the generator.
//!
//! The model mirrors what a Thrift-style frontend hands over after semantic
//! analysis: a [`Program`] owning typedefs, enums, consts, aggregates and
//! services, with named types carrying their declaring program so the emitter
//! can qualify foreign references. The generator never mutates any of it.

mod decl;
mod types;

pub use decl::{
    ConstDecl, ConstValue, Declaration, EnumDecl, EnumValue, Field, FieldReq, Function, Include,
    ParentService, Program, Service, StructDecl, StructFlavor, TypedefDecl,
};
pub use types::{BaseType, IdlType, TypeRef, TypedefRef};
