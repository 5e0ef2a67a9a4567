//! IDL declaration definitions.

use super::types::IdlType;

/// A single parsed IDL program plus the metadata the emitter needs.
#[derive(Debug, Clone)]
pub struct Program {
    /// Program name as written in the IDL (usually the file stem).
    pub name: String,
    /// Dotted per-target namespace, e.g. `"mycompany.rpc"`.
    pub namespace: Option<String>,
    /// Direct includes of this program.
    pub includes: Vec<Include>,
    /// Typedefs, enums, consts and aggregates, in source order.
    pub declarations: Vec<Declaration>,
    /// Services, emitted after all other declarations.
    pub services: Vec<Service>,
}

/// A direct IDL include of another program.
#[derive(Debug, Clone)]
pub struct Include {
    pub name: String,
    pub namespace: Option<String>,
}

/// Non-service declarations, kept in source order.
#[derive(Debug, Clone)]
pub enum Declaration {
    Typedef(TypedefDecl),
    Enum(EnumDecl),
    Const(ConstDecl),
    Struct(StructDecl),
}

/// A typedef declaration.
#[derive(Debug, Clone)]
pub struct TypedefDecl {
    /// The alias being introduced.
    pub name: String,
    /// The aliased type.
    pub ty: IdlType,
    pub doc: Option<String>,
}

/// An enum declaration.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<EnumValue>,
    pub doc: Option<String>,
}

/// A single enum variant.
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub value: i32,
    pub doc: Option<String>,
}

/// A constant declaration.
#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub name: String,
    pub ty: IdlType,
    pub value: ConstValue,
    pub doc: Option<String>,
}

/// A recursive constant literal.
///
/// Set literals arrive as [`ConstValue::List`]; enum constants arrive as
/// [`ConstValue::Int`] carrying the variant's numeric value.
#[derive(Debug, Clone)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

/// Flavor of a user-declared aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructFlavor {
    Regular,
    Union,
    Exception,
}

/// A struct, union or exception declaration.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub flavor: StructFlavor,
    pub fields: Vec<Field>,
    pub doc: Option<String>,
}

impl StructDecl {
    /// Fields in stable emission order (ascending field id).
    pub fn sorted_fields(&self) -> Vec<&Field> {
        sorted_by_id(&self.fields)
    }
}

/// Field optionality as declared in the IDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldReq {
    Required,
    Optional,
    /// Written only when present; initialized to a zero default on read.
    OptInReqOut,
}

/// A struct/union/exception member or a function argument.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field id. Zero and negative ids are legal.
    pub id: i32,
    /// Name as written in the IDL; this spelling goes on the wire.
    pub name: String,
    pub ty: IdlType,
    pub req: FieldReq,
    pub doc: Option<String>,
}

/// A service declaration.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    /// The extended service, if any. Extension chains are assumed acyclic.
    pub extends: Option<Box<ParentService>>,
    pub functions: Vec<Function>,
    pub doc: Option<String>,
}

/// A link in a service-extension chain.
#[derive(Debug, Clone)]
pub struct ParentService {
    /// Declaring program name, `None` when declared in the current program.
    pub program: Option<String>,
    /// Dotted namespace of the declaring program (used for import closure).
    pub namespace: Option<String>,
    pub service: Service,
}

/// A function declared on a service.
#[derive(Debug, Clone)]
pub struct Function {
    /// Name as written in the IDL; this spelling goes on the wire and in
    /// dispatch strings.
    pub name: String,
    pub return_type: IdlType,
    /// Declared arguments, each a field of the synthetic args struct.
    pub args: Vec<Field>,
    /// Declared exceptions, each a field of the synthetic result struct.
    pub exceptions: Vec<Field>,
    pub oneway: bool,
    pub doc: Option<String>,
}

impl Function {
    /// Arguments in stable emission order (ascending field id).
    pub fn sorted_args(&self) -> Vec<&Field> {
        sorted_by_id(&self.args)
    }

    /// Declared exceptions in stable emission order (ascending field id).
    pub fn sorted_exceptions(&self) -> Vec<&Field> {
        sorted_by_id(&self.exceptions)
    }

    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

fn sorted_by_id(fields: &[Field]) -> Vec<&Field> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by_key(|f| f.id);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseType;

    fn field(id: i32, name: &str) -> Field {
        Field {
            id,
            name: name.to_string(),
            ty: IdlType::Base(BaseType::I32),
            req: FieldReq::Required,
            doc: None,
        }
    }

    #[test]
    fn fields_sort_by_ascending_id() {
        let decl = StructDecl {
            name: "S".to_string(),
            flavor: StructFlavor::Regular,
            fields: vec![field(3, "c"), field(-1, "a"), field(2, "b")],
            doc: None,
        };
        let order: Vec<i32> = decl.sorted_fields().iter().map(|f| f.id).collect();
        assert_eq!(order, vec![-1, 2, 3]);
    }
}
