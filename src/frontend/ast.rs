// src/frontend/ast.rs

use crate::frontend::Span;

/// Unique identifier for AST nodes. Semantic results (types, bindings,
/// lowering choices) live in side tables keyed by this id, so nodes stay
/// immutable after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

/// A parsed module body
#[derive(Debug, Clone)]
pub struct ModuleAst {
    pub body: Vec<Node>,
    pub location: Span,
}

/// All node kinds. The variant is the visitor dispatch tag: every pass and
/// the TIR generator branch on it in one match table.
#[derive(Debug, Clone)]
pub enum Node {
    IntegerLiteral(IntegerLiteral),
    FloatLiteral(FloatLiteral),
    StringLiteral(StringLiteral),
    SelfLiteral(SelfLiteral),
    Identifier(Identifier),
    Constant(Constant),
    Attribute(Attribute),
    Global(Global),
    Send(Send),
    Block(Block),
    MethodDef(MethodDef),
    ObjectDef(ObjectDef),
    TraitDef(TraitDef),
    TraitImpl(TraitImpl),
    Reopen(Reopen),
    DefineVariable(DefineVariable),
    Reassign(Reassign),
    TypeCast(TypeCast),
    Dereference(Dereference),
    RawInstruction(RawInstruction),
    Return(Return),
    Throw(Throw),
    Try(Try),
    Import(Import),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::IntegerLiteral(n) => n.id,
            Node::FloatLiteral(n) => n.id,
            Node::StringLiteral(n) => n.id,
            Node::SelfLiteral(n) => n.id,
            Node::Identifier(n) => n.id,
            Node::Constant(n) => n.id,
            Node::Attribute(n) => n.id,
            Node::Global(n) => n.id,
            Node::Send(n) => n.id,
            Node::Block(n) => n.id,
            Node::MethodDef(n) => n.id,
            Node::ObjectDef(n) => n.id,
            Node::TraitDef(n) => n.id,
            Node::TraitImpl(n) => n.id,
            Node::Reopen(n) => n.id,
            Node::DefineVariable(n) => n.id,
            Node::Reassign(n) => n.id,
            Node::TypeCast(n) => n.id,
            Node::Dereference(n) => n.id,
            Node::RawInstruction(n) => n.id,
            Node::Return(n) => n.id,
            Node::Throw(n) => n.id,
            Node::Try(n) => n.id,
            Node::Import(n) => n.id,
        }
    }

    pub fn location(&self) -> Span {
        match self {
            Node::IntegerLiteral(n) => n.location,
            Node::FloatLiteral(n) => n.location,
            Node::StringLiteral(n) => n.location,
            Node::SelfLiteral(n) => n.location,
            Node::Identifier(n) => n.location,
            Node::Constant(n) => n.location,
            Node::Attribute(n) => n.location,
            Node::Global(n) => n.location,
            Node::Send(n) => n.location,
            Node::Block(n) => n.location,
            Node::MethodDef(n) => n.location,
            Node::ObjectDef(n) => n.location,
            Node::TraitDef(n) => n.location,
            Node::TraitImpl(n) => n.location,
            Node::Reopen(n) => n.location,
            Node::DefineVariable(n) => n.location,
            Node::Reassign(n) => n.location,
            Node::TypeCast(n) => n.location,
            Node::Dereference(n) => n.location,
            Node::RawInstruction(n) => n.location,
            Node::Return(n) => n.location,
            Node::Throw(n) => n.location,
            Node::Try(n) => n.location,
            Node::Import(n) => n.location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegerLiteral {
    pub id: NodeId,
    pub value: i64,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct FloatLiteral {
    pub id: NodeId,
    pub value: f64,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct StringLiteral {
    pub id: NodeId,
    pub value: String,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct SelfLiteral {
    pub id: NodeId,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
    pub location: Span,
}

/// Constant reference, optionally scoped to a receiver: `Foo` or `expr.Foo`
#[derive(Debug, Clone)]
pub struct Constant {
    pub id: NodeId,
    pub name: String,
    pub receiver: Option<Box<Node>>,
    pub location: Span,
}

/// Attribute reference on self: `@name`
#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: NodeId,
    pub name: String,
    pub location: Span,
}

/// Module global reference, produced by desugaring (never parsed directly)
#[derive(Debug, Clone)]
pub struct Global {
    pub id: NodeId,
    pub name: String,
    pub location: Span,
}

/// A message send: `receiver.name(args, keyword: value)`.
///
/// Binary operators and literal collection syntax desugar to sends:
/// `a + b` is `a.+(b)`, `[x]` is `Array.new(x)`, and `%[k: v]` is a send
/// flagged with `hash_map_literal` that the generator expands itself.
#[derive(Debug, Clone)]
pub struct Send {
    pub id: NodeId,
    pub name: String,
    pub receiver: Option<Box<Node>>,
    pub arguments: Vec<Node>,
    pub keyword_arguments: Vec<(String, Node)>,
    pub hash_map_literal: bool,
    pub location: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Closure,
    Lambda,
}

/// A closure (`do (x) { ... }`, `{ ... }`) or lambda (`lambda { ... }`)
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub kind: BlockKind,
    pub arguments: Vec<ArgumentDef>,
    pub returns: Option<TypeRef>,
    pub throws: Option<TypeRef>,
    pub body: Vec<Node>,
    pub location: Span,
}

/// A method definition. `body` is `None` for required trait methods.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub id: NodeId,
    pub name: String,
    pub type_parameters: Vec<TypeParameterDef>,
    pub arguments: Vec<ArgumentDef>,
    pub returns: Option<TypeRef>,
    pub throws: Option<TypeRef>,
    pub body: Option<Vec<Node>>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub id: NodeId,
    pub name: String,
    pub type_parameters: Vec<TypeParameterDef>,
    pub body: Vec<Node>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct TraitDef {
    pub id: NodeId,
    pub name: String,
    pub type_parameters: Vec<TypeParameterDef>,
    pub body: Vec<Node>,
    pub location: Span,
}

/// `impl Trait for Object { ... }`
#[derive(Debug, Clone)]
pub struct TraitImpl {
    pub id: NodeId,
    pub trait_name: String,
    pub object_name: String,
    pub body: Vec<Node>,
    pub location: Span,
}

/// `impl Object { ... }` without a trait reopens the object
#[derive(Debug, Clone)]
pub struct Reopen {
    pub id: NodeId,
    pub name: String,
    pub body: Vec<Node>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct DefineVariable {
    pub id: NodeId,
    pub name: String,
    pub mutable: bool,
    pub value_type: Option<TypeRef>,
    pub value: Box<Node>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub enum ReassignTarget {
    Local(String),
    Attribute(String),
}

#[derive(Debug, Clone)]
pub struct Reassign {
    pub id: NodeId,
    pub target: ReassignTarget,
    pub value: Box<Node>,
    pub location: Span,
}

/// `expr as Type`: changes the static type, lowers to nothing
#[derive(Debug, Clone)]
pub struct TypeCast {
    pub id: NodeId,
    pub expression: Box<Node>,
    pub target: TypeRef,
    pub location: Span,
}

/// `*expr`
#[derive(Debug, Clone)]
pub struct Dereference {
    pub id: NodeId,
    pub expression: Box<Node>,
    pub location: Span,
}

/// `_intrinsic.<name>(args)`: the bridge to a VM opcode
#[derive(Debug, Clone)]
pub struct RawInstruction {
    pub id: NodeId,
    pub name: String,
    pub arguments: Vec<Node>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub id: NodeId,
    pub value: Option<Box<Node>>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct Throw {
    pub id: NodeId,
    pub value: Box<Node>,
    pub location: Span,
}

/// `try expr` or `try expr else (err) { body }`
#[derive(Debug, Clone)]
pub struct Try {
    pub id: NodeId,
    pub expression: Box<Node>,
    pub else_argument: Option<String>,
    pub else_body: Option<Vec<Node>>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub id: NodeId,
    /// Qualified name segments, e.g. ["std", "hash_map"]
    pub path: Vec<String>,
    pub symbols: Vec<ImportSymbol>,
    pub location: Span,
}

impl Import {
    pub fn qualified_name(&self) -> String {
        self.path.join("::")
    }
}

/// One symbol in an import list
#[derive(Debug, Clone)]
pub enum ImportSymbol {
    /// `self` (the module itself), optionally aliased
    SelfModule { alias: Option<String>, location: Span },
    /// `*`: re-export every module attribute
    Glob { location: Span },
    /// A named symbol with an optional alias
    Named {
        name: String,
        alias: Option<String>,
        location: Span,
    },
}

impl ImportSymbol {
    pub fn location(&self) -> Span {
        match self {
            ImportSymbol::SelfModule { location, .. } => *location,
            ImportSymbol::Glob { location } => *location,
            ImportSymbol::Named { location, .. } => *location,
        }
    }
}

/// Argument definition in a method or block signature
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub value_type: Option<TypeRef>,
    pub default: Option<Node>,
    pub rest: bool,
    pub location: Span,
}

/// A generic type parameter declaration: `!(T, U)`
#[derive(Debug, Clone)]
pub struct TypeParameterDef {
    pub name: String,
    pub location: Span,
}

/// A syntactic type annotation
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub arguments: Vec<TypeRef>,
    pub location: Span,
}
