// src/sema/mod.rs
//! The semantic layer: symbol tables, the type database, and the passes
//! that decorate the AST before TIR generation.

pub mod database;
pub mod message;
pub mod passes;
pub mod symbol_table;
pub mod types;

use crate::frontend::ast::NodeId;
use rustc_hash::FxHashMap;
use symbol_table::{Symbol, TableId};
use types::TypeId;

/// The method name a type implements to receive unresolvable sends
pub const UNKNOWN_MESSAGE: &str = "unknown_message";

/// The message sent to a trait to implement it for an object at runtime
pub const IMPLEMENT_TRAIT_MESSAGE: &str = "implement_trait";

/// The name of the `self` local, present in method, module and lambda scopes
pub const SELF_LOCAL: &str = "self";

/// How a name-ish node resolved, recorded per node by type inference and
/// consumed by the TIR generator.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A local, depth -1 for the current scope
    Local { depth: i32, symbol: Symbol },
    /// An identifier desugaring to a send to `self`
    SelfMethod,
    /// An identifier desugaring to a send to the module object
    ModuleMethod,
    /// An attribute of `self` (`@x`, or a constant found on self)
    SelfAttribute,
    /// A module global; the null symbol when resolution failed
    Global { symbol: Symbol },
    /// A receiverless send dispatching to `self`
    SelfReceiver,
    /// A receiverless send dispatching to the module object
    ModuleReceiver,
}

/// Per-module side tables filled by the semantic passes.
///
/// This is the Rust rendition of "fill in `type`, `symbol` and `depth` on
/// each node": nodes stay frozen and the passes key their results by
/// `NodeId`.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Resolved type per expression node
    pub types: FxHashMap<NodeId, TypeId>,
    /// Name resolution result per node that names something
    pub bindings: FxHashMap<NodeId, Binding>,
    /// Resolved block signature per send (and per try-else body)
    pub block_types: FxHashMap<NodeId, TypeId>,
    /// Static receiver type per send
    pub receiver_types: FxHashMap<NodeId, TypeId>,
    /// Locals table per block-defining node (methods, closures, lambdas,
    /// object/trait bodies, try else bodies)
    pub locals: FxHashMap<NodeId, TableId>,
    /// The module body's own locals table
    pub module_locals: Option<TableId>,
}

impl Analysis {
    pub fn node_type(&self, id: NodeId) -> TypeId {
        self.types.get(&id).copied().unwrap_or(TypeId::DYNAMIC)
    }

    pub fn binding(&self, id: NodeId) -> Option<&Binding> {
        self.bindings.get(&id)
    }
}
