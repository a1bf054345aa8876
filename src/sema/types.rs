// src/sema/types.rs
//! The type arena and type kinds.
//!
//! Every type a compile creates lives in one `TypeArena` and is referred to
//! by `TypeId`. Prototype chains, trait membership and generic instances
//! are all resolved through the arena; chain walks carry a visited set so a
//! cyclic prototype chain cannot hang the compiler.

use crate::sema::symbol_table::{Symbol, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Index of a type in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The dynamic type, always allocated at slot zero.
    pub const DYNAMIC: TypeId = TypeId(0);
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Dynamic,
    Object(ObjectType),
    Trait(TraitType),
    Block(BlockType),
    TypeParameter(TypeParameterType),
}

/// A prototype object: primitives, user objects and generic instances
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub prototype: Option<TypeId>,
    pub attributes: SymbolTable,
    pub implemented_traits: FxHashSet<TypeId>,
    pub type_parameters: TypeParameterTable,
    /// Concrete assignments for the declared parameters, filled on
    /// instantiation and during send inference
    pub type_parameter_instances: FxHashMap<String, TypeId>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, prototype: Option<TypeId>) -> Self {
        Self {
            name: name.into(),
            prototype,
            attributes: SymbolTable::new(),
            implemented_traits: FxHashSet::default(),
            type_parameters: TypeParameterTable::new(),
            type_parameter_instances: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraitType {
    pub name: String,
    pub prototype: Option<TypeId>,
    pub attributes: SymbolTable,
    pub type_parameters: TypeParameterTable,
    /// Methods declared without a body; implementors must define these
    pub required_methods: Vec<String>,
}

impl TraitType {
    pub fn new(name: impl Into<String>, prototype: Option<TypeId>) -> Self {
        Self {
            name: name.into(),
            prototype,
            attributes: SymbolTable::new(),
            type_parameters: TypeParameterTable::new(),
            required_methods: Vec::new(),
        }
    }
}

/// Distinguishes how a block binds `self` and what `return` means in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Method,
    Closure,
    Lambda,
}

#[derive(Debug, Clone)]
pub struct BlockArgument {
    pub name: String,
    pub value_type: TypeId,
    pub has_default: bool,
    pub rest: bool,
}

/// A block signature: methods, closures and lambdas
#[derive(Debug, Clone)]
pub struct BlockType {
    pub name: String,
    pub style: BlockStyle,
    pub prototype: TypeId,
    /// Every argument in declaration order. Methods carry an explicit
    /// `self` argument at slot zero; closures and lambdas do not.
    pub arguments: Vec<BlockArgument>,
    pub rest_argument: bool,
    pub throws: Option<TypeId>,
    pub returns: TypeId,
    pub type_parameters: TypeParameterTable,
}

impl BlockType {
    /// Number of caller-supplied arguments that must be present.
    pub fn required_arguments(&self) -> usize {
        self.caller_arguments()
            .filter(|arg| !arg.has_default && !arg.rest)
            .count()
    }

    /// The inclusive range of accepted positional argument counts, with
    /// `None` as the upper bound when a rest argument absorbs overflow.
    pub fn argument_count_range(&self) -> (usize, Option<usize>) {
        let required = self.required_arguments();
        if self.rest_argument {
            (required, None)
        } else {
            (required, Some(self.caller_arguments().count()))
        }
    }

    pub fn lookup_argument(&self, name: &str) -> Option<&BlockArgument> {
        self.caller_arguments().find(|arg| arg.name == name)
    }

    pub fn rest_argument_type(&self) -> Option<TypeId> {
        self.arguments
            .iter()
            .find(|arg| arg.rest)
            .map(|arg| arg.value_type)
    }

    /// Arguments as the caller sees them: the implicit `self` slot of a
    /// method is excluded.
    pub fn caller_arguments(&self) -> impl Iterator<Item = &BlockArgument> {
        let skip = if self.style == BlockStyle::Method { 1 } else { 0 };
        self.arguments.iter().skip(skip)
    }
}

#[derive(Debug, Clone)]
pub struct TypeParameterType {
    pub name: String,
    pub required_traits: Vec<TypeId>,
}

/// Ordered name -> parameter-type map attached to each generic container
#[derive(Debug, Clone, Default)]
pub struct TypeParameterTable {
    names: Vec<String>,
    mapping: FxHashMap<String, TypeId>,
}

impl TypeParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, parameter: TypeId) {
        let name = name.into();
        if !self.mapping.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.mapping.insert(name, parameter);
    }

    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.mapping.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mapping.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Import entries from a parent container, keeping existing ones.
    pub fn merge(&mut self, parent: &TypeParameterTable) {
        for name in parent.names() {
            if !self.mapping.contains_key(name) {
                self.names.push(name.clone());
                self.mapping.insert(name.clone(), parent.mapping[name]);
            }
        }
    }
}

/// Arena owning every type of a compile
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<TypeKind>,
}

impl TypeArena {
    pub fn new() -> Self {
        // Slot zero is reserved for Dynamic, see TypeId::DYNAMIC
        Self {
            types: vec![TypeKind::Dynamic],
        }
    }

    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.types[id.0 as usize]
    }

    pub fn object(&self, id: TypeId) -> Option<&ObjectType> {
        match self.get(id) {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, id: TypeId) -> Option<&mut ObjectType> {
        match self.get_mut(id) {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn block(&self, id: TypeId) -> Option<&BlockType> {
        match self.get(id) {
            TypeKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn is_dynamic(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeKind::Dynamic)
    }

    pub fn is_type_parameter(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeKind::TypeParameter(_))
    }

    /// True for generic object prototypes that declare type parameters.
    pub fn is_generic(&self, id: TypeId) -> bool {
        match self.get(id) {
            TypeKind::Object(object) => !object.type_parameters.is_empty(),
            _ => false,
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeKind::Dynamic => "Dynamic".to_string(),
            TypeKind::Object(object) => object.name.clone(),
            TypeKind::Trait(trait_type) => trait_type.name.clone(),
            TypeKind::Block(block) => block.name.clone(),
            TypeKind::TypeParameter(parameter) => parameter.name.clone(),
        }
    }

    pub fn prototype(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            TypeKind::Object(object) => object.prototype,
            TypeKind::Trait(trait_type) => trait_type.prototype,
            TypeKind::Block(block) => Some(block.prototype),
            _ => None,
        }
    }

    pub fn attributes(&self, id: TypeId) -> Option<&SymbolTable> {
        match self.get(id) {
            TypeKind::Object(object) => Some(&object.attributes),
            TypeKind::Trait(trait_type) => Some(&trait_type.attributes),
            _ => None,
        }
    }

    /// Look up an attribute on the type itself, without chain walking.
    pub fn lookup_attribute(&self, id: TypeId, name: &str) -> Symbol {
        match self.attributes(id) {
            Some(attributes) => attributes.lookup(name),
            None => Symbol::null(name),
        }
    }

    pub fn define_attribute(
        &mut self,
        id: TypeId,
        name: impl Into<String>,
        value_type: TypeId,
    ) -> Symbol {
        match self.get_mut(id) {
            TypeKind::Object(object) => object.attributes.define(name, value_type, false),
            TypeKind::Trait(trait_type) => trait_type.attributes.define(name, value_type, false),
            _ => Symbol::null(name),
        }
    }

    /// Look up a method by walking the prototype chain.
    pub fn lookup_method(&self, id: TypeId, name: &str) -> Symbol {
        let mut visited = FxHashSet::default();
        let mut current = Some(id);

        while let Some(type_id) = current {
            if !visited.insert(type_id) {
                break;
            }
            let symbol = self.lookup_attribute(type_id, name);
            if symbol.any() {
                return symbol;
            }
            current = self.prototype(type_id);
        }

        Symbol::null(name)
    }

    /// Attribute lookup walking the prototype chain. Dynamic receivers
    /// respond to everything.
    pub fn responds_to_message(&self, id: TypeId, name: &str) -> bool {
        if self.is_dynamic(id) {
            return true;
        }
        self.lookup_method(id, name).any()
    }

    /// Record a trait implementation: the trait joins the implemented set
    /// and its default methods are copied onto the implementor. Required
    /// methods are not copied; the implementor must define those itself.
    pub fn implement_trait(&mut self, target: TypeId, trait_id: TypeId) {
        let methods: Vec<Symbol> = match self.get(trait_id) {
            TypeKind::Trait(trait_type) => trait_type
                .attributes
                .iter()
                .filter(|method| !trait_type.required_methods.contains(&method.name))
                .cloned()
                .collect(),
            _ => return,
        };

        let Some(object) = self.object_mut(target) else {
            return;
        };
        object.implemented_traits.insert(trait_id);
        for method in methods {
            if !object.attributes.contains(&method.name) {
                object
                    .attributes
                    .define(method.name.clone(), method.value_type, false);
            }
        }
    }

    pub fn trait_type(&self, id: TypeId) -> Option<&TraitType> {
        match self.get(id) {
            TypeKind::Trait(trait_type) => Some(trait_type),
            _ => None,
        }
    }

    pub fn trait_type_mut(&mut self, id: TypeId) -> Option<&mut TraitType> {
        match self.get_mut(id) {
            TypeKind::Trait(trait_type) => Some(trait_type),
            _ => None,
        }
    }

    /// Reflective kind check: the prototype chain first, then the
    /// implemented-traits set of each walked prototype.
    pub fn implements_trait(&self, id: TypeId, trait_id: TypeId) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = Some(id);

        while let Some(type_id) = current {
            if !visited.insert(type_id) {
                break;
            }
            if type_id == trait_id {
                return true;
            }
            if let TypeKind::Object(object) = self.get(type_id)
                && object.implemented_traits.contains(&trait_id)
            {
                return true;
            }
            current = self.prototype(type_id);
        }

        false
    }

    /// True when the type opts into the unknown-message protocol: it, a
    /// prototype, or an implemented trait defines `unknown_message`.
    pub fn unknown_message_protocol(&self, id: TypeId) -> bool {
        if self.responds_to_message(id, crate::sema::UNKNOWN_MESSAGE) {
            return true;
        }

        let mut visited = FxHashSet::default();
        let mut current = Some(id);
        while let Some(type_id) = current {
            if !visited.insert(type_id) {
                break;
            }
            if let TypeKind::Object(object) = self.get(type_id) {
                for &trait_id in &object.implemented_traits {
                    if self
                        .lookup_attribute(trait_id, crate::sema::UNKNOWN_MESSAGE)
                        .any()
                    {
                        return true;
                    }
                }
            }
            current = self.prototype(type_id);
        }

        false
    }

    /// True iff a send of `name` must be lowered through the
    /// unknown-message fallback.
    pub fn guard_unknown_message(&self, id: TypeId, name: &str) -> bool {
        !self.responds_to_message(id, name) && self.unknown_message_protocol(id)
    }

    /// Concretize a possibly-parameterized type against a call site.
    /// Type parameters resolve through the call-site table first, then the
    /// receiver's instances; anything else resolves to itself.
    pub fn resolve_type(
        &self,
        id: TypeId,
        receiver: TypeId,
        parameters: &FxHashMap<String, TypeId>,
    ) -> TypeId {
        let TypeKind::TypeParameter(parameter) = self.get(id) else {
            return id;
        };

        if let Some(&resolved) = parameters.get(&parameter.name) {
            return resolved;
        }
        if let Some(object) = self.object(receiver)
            && let Some(&resolved) = object.type_parameter_instances.get(&parameter.name)
        {
            return resolved;
        }
        id
    }

    /// Instantiate a generic prototype with the given parameter
    /// assignments. Non-generic types come back unchanged.
    pub fn new_instance(&mut self, id: TypeId, parameters: &FxHashMap<String, TypeId>) -> TypeId {
        let Some(object) = self.object(id) else {
            return id;
        };
        if object.type_parameters.is_empty() {
            return id;
        }

        let mut instance = object.clone();
        for name in object.type_parameters.names().cloned().collect::<Vec<_>>() {
            if let Some(&assigned) = parameters.get(&name) {
                instance.type_parameter_instances.insert(name, assigned);
            }
        }
        self.alloc(TypeKind::Object(instance))
    }

    /// Structural compatibility used for argument checks.
    pub fn type_compatible(&self, found: TypeId, expected: TypeId) -> bool {
        if found == expected || self.is_dynamic(found) || self.is_dynamic(expected) {
            return true;
        }

        match self.get(expected) {
            TypeKind::Trait(_) => self.implements_trait(found, expected),
            TypeKind::TypeParameter(parameter) => parameter
                .required_traits
                .iter()
                .all(|&required| self.implements_trait(found, required)),
            TypeKind::Object(expected_object) => {
                if self.implements_trait(found, expected) {
                    return true;
                }
                // A generic instance stays compatible with its prototype
                match self.object(found) {
                    Some(found_object) => {
                        found_object.name == expected_object.name
                            && found_object.prototype == expected_object.prototype
                    }
                    None => false,
                }
            }
            TypeKind::Block(_) => self.block(found).is_some(),
            TypeKind::Dynamic => true,
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(arena: &mut TypeArena, name: &str, prototype: Option<TypeId>) -> TypeId {
        arena.alloc(TypeKind::Object(ObjectType::new(name, prototype)))
    }

    #[test]
    fn lookup_method_walks_the_prototype_chain() {
        let mut arena = TypeArena::new();
        let root = object(&mut arena, "Object", None);
        let child = object(&mut arena, "Child", Some(root));
        arena.define_attribute(root, "inspect", TypeId::DYNAMIC);

        assert!(arena.lookup_method(child, "inspect").any());
        assert!(!arena.lookup_attribute(child, "inspect").any());
    }

    #[test]
    fn cyclic_prototype_chains_terminate() {
        let mut arena = TypeArena::new();
        let a = object(&mut arena, "A", None);
        let b = object(&mut arena, "B", Some(a));
        arena.object_mut(a).unwrap().prototype = Some(b);

        assert!(!arena.lookup_method(a, "missing").any());
        assert!(!arena.implements_trait(a, TypeId::DYNAMIC));
    }

    #[test]
    fn implement_trait_copies_methods_and_records_membership() {
        let mut arena = TypeArena::new();
        let target = object(&mut arena, "Person", None);
        let to_string = arena.alloc(TypeKind::Trait(TraitType::new("ToString", None)));
        arena.define_attribute(to_string, "to_string", TypeId::DYNAMIC);

        arena.implement_trait(target, to_string);

        assert!(arena.implements_trait(target, to_string));
        assert!(arena.lookup_attribute(target, "to_string").any());
    }

    #[test]
    fn guard_unknown_message_requires_protocol_and_missing_method() {
        let mut arena = TypeArena::new();
        let plain = object(&mut arena, "Plain", None);
        assert!(!arena.guard_unknown_message(plain, "ping"));

        let open = object(&mut arena, "Open", None);
        arena.define_attribute(open, crate::sema::UNKNOWN_MESSAGE, TypeId::DYNAMIC);
        assert!(arena.guard_unknown_message(open, "ping"));

        // A defined method never takes the fallback path
        arena.define_attribute(open, "ping", TypeId::DYNAMIC);
        assert!(!arena.guard_unknown_message(open, "ping"));
    }

    #[test]
    fn dynamic_receivers_respond_to_everything() {
        let arena = TypeArena::new();
        assert!(arena.responds_to_message(TypeId::DYNAMIC, "anything"));
        assert!(!arena.guard_unknown_message(TypeId::DYNAMIC, "anything"));
    }

    #[test]
    fn resolve_type_prefers_call_site_parameters() {
        let mut arena = TypeArena::new();
        let integer = object(&mut arena, "Integer", None);
        let string = object(&mut arena, "String", None);
        let parameter = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));

        let mut receiver_object = ObjectType::new("Array", None);
        receiver_object
            .type_parameter_instances
            .insert("T".to_string(), string);
        let receiver = arena.alloc(TypeKind::Object(receiver_object));

        let mut call_site = FxHashMap::default();
        call_site.insert("T".to_string(), integer);

        assert_eq!(arena.resolve_type(parameter, receiver, &call_site), integer);

        let empty = FxHashMap::default();
        assert_eq!(arena.resolve_type(parameter, receiver, &empty), string);
    }

    #[test]
    fn new_instance_binds_declared_parameters() {
        let mut arena = TypeArena::new();
        let integer = object(&mut arena, "Integer", None);
        let parameter = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));

        let mut array_object = ObjectType::new("Array", None);
        array_object.type_parameters.define("T", parameter);
        let array = arena.alloc(TypeKind::Object(array_object));

        let mut assignments = FxHashMap::default();
        assignments.insert("T".to_string(), integer);

        let instance = arena.new_instance(array, &assignments);
        assert_ne!(instance, array);
        assert_eq!(
            arena
                .object(instance)
                .unwrap()
                .type_parameter_instances
                .get("T"),
            Some(&integer)
        );
        // Instances remain compatible with the base prototype
        assert!(arena.type_compatible(instance, array));
    }

    #[test]
    fn type_parameter_table_merge_imports_parent_entries() {
        let mut parent = TypeParameterTable::new();
        parent.define("T", TypeId::DYNAMIC);
        parent.define("U", TypeId::DYNAMIC);

        let mut child = TypeParameterTable::new();
        child.define("U", TypeId(7));
        child.merge(&parent);

        assert_eq!(child.get("U"), Some(TypeId(7)));
        assert!(child.contains("T"));
        let names: Vec<_> = child.names().cloned().collect();
        assert_eq!(names, vec!["U".to_string(), "T".to_string()]);
    }

    #[test]
    fn block_argument_count_range() {
        let mut arena = TypeArena::new();
        let proto = object(&mut arena, "Block", None);
        let block = BlockType {
            name: "example".to_string(),
            style: BlockStyle::Method,
            prototype: proto,
            arguments: vec![
                BlockArgument {
                    name: "self".to_string(),
                    value_type: TypeId::DYNAMIC,
                    has_default: false,
                    rest: false,
                },
                BlockArgument {
                    name: "a".to_string(),
                    value_type: TypeId::DYNAMIC,
                    has_default: false,
                    rest: false,
                },
                BlockArgument {
                    name: "b".to_string(),
                    value_type: TypeId::DYNAMIC,
                    has_default: true,
                    rest: false,
                },
            ],
            rest_argument: false,
            throws: None,
            returns: TypeId::DYNAMIC,
            type_parameters: TypeParameterTable::new(),
        };

        assert_eq!(block.argument_count_range(), (1, Some(2)));
        assert!(block.lookup_argument("b").is_some());
        assert!(block.lookup_argument("self").is_none());
    }
}
