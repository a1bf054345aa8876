// src/sema/message.rs
//! Per-call-site context for send inference.

use crate::frontend::Span;
use crate::sema::types::{TypeArena, TypeId};
use rustc_hash::FxHashMap;

/// Everything inference knows about one send: the receiver, the resolved
/// block signature, argument types, and a fresh type-parameter table
/// seeded from the receiver and block.
#[derive(Debug)]
pub struct MessageContext {
    pub receiver: TypeId,
    pub block: TypeId,
    pub arguments: Vec<TypeId>,
    pub type_parameters: FxHashMap<String, TypeId>,
    pub location: Span,
}

impl MessageContext {
    pub fn new(arena: &TypeArena, receiver: TypeId, block: TypeId, location: Span) -> Self {
        let mut type_parameters = FxHashMap::default();

        // Seed with the receiver's already-known assignments, then leave
        // the block's own parameters open for argument inference.
        if let Some(object) = arena.object(receiver) {
            for (name, &assigned) in &object.type_parameter_instances {
                type_parameters.insert(name.clone(), assigned);
            }
        }

        Self {
            receiver,
            block,
            arguments: Vec::new(),
            type_parameters,
            location,
        }
    }

    /// Bind a type parameter the first time it meets a concrete argument
    /// type. Both the call-site table and the receiver's instance table
    /// are updated when the receiver declares the parameter.
    pub fn initialize_type_parameter(&mut self, arena: &mut TypeArena, name: &str, assigned: TypeId) {
        if self.type_parameters.contains_key(name) {
            return;
        }
        self.type_parameters.insert(name.to_string(), assigned);

        if let Some(object) = arena.object_mut(self.receiver)
            && object.type_parameters.contains(name)
            && !object.type_parameter_instances.contains_key(name)
        {
            object
                .type_parameter_instances
                .insert(name.to_string(), assigned);
        }
    }

    /// The send's result type: the block's declared return type, resolved
    /// against the receiver and call site, then instantiated if the result
    /// is still a generic prototype. The resolve-then-instantiate order is
    /// load-bearing: a generic return may depend on a parameter captured
    /// from the receiver.
    pub fn initialized_return_type(&self, arena: &mut TypeArena) -> TypeId {
        let returns = match arena.block(self.block) {
            Some(block) => block.returns,
            None => return TypeId::DYNAMIC,
        };

        let resolved = arena.resolve_type(returns, self.receiver, &self.type_parameters);
        if arena.is_generic(resolved) {
            arena.new_instance(resolved, &self.type_parameters)
        } else {
            resolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::types::{
        BlockArgument, BlockStyle, BlockType, ObjectType, TypeKind, TypeParameterTable,
        TypeParameterType,
    };

    fn method_returning(arena: &mut TypeArena, returns: TypeId) -> TypeId {
        let prototype = arena.alloc(TypeKind::Object(ObjectType::new("Block", None)));
        arena.alloc(TypeKind::Block(BlockType {
            name: "example".to_string(),
            style: BlockStyle::Method,
            prototype,
            arguments: vec![BlockArgument {
                name: "self".to_string(),
                value_type: TypeId::DYNAMIC,
                has_default: false,
                rest: false,
            }],
            rest_argument: false,
            throws: None,
            returns,
            type_parameters: TypeParameterTable::new(),
        }))
    }

    #[test]
    fn return_type_resolves_through_call_site_parameters() {
        let mut arena = TypeArena::new();
        let integer = arena.alloc(TypeKind::Object(ObjectType::new("Integer", None)));
        let parameter = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));
        let receiver = arena.alloc(TypeKind::Object(ObjectType::new("Thing", None)));
        let block = method_returning(&mut arena, parameter);

        let mut context = MessageContext::new(&arena, receiver, block, Span::default());
        context.initialize_type_parameter(&mut arena, "T", integer);

        assert_eq!(context.initialized_return_type(&mut arena), integer);
    }

    #[test]
    fn return_type_falls_back_to_receiver_instances() {
        let mut arena = TypeArena::new();
        let string = arena.alloc(TypeKind::Object(ObjectType::new("String", None)));
        let parameter = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));

        let mut receiver_object = ObjectType::new("Array", None);
        receiver_object.type_parameters.define("T", parameter);
        receiver_object
            .type_parameter_instances
            .insert("T".to_string(), string);
        let receiver = arena.alloc(TypeKind::Object(receiver_object));
        let block = method_returning(&mut arena, parameter);

        let context = MessageContext::new(&arena, receiver, block, Span::default());
        assert_eq!(context.initialized_return_type(&mut arena), string);
    }

    #[test]
    fn generic_returns_are_instantiated_after_resolution() {
        let mut arena = TypeArena::new();
        let integer = arena.alloc(TypeKind::Object(ObjectType::new("Integer", None)));
        let element = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));
        let mut array_object = ObjectType::new("Array", None);
        array_object.type_parameters.define("T", element);
        let array = arena.alloc(TypeKind::Object(array_object));

        let receiver = arena.alloc(TypeKind::Object(ObjectType::new("Thing", None)));
        let block = method_returning(&mut arena, array);

        let mut context = MessageContext::new(&arena, receiver, block, Span::default());
        context.initialize_type_parameter(&mut arena, "T", integer);

        let result = context.initialized_return_type(&mut arena);
        assert_ne!(result, array);
        assert_eq!(
            arena.object(result).unwrap().type_parameter_instances.get("T"),
            Some(&integer)
        );
    }

    #[test]
    fn initialize_type_parameter_updates_receiver_once() {
        let mut arena = TypeArena::new();
        let integer = arena.alloc(TypeKind::Object(ObjectType::new("Integer", None)));
        let string = arena.alloc(TypeKind::Object(ObjectType::new("String", None)));
        let element = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: "T".to_string(),
            required_traits: Vec::new(),
        }));
        let mut receiver_object = ObjectType::new("Array", None);
        receiver_object.type_parameters.define("T", element);
        let receiver = arena.alloc(TypeKind::Object(receiver_object));
        let block = method_returning(&mut arena, element);

        let mut context = MessageContext::new(&arena, receiver, block, Span::default());
        context.initialize_type_parameter(&mut arena, "T", integer);
        // The second initialization is ignored: first concrete type wins
        context.initialize_type_parameter(&mut arena, "T", string);

        assert_eq!(
            arena
                .object(receiver)
                .unwrap()
                .type_parameter_instances
                .get("T"),
            Some(&integer)
        );
        assert_eq!(context.initialized_return_type(&mut arena), integer);
    }
}
