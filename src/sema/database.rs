// src/sema/database.rs
//
// Canonical singleton prototypes, created once per compile and looked up
// by the passes and the generator without re-resolution.

use crate::sema::types::{
    BlockArgument, BlockStyle, BlockType, ObjectType, TypeArena, TypeId, TypeKind,
    TypeParameterTable, TypeParameterType,
};
use rustc_hash::FxHashMap;

/// The built-in global names every module starts with, in the order the
/// imports block binds them.
pub const BUILTIN_GLOBALS: &[&str] = &[
    "Object", "Integer", "Float", "String", "Boolean", "True", "False", "Nil", "Array", "Block",
    "Trait", "Module",
];

/// The name of the Array element type parameter.
pub const ARRAY_ELEMENT_PARAMETER: &str = "T";

/// The per-compile type database: one arena plus the well-known prototypes.
#[derive(Debug)]
pub struct TypeDatabase {
    pub arena: TypeArena,
    /// The object every module's root scope ultimately hangs off
    pub toplevel: TypeId,
    pub object: TypeId,
    pub integer: TypeId,
    pub float: TypeId,
    pub string: TypeId,
    pub boolean: TypeId,
    pub nil: TypeId,
    pub array: TypeId,
    pub block: TypeId,
    pub trait_prototype: TypeId,
    pub module_prototype: TypeId,
}

impl TypeDatabase {
    pub fn new() -> Self {
        let mut arena = TypeArena::new();

        let object = arena.alloc(TypeKind::Object(ObjectType::new("Object", None)));
        let toplevel = arena.alloc(TypeKind::Object(ObjectType::new("Toplevel", Some(object))));
        let integer = arena.alloc(TypeKind::Object(ObjectType::new("Integer", Some(object))));
        let float = arena.alloc(TypeKind::Object(ObjectType::new("Float", Some(object))));
        let string = arena.alloc(TypeKind::Object(ObjectType::new("String", Some(object))));
        let boolean = arena.alloc(TypeKind::Object(ObjectType::new("Boolean", Some(object))));
        let nil = arena.alloc(TypeKind::Object(ObjectType::new("Nil", Some(object))));
        let block = arena.alloc(TypeKind::Object(ObjectType::new("Block", Some(object))));
        let trait_prototype = arena.alloc(TypeKind::Object(ObjectType::new("Trait", Some(object))));
        let module_prototype =
            arena.alloc(TypeKind::Object(ObjectType::new("Module", Some(object))));

        // Array is generic over its element type
        let element = arena.alloc(TypeKind::TypeParameter(TypeParameterType {
            name: ARRAY_ELEMENT_PARAMETER.to_string(),
            required_traits: Vec::new(),
        }));
        let mut array_object = ObjectType::new("Array", Some(object));
        array_object
            .type_parameters
            .define(ARRAY_ELEMENT_PARAMETER, element);
        let array = arena.alloc(TypeKind::Object(array_object));

        let database = Self {
            arena,
            toplevel,
            object,
            integer,
            float,
            string,
            boolean,
            nil,
            array,
            block,
            trait_prototype,
            module_prototype,
        };
        database
            .register_toplevel_constants()
            .register_primitive_operators()
    }

    /// Expose the prototypes as attributes of the toplevel so constant
    /// resolution and the imports block can reach them by name.
    fn register_toplevel_constants(mut self) -> Self {
        let pairs = [
            ("Object", self.object),
            ("Integer", self.integer),
            ("Float", self.float),
            ("String", self.string),
            ("Boolean", self.boolean),
            ("True", self.boolean),
            ("False", self.boolean),
            ("Nil", self.nil),
            ("Array", self.array),
            ("Block", self.block),
            ("Trait", self.trait_prototype),
            ("Module", self.module_prototype),
        ];
        for (name, type_id) in pairs {
            self.arena.define_attribute(self.toplevel, name, type_id);
        }
        self
    }

    /// Register the operator methods the VM implements natively. The
    /// generator lowers sends to these straight to primitive opcodes when
    /// the receiver's static type is the matching prototype.
    fn register_primitive_operators(mut self) -> Self {
        let arithmetic = ["+", "-", "*", "/", "%"];
        let bitwise = ["&", "|", "^", "<<", ">>"];
        let comparisons = ["<", ">", "<=", ">=", "==", "!="];

        for &name in arithmetic.iter().chain(bitwise.iter()) {
            self.define_primitive_method(self.integer, name, &[self.integer], self.integer);
        }
        for name in comparisons {
            self.define_primitive_method(self.integer, name, &[self.integer], self.boolean);
        }
        self.define_primitive_method(self.integer, "to_float", &[], self.float);
        self.define_primitive_method(self.integer, "to_string", &[], self.string);

        for name in arithmetic {
            self.define_primitive_method(self.float, name, &[self.float], self.float);
        }
        for name in comparisons {
            self.define_primitive_method(self.float, name, &[self.float], self.boolean);
        }
        self.define_primitive_method(self.float, "to_integer", &[], self.integer);
        self.define_primitive_method(self.float, "to_string", &[], self.string);

        self.define_primitive_method(self.string, "+", &[self.string], self.string);
        self.define_primitive_method(self.string, "==", &[self.string], self.boolean);
        self.define_primitive_method(self.string, "!=", &[self.string], self.boolean);
        self.define_primitive_method(self.string, "length", &[], self.integer);

        self.define_primitive_method(self.boolean, "==", &[self.boolean], self.boolean);
        self.define_primitive_method(self.boolean, "!=", &[self.boolean], self.boolean);

        self
    }

    fn define_primitive_method(
        &mut self,
        receiver: TypeId,
        name: &str,
        parameters: &[TypeId],
        returns: TypeId,
    ) {
        let mut arguments = vec![BlockArgument {
            name: crate::sema::SELF_LOCAL.to_string(),
            value_type: receiver,
            has_default: false,
            rest: false,
        }];
        for (index, &value_type) in parameters.iter().enumerate() {
            arguments.push(BlockArgument {
                name: format!("arg{index}"),
                value_type,
                has_default: false,
                rest: false,
            });
        }

        let block = self.arena.alloc(TypeKind::Block(BlockType {
            name: name.to_string(),
            style: BlockStyle::Method,
            prototype: self.block,
            arguments,
            rest_argument: false,
            throws: None,
            returns,
            type_parameters: TypeParameterTable::new(),
        }));
        self.arena.define_attribute(receiver, name, block);
    }

    /// The parameterized Array prototype instance for one element type.
    pub fn new_array_of_type(&mut self, element: TypeId) -> TypeId {
        let mut assignments = FxHashMap::default();
        assignments.insert(ARRAY_ELEMENT_PARAMETER.to_string(), element);
        self.arena.new_instance(self.array, &assignments)
    }

    /// Look up a built-in prototype by its global name.
    pub fn builtin(&self, name: &str) -> Option<TypeId> {
        let symbol = self.arena.lookup_attribute(self.toplevel, name);
        symbol.any().then_some(symbol.value_type)
    }
}

impl Default for TypeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_share_the_object_prototype() {
        let database = TypeDatabase::new();
        assert_eq!(database.arena.prototype(database.integer), Some(database.object));
        assert_eq!(database.arena.prototype(database.array), Some(database.object));
    }

    #[test]
    fn builtins_resolve_by_name() {
        let database = TypeDatabase::new();
        assert_eq!(database.builtin("Integer"), Some(database.integer));
        assert_eq!(database.builtin("True"), Some(database.boolean));
        assert_eq!(database.builtin("HashMap"), None);
        for name in BUILTIN_GLOBALS {
            assert!(database.builtin(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn primitive_operators_resolve_as_methods() {
        let database = TypeDatabase::new();
        let add = database.arena.lookup_method(database.integer, "+");
        assert!(add.any());

        let block = database.arena.block(add.value_type).unwrap();
        assert_eq!(block.returns, database.integer);
        assert_eq!(block.argument_count_range(), (1, Some(1)));

        let less = database.arena.lookup_method(database.integer, "<");
        assert_eq!(
            database.arena.block(less.value_type).unwrap().returns,
            database.boolean
        );
        assert!(database.arena.lookup_method(database.string, "length").any());
    }

    #[test]
    fn new_array_of_type_binds_the_element_parameter() {
        let mut database = TypeDatabase::new();
        let ints = database.new_array_of_type(database.integer);
        assert_ne!(ints, database.array);

        let object = database.arena.object(ints).unwrap();
        assert_eq!(
            object.type_parameter_instances.get(ARRAY_ELEMENT_PARAMETER),
            Some(&database.integer)
        );
        assert!(database.arena.type_compatible(ints, database.array));
    }
}
