// src/sema/passes/infer.rs
//! Pass 4: type inference and name resolution.
//!
//! A depth-first visitor over the module body. For every expression node it
//! records the resolved type, and for every name-ish node the binding the
//! generator will lower through. Lookups tolerate missing definitions:
//! unresolved names become Nil/Dynamic placeholders so the pass can keep
//! going and surface more than one problem per run.

use crate::errors::{ParserError, SemanticError};
use crate::frontend::Span;
use crate::frontend::ast::*;
use crate::sema::message::MessageContext;
use crate::sema::symbol_table::TableId;
use crate::sema::types::{
    BlockArgument, BlockStyle, BlockType, ObjectType, TypeId, TypeKind, TypeParameterTable,
    TypeParameterType,
};
use crate::sema::{Analysis, Binding, SELF_LOCAL};
use crate::state::CompileState;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

pub fn run(state: &mut CompileState, qualified_name: &str) {
    let Ok(module) = state.module(qualified_name) else {
        return;
    };
    let ast = module.ast.clone();
    let source_path = module.source_path.clone();
    let module_self = module.self_type;
    let globals = module.globals;

    let mut resolver = TypeResolver {
        state,
        analysis: Analysis::default(),
        source_path,
        module_self,
        globals,
    };

    // The module body runs with the module object as self
    let locals = resolver.state.tables.alloc(None);
    resolver
        .state
        .tables
        .get_mut(locals)
        .define(SELF_LOCAL, module_self, false);
    resolver.analysis.module_locals = Some(locals);

    let mut scope = Scope {
        locals,
        self_type: module_self,
        module_scope: true,
        type_parameters: TypeParameterTable::new(),
        in_trait_body: false,
    };
    for node in &ast.body {
        resolver.infer(node, &mut scope);
    }

    let TypeResolver { state, analysis, .. } = resolver;
    if let Ok(module) = state.module_mut(qualified_name) {
        module.analysis = analysis;
    }
}

#[derive(Debug, Clone)]
struct Scope {
    locals: TableId,
    self_type: TypeId,
    module_scope: bool,
    type_parameters: TypeParameterTable,
    in_trait_body: bool,
}

struct TypeResolver<'a> {
    state: &'a mut CompileState,
    analysis: Analysis,
    source_path: PathBuf,
    module_self: TypeId,
    globals: TableId,
}

impl<'a> TypeResolver<'a> {
    fn error(&mut self, error: impl miette::Diagnostic + std::fmt::Display, location: Span) {
        let path = self.source_path.clone();
        self.state.diagnostics.error(error, &path, location);
    }

    fn infer(&mut self, node: &Node, scope: &mut Scope) -> TypeId {
        let inferred = match node {
            Node::IntegerLiteral(_) => self.state.types.integer,
            Node::FloatLiteral(_) => self.state.types.float,
            Node::StringLiteral(_) => self.state.types.string,
            Node::SelfLiteral(_) => scope.self_type,
            Node::Identifier(identifier) => self.infer_identifier(identifier, scope),
            Node::Constant(constant) => self.infer_constant(constant, scope),
            Node::Attribute(attribute) => self.infer_attribute(attribute, scope),
            Node::Global(global) => self.infer_global(global),
            Node::Send(send) => self.infer_send(send, scope),
            Node::Block(block) => self.infer_block(block, scope),
            Node::MethodDef(method) => self.infer_method_def(method, scope),
            Node::ObjectDef(object) => self.infer_object_def(object, scope),
            Node::TraitDef(trait_def) => self.infer_trait_def(trait_def, scope),
            Node::TraitImpl(trait_impl) => self.infer_trait_impl(trait_impl, scope),
            Node::Reopen(reopen) => self.infer_reopen(reopen, scope),
            Node::DefineVariable(define) => self.infer_define_variable(define, scope),
            Node::Reassign(reassign) => self.infer_reassign(reassign, scope),
            Node::TypeCast(cast) => {
                self.infer(&cast.expression, scope);
                self.resolve_type_ref(&cast.target, scope)
            }
            Node::Dereference(dereference) => self.infer(&dereference.expression, scope),
            Node::RawInstruction(raw) => {
                for argument in &raw.arguments {
                    self.infer(argument, scope);
                }
                TypeId::DYNAMIC
            }
            Node::Return(node) => {
                if let Some(value) = &node.value {
                    self.infer(value, scope);
                }
                self.state.types.nil
            }
            Node::Throw(node) => {
                self.infer(&node.value, scope);
                self.state.types.nil
            }
            Node::Try(node) => self.infer_try(node, scope),
            Node::Import(_) => self.state.types.nil,
        };
        self.analysis.types.insert(node.id(), inferred);
        inferred
    }

    /// Identifier resolution order: local-with-parent, then a method on
    /// self, then a method on the module, then a module global. Anything
    /// else becomes a Nil placeholder with depth -1.
    fn infer_identifier(&mut self, node: &Identifier, scope: &mut Scope) -> TypeId {
        let (depth, symbol) = self.state.tables.lookup_with_parent(scope.locals, &node.name);
        if symbol.any() {
            let value_type = symbol.value_type;
            self.analysis
                .bindings
                .insert(node.id, Binding::Local { depth, symbol });
            return value_type;
        }

        if self
            .state
            .types
            .arena
            .lookup_method(scope.self_type, &node.name)
            .any()
        {
            self.analysis.bindings.insert(node.id, Binding::SelfMethod);
            return self.message_result_type(scope.self_type, &node.name, node.location);
        }

        if self
            .state
            .types
            .arena
            .lookup_method(self.module_self, &node.name)
            .any()
        {
            self.analysis
                .bindings
                .insert(node.id, Binding::ModuleMethod);
            return self.message_result_type(self.module_self, &node.name, node.location);
        }

        let symbol = self.state.tables.get(self.globals).lookup(&node.name);
        if symbol.any() {
            let value_type = symbol.value_type;
            self.analysis
                .bindings
                .insert(node.id, Binding::Global { symbol });
            return value_type;
        }

        self.analysis.bindings.insert(
            node.id,
            Binding::Global {
                symbol: crate::sema::symbol_table::Symbol::null(&node.name),
            },
        );
        self.state.types.nil
    }

    /// The result type of a zero-argument desugared send.
    fn message_result_type(&mut self, receiver: TypeId, name: &str, location: Span) -> TypeId {
        let method = self.state.types.arena.lookup_method(receiver, name);
        let block_id = method.value_type;
        let Some(block) = self.state.types.arena.block(block_id) else {
            return block_id;
        };
        let (required, _) = block.argument_count_range();
        if required > 0 {
            self.error(
                SemanticError::ArityMismatch {
                    message: name.to_string(),
                    expected: required.to_string(),
                    found: 0,
                },
                location,
            );
        }
        let context = MessageContext::new(&self.state.types.arena, receiver, block_id, location);
        context.initialized_return_type(&mut self.state.types.arena)
    }

    fn infer_constant(&mut self, node: &Constant, scope: &mut Scope) -> TypeId {
        if let Some(receiver) = &node.receiver {
            let receiver_type = self.infer(receiver, scope);
            let symbol = self.state.types.arena.lookup_method(receiver_type, &node.name);
            if symbol.any() {
                return symbol.value_type;
            }
            if self.state.types.arena.is_dynamic(receiver_type) {
                return TypeId::DYNAMIC;
            }
            self.error(
                SemanticError::UndefinedConstant {
                    name: node.name.clone(),
                },
                node.location,
            );
            return TypeId::DYNAMIC;
        }

        let symbol = self.state.types.arena.lookup_method(scope.self_type, &node.name);
        if symbol.any() {
            self.analysis
                .bindings
                .insert(node.id, Binding::SelfAttribute);
            return symbol.value_type;
        }

        let symbol = self.state.tables.get(self.globals).lookup(&node.name);
        if symbol.any() {
            let value_type = symbol.value_type;
            self.analysis
                .bindings
                .insert(node.id, Binding::Global { symbol });
            return value_type;
        }

        self.error(
            SemanticError::UndefinedConstant {
                name: node.name.clone(),
            },
            node.location,
        );
        self.analysis.bindings.insert(
            node.id,
            Binding::Global {
                symbol: crate::sema::symbol_table::Symbol::null(&node.name),
            },
        );
        TypeId::DYNAMIC
    }

    fn infer_attribute(&mut self, node: &Attribute, scope: &mut Scope) -> TypeId {
        self.analysis
            .bindings
            .insert(node.id, Binding::SelfAttribute);
        let symbol = self.state.types.arena.lookup_attribute(scope.self_type, &node.name);
        if symbol.any() {
            symbol.value_type
        } else {
            // Attributes may be assigned at runtime before first read
            TypeId::DYNAMIC
        }
    }

    fn infer_global(&mut self, node: &Global) -> TypeId {
        let symbol = self.state.tables.get(self.globals).lookup(&node.name);
        let value_type = if symbol.any() {
            symbol.value_type
        } else {
            self.state.types.nil
        };
        self.analysis
            .bindings
            .insert(node.id, Binding::Global { symbol });
        value_type
    }

    fn infer_send(&mut self, node: &Send, scope: &mut Scope) -> TypeId {
        if node.hash_map_literal {
            return self.infer_hash_literal(node, scope);
        }

        let receiver_type = match &node.receiver {
            Some(receiver) => self.infer(receiver, scope),
            None => {
                if self
                    .state
                    .types
                    .arena
                    .responds_to_message(scope.self_type, &node.name)
                {
                    self.analysis
                        .bindings
                        .insert(node.id, Binding::SelfReceiver);
                    scope.self_type
                } else if self
                    .state
                    .types
                    .arena
                    .responds_to_message(self.module_self, &node.name)
                {
                    self.analysis
                        .bindings
                        .insert(node.id, Binding::ModuleReceiver);
                    self.module_self
                } else {
                    self.analysis
                        .bindings
                        .insert(node.id, Binding::SelfReceiver);
                    scope.self_type
                }
            }
        };
        self.analysis.receiver_types.insert(node.id, receiver_type);

        // Array construction bypasses method lookup entirely
        if receiver_type == self.state.types.array && node.name == "new" {
            let mut arguments = Vec::new();
            for argument in &node.arguments {
                arguments.push(self.infer(argument, scope));
            }
            let element = match arguments.split_first() {
                Some((&first, rest)) if rest.iter().all(|&ty| ty == first) => first,
                _ => TypeId::DYNAMIC,
            };
            return self.state.types.new_array_of_type(element);
        }

        // Calling a block directly
        if node.name == "call"
            && let Some(block) = self.state.types.arena.block(receiver_type).cloned()
        {
            return self.check_call(node, scope, receiver_type, receiver_type, &block);
        }

        let method = self.state.types.arena.lookup_method(receiver_type, &node.name);
        if !method.any() {
            let result = if self.state.types.arena.is_dynamic(receiver_type)
                || self
                    .state
                    .types
                    .arena
                    .guard_unknown_message(receiver_type, &node.name)
            {
                TypeId::DYNAMIC
            } else {
                let receiver_name = self.state.types.arena.type_name(receiver_type);
                self.error(
                    SemanticError::UndefinedMethod {
                        receiver: receiver_name,
                        message: node.name.clone(),
                    },
                    node.location,
                );
                TypeId::DYNAMIC
            };
            for argument in &node.arguments {
                self.infer(argument, scope);
            }
            for (_, value) in &node.keyword_arguments {
                self.infer(value, scope);
            }
            return result;
        }

        let block_id = method.value_type;
        let Some(block) = self.state.types.arena.block(block_id).cloned() else {
            // An attribute holding a non-block value; its type is the result
            for argument in &node.arguments {
                self.infer(argument, scope);
            }
            return block_id;
        };
        self.check_call(node, scope, receiver_type, block_id, &block)
    }

    /// Check arity, keyword and argument types of a send against a block
    /// signature, initializing generic parameters from the arguments, and
    /// produce the initialized return type.
    fn check_call(
        &mut self,
        node: &Send,
        scope: &mut Scope,
        receiver_type: TypeId,
        block_id: TypeId,
        block: &BlockType,
    ) -> TypeId {
        let mut context =
            MessageContext::new(&self.state.types.arena, receiver_type, block_id, node.location);

        let mut positional = Vec::new();
        for argument in &node.arguments {
            positional.push(self.infer(argument, scope));
        }

        let (required, maximum) = block.argument_count_range();
        let count = positional.len() + node.keyword_arguments.len();
        if count < required || maximum.is_some_and(|maximum| count > maximum) {
            let expected = match maximum {
                Some(maximum) if maximum == required => required.to_string(),
                Some(maximum) => format!("{required} to {maximum}"),
                None => format!("at least {required}"),
            };
            self.error(
                SemanticError::ArityMismatch {
                    message: node.name.clone(),
                    expected,
                    found: count,
                },
                node.location,
            );
        }

        let parameters: Vec<BlockArgument> = block.caller_arguments().cloned().collect();
        for (index, &found) in positional.iter().enumerate() {
            let expected = match parameters.get(index) {
                Some(parameter) => parameter.value_type,
                // Excess positional arguments collapse into the rest array
                None => match block.rest_argument_type() {
                    Some(element) => element,
                    None => continue,
                },
            };
            self.check_argument(&mut context, found, expected, node.arguments[index].location());
        }

        for (name, value) in &node.keyword_arguments {
            let found = self.infer(value, scope);
            match block.lookup_argument(name) {
                Some(parameter) => {
                    let expected = parameter.value_type;
                    self.check_argument(&mut context, found, expected, value.location());
                }
                None => {
                    self.error(
                        SemanticError::UnknownKeyword {
                            message: node.name.clone(),
                            keyword: name.clone(),
                        },
                        value.location(),
                    );
                }
            }
        }

        context.arguments = positional;
        self.analysis.block_types.insert(node.id, block_id);
        context.initialized_return_type(&mut self.state.types.arena)
    }

    fn check_argument(
        &mut self,
        context: &mut MessageContext,
        found: TypeId,
        expected: TypeId,
        location: Span,
    ) {
        let arena = &mut self.state.types.arena;
        if let TypeKind::TypeParameter(parameter) = arena.get(expected) {
            let name = parameter.name.clone();
            context.initialize_type_parameter(arena, &name, found);
        }

        let resolved = arena.resolve_type(expected, context.receiver, &context.type_parameters);
        if arena.is_type_parameter(resolved) || arena.type_compatible(found, resolved) {
            return;
        }
        let expected_name = arena.type_name(resolved);
        let found_name = arena.type_name(found);
        self.error(
            SemanticError::TypeMismatch {
                expected: expected_name,
                found: found_name,
            },
            location,
        );
    }

    /// `%[...]` types as whatever `HashMap.new` produces; argument checks
    /// do not apply because the generator expands the literal itself.
    fn infer_hash_literal(&mut self, node: &Send, scope: &mut Scope) -> TypeId {
        let receiver_type = match &node.receiver {
            Some(receiver) => self.infer(receiver, scope),
            None => TypeId::DYNAMIC,
        };
        self.analysis.receiver_types.insert(node.id, receiver_type);
        for argument in &node.arguments {
            self.infer(argument, scope);
        }

        let method = self.state.types.arena.lookup_method(receiver_type, "new");
        if !method.any() {
            return TypeId::DYNAMIC;
        }
        let block_id = method.value_type;
        if self.state.types.arena.block(block_id).is_none() {
            return TypeId::DYNAMIC;
        }
        let context =
            MessageContext::new(&self.state.types.arena, receiver_type, block_id, node.location);
        context.initialized_return_type(&mut self.state.types.arena)
    }

    fn infer_block(&mut self, node: &Block, scope: &mut Scope) -> TypeId {
        let style = match node.kind {
            BlockKind::Closure => BlockStyle::Closure,
            BlockKind::Lambda => BlockStyle::Lambda,
        };
        let (self_type, parent) = match style {
            // Closures capture the enclosing scope, self included
            BlockStyle::Closure => (scope.self_type, Some(scope.locals)),
            // Lambdas capture nothing; self defaults to the module object
            _ => (self.module_self, None),
        };

        let signature = self.block_signature(
            match style {
                BlockStyle::Lambda => "<lambda>",
                _ => "<closure>",
            },
            style,
            None,
            &node.arguments,
            node.returns.as_ref(),
            node.throws.as_ref(),
            scope,
        );

        let locals = self.state.tables.alloc(parent);
        if style == BlockStyle::Lambda {
            self.state
                .tables
                .get_mut(locals)
                .define(SELF_LOCAL, self_type, false);
        }
        self.define_argument_locals(locals, &node.arguments, &signature.1, scope);
        self.analysis.locals.insert(node.id, locals);

        let mut inner = Scope {
            locals,
            self_type,
            module_scope: false,
            type_parameters: scope.type_parameters.clone(),
            in_trait_body: false,
        };
        for argument in &node.arguments {
            if let Some(default) = &argument.default {
                self.infer(default, &mut inner);
            }
        }
        for expression in &node.body {
            self.infer(expression, &mut inner);
        }

        signature.0
    }

    fn infer_method_def(&mut self, node: &MethodDef, scope: &mut Scope) -> TypeId {
        let mut type_parameters = TypeParameterTable::new();
        for parameter in &node.type_parameters {
            let parameter_type = self
                .state
                .types
                .arena
                .alloc(TypeKind::TypeParameter(TypeParameterType {
                    name: parameter.name.clone(),
                    required_traits: Vec::new(),
                }));
            type_parameters.define(&parameter.name, parameter_type);
        }
        type_parameters.merge(&scope.type_parameters);

        let mut method_scope = scope.clone();
        method_scope.type_parameters = type_parameters.clone();

        let (block_id, argument_types) = self.block_signature(
            &node.name,
            BlockStyle::Method,
            Some(scope.self_type),
            &node.arguments,
            node.returns.as_ref(),
            node.throws.as_ref(),
            &method_scope,
        );

        self.state
            .types
            .arena
            .define_attribute(scope.self_type, &node.name, block_id);
        if scope.module_scope {
            self.state
                .tables
                .get_mut(self.globals)
                .define(&node.name, block_id, false);
        }

        let Some(body) = &node.body else {
            if scope.in_trait_body {
                if let Some(trait_type) = self.state.types.arena.trait_type_mut(scope.self_type) {
                    trait_type.required_methods.push(node.name.clone());
                }
            } else {
                self.error(ParserError::RequiredMethodOutsideTrait, node.location);
            }
            return block_id;
        };

        let locals = self.state.tables.alloc(None);
        self.state
            .tables
            .get_mut(locals)
            .define(SELF_LOCAL, scope.self_type, false);
        self.define_argument_locals(locals, &node.arguments, &argument_types, scope);
        self.analysis.locals.insert(node.id, locals);

        let mut inner = Scope {
            locals,
            self_type: scope.self_type,
            module_scope: false,
            type_parameters,
            in_trait_body: false,
        };
        for argument in &node.arguments {
            if let Some(default) = &argument.default {
                self.infer(default, &mut inner);
            }
        }
        for expression in body {
            self.infer(expression, &mut inner);
        }

        block_id
    }

    /// Build a block signature, returning its type id plus the resolved
    /// caller argument types in declaration order.
    #[allow(clippy::too_many_arguments)]
    fn block_signature(
        &mut self,
        name: &str,
        style: BlockStyle,
        self_type: Option<TypeId>,
        arguments: &[ArgumentDef],
        returns: Option<&TypeRef>,
        throws: Option<&TypeRef>,
        scope: &Scope,
    ) -> (TypeId, Vec<TypeId>) {
        let mut block_arguments = Vec::new();
        if let Some(self_type) = self_type {
            block_arguments.push(BlockArgument {
                name: SELF_LOCAL.to_string(),
                value_type: self_type,
                has_default: false,
                rest: false,
            });
        }

        let mut argument_types = Vec::new();
        let mut rest_argument = false;
        for argument in arguments {
            let value_type = match &argument.value_type {
                Some(reference) => self.resolve_type_ref(reference, scope),
                None => TypeId::DYNAMIC,
            };
            argument_types.push(value_type);
            rest_argument |= argument.rest;
            block_arguments.push(BlockArgument {
                name: argument.name.clone(),
                value_type,
                has_default: argument.default.is_some(),
                rest: argument.rest,
            });
        }

        let returns = match returns {
            Some(reference) => self.resolve_type_ref(reference, scope),
            None => TypeId::DYNAMIC,
        };
        let throws = throws.map(|reference| self.resolve_type_ref(reference, scope));

        let block_id = self.state.types.arena.alloc(TypeKind::Block(BlockType {
            name: name.to_string(),
            style,
            prototype: self.state.types.block,
            arguments: block_arguments,
            rest_argument,
            throws,
            returns,
            type_parameters: scope.type_parameters.clone(),
        }));
        (block_id, argument_types)
    }

    /// Define the declared arguments as locals. Rest arguments hold an
    /// array of their declared element type.
    fn define_argument_locals(
        &mut self,
        locals: TableId,
        arguments: &[ArgumentDef],
        argument_types: &[TypeId],
        _scope: &Scope,
    ) {
        for (argument, &value_type) in arguments.iter().zip(argument_types) {
            let local_type = if argument.rest {
                self.state.types.new_array_of_type(value_type)
            } else {
                value_type
            };
            self.state
                .tables
                .get_mut(locals)
                .define(&argument.name, local_type, false);
        }
    }

    fn infer_object_def(&mut self, node: &ObjectDef, scope: &mut Scope) -> TypeId {
        let type_id = self.defined_type_for(&node.name, scope, |resolver| {
            let mut object = ObjectType::new(&node.name, Some(resolver.state.types.object));
            for parameter in &node.type_parameters {
                let parameter_type =
                    resolver
                        .state
                        .types
                        .arena
                        .alloc(TypeKind::TypeParameter(TypeParameterType {
                            name: parameter.name.clone(),
                            required_traits: Vec::new(),
                        }));
                object.type_parameters.define(&parameter.name, parameter_type);
            }
            resolver.state.types.arena.alloc(TypeKind::Object(object))
        });

        let mut type_parameters = match self.state.types.arena.object(type_id) {
            Some(object) => object.type_parameters.clone(),
            None => TypeParameterTable::new(),
        };
        type_parameters.merge(&scope.type_parameters);

        self.infer_definition_body(node.id, &node.body, type_id, type_parameters, false);
        type_id
    }

    fn infer_trait_def(&mut self, node: &TraitDef, scope: &mut Scope) -> TypeId {
        let type_id = self.defined_type_for(&node.name, scope, |resolver| {
            resolver.state.types.arena.alloc(TypeKind::Trait(
                crate::sema::types::TraitType::new(
                    &node.name,
                    Some(resolver.state.types.trait_prototype),
                ),
            ))
        });

        let mut type_parameters = match self.state.types.arena.trait_type(type_id) {
            Some(trait_type) => trait_type.type_parameters.clone(),
            None => TypeParameterTable::new(),
        };
        type_parameters.merge(&scope.type_parameters);

        self.infer_definition_body(node.id, &node.body, type_id, type_parameters, true);
        type_id
    }

    /// Reuse the type the globals pass created for a top-level definition;
    /// nested definitions allocate a fresh type bound to the enclosing
    /// object.
    fn defined_type_for(
        &mut self,
        name: &str,
        scope: &mut Scope,
        create: impl FnOnce(&mut Self) -> TypeId,
    ) -> TypeId {
        if scope.module_scope {
            let symbol = self.state.tables.get(self.globals).lookup(name);
            if symbol.any() && !self.state.types.arena.is_dynamic(symbol.value_type) {
                return symbol.value_type;
            }
        }
        let type_id = create(self);
        self.state
            .types
            .arena
            .define_attribute(scope.self_type, name, type_id);
        if scope.module_scope {
            self.state
                .tables
                .get_mut(self.globals)
                .define(name, type_id, false);
        }
        type_id
    }

    /// Object, trait, impl and reopen bodies all run as a block with the
    /// definition as self.
    fn infer_definition_body(
        &mut self,
        id: NodeId,
        body: &[Node],
        self_type: TypeId,
        type_parameters: TypeParameterTable,
        in_trait_body: bool,
    ) {
        let locals = self.state.tables.alloc(None);
        self.state
            .tables
            .get_mut(locals)
            .define(SELF_LOCAL, self_type, false);
        self.analysis.locals.insert(id, locals);

        let mut inner = Scope {
            locals,
            self_type,
            module_scope: false,
            type_parameters,
            in_trait_body,
        };
        for expression in body {
            self.infer(expression, &mut inner);
        }
    }

    fn infer_trait_impl(&mut self, node: &TraitImpl, scope: &mut Scope) -> TypeId {
        let trait_symbol = self.state.tables.get(self.globals).lookup(&node.trait_name);
        let object_symbol = self.state.tables.get(self.globals).lookup(&node.object_name);

        if !trait_symbol.any() {
            self.error(
                SemanticError::UndefinedConstant {
                    name: node.trait_name.clone(),
                },
                node.location,
            );
        }
        if !object_symbol.any() {
            self.error(
                SemanticError::UndefinedConstant {
                    name: node.object_name.clone(),
                },
                node.location,
            );
        }

        let target = object_symbol.value_type;
        if trait_symbol.any() && object_symbol.any() {
            self.state
                .types
                .arena
                .implement_trait(target, trait_symbol.value_type);
        }

        let self_type = if object_symbol.any() { target } else { scope.self_type };
        self.infer_definition_body(
            node.id,
            &node.body,
            self_type,
            scope.type_parameters.clone(),
            false,
        );
        self.state.types.nil
    }

    fn infer_reopen(&mut self, node: &Reopen, scope: &mut Scope) -> TypeId {
        let symbol = self.state.tables.get(self.globals).lookup(&node.name);
        if !symbol.any() {
            self.error(
                SemanticError::UndefinedConstant {
                    name: node.name.clone(),
                },
                node.location,
            );
        }
        let self_type = if symbol.any() { symbol.value_type } else { scope.self_type };
        self.infer_definition_body(
            node.id,
            &node.body,
            self_type,
            scope.type_parameters.clone(),
            false,
        );
        self.state.types.nil
    }

    fn infer_define_variable(&mut self, node: &DefineVariable, scope: &mut Scope) -> TypeId {
        let value_type = self.infer(&node.value, scope);
        let declared = node
            .value_type
            .as_ref()
            .map(|reference| self.resolve_type_ref(reference, scope));

        if let Some(declared) = declared
            && !self.state.types.arena.type_compatible(value_type, declared)
        {
            let expected = self.state.types.arena.type_name(declared);
            let found = self.state.types.arena.type_name(value_type);
            self.error(SemanticError::TypeMismatch { expected, found }, node.location);
        }

        let variable_type = declared.unwrap_or(value_type);
        let symbol = self
            .state
            .tables
            .get_mut(scope.locals)
            .define(&node.name, variable_type, node.mutable);
        self.analysis
            .bindings
            .insert(node.id, Binding::Local { depth: -1, symbol });

        if scope.module_scope {
            self.state
                .tables
                .get_mut(self.globals)
                .define(&node.name, variable_type, node.mutable);
        }
        variable_type
    }

    fn infer_reassign(&mut self, node: &Reassign, scope: &mut Scope) -> TypeId {
        let value_type = self.infer(&node.value, scope);
        match &node.target {
            ReassignTarget::Local(name) => {
                let (depth, symbol) = self.state.tables.lookup_with_parent(scope.locals, name);
                let symbol = if symbol.any() {
                    symbol
                } else {
                    // Tolerate assignment to an unseen name by defining it
                    self.state
                        .tables
                        .get_mut(scope.locals)
                        .define(name, value_type, true)
                };
                self.analysis
                    .bindings
                    .insert(node.id, Binding::Local { depth, symbol });
            }
            ReassignTarget::Attribute(name) => {
                let existing = self.state.types.arena.lookup_attribute(scope.self_type, name);
                if !existing.any() {
                    self.state
                        .types
                        .arena
                        .define_attribute(scope.self_type, name, value_type);
                }
                self.analysis
                    .bindings
                    .insert(node.id, Binding::SelfAttribute);
            }
        }
        value_type
    }

    fn infer_try(&mut self, node: &Try, scope: &mut Scope) -> TypeId {
        let expression_type = self.infer(&node.expression, scope);

        if let Some(body) = &node.else_body {
            let thrown = self
                .analysis
                .block_types
                .get(&node.expression.id())
                .and_then(|&block_id| self.state.types.arena.block(block_id))
                .and_then(|block| block.throws)
                .unwrap_or(TypeId::DYNAMIC);

            // The else body runs as a child block invoked with (self, error)
            let locals = self.state.tables.alloc(Some(scope.locals));
            self.state
                .tables
                .get_mut(locals)
                .define(SELF_LOCAL, scope.self_type, false);
            if let Some(name) = &node.else_argument {
                self.state.tables.get_mut(locals).define(name, thrown, false);
            }
            self.analysis.locals.insert(node.id, locals);

            let else_signature = self.state.types.arena.alloc(TypeKind::Block(BlockType {
                name: "<try.else>".to_string(),
                style: BlockStyle::Closure,
                prototype: self.state.types.block,
                arguments: vec![
                    BlockArgument {
                        name: SELF_LOCAL.to_string(),
                        value_type: scope.self_type,
                        has_default: false,
                        rest: false,
                    },
                    BlockArgument {
                        name: node.else_argument.clone().unwrap_or_else(|| "error".to_string()),
                        value_type: thrown,
                        has_default: false,
                        rest: false,
                    },
                ],
                rest_argument: false,
                throws: None,
                returns: expression_type,
                type_parameters: scope.type_parameters.clone(),
            }));
            self.analysis.block_types.insert(node.id, else_signature);

            let mut inner = Scope {
                locals,
                self_type: scope.self_type,
                module_scope: false,
                type_parameters: scope.type_parameters.clone(),
                in_trait_body: false,
            };
            for expression in body {
                self.infer(expression, &mut inner);
            }
        }

        expression_type
    }

    fn resolve_type_ref(&mut self, reference: &TypeRef, scope: &Scope) -> TypeId {
        if reference.name == "Dynamic" {
            return TypeId::DYNAMIC;
        }
        if let Some(parameter) = scope.type_parameters.get(&reference.name) {
            return parameter;
        }

        let symbol = self.state.tables.get(self.globals).lookup(&reference.name);
        let base = if symbol.any() {
            symbol.value_type
        } else if let Some(builtin) = self.state.types.builtin(&reference.name) {
            builtin
        } else {
            self.error(
                SemanticError::UndefinedConstant {
                    name: reference.name.clone(),
                },
                reference.location,
            );
            return TypeId::DYNAMIC;
        };

        if reference.arguments.is_empty() {
            return base;
        }

        let names: Vec<String> = match self.state.types.arena.object(base) {
            Some(object) => object.type_parameters.names().cloned().collect(),
            None => Vec::new(),
        };
        let mut assignments = FxHashMap::default();
        for (name, argument) in names.iter().zip(&reference.arguments) {
            let resolved = self.resolve_type_ref(argument, scope);
            assignments.insert(name.clone(), resolved);
        }
        self.state.types.arena.new_instance(base, &assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::passes;
    use crate::state::{CompileState, Config};
    use std::path::PathBuf;
    use std::rc::Rc;

    fn analyse(source: &str) -> CompileState {
        let mut state = CompileState::new(Config::default());
        let ast = Rc::new(
            crate::frontend::Parser::new(source)
                .parse_module()
                .expect("parse failed"),
        );
        state.register_module("main", PathBuf::from("main.stoat"), ast);
        passes::analyse_module(&mut state, "main");
        state
    }

    fn node_type(state: &CompileState, index: usize) -> TypeId {
        let module = state.module("main").unwrap();
        module.analysis.node_type(module.ast.body[index].id())
    }

    #[test]
    fn literals_receive_primitive_types() {
        let state = analyse("10\n2.5\n'hi'");
        assert_eq!(node_type(&state, 0), state.types.integer);
        assert_eq!(node_type(&state, 1), state.types.float);
        assert_eq!(node_type(&state, 2), state.types.string);
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn integer_operators_type_as_integers() {
        let state = analyse("1 + 2");
        assert_eq!(node_type(&state, 0), state.types.integer);
        assert!(!state.diagnostics.has_errors());

        let state = analyse("1 < 2");
        assert_eq!(node_type(&state, 0), state.types.boolean);
    }

    #[test]
    fn let_binds_a_local_with_the_value_type() {
        let state = analyse("let x = 10\nx");
        let module = state.module("main").unwrap();
        assert_eq!(node_type(&state, 1), state.types.integer);

        let binding = module.analysis.binding(module.ast.body[1].id()).unwrap();
        assert!(matches!(
            binding,
            Binding::Local { depth: -1, symbol } if symbol.name == "x"
        ));
    }

    #[test]
    fn array_literals_produce_typed_arrays() {
        let state = analyse("[10, 20, 30]");
        let array = node_type(&state, 0);
        let object = state.types.arena.object(array).unwrap();
        assert_eq!(object.name, "Array");
        assert_eq!(
            object.type_parameter_instances.get("T"),
            Some(&state.types.integer)
        );
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn mixed_arrays_fall_back_to_dynamic_elements() {
        let state = analyse("[10, 'x']");
        let array = node_type(&state, 0);
        let object = state.types.arena.object(array).unwrap();
        assert_eq!(
            object.type_parameter_instances.get("T"),
            Some(&TypeId::DYNAMIC)
        );
    }

    #[test]
    fn undefined_method_sends_are_reported() {
        let state = analyse("10.launch");
        assert!(state.diagnostics.has_errors());
        let diagnostic = state.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code.as_deref(), Some("E2003"));
    }

    #[test]
    fn arity_mismatches_are_reported() {
        let state = analyse("def add(a: Integer, b: Integer) -> Integer { 1 }\nadd(1)");
        assert!(state.diagnostics.has_errors());
        let diagnostic = state.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code.as_deref(), Some("E2004"));
    }

    #[test]
    fn rest_arguments_absorb_positional_overflow() {
        let state = analyse("def join(first: String, *rest: String) { 1 }\njoin('a', 'b', 'c')");
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn rest_argument_element_types_are_checked() {
        let state = analyse("def join(first: String, *rest: String) { 1 }\njoin('a', 2)");
        assert!(state.diagnostics.has_errors());
        let diagnostic = state.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code.as_deref(), Some("E2006"));
    }

    #[test]
    fn unknown_keywords_are_reported() {
        let state = analyse("def greet(name: String) { 1 }\ngreet(name: 'a', tone: 'b')");
        assert!(state.diagnostics.has_errors());
        let codes: Vec<_> = state
            .diagnostics
            .iter()
            .filter_map(|d| d.code.clone())
            .collect();
        assert!(codes.contains(&"E2005".to_string()));
    }

    #[test]
    fn method_calls_resolve_their_return_types() {
        let state = analyse("def double(a: Integer) -> Integer { a }\ndouble(2)");
        assert_eq!(node_type(&state, 1), state.types.integer);
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn self_sends_resolve_inside_object_bodies() {
        let state = analyse("object Counter {\n  def zero -> Integer { 0 }\n  def start -> Integer { zero }\n}");
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn unknown_message_receivers_type_as_dynamic_without_errors() {
        let state = analyse(
            "object Proxy {\n  def unknown_message(name, *rest) { 42 }\n}\nProxy.ping",
        );
        assert!(!state.diagnostics.has_errors());
        assert_eq!(node_type(&state, 1), TypeId::DYNAMIC);
    }

    #[test]
    fn trait_methods_copy_onto_implementors() {
        let state = analyse(
            "trait Greeter {\n  def greet -> String { 'hi' }\n}\nobject Person {}\nimpl Greeter for Person {}\nPerson.greet",
        );
        assert!(!state.diagnostics.has_errors());
        assert_eq!(node_type(&state, 3), state.types.string);
    }

    #[test]
    fn generic_methods_infer_parameters_from_arguments() {
        let state = analyse("def identity!(T)(value: T) -> T { value }\nidentity(10)");
        assert!(!state.diagnostics.has_errors());
        assert_eq!(node_type(&state, 1), state.types.integer);
    }

    #[test]
    fn unresolved_identifiers_become_nil_placeholders() {
        let state = analyse("ghost");
        let module = state.module("main").unwrap();
        assert_eq!(node_type(&state, 0), state.types.nil);
        let binding = module.analysis.binding(module.ast.body[0].id()).unwrap();
        assert!(matches!(
            binding,
            Binding::Global { symbol } if !symbol.any()
        ));
    }

    #[test]
    fn closures_see_enclosing_locals_through_parents() {
        let state = analyse("def run {\n  let x = 1\n  do { x }\n}");
        assert!(!state.diagnostics.has_errors());
    }

    #[test]
    fn type_annotations_override_value_types() {
        let state = analyse("let x: Dynamic = 10");
        assert_eq!(node_type(&state, 0), TypeId::DYNAMIC);
    }

    #[test]
    fn annotated_type_mismatches_are_reported() {
        let state = analyse("let x: String = 10");
        assert!(state.diagnostics.has_errors());
    }

    #[test]
    fn try_else_binds_the_error_argument() {
        let state = analyse(
            "def divide(a: Integer, b: Integer) !! String -> Integer { a }\ntry divide(1, 0) else (e) { 0 }",
        );
        assert!(!state.diagnostics.has_errors());
        let module = state.module("main").unwrap();
        let Node::Try(try_node) = &module.ast.body[1] else {
            panic!("expected a try node");
        };
        let locals = module.analysis.locals[&try_node.id];
        let error = state.tables.get(locals).lookup("e");
        assert!(error.any());
        assert_eq!(error.value_type, state.types.string);
    }
}
