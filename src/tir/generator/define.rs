// src/tir/generator/define.rs
//! Lowering of block-defining nodes: methods, closures, lambdas, object
//! and trait definitions, trait implementations and try/else.

use crate::frontend::Span;
use crate::frontend::ast::*;
use crate::module::MODULE_GLOBAL;
use crate::sema::types::{
    BlockArgument, BlockStyle, BlockType, TypeId, TypeKind, TypeParameterTable,
};
use crate::sema::{IMPLEMENT_TRAIT_MESSAGE, SELF_LOCAL};
use crate::tir::generator::Generator;
use crate::tir::instruction::{Literal, Opcode};
use crate::tir::{CatchEntry, CodeObject, Register};

impl<'a> Generator<'a> {
    pub(crate) fn process_method_def(
        &mut self,
        code: &mut CodeObject,
        node: &MethodDef,
    ) -> Option<Register> {
        let Some(body) = &node.body else {
            // Required trait methods carry a signature and no code
            return None;
        };

        let block_type = self.analysis.node_type(node.id);
        let locals = self.locals_for(node.id);
        let child = self.generate_body(
            &node.name,
            block_type,
            locals,
            &node.arguments,
            body,
            node.location,
        );
        code.code_objects.push(child);
        let index = code.code_objects.len() - 1;

        let block = code.register(block_type);
        self.push(
            code,
            Opcode::SetBlock,
            Some(block),
            [],
            [Literal::Code(index)],
            node.location,
        );

        if self.module_scope {
            self.set_global(code, &node.name, block, node.location);
            self.define_on_toplevel(code, &node.name, block, node.location);
        }
        let receiver = self.self_register(code, node.location)?;
        self.push(
            code,
            Opcode::SetAttribute,
            None,
            [receiver, block],
            [Literal::Name(node.name.clone())],
            node.location,
        );
        Some(block)
    }

    pub(crate) fn process_block(&mut self, code: &mut CodeObject, node: &Block) -> Option<Register> {
        let block_type = self.analysis.node_type(node.id);
        let locals = self.locals_for(node.id);
        let name = match node.kind {
            BlockKind::Lambda => "<lambda>",
            BlockKind::Closure => "<closure>",
        };
        let child = self.generate_body(
            name,
            block_type,
            locals,
            &node.arguments,
            &node.body,
            node.location,
        );
        code.code_objects.push(child);
        let index = code.code_objects.len() - 1;

        let block = code.register(block_type);
        self.push(
            code,
            Opcode::SetBlock,
            Some(block),
            [],
            [Literal::Code(index)],
            node.location,
        );
        Some(block)
    }

    pub(crate) fn process_object_def(
        &mut self,
        code: &mut CodeObject,
        node: &ObjectDef,
    ) -> Option<Register> {
        let prototype = self.get_global(code, "Object", node.location)?;
        self.materialize_definition(code, &node.name, &node.body, node.id, prototype, node.location)
    }

    pub(crate) fn process_trait_def(
        &mut self,
        code: &mut CodeObject,
        node: &TraitDef,
    ) -> Option<Register> {
        let prototype = self.get_global(code, "Trait", node.location)?;
        self.materialize_definition(code, &node.name, &node.body, node.id, prototype, node.location)
    }

    /// Shared lowering of `object` and `trait` definitions: a `SetObject`
    /// from the fetched prototype, stored as an attribute (and global at
    /// module scope), with the body run against the new object.
    fn materialize_definition(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        body: &[Node],
        id: NodeId,
        prototype: Register,
        location: Span,
    ) -> Option<Register> {
        let defined_type = self.analysis.node_type(id);
        let object = code.register(defined_type);
        self.push(
            code,
            Opcode::SetObject,
            Some(object),
            [prototype],
            [],
            location,
        );

        let receiver = self.self_register(code, location)?;
        self.push(
            code,
            Opcode::SetAttribute,
            None,
            [receiver, object],
            [Literal::Name(name.to_string())],
            location,
        );
        if self.module_scope {
            self.set_global(code, name, object, location);
            self.define_on_toplevel(code, name, object, location);
        }

        self.run_definition_body(code, name, body, id, defined_type, object, location);
        Some(object)
    }

    pub(crate) fn process_trait_impl(
        &mut self,
        code: &mut CodeObject,
        node: &TraitImpl,
    ) -> Option<Register> {
        let object = self.get_global(code, &node.object_name, node.location)?;
        let trait_register = self.get_global(code, &node.trait_name, node.location)?;

        // implement_trait is an ordinary send to the trait; its method
        // lives on the trait prototype and mutates the object at runtime
        let implement = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(implement),
            [trait_register],
            [Literal::Name(IMPLEMENT_TRAIT_MESSAGE.to_string())],
            node.location,
        );
        let ignored = code.register_dynamic();
        self.run_block(
            code,
            ignored,
            implement,
            &[trait_register, object],
            &[],
            node.location,
        );

        let self_type = self
            .state
            .tables
            .get(self.globals)
            .lookup(&node.object_name)
            .value_type;
        self.run_definition_body(
            code,
            &node.object_name,
            &node.body,
            node.id,
            self_type,
            object,
            node.location,
        );
        None
    }

    pub(crate) fn process_reopen(
        &mut self,
        code: &mut CodeObject,
        node: &Reopen,
    ) -> Option<Register> {
        let object = self.get_global(code, &node.name, node.location)?;
        let self_type = self
            .state
            .tables
            .get(self.globals)
            .lookup(&node.name)
            .value_type;
        self.run_definition_body(
            code,
            &node.name,
            &node.body,
            node.id,
            self_type,
            object,
            node.location,
        );
        None
    }

    /// Run a definition body as a child code object with the definition as
    /// its receiver.
    #[allow(clippy::too_many_arguments)]
    fn run_definition_body(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        body: &[Node],
        id: NodeId,
        self_type: TypeId,
        receiver: Register,
        location: Span,
    ) {
        if body.is_empty() {
            return;
        }
        let block_type = self.definition_body_type(name, self_type);
        let locals = self.locals_for(id);
        let child = self.generate_body(name, block_type, locals, &[], body, location);
        code.code_objects.push(child);
        let index = code.code_objects.len() - 1;

        let block = code.register(block_type);
        self.push(
            code,
            Opcode::SetBlock,
            Some(block),
            [],
            [Literal::Code(index)],
            location,
        );
        let ignored = code.register_dynamic();
        self.run_block(code, ignored, block, &[receiver], &[], location);
    }

    pub(crate) fn process_try(&mut self, code: &mut CodeObject, node: &Try) -> Option<Register> {
        let Some(body) = &node.else_body else {
            // Without an else the thrown value propagates through the
            // enclosing catch table untouched
            return self.process(code, &node.expression);
        };

        let result_type = self.analysis.node_type(node.id);
        let result = code.register(result_type);

        let try_block = code.add_block(Some("try"));
        let value = self.process(code, &node.expression)?;
        self.push(
            code,
            Opcode::SetRegister,
            Some(result),
            [value],
            [],
            node.location,
        );
        self.push(code, Opcode::SkipNextBlock, None, [], [], node.location);

        let else_block = code.add_block(Some("else"));
        let locals = self.locals_for(node.id);
        let catch_type = match &node.else_argument {
            Some(name) => self.state.tables.get(locals).lookup(name).value_type,
            None => TypeId::DYNAMIC,
        };
        let catch = code.register(catch_type);

        let block_type = match self.analysis.block_types.get(&node.id) {
            Some(&block_type) => block_type,
            None => self.definition_body_type("<try.else>", TypeId::DYNAMIC),
        };
        let child = self.generate_body("<try.else>", block_type, locals, &[], body, node.location);
        code.code_objects.push(child);
        let index = code.code_objects.len() - 1;

        let else_code = code.register(block_type);
        self.push(
            code,
            Opcode::SetBlock,
            Some(else_code),
            [],
            [Literal::Code(index)],
            node.location,
        );
        let receiver = self.self_register(code, node.location)?;
        let else_result = code.register(result_type);
        self.run_block(
            code,
            else_result,
            else_code,
            &[receiver, catch],
            &[],
            node.location,
        );
        self.push(
            code,
            Opcode::SetRegister,
            Some(result),
            [else_result],
            [],
            node.location,
        );

        code.add_block(None);
        code.catch_table.push(CatchEntry {
            try_block,
            else_block,
            register: catch,
        });
        Some(result)
    }

    /// Generate a child code object: lambda self-default first, then one
    /// conditional block per defaulted argument, then the body.
    pub(crate) fn generate_body(
        &mut self,
        name: &str,
        block_type: TypeId,
        locals: crate::sema::symbol_table::TableId,
        arguments: &[ArgumentDef],
        body: &[Node],
        location: Span,
    ) -> CodeObject {
        let saved_scope = self.module_scope;
        self.module_scope = false;

        let mut child = CodeObject::new(name, block_type, locals, location);
        let style = self
            .state
            .types
            .arena
            .block(block_type)
            .map(|block| block.style)
            .unwrap_or(BlockStyle::Closure);

        if style == BlockStyle::Lambda {
            self.generate_self_default(&mut child, location);
        }

        // Methods and lambdas hold self in slot zero; declared arguments
        // follow it
        let offset = usize::from(style != BlockStyle::Closure);
        for (index, argument) in arguments.iter().enumerate() {
            if argument.default.is_none() && !argument.rest {
                continue;
            }
            self.generate_argument_default(&mut child, argument, offset + index);
        }

        let mut last = None;
        for node in body {
            last = self.process(&mut child, node);
        }
        self.finish(&mut child, last, location);

        self.module_scope = saved_scope;
        child
    }

    /// Lambdas do not capture self; their first block assigns the MODULE
    /// global to the self local when the caller did not supply one. This
    /// is what lets a lambda run as a fresh process entry point.
    fn generate_self_default(&mut self, code: &mut CodeObject, location: Span) {
        let exists = code.register(self.state.types.boolean);
        self.push(
            code,
            Opcode::LocalExists,
            Some(exists),
            [],
            [Literal::Name(SELF_LOCAL.to_string()), Literal::Integer(0)],
            location,
        );
        self.push(
            code,
            Opcode::GotoNextBlockIfTrue,
            None,
            [exists],
            [],
            location,
        );

        code.add_block(Some("self_default"));
        if let Some(module) = self.get_global(code, MODULE_GLOBAL, location) {
            let locals = code.locals;
            self.set_local_named(code, locals, SELF_LOCAL, module, location);
        }

        code.add_block(None);
    }

    /// One conditional block per defaulted argument: skipped when the
    /// caller supplied a value, otherwise the default expression (or an
    /// empty array for rest arguments) is evaluated and assigned.
    fn generate_argument_default(
        &mut self,
        code: &mut CodeObject,
        argument: &ArgumentDef,
        slot: usize,
    ) {
        let Some(symbol) = self.state.tables.get(code.locals).symbol_at(slot).cloned() else {
            return;
        };

        let exists = code.register(self.state.types.boolean);
        self.push(
            code,
            Opcode::LocalExists,
            Some(exists),
            [],
            [
                Literal::Name(symbol.name.clone()),
                Literal::Integer(symbol.index as i64),
            ],
            argument.location,
        );
        self.push(
            code,
            Opcode::GotoNextBlockIfTrue,
            None,
            [exists],
            [],
            argument.location,
        );

        code.add_block(Some("default_argument"));
        let value = match &argument.default {
            Some(default) => self.process(code, default),
            None => {
                // A rest argument defaults to an empty array
                let register = code.register(symbol.value_type);
                self.push(code, Opcode::SetArray, Some(register), [], [], argument.location);
                Some(register)
            }
        };
        if let Some(value) = value {
            self.set_local(code, &symbol, value, argument.location);
        }

        code.add_block(None);
    }

    /// The signature type of an object/trait/impl body block.
    fn definition_body_type(&mut self, name: &str, self_type: TypeId) -> TypeId {
        self.state.types.arena.alloc(TypeKind::Block(BlockType {
            name: name.to_string(),
            style: BlockStyle::Method,
            prototype: self.state.types.block,
            arguments: vec![BlockArgument {
                name: SELF_LOCAL.to_string(),
                value_type: self_type,
                has_default: false,
                rest: false,
            }],
            rest_argument: false,
            throws: None,
            returns: TypeId::DYNAMIC,
            type_parameters: TypeParameterTable::new(),
        }))
    }

    /// Bootstrap modules also define their names on the toplevel.
    pub(crate) fn define_on_toplevel(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        value: Register,
        location: Span,
    ) {
        if self.define_module {
            return;
        }
        let toplevel = code.register(self.state.types.toplevel);
        self.push(code, Opcode::GetToplevel, Some(toplevel), [], [], location);
        self.push(
            code,
            Opcode::SetAttribute,
            None,
            [toplevel, value],
            [Literal::Name(name.to_string())],
            location,
        );
    }

    /// The locals table inference recorded for a block-defining node. A
    /// fresh empty table covers bodies inference never reached.
    pub(crate) fn locals_for(&mut self, id: NodeId) -> crate::sema::symbol_table::TableId {
        match self.analysis.locals.get(&id) {
            Some(&locals) => locals,
            None => self.state.tables.alloc(None),
        }
    }
}
