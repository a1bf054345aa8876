// src/tir/generator.rs
//! The TIR generator: a depth-first visitor over the decorated AST that
//! produces one code object per block-defining node.
//!
//! A module's top-level code object starts with an imports block, followed
//! by a define-module block (skipped for bootstrap modules), followed by
//! the user body. The generator aborts the current module on the first
//! error (an undefined global or unknown intrinsic): instructions emitted
//! past such a point could not be trusted by the emitter.

mod define;
mod expr;
mod send;

use crate::errors::GeneratorError;
use crate::frontend::Span;
use crate::frontend::ast::{ModuleAst, Node};
use crate::module::MODULE_GLOBAL;
use crate::sema::database::BUILTIN_GLOBALS;
use crate::sema::symbol_table::{Symbol, TableId};
use crate::sema::types::{BlockArgument, BlockStyle, BlockType, TypeId, TypeKind, TypeParameterTable};
use crate::sema::{Analysis, SELF_LOCAL};
use crate::state::CompileState;
use crate::tir::instruction::{Instruction, Literal, Opcode};
use crate::tir::{CodeObject, Register};
use rustc_hash::FxHashSet;
use smallvec::smallvec;
use std::path::PathBuf;
use std::rc::Rc;

pub struct Generator<'a> {
    pub(crate) state: &'a mut CompileState,
    pub(crate) analysis: Analysis,
    pub(crate) module_name: String,
    pub(crate) source_path: PathBuf,
    pub(crate) globals: TableId,
    pub(crate) module_self: TypeId,
    pub(crate) define_module: bool,
    /// True while lowering the module body itself
    pub(crate) module_scope: bool,
    /// Qualified names already loaded in the imports block
    loaded: FxHashSet<String>,
    /// Set on the first generator error; stops further emission
    pub(crate) aborted: bool,
}

impl<'a> Generator<'a> {
    /// Generate the top-level code object for an analysed module.
    pub fn run(state: &'a mut CompileState, qualified_name: &str) {
        let Ok(module) = state.module_mut(qualified_name) else {
            return;
        };
        let analysis = std::mem::take(&mut module.analysis);
        let ast: Rc<ModuleAst> = module.ast.clone();
        let imports = module.imports.clone();
        let source_path = module.source_path.clone();
        let globals = module.globals;
        let module_self = module.self_type;
        let define_module = module.define_module;

        tracing::debug!(module = qualified_name, "generating TIR");

        let locals = match analysis.module_locals {
            Some(locals) => locals,
            None => {
                let locals = state.tables.alloc(None);
                state
                    .tables
                    .get_mut(locals)
                    .define(SELF_LOCAL, module_self, false);
                locals
            }
        };
        let block_type = state.types.arena.alloc(TypeKind::Block(BlockType {
            name: qualified_name.to_string(),
            style: BlockStyle::Method,
            prototype: state.types.block,
            arguments: vec![BlockArgument {
                name: SELF_LOCAL.to_string(),
                value_type: module_self,
                has_default: false,
                rest: false,
            }],
            rest_argument: false,
            throws: None,
            returns: TypeId::DYNAMIC,
            type_parameters: TypeParameterTable::new(),
        }));

        let mut generator = Generator {
            state,
            analysis,
            module_name: qualified_name.to_string(),
            source_path,
            globals,
            module_self,
            define_module,
            module_scope: true,
            loaded: FxHashSet::default(),
            aborted: false,
        };

        let mut code = CodeObject::new(qualified_name, block_type, locals, ast.location);
        code.blocks[0].name = Some("imports");
        generator.generate_imports_block(&mut code, &imports, ast.location);
        generator.generate_define_module_block(&mut code, ast.location);

        code.add_block(Some("body"));
        let mut last = None;
        for node in &ast.body {
            last = generator.process(&mut code, node);
        }
        generator.finish(&mut code, last, ast.location);

        let Generator { state, analysis, .. } = generator;
        let module = state.module_mut(qualified_name).unwrap();
        module.analysis = analysis;
        module.body = Some(code);
    }

    /// Lower one node, producing the register holding its value (if any).
    pub(crate) fn process(&mut self, code: &mut CodeObject, node: &Node) -> Option<Register> {
        if self.aborted {
            return None;
        }
        match node {
            Node::IntegerLiteral(literal) => self.process_integer(code, literal),
            Node::FloatLiteral(literal) => self.process_float(code, literal),
            Node::StringLiteral(literal) => self.process_string(code, literal),
            Node::SelfLiteral(literal) => self.self_register(code, literal.location),
            Node::Identifier(identifier) => self.process_identifier(code, identifier),
            Node::Constant(constant) => self.process_constant(code, constant),
            Node::Attribute(attribute) => self.process_attribute(code, attribute),
            Node::Global(global) => self.process_global(code, global),
            Node::Send(send) => self.process_send(code, send),
            Node::Block(block) => self.process_block(code, block),
            Node::MethodDef(method) => self.process_method_def(code, method),
            Node::ObjectDef(object) => self.process_object_def(code, object),
            Node::TraitDef(trait_def) => self.process_trait_def(code, trait_def),
            Node::TraitImpl(trait_impl) => self.process_trait_impl(code, trait_impl),
            Node::Reopen(reopen) => self.process_reopen(code, reopen),
            Node::DefineVariable(define) => self.process_define_variable(code, define),
            Node::Reassign(reassign) => self.process_reassign(code, reassign),
            Node::TypeCast(cast) => self.process(code, &cast.expression),
            Node::Dereference(dereference) => self.process(code, &dereference.expression),
            Node::RawInstruction(raw) => self.process_raw_instruction(code, raw),
            Node::Return(node) => self.process_return(code, node),
            Node::Throw(node) => self.process_throw(code, node),
            Node::Try(node) => self.process_try(code, node),
            // Imports were lowered in the imports block
            Node::Import(_) => None,
        }
    }

    /// Record a generator error and stop lowering this module.
    pub(crate) fn abort(&mut self, error: GeneratorError, location: Span) {
        let path = self.source_path.clone();
        self.state.diagnostics.error(error, &path, location);
        self.aborted = true;
    }

    pub(crate) fn push(
        &mut self,
        code: &mut CodeObject,
        opcode: Opcode,
        destination: Option<Register>,
        operands: impl IntoIterator<Item = Register>,
        literals: impl IntoIterator<Item = Literal>,
        location: Span,
    ) {
        code.push(Instruction::new(opcode, destination, operands, literals, location));
    }

    /// The imports block: bind the built-in globals from the toplevel, then
    /// load each imported module exactly once and bind its symbols.
    fn generate_imports_block(
        &mut self,
        code: &mut CodeObject,
        imports: &[crate::frontend::ast::Import],
        location: Span,
    ) {
        let toplevel = code.register(self.state.types.toplevel);
        self.push(code, Opcode::GetToplevel, Some(toplevel), [], [], location);

        for &name in BUILTIN_GLOBALS {
            let Some(builtin) = self.state.types.builtin(name) else {
                continue;
            };
            let register = code.register(builtin);
            self.push(
                code,
                Opcode::GetAttribute,
                Some(register),
                [toplevel],
                [Literal::Name(name.to_string())],
                location,
            );
            self.set_global(code, name, register, location);
        }

        if !self.define_module {
            // Bootstrap modules run with the toplevel as self
            let locals = code.locals;
            self.set_local_named(code, locals, SELF_LOCAL, toplevel, location);
        }

        if imports.is_empty() {
            return;
        }

        let modules = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(modules),
            [toplevel],
            [Literal::Name("modules".to_string())],
            location,
        );

        for import in imports {
            let dependency = import.qualified_name();
            let Ok(dependency_module) = self.state.module(&dependency) else {
                continue;
            };
            let dependency_self = dependency_module.self_type;
            let dependency_globals = dependency_module.globals;
            let bytecode_path = dependency_module.bytecode_import_path();

            if self.loaded.insert(dependency.clone()) {
                let path_register = code.register(self.state.types.string);
                self.push(
                    code,
                    Opcode::SetLiteral,
                    Some(path_register),
                    [],
                    [Literal::String(bytecode_path)],
                    import.location,
                );
                let loaded = code.register_dynamic();
                self.push(
                    code,
                    Opcode::LoadModule,
                    Some(loaded),
                    [path_register],
                    [],
                    import.location,
                );
            }

            let module_register = code.register(dependency_self);
            self.push(
                code,
                Opcode::GetAttribute,
                Some(module_register),
                [modules],
                [Literal::Name(dependency.clone())],
                import.location,
            );

            for symbol in &import.symbols {
                match symbol {
                    crate::frontend::ast::ImportSymbol::SelfModule { alias, location } => {
                        let name = alias.clone().unwrap_or_else(|| dependency.clone());
                        self.set_global(code, &name, module_register, *location);
                    }
                    crate::frontend::ast::ImportSymbol::Named {
                        name,
                        alias,
                        location,
                    } => {
                        let symbol_register = code.register_dynamic();
                        self.push(
                            code,
                            Opcode::GetAttribute,
                            Some(symbol_register),
                            [module_register],
                            [Literal::Name(name.clone())],
                            *location,
                        );
                        let global_name = alias.clone().unwrap_or_else(|| name.clone());
                        self.set_global(code, &global_name, symbol_register, *location);
                    }
                    crate::frontend::ast::ImportSymbol::Glob { location } => {
                        let exports: Vec<String> = self
                            .state
                            .tables
                            .get(dependency_globals)
                            .iter()
                            .filter(|symbol| crate::sema::passes::globals::exported(&symbol.name))
                            .map(|symbol| symbol.name.clone())
                            .collect();
                        for name in exports {
                            let symbol_register = code.register_dynamic();
                            self.push(
                                code,
                                Opcode::GetAttribute,
                                Some(symbol_register),
                                [module_register],
                                [Literal::Name(name.clone())],
                                *location,
                            );
                            self.set_global(code, &name, symbol_register, *location);
                        }
                    }
                }
            }
        }
    }

    /// The define-module block: materialize the module object, register it
    /// under the toplevel's module map and bind the MODULE global.
    fn generate_define_module_block(&mut self, code: &mut CodeObject, location: Span) {
        if !self.define_module {
            return;
        }
        code.add_block(Some("define_module"));

        let toplevel = code.register(self.state.types.toplevel);
        self.push(code, Opcode::GetToplevel, Some(toplevel), [], [], location);

        let modules = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(modules),
            [toplevel],
            [Literal::Name("modules".to_string())],
            location,
        );

        let Some(prototype) = self.get_global(code, "Module", location) else {
            return;
        };
        let module_object = code.register(self.module_self);
        self.push(
            code,
            Opcode::SetObject,
            Some(module_object),
            [prototype],
            [],
            location,
        );
        self.push(
            code,
            Opcode::SetAttribute,
            None,
            [modules, module_object],
            [Literal::Name(self.module_name.clone())],
            location,
        );
        self.set_global(code, MODULE_GLOBAL, module_object, location);
        let locals = code.locals;
        self.set_local_named(code, locals, SELF_LOCAL, module_object, location);
    }

    /// Append the implicit trailing `Return` when the body did not end in
    /// a terminator of its own.
    pub(crate) fn finish(
        &mut self,
        code: &mut CodeObject,
        last: Option<Register>,
        location: Span,
    ) {
        if self.aborted {
            return;
        }
        let terminated = code
            .blocks
            .last()
            .and_then(|block| block.last_opcode())
            .is_some_and(|opcode| opcode.terminates_block());
        if terminated {
            return;
        }

        let value = match last {
            Some(register) => register,
            None => {
                let nil = code.register(self.state.types.nil);
                self.push(code, Opcode::GetNil, Some(nil), [], [], location);
                nil
            }
        };
        self.push(
            code,
            Opcode::Return,
            None,
            [value],
            [Literal::Integer(0)],
            location,
        );
    }

    /// Load `self`: a local in the current scope, a parent local inside a
    /// closure, or the MODULE global when no binding exists at all.
    pub(crate) fn self_register(&mut self, code: &mut CodeObject, location: Span) -> Option<Register> {
        let (depth, symbol) = self.state.tables.lookup_with_parent(code.locals, SELF_LOCAL);
        if symbol.any() {
            return Some(self.get_local(code, depth, &symbol, location));
        }
        self.get_global(code, MODULE_GLOBAL, location)
    }

    pub(crate) fn get_local(
        &mut self,
        code: &mut CodeObject,
        depth: i32,
        symbol: &Symbol,
        location: Span,
    ) -> Register {
        let register = code.register(symbol.value_type);
        if depth < 0 {
            self.push(
                code,
                Opcode::GetLocal,
                Some(register),
                [],
                [
                    Literal::Name(symbol.name.clone()),
                    Literal::Integer(symbol.index as i64),
                ],
                location,
            );
        } else {
            self.push(
                code,
                Opcode::GetParentLocal,
                Some(register),
                [],
                [
                    Literal::Integer(depth as i64),
                    Literal::Name(symbol.name.clone()),
                    Literal::Integer(symbol.index as i64),
                ],
                location,
            );
        }
        register
    }

    /// Store into a local of the current scope, resolving the symbol by
    /// name in the given table.
    pub(crate) fn set_local_named(
        &mut self,
        code: &mut CodeObject,
        locals: TableId,
        name: &str,
        value: Register,
        location: Span,
    ) {
        let symbol = self.state.tables.get(locals).lookup(name);
        self.set_local(code, &symbol, value, location);
    }

    pub(crate) fn set_local(
        &mut self,
        code: &mut CodeObject,
        symbol: &Symbol,
        value: Register,
        location: Span,
    ) {
        self.push(
            code,
            Opcode::SetLocal,
            None,
            [value],
            [
                Literal::Name(symbol.name.clone()),
                Literal::Integer(symbol.index as i64),
            ],
            location,
        );
    }

    /// Load a module global. A symbol with a negative index means the
    /// global was never defined; lowering cannot continue past it.
    pub(crate) fn get_global(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        location: Span,
    ) -> Option<Register> {
        let symbol = self.state.tables.get(self.globals).lookup(name);
        self.get_global_symbol(code, &symbol, location)
    }

    pub(crate) fn get_global_symbol(
        &mut self,
        code: &mut CodeObject,
        symbol: &Symbol,
        location: Span,
    ) -> Option<Register> {
        if symbol.index < 0 {
            self.abort(
                GeneratorError::UndefinedGlobal {
                    name: symbol.name.clone(),
                },
                location,
            );
            return None;
        }
        let register = code.register(symbol.value_type);
        self.push(
            code,
            Opcode::GetGlobal,
            Some(register),
            [],
            [
                Literal::Name(symbol.name.clone()),
                Literal::Integer(symbol.index as i64),
            ],
            location,
        );
        Some(register)
    }

    pub(crate) fn set_global(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        value: Register,
        location: Span,
    ) {
        let symbol = self.state.tables.get(self.globals).lookup(name);
        debug_assert!(symbol.any(), "SetGlobal of an undefined global {name}");
        self.push(
            code,
            Opcode::SetGlobal,
            None,
            [value],
            [
                Literal::Name(symbol.name.clone()),
                Literal::Integer(symbol.index as i64),
            ],
            location,
        );
    }

    /// Emit a literal into a fresh register of the given type.
    pub(crate) fn literal(
        &mut self,
        code: &mut CodeObject,
        value: Literal,
        value_type: TypeId,
        location: Span,
    ) -> Register {
        let register = code.register(value_type);
        code.push(Instruction {
            opcode: Opcode::SetLiteral,
            destination: Some(register),
            operands: smallvec![],
            literals: smallvec![value],
            location,
        });
        register
    }
}
