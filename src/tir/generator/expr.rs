// src/tir/generator/expr.rs
//! Lowering of literals, name references, variables and control effects.

use crate::errors::GeneratorError;
use crate::frontend::ast::*;
use crate::sema::Binding;
use crate::sema::types::BlockStyle;
use crate::tir::generator::Generator;
use crate::tir::instruction::{Literal, Opcode};
use crate::tir::{CodeObject, Register};

impl<'a> Generator<'a> {
    pub(crate) fn process_integer(
        &mut self,
        code: &mut CodeObject,
        node: &IntegerLiteral,
    ) -> Option<Register> {
        let value_type = self.state.types.integer;
        Some(self.literal(code, Literal::Integer(node.value), value_type, node.location))
    }

    pub(crate) fn process_float(
        &mut self,
        code: &mut CodeObject,
        node: &FloatLiteral,
    ) -> Option<Register> {
        let value_type = self.state.types.float;
        Some(self.literal(code, Literal::Float(node.value), value_type, node.location))
    }

    pub(crate) fn process_string(
        &mut self,
        code: &mut CodeObject,
        node: &StringLiteral,
    ) -> Option<Register> {
        let value_type = self.state.types.string;
        Some(self.literal(
            code,
            Literal::String(node.value.clone()),
            value_type,
            node.location,
        ))
    }

    pub(crate) fn process_identifier(
        &mut self,
        code: &mut CodeObject,
        node: &Identifier,
    ) -> Option<Register> {
        match self.analysis.binding(node.id).cloned() {
            Some(Binding::Local { depth, symbol }) => {
                Some(self.get_local(code, depth, &symbol, node.location))
            }
            Some(Binding::SelfMethod) => {
                let receiver = self.self_register(code, node.location)?;
                let result = self.analysis.node_type(node.id);
                self.send_to(code, receiver, &node.name, &[], &[], result, node.location)
            }
            Some(Binding::ModuleMethod) => {
                let receiver = self.get_global(code, crate::module::MODULE_GLOBAL, node.location)?;
                let result = self.analysis.node_type(node.id);
                self.send_to(code, receiver, &node.name, &[], &[], result, node.location)
            }
            Some(Binding::SelfAttribute) => self.attribute_of_self(code, &node.name, node.location),
            Some(Binding::Global { symbol }) => self.get_global_symbol(code, &symbol, node.location),
            _ => {
                self.abort(
                    GeneratorError::UndefinedGlobal {
                        name: node.name.clone(),
                    },
                    node.location,
                );
                None
            }
        }
    }

    pub(crate) fn process_constant(
        &mut self,
        code: &mut CodeObject,
        node: &Constant,
    ) -> Option<Register> {
        if let Some(receiver) = &node.receiver {
            let receiver_register = self.process(code, receiver)?;
            let register = code.register(self.analysis.node_type(node.id));
            self.push(
                code,
                Opcode::GetAttribute,
                Some(register),
                [receiver_register],
                [Literal::Name(node.name.clone())],
                node.location,
            );
            return Some(register);
        }

        match self.analysis.binding(node.id).cloned() {
            Some(Binding::SelfAttribute) => self.attribute_of_self(code, &node.name, node.location),
            Some(Binding::Global { symbol }) => self.get_global_symbol(code, &symbol, node.location),
            _ => self.get_global(code, &node.name, node.location),
        }
    }

    pub(crate) fn process_attribute(
        &mut self,
        code: &mut CodeObject,
        node: &Attribute,
    ) -> Option<Register> {
        self.attribute_of_self(code, &node.name, node.location)
    }

    fn attribute_of_self(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        location: crate::frontend::Span,
    ) -> Option<Register> {
        let receiver = self.self_register(code, location)?;
        let register = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(register),
            [receiver],
            [Literal::Name(name.to_string())],
            location,
        );
        Some(register)
    }

    pub(crate) fn process_global(
        &mut self,
        code: &mut CodeObject,
        node: &Global,
    ) -> Option<Register> {
        self.get_global(code, &node.name, node.location)
    }

    pub(crate) fn process_define_variable(
        &mut self,
        code: &mut CodeObject,
        node: &DefineVariable,
    ) -> Option<Register> {
        let value = self.process(code, &node.value)?;

        let Some(Binding::Local { symbol, .. }) = self.analysis.binding(node.id).cloned() else {
            return Some(value);
        };
        self.set_local(code, &symbol, value, node.location);

        if self.module_scope {
            self.set_global(code, &node.name, value, node.location);
            self.define_on_toplevel(code, &node.name, value, node.location);
        }
        Some(value)
    }

    pub(crate) fn process_reassign(
        &mut self,
        code: &mut CodeObject,
        node: &Reassign,
    ) -> Option<Register> {
        let value = self.process(code, &node.value)?;

        match (&node.target, self.analysis.binding(node.id).cloned()) {
            (ReassignTarget::Local(_), Some(Binding::Local { depth, symbol })) => {
                if depth < 0 {
                    self.set_local(code, &symbol, value, node.location);
                } else {
                    self.push(
                        code,
                        Opcode::SetParentLocal,
                        None,
                        [value],
                        [
                            Literal::Integer(depth as i64),
                            Literal::Name(symbol.name.clone()),
                            Literal::Integer(symbol.index as i64),
                        ],
                        node.location,
                    );
                }
            }
            (ReassignTarget::Attribute(name), _) => {
                let receiver = self.self_register(code, node.location)?;
                self.push(
                    code,
                    Opcode::SetAttribute,
                    None,
                    [receiver, value],
                    [Literal::Name(name.clone())],
                    node.location,
                );
            }
            _ => {}
        }
        Some(value)
    }

    pub(crate) fn process_raw_instruction(
        &mut self,
        code: &mut CodeObject,
        node: &RawInstruction,
    ) -> Option<Register> {
        let Some(opcode) = crate::tir::intrinsic_opcode(&node.name) else {
            self.abort(
                GeneratorError::UnknownIntrinsic {
                    name: node.name.clone(),
                },
                node.location,
            );
            return None;
        };

        let mut operands = Vec::new();
        for argument in &node.arguments {
            operands.push(self.process(code, argument)?);
        }

        let destination = opcode
            .writes_register()
            .then(|| code.register_dynamic());
        self.push(code, opcode, destination, operands, [], node.location);
        if opcode.terminates_block() {
            code.add_block(None);
        }
        destination
    }

    /// `return e` emits a Return and starts a fresh (unreachable) block.
    /// The block-return flag is set inside closures and lambdas, which
    /// return from their enclosing method.
    pub(crate) fn process_return(
        &mut self,
        code: &mut CodeObject,
        node: &Return,
    ) -> Option<Register> {
        let value = match &node.value {
            Some(value) => self.process(code, value)?,
            None => {
                let nil = code.register(self.state.types.nil);
                self.push(code, Opcode::GetNil, Some(nil), [], [], node.location);
                nil
            }
        };

        let block_return = self
            .state
            .types
            .arena
            .block(code.block_type)
            .is_some_and(|block| block.style != BlockStyle::Method);
        self.push(
            code,
            Opcode::Return,
            None,
            [value],
            [Literal::Integer(block_return as i64)],
            node.location,
        );
        code.add_block(None);
        None
    }

    pub(crate) fn process_throw(
        &mut self,
        code: &mut CodeObject,
        node: &Throw,
    ) -> Option<Register> {
        let value = self.process(code, &node.value)?;
        self.push(code, Opcode::Throw, None, [value], [], node.location);
        code.add_block(None);
        None
    }
}
