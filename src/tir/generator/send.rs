// src/tir/generator/send.rs
//! Lowering of message sends.
//!
//! Emission forms, in the order they are chosen:
//!
//! 1. primitive operator opcodes when the receiver's static type is a
//!    primitive prototype and the message maps onto one
//! 2. `SetArray` when the receiver is the Array prototype and the message
//!    is `new`
//! 3. `RunBlock` on the receiver itself when it is a block and the message
//!    is `call`
//! 4. plain lookup-and-run: `GetAttribute` + `RunBlock`
//! 5. the unknown-message pattern: a guarded lookup that falls back to
//!    invoking `unknown_message(name, args)` on the receiver

use crate::frontend::Span;
use crate::frontend::ast::Send;
use crate::sema::types::TypeId;
use crate::sema::{Binding, UNKNOWN_MESSAGE};
use crate::tir::generator::Generator;
use crate::tir::instruction::{Literal, Opcode};
use crate::tir::{CodeObject, Register};

impl<'a> Generator<'a> {
    pub(crate) fn process_send(&mut self, code: &mut CodeObject, node: &Send) -> Option<Register> {
        if node.hash_map_literal {
            return self.process_hash_literal(code, node);
        }

        let receiver_type = self
            .analysis
            .receiver_types
            .get(&node.id)
            .copied()
            .unwrap_or(TypeId::DYNAMIC);

        // Array construction bypasses the receiver and method lookup
        // entirely: the elements become the operands of one SetArray.
        if receiver_type == self.state.types.array && node.name == "new" {
            let mut values = Vec::new();
            for argument in &node.arguments {
                values.push(self.process(code, argument)?);
            }
            let result = code.register(self.analysis.node_type(node.id));
            self.push(code, Opcode::SetArray, Some(result), values, [], node.location);
            return Some(result);
        }

        let receiver = match &node.receiver {
            Some(receiver) => self.process(code, receiver)?,
            None => {
                let module_receiver = matches!(
                    self.analysis.binding(node.id),
                    Some(Binding::ModuleReceiver)
                ) || (receiver_type == self.module_self && self.define_module);
                if module_receiver {
                    self.get_global(code, crate::module::MODULE_GLOBAL, node.location)?
                } else {
                    self.self_register(code, node.location)?
                }
            }
        };

        // Primitive operators compile to their own opcodes
        if node.arguments.len() <= 1
            && node.keyword_arguments.is_empty()
            && let Some(opcode) = self.primitive_opcode(receiver_type, &node.name)
        {
            let mut operands = vec![receiver];
            for argument in &node.arguments {
                operands.push(self.process(code, argument)?);
            }
            let result = code.register(self.analysis.node_type(node.id));
            self.push(code, opcode, Some(result), operands, [], node.location);
            return Some(result);
        }

        // Positional arguments evaluate left to right, then keyword pairs
        let mut arguments = Vec::new();
        for argument in &node.arguments {
            arguments.push(self.process(code, argument)?);
        }
        let mut keywords = Vec::new();
        for (name, value) in &node.keyword_arguments {
            let name_register = self.literal(
                code,
                Literal::String(name.clone()),
                self.state.types.string,
                value.location(),
            );
            let value_register = self.process(code, value)?;
            keywords.push((name_register, value_register));
        }

        // Direct block call
        if node.name == "call" && self.state.types.arena.block(receiver_type).is_some() {
            let result = code.register(self.analysis.node_type(node.id));
            self.run_block(
                code,
                result,
                receiver,
                &arguments,
                &keywords,
                node.location,
            );
            return Some(result);
        }

        let guarded = self
            .state
            .types
            .arena
            .guard_unknown_message(receiver_type, &node.name);
        let result = code.register(self.analysis.node_type(node.id));

        if !guarded {
            let block = code.register_dynamic();
            self.push(
                code,
                Opcode::GetAttribute,
                Some(block),
                [receiver],
                [Literal::Name(node.name.clone())],
                node.location,
            );
            let mut operands = vec![receiver];
            operands.extend(&arguments);
            self.run_block(code, result, block, &operands, &keywords, node.location);
            return Some(result);
        }

        // Unknown-message pattern: one linear block sequence where the
        // fallback sits between the lookup and the direct call.
        let block = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(block),
            [receiver],
            [Literal::Name(node.name.clone())],
            node.location,
        );
        self.push(
            code,
            Opcode::GotoNextBlockIfTrue,
            None,
            [block],
            [],
            node.location,
        );

        code.add_block(Some("unknown_message"));
        self.push(
            code,
            Opcode::GetAttribute,
            Some(block),
            [receiver],
            [Literal::Name(UNKNOWN_MESSAGE.to_string())],
            node.location,
        );
        let name_register = self.literal(
            code,
            Literal::String(node.name.clone()),
            self.state.types.string,
            node.location,
        );
        let packed = code.register_dynamic();
        self.push(
            code,
            Opcode::SetArray,
            Some(packed),
            arguments.clone(),
            [],
            node.location,
        );
        self.run_block(
            code,
            result,
            block,
            &[receiver, name_register, packed],
            &[],
            node.location,
        );
        self.push(code, Opcode::SkipNextBlock, None, [], [], node.location);

        code.add_block(Some("known_message"));
        let mut operands = vec![receiver];
        operands.extend(&arguments);
        self.run_block(code, result, block, &operands, &keywords, node.location);

        code.add_block(None);
        Some(result)
    }

    /// Emit a RunBlock. Operands: the block register, the positional
    /// argument registers, then a (name, value) register pair per keyword
    /// argument. Literals: the positional count and the keyword count.
    pub(crate) fn run_block(
        &mut self,
        code: &mut CodeObject,
        result: Register,
        block: Register,
        arguments: &[Register],
        keywords: &[(Register, Register)],
        location: Span,
    ) {
        let mut operands = vec![block];
        operands.extend(arguments);
        for &(name, value) in keywords {
            operands.push(name);
            operands.push(value);
        }
        self.push(
            code,
            Opcode::RunBlock,
            Some(result),
            operands,
            [
                Literal::Integer(arguments.len() as i64),
                Literal::Integer(keywords.len() as i64),
            ],
            location,
        );
    }

    /// A zero-or-more argument send used by desugared identifier lookups.
    pub(crate) fn send_to(
        &mut self,
        code: &mut CodeObject,
        receiver: Register,
        name: &str,
        arguments: &[Register],
        keywords: &[(Register, Register)],
        result_type: TypeId,
        location: Span,
    ) -> Option<Register> {
        let block = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(block),
            [receiver],
            [Literal::Name(name.to_string())],
            location,
        );
        let result = code.register(result_type);
        let mut operands = vec![receiver];
        operands.extend(arguments);
        self.run_block(code, result, block, &operands, keywords, location);
        Some(result)
    }

    /// `%[k: v, ...]` expands to `HashMap.new` followed by one `[]=` send
    /// per pair, before any argument shortcuts apply.
    fn process_hash_literal(&mut self, code: &mut CodeObject, node: &Send) -> Option<Register> {
        let receiver = match &node.receiver {
            Some(receiver) => self.process(code, receiver)?,
            None => self.get_global(code, "HashMap", node.location)?,
        };

        let map = code.register(self.analysis.node_type(node.id));
        let new_block = code.register_dynamic();
        self.push(
            code,
            Opcode::GetAttribute,
            Some(new_block),
            [receiver],
            [Literal::Name("new".to_string())],
            node.location,
        );
        self.run_block(code, map, new_block, &[receiver], &[], node.location);

        for pair in node.arguments.chunks(2) {
            let [key, value] = pair else { break };
            let key_register = self.process(code, key)?;
            let value_register = self.process(code, value)?;

            let set_block = code.register_dynamic();
            self.push(
                code,
                Opcode::GetAttribute,
                Some(set_block),
                [map],
                [Literal::Name("[]=".to_string())],
                key.location(),
            );
            let ignored = code.register_dynamic();
            self.run_block(
                code,
                ignored,
                set_block,
                &[map, key_register, value_register],
                &[],
                key.location(),
            );
        }

        Some(map)
    }

    /// The opcode for an operator send on a primitive receiver, if any.
    fn primitive_opcode(&self, receiver: TypeId, name: &str) -> Option<Opcode> {
        let types = &self.state.types;
        let opcode = if receiver == types.integer {
            match name {
                "+" => Opcode::IntegerAdd,
                "-" => Opcode::IntegerSub,
                "*" => Opcode::IntegerMul,
                "/" => Opcode::IntegerDiv,
                "%" => Opcode::IntegerMod,
                "&" => Opcode::IntegerBitwiseAnd,
                "|" => Opcode::IntegerBitwiseOr,
                "^" => Opcode::IntegerBitwiseXor,
                "<<" => Opcode::IntegerShiftLeft,
                ">>" => Opcode::IntegerShiftRight,
                "<" => Opcode::IntegerSmaller,
                ">" => Opcode::IntegerGreater,
                "<=" => Opcode::IntegerSmallerOrEqual,
                ">=" => Opcode::IntegerGreaterOrEqual,
                "==" => Opcode::IntegerEquals,
                "!=" => Opcode::IntegerNotEquals,
                "to_float" => Opcode::IntegerToFloat,
                "to_string" => Opcode::IntegerToString,
                _ => return None,
            }
        } else if receiver == types.float {
            match name {
                "+" => Opcode::FloatAdd,
                "-" => Opcode::FloatSub,
                "*" => Opcode::FloatMul,
                "/" => Opcode::FloatDiv,
                "%" => Opcode::FloatMod,
                "<" => Opcode::FloatSmaller,
                ">" => Opcode::FloatGreater,
                "<=" => Opcode::FloatSmallerOrEqual,
                ">=" => Opcode::FloatGreaterOrEqual,
                "==" => Opcode::FloatEquals,
                "!=" => Opcode::FloatNotEquals,
                "to_integer" => Opcode::FloatToInteger,
                "to_string" => Opcode::FloatToString,
                _ => return None,
            }
        } else if receiver == types.string {
            match name {
                "+" => Opcode::StringConcat,
                "==" => Opcode::StringEquals,
                "!=" => Opcode::StringNotEquals,
                "length" => Opcode::StringLength,
                _ => return None,
            }
        } else if receiver == types.boolean {
            match name {
                "==" => Opcode::BooleanEquals,
                "!=" => Opcode::BooleanNotEquals,
                _ => return None,
            }
        } else {
            return None;
        };
        Some(opcode)
    }
}
