// src/tir/code_object.rs
//! Code objects: the function bodies of the TIR.
//!
//! A code object owns typed registers, a linear list of basic blocks, a
//! catch table and its nested child code objects. Terminator semantics are
//! implicit in each block's last instruction:
//!
//! - `SkipNextBlock` continues at the block after the next one
//! - `GotoNextBlockIfTrue` either falls through or skips the next block
//! - `Return`, `Throw`, `Panic` and `Exit` end control flow
//! - anything else falls through to the next block

use crate::frontend::Span;
use crate::sema::symbol_table::TableId;
use crate::sema::types::TypeId;
use crate::tir::instruction::{Instruction, Opcode};

/// A numbered register with a type recorded in the owning code object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub u32);

/// A straight-line instruction sequence
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: usize,
    pub name: Option<&'static str>,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn last_opcode(&self) -> Option<Opcode> {
        self.instructions.last().map(|instruction| instruction.opcode)
    }
}

/// If anything in `try_block` throws, control moves to `else_block` with
/// the thrown value in `register`.
#[derive(Debug, Clone, Copy)]
pub struct CatchEntry {
    pub try_block: usize,
    pub else_block: usize,
    pub register: Register,
}

#[derive(Debug)]
pub struct CodeObject {
    pub name: String,
    /// The signature type of this body (a block type)
    pub block_type: TypeId,
    pub location: Span,
    /// The local symbol table, parent-linked to the enclosing body's
    pub locals: TableId,
    /// Register type table: index is the register number
    pub registers: Vec<TypeId>,
    pub blocks: Vec<BasicBlock>,
    pub catch_table: Vec<CatchEntry>,
    pub code_objects: Vec<CodeObject>,
}

impl CodeObject {
    pub fn new(
        name: impl Into<String>,
        block_type: TypeId,
        locals: TableId,
        location: Span,
    ) -> Self {
        let mut code = Self {
            name: name.into(),
            block_type,
            location,
            locals,
            registers: Vec::new(),
            blocks: Vec::new(),
            catch_table: Vec::new(),
            code_objects: Vec::new(),
        };
        code.add_block(None);
        code
    }

    /// Allocate a fresh register of the given type.
    pub fn register(&mut self, value_type: TypeId) -> Register {
        let register = Register(self.registers.len() as u32);
        self.registers.push(value_type);
        register
    }

    pub fn register_dynamic(&mut self) -> Register {
        self.register(TypeId::DYNAMIC)
    }

    pub fn register_type(&self, register: Register) -> TypeId {
        self.registers[register.0 as usize]
    }

    /// Append a new basic block and make it current.
    pub fn add_block(&mut self, name: Option<&'static str>) -> usize {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            id,
            name,
            instructions: Vec::new(),
        });
        id
    }

    pub fn current_block(&self) -> usize {
        self.blocks.len() - 1
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.blocks
            .last_mut()
            .expect("a code object always has at least one block")
            .instructions
            .push(instruction);
    }

    /// Destination of the most recently pushed instruction, if any.
    pub fn last_destination(&self) -> Option<Register> {
        self.blocks
            .iter()
            .rev()
            .flat_map(|block| block.instructions.iter().rev())
            .find_map(|instruction| instruction.destination)
    }

    /// Mark each basic block as reachable or not: the entry block is
    /// reachable, plus everything its control flow (and the catch table)
    /// leads to.
    pub fn reachable_blocks(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        if self.blocks.is_empty() {
            return reachable;
        }

        let mut worklist = vec![0usize];
        while let Some(id) = worklist.pop() {
            if id >= self.blocks.len() || reachable[id] {
                continue;
            }
            reachable[id] = true;

            match self.blocks[id].last_opcode() {
                Some(Opcode::Return) | Some(Opcode::Throw) | Some(Opcode::Panic)
                | Some(Opcode::Exit) => {}
                Some(Opcode::SkipNextBlock) => worklist.push(id + 2),
                Some(Opcode::GotoNextBlockIfTrue) => {
                    worklist.push(id + 1);
                    worklist.push(id + 2);
                }
                _ => worklist.push(id + 1),
            }

            for entry in &self.catch_table {
                if entry.try_block == id {
                    worklist.push(entry.else_block);
                }
            }
        }

        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn instruction(opcode: Opcode) -> Instruction {
        Instruction {
            opcode,
            destination: None,
            operands: smallvec![],
            literals: smallvec![],
            location: Span::default(),
        }
    }

    fn code() -> CodeObject {
        CodeObject::new("test", TypeId::DYNAMIC, TableId(0), Span::default())
    }

    #[test]
    fn registers_are_numbered_densely_and_typed() {
        let mut code = code();
        let a = code.register(TypeId(3));
        let b = code.register_dynamic();
        assert_eq!(a, Register(0));
        assert_eq!(b, Register(1));
        assert_eq!(code.register_type(a), TypeId(3));
        assert_eq!(code.register_type(b), TypeId::DYNAMIC);
    }

    #[test]
    fn blocks_after_a_return_are_unreachable() {
        let mut code = code();
        code.push(instruction(Opcode::Return));
        code.add_block(None);
        code.push(instruction(Opcode::Return));

        assert_eq!(code.reachable_blocks(), vec![true, false]);
    }

    #[test]
    fn skip_next_block_jumps_over_one_block() {
        let mut code = code();
        code.push(instruction(Opcode::SkipNextBlock));
        code.add_block(None); // skipped
        code.add_block(None); // target

        assert_eq!(code.reachable_blocks(), vec![true, false, true]);
    }

    #[test]
    fn goto_next_block_if_true_reaches_both_paths() {
        let mut code = code();
        code.push(instruction(Opcode::GotoNextBlockIfTrue));
        code.add_block(None); // fallthrough
        code.add_block(None); // jump target

        assert_eq!(code.reachable_blocks(), vec![true, true, true]);
    }

    #[test]
    fn catch_table_entries_make_else_blocks_reachable() {
        let mut code = code();
        code.push(instruction(Opcode::Return));
        code.add_block(None); // else handler, only reachable via the catch table
        let register = code.register_dynamic();
        code.catch_table.push(CatchEntry {
            try_block: 0,
            else_block: 1,
            register,
        });

        assert_eq!(code.reachable_blocks(), vec![true, true]);
    }

    #[test]
    fn fallthrough_reaches_the_next_block() {
        let mut code = code();
        code.push(instruction(Opcode::SetLiteral));
        code.add_block(None);

        assert_eq!(code.reachable_blocks(), vec![true, true]);
    }
}
