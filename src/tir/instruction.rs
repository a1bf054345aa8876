// src/tir/instruction.rs
//! The TIR instruction set.
//!
//! Instructions are a uniform record: an opcode, an optional destination
//! register, operand registers, and inline literal arguments. The shape of
//! an instruction is implied by its opcode; there is no separate IR type
//! per shape. The registry is closed per compile: `_intrinsic.<name>`
//! resolves through `intrinsic_opcode` and unknown names are rejected.

use crate::frontend::Span;
use crate::tir::Register;
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Construction
    SetLiteral,
    SetObject,
    SetArray,
    SetBlock,
    SetRegister,

    // Attributes, locals and globals
    GetAttribute,
    SetAttribute,
    GetLocal,
    SetLocal,
    GetParentLocal,
    SetParentLocal,
    GetGlobal,
    SetGlobal,
    GetToplevel,
    LocalExists,

    // Well-known singletons
    GetNil,

    // Calls and control flow
    RunBlock,
    Return,
    Throw,
    GotoNextBlockIfTrue,
    SkipNextBlock,
    LoadModule,

    // Integer operations
    IntegerAdd,
    IntegerSub,
    IntegerMul,
    IntegerDiv,
    IntegerMod,
    IntegerBitwiseAnd,
    IntegerBitwiseOr,
    IntegerBitwiseXor,
    IntegerShiftLeft,
    IntegerShiftRight,
    IntegerSmaller,
    IntegerGreater,
    IntegerSmallerOrEqual,
    IntegerGreaterOrEqual,
    IntegerEquals,
    IntegerNotEquals,
    IntegerToFloat,
    IntegerToString,

    // Float operations
    FloatAdd,
    FloatSub,
    FloatMul,
    FloatDiv,
    FloatMod,
    FloatSmaller,
    FloatGreater,
    FloatSmallerOrEqual,
    FloatGreaterOrEqual,
    FloatEquals,
    FloatNotEquals,
    FloatToInteger,
    FloatToString,

    // String operations
    StringConcat,
    StringEquals,
    StringNotEquals,
    StringLength,

    // Boolean operations
    BooleanEquals,
    BooleanNotEquals,

    // Array operations
    ArrayLength,
    ArrayAt,
    ArraySet,
    ArrayRemove,

    // Object operations
    ObjectEquals,
    GetPrototype,
    SetPrototype,

    // Processes
    ProcessSpawn,
    ProcessSendMessage,
    ProcessReceiveMessage,
    ProcessCurrentPid,
    ProcessStatus,
    ProcessSuspendCurrent,
    ProcessTerminateCurrent,

    // Files and directories
    FileOpen,
    FileRead,
    FileWrite,
    FileFlush,
    FileSize,
    FileSeek,
    FileRemove,
    DirectoryCreate,
    DirectoryRemove,
    DirectoryList,

    // Hashers
    HasherNew,
    HasherWrite,
    HasherToHash,

    // Standard streams
    StdoutWrite,
    StderrWrite,
    StdinRead,

    // Memory and lifecycle
    Drop,
    MoveToPool,
    Panic,
    Exit,
}

impl Opcode {
    /// True for opcodes that produce a value in a destination register.
    pub fn writes_register(&self) -> bool {
        !matches!(
            self,
            Opcode::SetLocal
                | Opcode::SetParentLocal
                | Opcode::SetGlobal
                | Opcode::Return
                | Opcode::Throw
                | Opcode::GotoNextBlockIfTrue
                | Opcode::SkipNextBlock
                | Opcode::Drop
                | Opcode::MoveToPool
                | Opcode::Panic
                | Opcode::Exit
                | Opcode::ProcessSuspendCurrent
                | Opcode::ProcessTerminateCurrent
        )
    }

    /// True for instructions that terminate a basic block.
    pub fn terminates_block(&self) -> bool {
        matches!(
            self,
            Opcode::Return
                | Opcode::Throw
                | Opcode::GotoNextBlockIfTrue
                | Opcode::SkipNextBlock
                | Opcode::Panic
                | Opcode::Exit
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Resolve an intrinsic name (`_intrinsic.<name>`) to its opcode.
pub fn intrinsic_opcode(name: &str) -> Option<Opcode> {
    let opcode = match name {
        "set_literal" => Opcode::SetLiteral,
        "set_object" => Opcode::SetObject,
        "set_array" => Opcode::SetArray,
        "set_register" => Opcode::SetRegister,
        "get_attribute" => Opcode::GetAttribute,
        "set_attribute" => Opcode::SetAttribute,
        "get_toplevel" => Opcode::GetToplevel,
        "get_nil" => Opcode::GetNil,
        "load_module" => Opcode::LoadModule,
        "run_block" => Opcode::RunBlock,
        "integer_add" => Opcode::IntegerAdd,
        "integer_sub" => Opcode::IntegerSub,
        "integer_mul" => Opcode::IntegerMul,
        "integer_div" => Opcode::IntegerDiv,
        "integer_mod" => Opcode::IntegerMod,
        "integer_bitwise_and" => Opcode::IntegerBitwiseAnd,
        "integer_bitwise_or" => Opcode::IntegerBitwiseOr,
        "integer_bitwise_xor" => Opcode::IntegerBitwiseXor,
        "integer_shift_left" => Opcode::IntegerShiftLeft,
        "integer_shift_right" => Opcode::IntegerShiftRight,
        "integer_smaller" => Opcode::IntegerSmaller,
        "integer_greater" => Opcode::IntegerGreater,
        "integer_smaller_or_equal" => Opcode::IntegerSmallerOrEqual,
        "integer_greater_or_equal" => Opcode::IntegerGreaterOrEqual,
        "integer_equals" => Opcode::IntegerEquals,
        "integer_not_equals" => Opcode::IntegerNotEquals,
        "integer_to_float" => Opcode::IntegerToFloat,
        "integer_to_string" => Opcode::IntegerToString,
        "float_add" => Opcode::FloatAdd,
        "float_sub" => Opcode::FloatSub,
        "float_mul" => Opcode::FloatMul,
        "float_div" => Opcode::FloatDiv,
        "float_mod" => Opcode::FloatMod,
        "float_smaller" => Opcode::FloatSmaller,
        "float_greater" => Opcode::FloatGreater,
        "float_smaller_or_equal" => Opcode::FloatSmallerOrEqual,
        "float_greater_or_equal" => Opcode::FloatGreaterOrEqual,
        "float_equals" => Opcode::FloatEquals,
        "float_not_equals" => Opcode::FloatNotEquals,
        "float_to_integer" => Opcode::FloatToInteger,
        "float_to_string" => Opcode::FloatToString,
        "string_concat" => Opcode::StringConcat,
        "string_equals" => Opcode::StringEquals,
        "string_not_equals" => Opcode::StringNotEquals,
        "string_length" => Opcode::StringLength,
        "boolean_equals" => Opcode::BooleanEquals,
        "boolean_not_equals" => Opcode::BooleanNotEquals,
        "array_length" => Opcode::ArrayLength,
        "array_at" => Opcode::ArrayAt,
        "array_set" => Opcode::ArraySet,
        "array_remove" => Opcode::ArrayRemove,
        "object_equals" => Opcode::ObjectEquals,
        "get_prototype" => Opcode::GetPrototype,
        "set_prototype" => Opcode::SetPrototype,
        "process_spawn" => Opcode::ProcessSpawn,
        "process_send_message" => Opcode::ProcessSendMessage,
        "process_receive_message" => Opcode::ProcessReceiveMessage,
        "process_current_pid" => Opcode::ProcessCurrentPid,
        "process_status" => Opcode::ProcessStatus,
        "process_suspend_current" => Opcode::ProcessSuspendCurrent,
        "process_terminate_current" => Opcode::ProcessTerminateCurrent,
        "file_open" => Opcode::FileOpen,
        "file_read" => Opcode::FileRead,
        "file_write" => Opcode::FileWrite,
        "file_flush" => Opcode::FileFlush,
        "file_size" => Opcode::FileSize,
        "file_seek" => Opcode::FileSeek,
        "file_remove" => Opcode::FileRemove,
        "directory_create" => Opcode::DirectoryCreate,
        "directory_remove" => Opcode::DirectoryRemove,
        "directory_list" => Opcode::DirectoryList,
        "hasher_new" => Opcode::HasherNew,
        "hasher_write" => Opcode::HasherWrite,
        "hasher_to_hash" => Opcode::HasherToHash,
        "stdout_write" => Opcode::StdoutWrite,
        "stderr_write" => Opcode::StderrWrite,
        "stdin_read" => Opcode::StdinRead,
        "drop" => Opcode::Drop,
        "move_to_pool" => Opcode::MoveToPool,
        "panic" => Opcode::Panic,
        "exit" => Opcode::Exit,
        _ => return None,
    };
    Some(opcode)
}

/// An inline literal argument of an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    /// A symbol or attribute name
    Name(String),
    /// Index of a child code object (SetBlock)
    Code(usize),
}

/// One TIR instruction
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub destination: Option<Register>,
    pub operands: SmallVec<[Register; 4]>,
    pub literals: SmallVec<[Literal; 2]>,
    pub location: Span,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        destination: Option<Register>,
        operands: impl IntoIterator<Item = Register>,
        literals: impl IntoIterator<Item = Literal>,
        location: Span,
    ) -> Self {
        Self {
            opcode,
            destination,
            operands: operands.into_iter().collect(),
            literals: literals.into_iter().collect(),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_names_resolve_to_opcodes() {
        assert_eq!(intrinsic_opcode("integer_add"), Some(Opcode::IntegerAdd));
        assert_eq!(intrinsic_opcode("stdout_write"), Some(Opcode::StdoutWrite));
        assert_eq!(intrinsic_opcode("hasher_new"), Some(Opcode::HasherNew));
        assert_eq!(intrinsic_opcode("warp_drive"), None);
    }

    #[test]
    fn terminators_and_register_writers() {
        assert!(Opcode::Return.terminates_block());
        assert!(Opcode::SkipNextBlock.terminates_block());
        assert!(!Opcode::SetLiteral.terminates_block());

        assert!(Opcode::SetLiteral.writes_register());
        assert!(Opcode::RunBlock.writes_register());
        assert!(!Opcode::SetGlobal.writes_register());
        assert!(!Opcode::Throw.writes_register());
    }
}
