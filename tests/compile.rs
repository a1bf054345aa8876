// tests/compile.rs
//! End-to-end compilation tests: source text in, code objects out.

use std::path::PathBuf;

use stoat::compiler::{CompileResult, MAIN_MODULE, compile_source};
use stoat::state::Config;
use stoat::tir::{CodeObject, Literal, Opcode};

fn compile(source: &str) -> CompileResult {
    let result = compile_source(source, &PathBuf::from("main.stoat"), Config::default());
    for diagnostic in result.state.diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    result
}

fn body(result: &CompileResult) -> &CodeObject {
    result
        .state
        .module(MAIN_MODULE)
        .unwrap()
        .body
        .as_ref()
        .expect("the main module has no generated body")
}

fn child<'a>(code: &'a CodeObject, name: &str) -> &'a CodeObject {
    code.code_objects
        .iter()
        .find(|child| child.name == name)
        .unwrap_or_else(|| panic!("no child code object named {name}"))
}

fn block_opcodes(code: &CodeObject, block: usize) -> Vec<Opcode> {
    code.blocks[block]
        .instructions
        .iter()
        .map(|instruction| instruction.opcode)
        .collect()
}

/// All instructions of a code object in emission order.
fn all_instructions(code: &CodeObject) -> Vec<&stoat::tir::Instruction> {
    code.blocks
        .iter()
        .flat_map(|block| block.instructions.iter())
        .collect()
}

#[test]
fn integer_literal_method_call_lowers_to_a_primitive_opcode() {
    let result = compile("def main { 1 + 2 }");
    assert!(result.is_success());

    let main = child(body(&result), "main");
    assert_eq!(
        block_opcodes(main, 0),
        vec![
            Opcode::SetLiteral,
            Opcode::SetLiteral,
            Opcode::IntegerAdd,
            Opcode::Return,
        ]
    );

    let add = &main.blocks[0].instructions[2];
    assert_eq!(add.operands.as_slice(), &[
        main.blocks[0].instructions[0].destination.unwrap(),
        main.blocks[0].instructions[1].destination.unwrap(),
    ]);

    // The implicit return flag is clear inside a method
    let ret = &main.blocks[0].instructions[3];
    assert_eq!(ret.operands.as_slice(), &[add.destination.unwrap()]);
    assert_eq!(ret.literals.as_slice(), &[Literal::Integer(0)]);
}

#[test]
fn array_literals_lower_to_set_array() {
    let result = compile("def main { let x = [10, 20, 30] }");
    assert!(result.is_success());

    let main = child(body(&result), "main");
    assert_eq!(
        block_opcodes(main, 0),
        vec![
            Opcode::SetLiteral,
            Opcode::SetLiteral,
            Opcode::SetLiteral,
            Opcode::SetArray,
            Opcode::SetLocal,
            Opcode::Return,
        ]
    );

    let instructions = &main.blocks[0].instructions;
    let array = &instructions[3];
    let literal_registers: Vec<_> = instructions[..3]
        .iter()
        .map(|instruction| instruction.destination.unwrap())
        .collect();
    assert_eq!(array.operands.as_slice(), literal_registers.as_slice());

    // The array register carries the parameterized Array type
    let element_type = result.state.types.integer;
    let array_type = main.register_type(array.destination.unwrap());
    let object = result.state.types.arena.object(array_type).unwrap();
    assert_eq!(object.name, "Array");
    assert_eq!(object.type_parameter_instances.get("T"), Some(&element_type));

    let set_local = &instructions[4];
    assert_eq!(set_local.operands.as_slice(), &[array.destination.unwrap()]);
    assert!(set_local.literals.contains(&Literal::Name("x".to_string())));
}

#[test]
fn unknown_message_sends_emit_the_guarded_pattern() {
    let result = compile(
        "object Proxy {\n  def unknown_message(name, *rest) { 42 }\n}\nProxy.ping",
    );
    assert!(result.is_success());

    let code = body(&result);
    // Find the block whose lookup of "ping" ends with the conditional skip
    let lookup_block = code
        .blocks
        .iter()
        .position(|block| {
            block.instructions.iter().any(|instruction| {
                instruction.opcode == Opcode::GetAttribute
                    && instruction.literals.contains(&Literal::Name("ping".to_string()))
            })
        })
        .expect("no lookup block for the ping send");

    assert_eq!(
        code.blocks[lookup_block].last_opcode(),
        Some(Opcode::GotoNextBlockIfTrue)
    );

    // The fallback block re-looks-up unknown_message, packs the arguments
    // and jumps past the direct call
    let fallback = &code.blocks[lookup_block + 1];
    let fallback_opcodes: Vec<_> = fallback
        .instructions
        .iter()
        .map(|instruction| instruction.opcode)
        .collect();
    assert_eq!(
        fallback_opcodes,
        vec![
            Opcode::GetAttribute,
            Opcode::SetLiteral,
            Opcode::SetArray,
            Opcode::RunBlock,
            Opcode::SkipNextBlock,
        ]
    );
    assert!(
        fallback.instructions[0]
            .literals
            .contains(&Literal::Name("unknown_message".to_string()))
    );
    assert!(
        fallback.instructions[1]
            .literals
            .contains(&Literal::String("ping".to_string()))
    );

    // The direct-call block holds only the RunBlock; both paths share the
    // result register
    let direct = &code.blocks[lookup_block + 2];
    assert_eq!(direct.instructions.len(), 1);
    assert_eq!(direct.instructions[0].opcode, Opcode::RunBlock);
    assert_eq!(
        direct.instructions[0].destination,
        fallback.instructions[3].destination
    );
}

#[test]
fn try_else_builds_three_blocks_and_a_catch_entry() {
    let result = compile(
        "def divide(a: Integer, b: Integer) !! String -> Integer { a }\ntry divide(1, 0) else (e) { 0 }",
    );
    assert!(result.is_success());

    let code = body(&result);
    assert_eq!(code.catch_table.len(), 1);
    let entry = code.catch_table[0];

    // The try block computes the result and skips over the else block
    let try_block = &code.blocks[entry.try_block];
    assert_eq!(try_block.last_opcode(), Some(Opcode::SkipNextBlock));
    assert!(
        try_block
            .instructions
            .iter()
            .any(|instruction| instruction.opcode == Opcode::SetRegister)
    );

    // The else block runs the handler as a child code object
    assert_eq!(entry.else_block, entry.try_block + 1);
    let else_block = &code.blocks[entry.else_block];
    let else_opcodes: Vec<_> = else_block
        .instructions
        .iter()
        .map(|instruction| instruction.opcode)
        .collect();
    assert_eq!(
        else_opcodes,
        vec![
            Opcode::SetBlock,
            Opcode::GetLocal,
            Opcode::RunBlock,
            Opcode::SetRegister,
        ]
    );

    // The handler is invoked with (self, caught value)
    let run = &else_block.instructions[2];
    assert!(run.operands.contains(&entry.register));

    // The caught value register carries the declared throw type
    assert_eq!(code.register_type(entry.register), result.state.types.string);

    // A continuation block follows the else block
    assert!(code.blocks.len() > entry.else_block + 1);
}

#[test]
fn imports_load_each_module_once_and_bind_aliases() {
    let root = std::env::temp_dir().join(format!("stoat-imports-{}", std::process::id()));
    std::fs::create_dir_all(root.join("std")).unwrap();
    std::fs::write(
        root.join("std/hash_map.stoat"),
        "object HashMap {\n  def new {}\n}\n",
    )
    .unwrap();

    let mut config = Config::default();
    config.target = root.join("build");
    config.include = vec![root.clone()];

    let result = compile_source(
        "import std::hash_map::(HashMap as Map)\nimport std::hash_map::(self as maps)",
        &PathBuf::from("main.stoat"),
        config,
    );
    for diagnostic in result.state.diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    assert!(result.is_success());

    let code = body(&result);
    let imports = &code.blocks[0];

    // Exactly one LoadModule despite two import statements
    let loads: Vec<_> = imports
        .instructions
        .iter()
        .filter(|instruction| instruction.opcode == Opcode::LoadModule)
        .collect();
    assert_eq!(loads.len(), 1);

    // The module is loaded through its bytecode import path
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetLiteral
            && instruction
                .literals
                .contains(&Literal::String("std/hash_map.bc".to_string()))
    }));

    // modules attribute -> module entry -> symbol -> aliased global
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::GetAttribute
            && instruction
                .literals
                .contains(&Literal::Name("modules".to_string()))
    }));
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::GetAttribute
            && instruction
                .literals
                .contains(&Literal::Name("std::hash_map".to_string()))
    }));
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::GetAttribute
            && instruction
                .literals
                .contains(&Literal::Name("HashMap".to_string()))
    }));
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetGlobal
            && instruction
                .literals
                .contains(&Literal::Name("Map".to_string()))
    }));
    assert!(imports.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetGlobal
            && instruction
                .literals
                .contains(&Literal::Name("maps".to_string()))
    }));

    // One module entry in the graph for the dependency
    assert!(result.state.module("std::hash_map").is_ok());

    std::fs::remove_dir_all(root).ok();
}

#[test]
fn hash_literals_expand_to_new_and_index_set_sends() {
    let result = compile(
        "object HashMap {\n  def new {}\n  def []=(key, value) {}\n}\ndef main { %['a': 10, 'b': 20] }",
    );
    assert!(result.is_success());

    let main = child(body(&result), "main");
    let instructions = all_instructions(main);

    // One constructor send
    let new_lookups: Vec<_> = instructions
        .iter()
        .filter(|instruction| {
            instruction.opcode == Opcode::GetAttribute
                && instruction.literals.contains(&Literal::Name("new".to_string()))
        })
        .collect();
    assert_eq!(new_lookups.len(), 1);

    // One []= send per pair
    let set_lookups: Vec<_> = instructions
        .iter()
        .filter(|instruction| {
            instruction.opcode == Opcode::GetAttribute
                && instruction.literals.contains(&Literal::Name("[]=".to_string()))
        })
        .collect();
    assert_eq!(set_lookups.len(), 2);

    let runs: Vec<_> = instructions
        .iter()
        .filter(|instruction| instruction.opcode == Opcode::RunBlock)
        .collect();
    assert_eq!(runs.len(), 3);

    // Keys and values are evaluated pairwise, after the constructor
    let literals: Vec<_> = instructions
        .iter()
        .filter(|instruction| instruction.opcode == Opcode::SetLiteral)
        .map(|instruction| instruction.literals[0].clone())
        .collect();
    assert_eq!(
        literals,
        vec![
            Literal::String("a".to_string()),
            Literal::Integer(10),
            Literal::String("b".to_string()),
            Literal::Integer(20),
        ]
    );
}

#[test]
fn operand_registers_are_defined_before_use() {
    let sources = [
        "def main { 1 + 2 }",
        "def main { let x = [10, 20] }",
        "object Proxy {\n  def unknown_message(name, *rest) { 42 }\n}\nProxy.ping",
        "def divide(a: Integer, b: Integer) !! String -> Integer { a }\ntry divide(1, 0) else (e) { 0 }",
        "def greet(name, prefix = 'Hello') { prefix }\ngreet('stoat')",
    ];

    for source in sources {
        let result = compile(source);
        assert!(result.is_success(), "failed to compile: {source}");
        check_operand_definitions(body(&result), source);
    }
}

fn check_operand_definitions(code: &CodeObject, source: &str) {
    // Catch registers are written by the VM when a throw transfers control
    let mut defined: Vec<bool> = vec![false; code.registers.len()];
    for entry in &code.catch_table {
        defined[entry.register.0 as usize] = true;
    }

    for block in &code.blocks {
        for instruction in &block.instructions {
            for operand in &instruction.operands {
                assert!(
                    defined[operand.0 as usize],
                    "operand {operand:?} of {:?} used before definition in {source}",
                    instruction.opcode
                );
            }
            if let Some(destination) = instruction.destination {
                defined[destination.0 as usize] = true;
            }
        }
    }

    for child_code in &code.code_objects {
        check_operand_definitions(child_code, source);
    }
}

#[test]
fn reachable_blocks_flow_into_terminators_or_successors() {
    let result = compile(
        "def main {\n  let x = 1\n  return x\n}\ndef other { try broken else { 0 } }\ndef broken !! String { throw 'oops' }",
    );
    assert!(result.is_success());

    check_terminators(body(&result));
}

fn check_terminators(code: &CodeObject) {
    let reachable = code.reachable_blocks();
    for (id, block) in code.blocks.iter().enumerate() {
        if !reachable[id] {
            continue;
        }
        let terminated = block
            .last_opcode()
            .is_some_and(|opcode| opcode.terminates_block());
        let has_successor = id + 1 < code.blocks.len();
        assert!(
            terminated || has_successor,
            "reachable block {id} of {} neither terminates nor falls through",
            code.name
        );
    }

    for child in &code.code_objects {
        check_terminators(child);
    }
}

#[test]
fn register_numbering_is_deterministic_across_runs() {
    let source =
        "object Proxy {\n  def unknown_message(name, *rest) { 42 }\n}\ndef main { Proxy.ping }\nmain";

    let first = compile(source);
    let second = compile(source);
    assert!(first.is_success());

    let rendered_first = format!("{:?}", body(&first));
    let rendered_second = format!("{:?}", body(&second));
    assert_eq!(rendered_first, rendered_second);
}

#[test]
fn missing_imports_surface_as_diagnostics_not_panics() {
    let result = compile("import std::missing");
    assert!(!result.is_success());
    let diagnostic = result.state.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.code.as_deref(), Some("E2001"));
    assert!(diagnostic.to_string().contains("std::missing"));
}

#[test]
fn method_defaults_generate_conditional_blocks() {
    let result = compile("def greet(name, prefix = 'Hello') { prefix }\ngreet('stoat')");
    assert!(result.is_success());

    let greet = child(body(&result), "greet");
    // Entry block tests for the caller-supplied value, the next block
    // assigns the default, and the body follows
    assert_eq!(
        block_opcodes(greet, 0),
        vec![Opcode::LocalExists, Opcode::GotoNextBlockIfTrue]
    );
    let default_block = &greet.blocks[1];
    assert_eq!(default_block.name, Some("default_argument"));
    assert_eq!(default_block.last_opcode(), Some(Opcode::SetLocal));
    assert!(greet.blocks[1].instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetLiteral
            && instruction
                .literals
                .contains(&Literal::String("Hello".to_string()))
    }));
}

#[test]
fn lambdas_default_self_to_the_module_global() {
    let result = compile("def main { lambda { 1 } }");
    assert!(result.is_success());

    let main = child(body(&result), "main");
    let lambda = child(main, "<lambda>");

    assert_eq!(
        block_opcodes(lambda, 0),
        vec![Opcode::LocalExists, Opcode::GotoNextBlockIfTrue]
    );
    let default_block = &lambda.blocks[1];
    assert_eq!(default_block.name, Some("self_default"));
    assert!(default_block.instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::GetGlobal
            && instruction
                .literals
                .contains(&Literal::Name("MODULE".to_string()))
    }));
    assert_eq!(default_block.last_opcode(), Some(Opcode::SetLocal));
}

#[test]
fn module_bodies_start_with_imports_and_define_module_blocks() {
    let result = compile("1");
    assert!(result.is_success());

    let code = body(&result);
    assert_eq!(code.blocks[0].name, Some("imports"));
    assert_eq!(code.blocks[1].name, Some("define_module"));
    assert_eq!(code.blocks[2].name, Some("body"));

    // The imports block binds the built-in globals from the toplevel
    assert_eq!(code.blocks[0].instructions[0].opcode, Opcode::GetToplevel);
    assert!(code.blocks[0].instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetGlobal
            && instruction
                .literals
                .contains(&Literal::Name("Integer".to_string()))
    }));

    // The define-module block materializes and binds the module object
    assert!(code.blocks[1].instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetObject
    }));
    assert!(code.blocks[1].instructions.iter().any(|instruction| {
        instruction.opcode == Opcode::SetGlobal
            && instruction
                .literals
                .contains(&Literal::Name("MODULE".to_string()))
    }));
}

#[test]
fn closures_reach_enclosing_locals_through_parent_opcodes() {
    let result = compile("def main {\n  let x = 1\n  do { x }\n}");
    assert!(result.is_success());

    let main = child(body(&result), "main");
    let closure = child(main, "<closure>");
    let instructions = all_instructions(closure);

    let parent_load = instructions
        .iter()
        .find(|instruction| instruction.opcode == Opcode::GetParentLocal)
        .expect("closures load captured locals through GetParentLocal");
    assert_eq!(parent_load.literals[0], Literal::Integer(0));
    assert!(parent_load.literals.contains(&Literal::Name("x".to_string())));
}

#[test]
fn explicit_returns_in_closures_set_the_block_return_flag() {
    let result = compile("def main {\n  do { return 1 }\n}");
    assert!(result.is_success());

    let main = child(body(&result), "main");
    let closure = child(main, "<closure>");
    let ret = all_instructions(closure)
        .into_iter()
        .find(|instruction| instruction.opcode == Opcode::Return)
        .expect("the closure has an explicit return");
    assert_eq!(ret.literals.as_slice(), &[Literal::Integer(1)]);
}
