use lime_asm::Opcode;
use lime_types::TypeTag;
use lime_vm::prelude::*;

mod common;

use common::{run, CapturedOutput, Program};

/// The emitter's top-level prologue: placeholder frame words plus
/// `proc 0 <locals>`.
fn top_frame(locals: u16) -> Program {
    Program::new()
        .op(Opcode::ICONST_0)
        .op(Opcode::ICONST_0)
        .op(Opcode::PROC)
        .imm16(0)
        .imm16(locals)
}

#[test]
fn call_and_return_through_a_frame() {
    // 0..7   top-level prologue
    // 7      i8const 7
    // 9      i8const 35
    // 11     call 17
    // 14     iprint i64
    // 16     halt
    // 17     proc 2 0
    // 22     xload 0
    // 25     xload 1
    // 28     iadd
    // 29     ret
    let (vm, out) = run(
        top_frame(0)
            .op(Opcode::I8CONST)
            .imm8(7)
            .op(Opcode::I8CONST)
            .imm8(35)
            .op(Opcode::CALL)
            .imm16(17)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I64 as u8)
            .op(Opcode::HALT)
            .op(Opcode::PROC)
            .imm16(2)
            .imm16(0)
            .op(Opcode::XLOAD)
            .imm16(0)
            .op(Opcode::XLOAD)
            .imm16(1)
            .op(Opcode::IADD)
            .op(Opcode::RET),
    );

    assert_eq!(out, "42");
    // Nothing but the synthetic top-level frame words remain.
    assert_eq!(vm.sp(), 3);
}

#[test]
fn jez_takes_integer_zero() {
    // 0..7 prologue; 7 iconst_0; 8 jez 14; 11 iprint skipped; 13 halt; 14 halt
    let (_, out) = run(
        top_frame(0)
            .op(Opcode::ICONST_0)
            .op(Opcode::JEZ)
            .imm16(14)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I64 as u8)
            .op(Opcode::HALT)
            .op(Opcode::HALT),
    );

    assert_eq!(out, "");
}

#[test]
fn jez_takes_real_positive_zero() {
    let (vm, _) = run(
        top_frame(0)
            .op(Opcode::RCONST_0)
            .op(Opcode::JEZ)
            .imm16(13)
            .op(Opcode::ICONST_1)
            .op(Opcode::HALT)
            .op(Opcode::HALT),
    );

    // The branch fired: no `1` was pushed above the frame words.
    assert_eq!(vm.sp(), 3);
}

#[test]
fn jnz_falls_through_on_zero() {
    let (vm, _) = run(
        top_frame(0)
            .op(Opcode::ICONST_0)
            .op(Opcode::JNZ)
            .imm16(13)
            .op(Opcode::ICONST_1)
            .op(Opcode::HALT)
            .op(Opcode::HALT),
    );

    assert_eq!(vm.sp(), 4);
    assert_eq!(vm.stack().last().unwrap().to_i64(), 1);
}

#[test]
fn dup_swap_drop() {
    let (vm, _) = run(
        Program::new()
            .op(Opcode::I8CONST)
            .imm8(1)
            .op(Opcode::I8CONST)
            .imm8(2)
            .op(Opcode::DUP)
            .op(Opcode::DROP)
            .op(Opcode::SWAP)
            .op(Opcode::HALT),
    );

    let stack = vm.stack();
    assert_eq!(stack[stack.len() - 2].to_i64(), 2);
    assert_eq!(stack[stack.len() - 1].to_i64(), 1);
}

#[test]
fn stack_grows_past_its_initial_size() {
    let mut program = Program::new();
    for _ in 0..100 {
        program = program.op(Opcode::ICONST_1);
    }
    let (vm, _) = run(program.op(Opcode::HALT));

    assert_eq!(vm.sp(), 100);
}

#[test]
fn drop_on_empty_stack_underflows() {
    let mut vm = Program::new()
        .op(Opcode::DROP)
        .op(Opcode::HALT)
        .into_vm(CapturedOutput::default());

    assert!(matches!(vm.run(), Err(VmError::StackUnderflow { ip: 0 })));
}

#[test]
fn jump_past_the_code_buffer_is_fatal() {
    let mut vm = Program::new()
        .op(Opcode::JMP)
        .imm16(0x400)
        .into_vm(CapturedOutput::default());

    assert!(matches!(vm.run(), Err(VmError::CodeOutOfBounds { .. })));
}
