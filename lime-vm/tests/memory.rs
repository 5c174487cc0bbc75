use lime_asm::Opcode;
use lime_types::TypeTag;
use lime_vm::prelude::*;

mod common;

use common::{run, CapturedOutput, Program};

fn top_frame(locals: u16) -> Program {
    Program::new()
        .op(Opcode::ICONST_0)
        .op(Opcode::ICONST_0)
        .op(Opcode::PROC)
        .imm16(0)
        .imm16(locals)
}

#[test]
fn store_and_load_a_slot() {
    let (_, out) = run(
        top_frame(1)
            .op(Opcode::I8CONST)
            .imm8(14)
            .op(Opcode::XSTORE)
            .imm16(0)
            .op(Opcode::XLOAD)
            .imm16(0)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I32 as u8)
            .op(Opcode::HALT),
    );

    assert_eq!(out, "14");
}

#[test]
fn sibling_slots_hold_distinct_values() {
    let (vm, _) = run(
        top_frame(2)
            .op(Opcode::I8CONST)
            .imm8(10)
            .op(Opcode::XSTORE)
            .imm16(0)
            .op(Opcode::I8CONST)
            .imm8(20)
            .op(Opcode::XSTORE)
            .imm16(1)
            .op(Opcode::XLOAD)
            .imm16(0)
            .op(Opcode::XLOAD)
            .imm16(1)
            .op(Opcode::HALT),
    );

    let stack = vm.stack();
    assert_eq!(stack[stack.len() - 2].to_i64(), 10);
    assert_eq!(stack[stack.len() - 1].to_i64(), 20);
}

#[test]
fn array_store_header_and_elements() {
    // Array of 3 i32 at slot 0: header slot + 3 element slots.
    let (vm, out) = run(
        top_frame(4)
            .op(Opcode::I8CONST)
            .imm8(10)
            .op(Opcode::I8CONST)
            .imm8(20)
            .op(Opcode::I8CONST)
            .imm8(30)
            .op(Opcode::ASTORE)
            .imm16(0)
            .imm16(3)
            .imm8(TypeTag::I32 as u8)
            // xs[1]
            .op(Opcode::ICONST_1)
            .op(Opcode::XLOADI)
            .imm16(0)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I32 as u8)
            // len(xs)
            .op(Opcode::I8CONST)
            .imm8(0)
            .op(Opcode::ALEN)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I64 as u8)
            .op(Opcode::HALT),
    );

    assert_eq!(out, "203"); // "20" then "3"

    // Header word at bp + 0 carries (len << 16) | ty.
    let bp = vm.bp() as usize;
    let header = vm.stack()[bp].to_u64();
    assert_eq!(header >> 16, 3);
    assert_eq!(header & 0xffff, TypeTag::I32 as u64);
}

#[test]
fn indexed_store_overwrites_one_element() {
    let (_, out) = run(
        top_frame(4)
            .op(Opcode::I8CONST)
            .imm8(1)
            .op(Opcode::I8CONST)
            .imm8(2)
            .op(Opcode::I8CONST)
            .imm8(3)
            .op(Opcode::ASTORE)
            .imm16(0)
            .imm16(3)
            .imm8(TypeTag::I32 as u8)
            // xs[2] = 9
            .op(Opcode::I8CONST)
            .imm8(9)
            .op(Opcode::I8CONST)
            .imm8(2)
            .op(Opcode::XSTOREI)
            .imm16(0)
            // print xs[2]
            .op(Opcode::I8CONST)
            .imm8(2)
            .op(Opcode::XLOADI)
            .imm16(0)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I32 as u8)
            .op(Opcode::HALT),
    );

    assert_eq!(out, "9");
}

#[test]
fn strings_print_and_measure() {
    let (_, out) = run(
        top_frame(0)
            .data(b"caf\xc3\xa9\0")
            .op(Opcode::XCONST)
            .imm16(0)
            .op(Opcode::SPRINT)
            .op(Opcode::XCONST)
            .imm16(0)
            .op(Opcode::SLEN)
            .op(Opcode::IPRINT)
            .imm8(TypeTag::I64 as u8)
            .op(Opcode::NPRINT)
            .op(Opcode::HALT),
    );

    // 5 bytes, 4 code points.
    assert_eq!(out, "café4\n");
}

#[test]
fn out_of_frame_slot_is_fatal() {
    let mut vm = top_frame(0)
        .op(Opcode::XLOAD)
        .imm16(40)
        .op(Opcode::HALT)
        .into_vm(CapturedOutput::default());

    assert!(matches!(vm.run(), Err(VmError::SlotOutOfRange { .. })));
}
