use lime_asm::Opcode;
use lime_vm::prelude::*;

mod common;

use common::{CapturedOutput, Program};

#[test]
fn listing_shows_immediate_bytes_in_stream_order() {
    let vm = Program::new()
        .op(Opcode::I16CONST)
        .imm16(0x0102)
        .op(Opcode::JMP)
        .imm16(0x0008)
        .op(Opcode::HALT)
        .into_vm(CapturedOutput::default());

    let mut listing = Vec::new();
    vm.dasm(&mut listing).expect("dasm");

    let listing = String::from_utf8(listing).unwrap();
    assert_eq!(
        listing,
        "0\t i16const 0x2 0x1\n3\t jmp 0x8 0x0\n6\t halt\n"
    );
}

#[test]
fn undecodable_bytes_are_listed_as_bad() {
    let mut vm = Vm::with_output(CapturedOutput::default());
    vm.code_emit(&[Opcode::NOP as u8, 0xfe, Opcode::HALT as u8]);

    let mut listing = Vec::new();
    vm.dasm(&mut listing).expect("dasm");

    let listing = String::from_utf8(listing).unwrap();
    assert_eq!(listing, "0\t nop\n1\t bad 0xfe\n2\t halt\n");
}
