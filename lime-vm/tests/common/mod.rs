#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use lime_asm::Opcode;
use lime_vm::prelude::*;

/// Write sink shared between a running [`Vm`] and the test that inspects
/// what the program printed.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn as_string(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("program output must be UTF-8")
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Byte-level program builder for hand-assembled test images.
#[derive(Debug, Default)]
pub struct Program {
    bytes: Vec<u8>,
    data: Vec<u8>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(mut self, op: Opcode) -> Self {
        self.bytes.push(op as u8);
        self
    }

    pub fn imm8(mut self, v: u8) -> Self {
        self.bytes.push(v);
        self
    }

    pub fn imm16(mut self, v: u16) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn imm32(mut self, v: u32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn imm64(mut self, v: u64) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Current code offset, for hand-computing jump targets.
    pub fn here(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub fn into_vm(self, out: CapturedOutput) -> Vm {
        let mut vm = Vm::with_output(out);
        vm.code_emit(&self.bytes);
        vm.data_emit(&self.data);
        vm
    }
}

/// Run a program to halt and hand back the machine plus captured output.
pub fn run(program: Program) -> (Vm, String) {
    let out = CapturedOutput::default();
    let mut vm = program.into_vm(out.clone());
    vm.run().expect("program must execute");
    (vm, out.as_string())
}
