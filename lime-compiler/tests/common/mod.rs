#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use lime_compiler::{compile_into, CompileError};
use lime_vm::prelude::*;

/// Write sink shared between the running [`Vm`] and the test.
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

/// Compile `source`, run it to halt, and return the machine plus whatever
/// it printed. Also asserts the universal stack invariant: at halt the
/// stack holds the global slots plus the three synthetic top-level frame
/// words, and nothing else.
pub fn run_source(source: &str) -> (Vm, String) {
    let out = CapturedOutput::default();
    let mut vm = Vm::with_output(out.clone());

    compile_into(source, &mut vm).expect("source must compile");

    // The prologue is iconst_0 iconst_0 proc <args:u16> <locals:u16>; the
    // locals immediate sits at code offsets 5..7.
    let locals = u16::from_le_bytes(vm.code()[5..7].try_into().unwrap()) as u32;

    vm.run().expect("program must execute");

    assert_eq!(
        vm.sp(),
        locals + 3,
        "user values leaked on the operand stack"
    );

    (vm, out.as_string())
}

/// Compile `source` and return its output alone.
pub fn output_of(source: &str) -> String {
    run_source(source).1
}

/// Compile `source`, expecting a diagnostic.
#[allow(dead_code)]
pub fn compile_error(source: &str) -> CompileError {
    let mut vm = Vm::with_output(CapturedOutput::default());
    compile_into(source, &mut vm).expect_err("source must be rejected")
}
