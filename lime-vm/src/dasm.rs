//! Disassembly listing writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use lime_asm::Opcode;

use crate::interpreter::Vm;

impl Vm {
    /// Write one line per instruction: the hex code offset, a tab, the
    /// mnemonic, then each immediate byte as `0x..` in stream order.
    /// Undecodable bytes are listed as `bad` so a damaged image still
    /// produces a listing.
    pub fn dasm<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let code = self.code.as_slice();
        let mut ip = 0;

        while ip < code.len() {
            ip += self.dasm_opcode(out, ip)?;
        }

        Ok(())
    }

    /// Disassemble to a file.
    pub fn dasm_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.dasm(&mut out)?;
        out.flush()
    }

    /// Write the single instruction at `ip`; returns its encoded length.
    fn dasm_opcode<W: Write>(&self, out: &mut W, ip: usize) -> io::Result<usize> {
        let code = self.code.as_slice();
        let byte = code[ip];

        let Ok(op) = Opcode::try_from(byte) else {
            writeln!(out, "{ip:x}\t bad {byte:#x}")?;
            return Ok(1);
        };

        write!(out, "{ip:x}\t {}", op.mnemonic())?;

        let imm = &code[ip + 1..(ip + 1 + op.immediate_len()).min(code.len())];
        for byte in imm {
            write!(out, " {byte:#x}")?;
        }
        writeln!(out)?;

        Ok(1 + op.immediate_len())
    }
}
