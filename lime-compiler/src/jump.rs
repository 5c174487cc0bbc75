//! Jump labels with patch-list fixup.
//!
//! A label collects the code offsets of every two-byte placeholder emitted
//! for it. `mark` pins the label to the current code address; `fix` then
//! walks the patch list and overwrites each placeholder. Forward and
//! backward jumps go through the identical API; a backward jump simply
//! happens to be emitted after the mark.

use lime_asm::Opcode;
use lime_vm::interpreter::Vm;

/// Placeholder written where the target address will land.
const PLACEHOLDER: u16 = u16::MAX;

/// A logical code location with pending patch sites.
#[derive(Debug, Default)]
pub struct Label {
    sites: Vec<usize>,
    addr: Option<u16>,
}

impl Label {
    /// Fresh unmarked label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `op` followed by a placeholder address and record the
    /// placeholder for fixup. `op` must be one of the jump-family opcodes.
    pub fn jump_to(&mut self, vm: &mut Vm, op: Opcode) {
        debug_assert!(
            matches!(op, Opcode::JMP | Opcode::JEZ | Opcode::JNZ),
            "not a jump opcode: {op}"
        );

        vm.code_emit(&[op as u8]);
        self.sites.push(vm.code_addr());
        vm.code_emit(&PLACEHOLDER.to_le_bytes());
    }

    /// Pin the label to the current end of the code buffer.
    pub fn mark(&mut self, vm: &Vm) {
        self.addr = Some(vm.code_addr() as u16);
    }

    /// The marked address, if any.
    pub fn addr(&self) -> Option<u16> {
        self.addr
    }

    /// Write the marked address into every pending site. Idempotent:
    /// resolved sites are drained, so fixing twice is a no-op.
    pub fn fix(&mut self, vm: &mut Vm) {
        debug_assert!(self.addr.is_some() || self.sites.is_empty(), "fix before mark");

        if let Some(addr) = self.addr {
            for site in self.sites.drain(..) {
                vm.code_write_at(site, &addr.to_le_bytes());
            }
        }
    }
}

impl Drop for Label {
    fn drop(&mut self) {
        debug_assert!(
            self.sites.is_empty(),
            "label dropped with {} unresolved jump sites",
            self.sites.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_is_patched_at_fix_time() {
        let mut vm = Vm::new();
        let mut label = Label::new();

        label.jump_to(&mut vm, Opcode::JMP);
        vm.code_emit(&[Opcode::NOP as u8]);
        label.mark(&vm);
        vm.code_emit(&[Opcode::HALT as u8]);

        // Placeholder still in place until the fix.
        assert_eq!(&vm.code()[1..3], &PLACEHOLDER.to_le_bytes());

        label.fix(&mut vm);
        assert_eq!(&vm.code()[1..3], &4u16.to_le_bytes());
    }

    #[test]
    fn backward_jump_uses_the_same_api() {
        let mut vm = Vm::new();
        let mut label = Label::new();

        vm.code_emit(&[Opcode::NOP as u8]);
        label.mark(&vm);
        vm.code_emit(&[Opcode::NOP as u8]);
        label.jump_to(&mut vm, Opcode::JMP);
        label.fix(&mut vm);

        assert_eq!(&vm.code()[3..5], &1u16.to_le_bytes());
    }

    #[test]
    fn fix_twice_is_a_no_op() {
        let mut vm = Vm::new();
        let mut label = Label::new();

        label.jump_to(&mut vm, Opcode::JMP);
        label.mark(&vm);
        label.fix(&mut vm);

        let before = vm.code().to_vec();
        label.fix(&mut vm);
        assert_eq!(vm.code(), &before[..]);
    }

    #[test]
    fn several_sites_resolve_to_one_mark() {
        let mut vm = Vm::new();
        let mut label = Label::new();

        label.jump_to(&mut vm, Opcode::JEZ);
        label.jump_to(&mut vm, Opcode::JNZ);
        label.mark(&vm);
        label.fix(&mut vm);

        assert_eq!(&vm.code()[1..3], &6u16.to_le_bytes());
        assert_eq!(&vm.code()[4..6], &6u16.to_le_bytes());
    }
}
