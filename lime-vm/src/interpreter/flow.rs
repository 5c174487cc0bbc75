use lime_types::Value;

use super::Vm;
use crate::consts::{CALL_LEN, FRAME_WORDS};
use crate::error::VmError;

impl Vm {
    pub(crate) fn op_dup(&mut self) -> Result<(), VmError> {
        let top = self.top()?;
        self.push(top);
        self.ip += 1;

        Ok(())
    }

    pub(crate) fn op_swap(&mut self) -> Result<(), VmError> {
        if self.sp < 2 {
            return Err(VmError::StackUnderflow { ip: self.ip });
        }

        let sp = self.sp as usize;
        self.stack.swap(sp, sp - 1);
        self.ip += 1;

        Ok(())
    }

    pub(crate) fn op_drop(&mut self) -> Result<(), VmError> {
        self.pop()?;
        self.ip += 1;

        Ok(())
    }

    pub(crate) fn op_allc(&mut self) {
        self.ensure_stack(1);
        self.sp += 1;
        self.ip += 1;
    }

    /// `call addr`: push the return address and the caller's `bp`, then
    /// jump to the callee's `proc`.
    pub(crate) fn op_call(&mut self) -> Result<(), VmError> {
        let addr = self.imm_u16(self.ip + 1)?;

        self.push(Value::from_u64((self.ip + CALL_LEN) as u64));
        self.push(Value::from_u64(self.bp as u64));
        self.ip = addr as u32;

        Ok(())
    }

    /// `proc args locals`: turn the words pushed by `call` into a frame.
    ///
    /// After this runs, slot 0 addresses the first argument, `locals`
    /// fresh slots sit above the arguments, and the top three cells are
    /// the return address, the saved `bp` and the drop count for `ret`.
    pub(crate) fn op_proc(&mut self) -> Result<(), VmError> {
        let args = self.imm_u16(self.ip + 1)? as u32;
        let locals = self.imm_u16(self.ip + 3)? as u32;

        let saved_bp = self.pop()?;
        let ret_ip = self.pop()?;

        // The vacated cells become the first locals; hand them over clean.
        self.stack[(self.sp + 1) as usize] = Value::ZERO;
        self.stack[(self.sp + 2) as usize] = Value::ZERO;

        if self.sp + 1 < args {
            return Err(VmError::StackUnderflow { ip: self.ip });
        }
        self.bp = self.sp + 1 - args;

        self.ensure_stack(locals + FRAME_WORDS);
        self.sp += locals;

        self.push(ret_ip);
        self.push(saved_bp);
        self.push(Value::from_u64((args + locals) as u64));

        self.ip += 5;

        Ok(())
    }

    /// `ret`: pop the return value, unwind the frame words and the slot
    /// area, restore the caller's registers and push the value back.
    pub(crate) fn op_ret(&mut self) -> Result<(), VmError> {
        let ret_value = self.pop()?;
        let drops = self.pop()?.to_u32();
        let saved_bp = self.pop()?;
        let ret_ip = self.pop()?;

        if self.sp < drops {
            return Err(VmError::StackUnderflow { ip: self.ip });
        }
        self.sp -= drops;

        self.push(ret_value);
        self.ip = ret_ip.to_u32();
        self.bp = saved_bp.to_u32();

        Ok(())
    }

    pub(crate) fn op_jmp(&mut self) -> Result<(), VmError> {
        self.ip = self.imm_u16(self.ip + 1)? as u32;

        Ok(())
    }

    /// `jez`: branch on an all-zero bit pattern. Integer `0` and real
    /// `+0.0` share that pattern, so one test serves both views.
    pub(crate) fn op_jez(&mut self) -> Result<(), VmError> {
        let target = self.imm_u16(self.ip + 1)?;
        let value = self.pop()?;

        if value.is_zero() {
            self.ip = target as u32;
        } else {
            self.ip += 3;
        }

        Ok(())
    }

    pub(crate) fn op_jnz(&mut self) -> Result<(), VmError> {
        let target = self.imm_u16(self.ip + 1)?;
        let value = self.pop()?;

        if value.is_zero() {
            self.ip += 3;
        } else {
            self.ip = target as u32;
        }

        Ok(())
    }
}
