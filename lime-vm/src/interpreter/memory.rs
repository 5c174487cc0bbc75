use lime_types::Value;

use super::Vm;
use crate::error::VmError;

impl Vm {
    pub(crate) fn op_xload(&mut self) -> Result<(), VmError> {
        let slot = self.imm_u16(self.ip + 1)?;
        let index = self.slot_index(slot as u32)?;

        self.push(self.stack[index]);
        self.ip += 3;

        Ok(())
    }

    pub(crate) fn op_xstore(&mut self) -> Result<(), VmError> {
        let slot = self.imm_u16(self.ip + 1)?;
        let value = self.pop()?;
        let index = self.slot_index(slot as u32)?;

        self.stack[index] = value;
        self.ip += 3;

        Ok(())
    }

    /// `xloadi slot`: pop an element index, push `stack[bp + slot + i + 1]`.
    /// Slot `bp + slot` itself is the array header.
    pub(crate) fn op_xloadi(&mut self) -> Result<(), VmError> {
        let slot = self.imm_u16(self.ip + 1)?;
        let element = self.pop()?.to_u16();
        let index = self.slot_index(slot as u32 + element as u32 + 1)?;

        self.push(self.stack[index]);
        self.ip += 3;

        Ok(())
    }

    pub(crate) fn op_xstorei(&mut self) -> Result<(), VmError> {
        let slot = self.imm_u16(self.ip + 1)?;
        let element = self.pop()?.to_u16();
        let value = self.pop()?;
        let index = self.slot_index(slot as u32 + element as u32 + 1)?;

        self.stack[index] = value;
        self.ip += 3;

        Ok(())
    }

    pub(crate) fn op_xconst(&mut self) -> Result<(), VmError> {
        let addr = self.imm_u16(self.ip + 1)?;

        self.push(Value::from_u64(addr as u64));
        self.ip += 3;

        Ok(())
    }

    /// `astore slot len ty`: write the `(len << 16) | ty` header word at
    /// the array's own slot and fill the element slots from the stack, the
    /// last element sitting on top.
    pub(crate) fn op_astore(&mut self) -> Result<(), VmError> {
        let slot = self.imm_u16(self.ip + 1)? as u32;
        let len = self.imm_u16(self.ip + 3)? as u32;
        let ty = self.imm_u8(self.ip + 5)? as u64;

        let header = self.slot_index(slot)?;
        self.stack[header] = Value::from_u64(((len as u64) << 16) | ty);

        for element in (0..len).rev() {
            let value = self.pop()?;
            let index = self.slot_index(slot + element + 1)?;
            self.stack[index] = value;
        }

        self.ip += 6;

        Ok(())
    }

    /// `alen`: replace a slot number by the length field of that slot's
    /// array header.
    pub(crate) fn op_alen(&mut self) -> Result<(), VmError> {
        let slot = self.top()?.to_u16();
        let index = self.slot_index(slot as u32)?;
        let header = self.stack[index].to_u64();

        *self.top_mut()? = Value::from_i64((header >> 16) as i64);
        self.ip += 1;

        Ok(())
    }
}
