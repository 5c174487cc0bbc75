use std::io::Write;

use lime_types::{TypeTag, Value};

use super::Vm;
use crate::error::VmError;

/// The NUL-terminated byte run at `addr` in the data buffer, terminator
/// excluded.
fn string_at(data: &[u8], addr: u16) -> Result<&[u8], VmError> {
    let tail = data
        .get(addr as usize..)
        .ok_or(VmError::DataOutOfBounds { addr })?;

    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(VmError::DataOutOfBounds { addr })?;

    Ok(&tail[..end])
}

impl Vm {
    /// `iprint ty`: pop and print an integer through the width named by the
    /// tag byte. Tags without an integer width (notably `bool`) print the
    /// raw cell as lowercase hex, which renders `0`/`1` for booleans.
    pub(crate) fn op_iprint(&mut self) -> Result<(), VmError> {
        let tag = self.imm_u8(self.ip + 1)?;
        let value = self.pop()?;

        match TypeTag::try_from(tag) {
            Ok(TypeTag::I8) => write!(self.out, "{}", value.to_i8())?,
            Ok(TypeTag::I16) => write!(self.out, "{}", value.to_i16())?,
            Ok(TypeTag::I32) => write!(self.out, "{}", value.to_i32())?,
            Ok(TypeTag::I64) => write!(self.out, "{}", value.to_i64())?,
            Ok(TypeTag::U8) => write!(self.out, "{}", value.to_u8())?,
            Ok(TypeTag::U16) => write!(self.out, "{}", value.to_u16())?,
            Ok(TypeTag::U32) => write!(self.out, "{}", value.to_u32())?,
            Ok(TypeTag::U64) => write!(self.out, "{}", value.to_u64())?,
            _ => write!(self.out, "{:x}", value.to_u64())?,
        }
        self.out.flush()?;

        self.ip += 2;

        Ok(())
    }

    /// `rprint`: pop and print a real with six decimal places.
    pub(crate) fn op_rprint(&mut self) -> Result<(), VmError> {
        let value = self.pop()?;

        write!(self.out, "{:.6}", value.to_real())?;
        self.out.flush()?;

        self.ip += 1;

        Ok(())
    }

    /// `sprint`: pop a data address and print the NUL-terminated UTF-8
    /// bytes found there.
    pub(crate) fn op_sprint(&mut self) -> Result<(), VmError> {
        let addr = self.pop()?.to_u16();
        let bytes = string_at(self.data.as_slice(), addr)?;

        self.out.write_all(bytes)?;
        self.out.flush()?;

        self.ip += 1;

        Ok(())
    }

    /// `slen`: replace a data address by the string's code-point count.
    pub(crate) fn op_slen(&mut self) -> Result<(), VmError> {
        let addr = self.top()?.to_u16();
        let count = String::from_utf8_lossy(string_at(self.data.as_slice(), addr)?)
            .chars()
            .count();

        *self.top_mut()? = Value::from_i64(count as i64);
        self.ip += 1;

        Ok(())
    }

    pub(crate) fn op_nprint(&mut self) -> Result<(), VmError> {
        writeln!(self.out)?;
        self.out.flush()?;

        self.ip += 1;

        Ok(())
    }
}
