use lime_types::Value;

use super::Vm;
use crate::error::VmError;

impl Vm {
    /// Replace the top cell through its 64-bit signed view.
    pub(crate) fn alu_unary<F>(&mut self, f: F) -> Result<(), VmError>
    where
        F: FnOnce(i64) -> i64,
    {
        let top = self.top_mut()?;
        *top = Value::from_i64(f(top.to_i64()));
        self.ip += 1;

        Ok(())
    }

    /// Pop the right operand and fold it into the left through the 64-bit
    /// signed view.
    pub(crate) fn alu_binary<F>(&mut self, f: F) -> Result<(), VmError>
    where
        F: FnOnce(i64, i64) -> i64,
    {
        let rhs = self.pop()?;
        let lhs = self.top_mut()?;
        *lhs = Value::from_i64(f(lhs.to_i64(), rhs.to_i64()));
        self.ip += 1;

        Ok(())
    }

    /// Division-family fold: errors out on a zero right operand instead of
    /// faulting.
    pub(crate) fn alu_div<F>(&mut self, f: F) -> Result<(), VmError>
    where
        F: FnOnce(i64, i64) -> i64,
    {
        let rhs = self.pop()?;
        if rhs.to_i64() == 0 {
            return Err(VmError::DivisionByZero { ip: self.ip });
        }

        let lhs = self.top_mut()?;
        *lhs = Value::from_i64(f(lhs.to_i64(), rhs.to_i64()));
        self.ip += 1;

        Ok(())
    }
}
