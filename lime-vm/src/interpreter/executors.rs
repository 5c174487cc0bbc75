use lime_asm::Opcode;
use lime_types::Value;
use tracing::trace;

use super::Vm;
use crate::error::VmError;
use crate::state::ExecuteState;

impl Vm {
    /// Execute from the current `ip` until a `halt`.
    pub fn run(&mut self) -> Result<(), VmError> {
        while !self.halt {
            self.step()?;
        }

        Ok(())
    }

    /// Decode and execute the instruction under `ip`.
    pub fn step(&mut self) -> Result<ExecuteState, VmError> {
        let byte = self.code_byte(self.ip)?;
        let op = Opcode::try_from(byte).map_err(|_| VmError::UnknownOpcode {
            opcode: byte,
            ip: self.ip,
        })?;

        trace!(ip = self.ip, %op, sp = self.sp, "execute");

        self.instruction(op)
    }

    fn instruction(&mut self, op: Opcode) -> Result<ExecuteState, VmError> {
        match op {
            Opcode::HALT => {
                self.halt = true;
                self.ip += 1;
                return Ok(ExecuteState::Halt);
            }

            Opcode::NOP => self.ip += 1,
            Opcode::DUP => self.op_dup()?,
            Opcode::DROP => self.op_drop()?,
            Opcode::ALLC => self.op_allc(),
            Opcode::SWAP => self.op_swap()?,

            Opcode::PROC => self.op_proc()?,
            Opcode::CALL => self.op_call()?,
            Opcode::RET => self.op_ret()?,
            Opcode::JNZ => self.op_jnz()?,
            Opcode::JEZ => self.op_jez()?,
            Opcode::JMP => self.op_jmp()?,

            Opcode::IINC => self.alu_unary(|a| a.wrapping_add(1))?,
            Opcode::IDEC => self.alu_unary(|a| a.wrapping_sub(1))?,
            Opcode::INEG => self.alu_unary(i64::wrapping_neg)?,
            Opcode::IABS => self.alu_unary(i64::wrapping_abs)?,
            Opcode::INOT => self.alu_unary(|a| (a == 0) as i64)?,
            Opcode::IADD => self.alu_binary(i64::wrapping_add)?,
            Opcode::ISUB => self.alu_binary(i64::wrapping_sub)?,
            Opcode::IDIV => self.alu_div(i64::wrapping_div)?,
            Opcode::IMOD => self.alu_div(i64::wrapping_rem)?,
            Opcode::IMUL => self.alu_binary(i64::wrapping_mul)?,
            Opcode::IAND => self.alu_binary(|a, b| (a != 0 && b != 0) as i64)?,
            Opcode::IOR => self.alu_binary(|a, b| (a != 0 || b != 0) as i64)?,
            Opcode::IBXOR => self.alu_binary(|a, b| a ^ b)?,
            Opcode::IBOR => self.alu_binary(|a, b| a | b)?,
            Opcode::IBAND => self.alu_binary(|a, b| a & b)?,
            Opcode::ISHL => self.alu_binary(|a, b| a.wrapping_shl(b as u32))?,
            Opcode::ISHR => self.alu_binary(|a, b| a.wrapping_shr(b as u32))?,
            Opcode::IGT => self.alu_binary(|a, b| (a > b) as i64)?,
            Opcode::ILT => self.alu_binary(|a, b| (a < b) as i64)?,
            Opcode::IGE => self.alu_binary(|a, b| (a >= b) as i64)?,
            Opcode::ILE => self.alu_binary(|a, b| (a <= b) as i64)?,
            Opcode::IEQ => self.alu_binary(|a, b| (a == b) as i64)?,
            Opcode::INQ => self.alu_binary(|a, b| (a != b) as i64)?,

            Opcode::I8CONST => {
                let v = self.imm_u8(self.ip + 1)? as i8;
                self.push(Value::from_i64(v as i64));
                self.ip += 2;
            }
            Opcode::I16CONST => {
                let v = self.imm_u16(self.ip + 1)? as i16;
                self.push(Value::from_i64(v as i64));
                self.ip += 3;
            }
            Opcode::I32CONST => {
                let v = self.imm_u32(self.ip + 1)? as i32;
                self.push(Value::from_i64(v as i64));
                self.ip += 5;
            }
            Opcode::I64CONST => {
                let v = self.imm_u64(self.ip + 1)? as i64;
                self.push(Value::from_i64(v));
                self.ip += 9;
            }
            Opcode::ICONST_0 => {
                self.push(Value::ZERO);
                self.ip += 1;
            }
            Opcode::ICONST_1 => {
                self.push(Value::ONE);
                self.ip += 1;
            }

            Opcode::IPRINT => self.op_iprint()?,

            Opcode::I8CAST => self.alu_unary(|a| a as i8 as i64)?,
            Opcode::I16CAST => self.alu_unary(|a| a as i16 as i64)?,
            Opcode::I32CAST => self.alu_unary(|a| a as i32 as i64)?,
            Opcode::I64CAST => self.alu_unary(|a| a)?,
            Opcode::IU8CAST => self.alu_unary(|a| a as u8 as i64)?,
            Opcode::IU16CAST => self.alu_unary(|a| a as u16 as i64)?,
            Opcode::IU32CAST => self.alu_unary(|a| a as u32 as i64)?,
            Opcode::IU64CAST => self.alu_unary(|a| a)?,

            Opcode::ITOR => {
                let top = self.top_mut()?;
                *top = Value::from_real(top.to_i64() as f64);
                self.ip += 1;
            }
            Opcode::RTOI => {
                let top = self.top_mut()?;
                *top = Value::from_i64(top.to_real() as i64);
                self.ip += 1;
            }

            Opcode::RINC => self.real_unary(|a| a + 1.0)?,
            Opcode::RDEC => self.real_unary(|a| a - 1.0)?,
            Opcode::RNEG => self.real_unary(|a| -a)?,
            Opcode::RABS => self.real_unary(f64::abs)?,
            Opcode::RADD => self.real_binary(|a, b| a + b)?,
            Opcode::RSUB => self.real_binary(|a, b| a - b)?,
            Opcode::RDIV => self.real_binary(|a, b| a / b)?,
            Opcode::RMOD => self.real_binary(|a, b| a % b)?,
            Opcode::RMUL => self.real_binary(|a, b| a * b)?,
            Opcode::RPOW => self.real_binary(f64::powf)?,
            Opcode::RSQRT => self.real_unary(f64::sqrt)?,
            Opcode::REXP => self.real_unary(f64::exp)?,
            Opcode::RSIN => self.real_unary(f64::sin)?,
            Opcode::RCOS => self.real_unary(f64::cos)?,
            Opcode::RTAN => self.real_unary(f64::tan)?,
            Opcode::RASIN => self.real_unary(f64::asin)?,
            Opcode::RACOS => self.real_unary(f64::acos)?,
            Opcode::RATAN2 => self.real_binary(f64::atan2)?,
            Opcode::RLOG => self.real_unary(f64::ln)?,
            Opcode::RLOG10 => self.real_unary(f64::log10)?,
            Opcode::RLOG2 => self.real_unary(f64::log2)?,
            Opcode::RCEIL => self.real_unary(f64::ceil)?,
            Opcode::RFLOOR => self.real_unary(f64::floor)?,
            Opcode::RROUND => self.real_unary(f64::round)?,
            Opcode::RGT => self.real_compare(|a, b| a > b)?,
            Opcode::RLT => self.real_compare(|a, b| a < b)?,
            Opcode::RGE => self.real_compare(|a, b| a >= b)?,
            Opcode::RLE => self.real_compare(|a, b| a <= b)?,
            Opcode::REQ => self.real_compare(|a, b| a == b)?,
            Opcode::RNQ => self.real_compare(|a, b| a != b)?,

            Opcode::RCONST => {
                let bits = self.imm_u64(self.ip + 1)?;
                self.push(Value::from_bits(bits));
                self.ip += 9;
            }
            Opcode::RCONST_0 => {
                self.push(Value::from_real(0.0));
                self.ip += 1;
            }
            Opcode::RCONST_1 => {
                self.push(Value::from_real(1.0));
                self.ip += 1;
            }
            Opcode::RCONST_PI => {
                self.push(Value::from_real(std::f64::consts::PI));
                self.ip += 1;
            }

            Opcode::RPRINT => self.op_rprint()?,

            Opcode::XLOAD => self.op_xload()?,
            Opcode::XSTORE => self.op_xstore()?,
            Opcode::XLOADI => self.op_xloadi()?,
            Opcode::XSTOREI => self.op_xstorei()?,
            Opcode::XCONST => self.op_xconst()?,
            Opcode::ASTORE => self.op_astore()?,
            Opcode::ALEN => self.op_alen()?,

            Opcode::SPRINT => self.op_sprint()?,
            Opcode::SLEN => self.op_slen()?,
            Opcode::NPRINT => self.op_nprint()?,
        }

        Ok(ExecuteState::Proceed)
    }
}
