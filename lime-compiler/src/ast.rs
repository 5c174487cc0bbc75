//! Typed AST and code generation.
//!
//! Every node carries the result type settled during parsing plus a tagged
//! payload; emission is one exhaustive match over the tag. A node's emitted
//! sequence leaves exactly one value on the stack for expression nodes and
//! leaves the stack unchanged for statements (the parser appends an
//! explicit `drop` behind expression statements).

use lime_asm::Opcode;
use lime_types::{TypeTag, Value};
use lime_vm::interpreter::Vm;

use crate::builtins::{Builtin, BuiltinKind};
use crate::error::CompileError;
use crate::jump::Label;
use crate::scope::{LoopRef, ScopeRef, SymbolExtra, SymbolRef};

/// Unary prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `+e`, a no-op.
    Plus,
    /// `-e`.
    Neg,
    /// `!e`.
    Not,
}

/// Binary infix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&&`, short-circuiting
    And,
    /// `||`, short-circuiting
    Or,
}

impl BinOp {
    /// Operators whose result is always `bool`.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Le
                | Self::Gt
                | Self::Ge
                | Self::And
                | Self::Or
        )
    }

    /// Operators with no real-typed form; both operands must be integral.
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::And | Self::Or
        )
    }
}

/// A typed AST node.
#[derive(Debug)]
pub struct Node {
    /// Result type left on the stack by this node's emission; `Unknown`
    /// for statements.
    pub ty: TypeTag,
    /// The construct and its children.
    pub kind: NodeKind,
}

/// Node payloads.
#[derive(Debug)]
pub enum NodeKind {
    /// Scalar constant; the node type picks the encoding width.
    Constant(Value),
    /// String literal; appended to the data buffer at emission.
    Str(String),
    /// Unary operator application.
    Unary {
        /// The operator.
        op: UnOp,
        /// Operand.
        expr: Box<Node>,
    },
    /// Binary operator application.
    Binary {
        /// The operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Node>,
        /// Right operand.
        rhs: Box<Node>,
    },
    /// Variable read, optionally indexed.
    Variable {
        /// The bound symbol.
        symbol: SymbolRef,
        /// Element index for array reads.
        index: Option<Box<Node>>,
    },
    /// Assignment, optionally indexed.
    Assign {
        /// Target symbol.
        symbol: SymbolRef,
        /// Right-hand side.
        expr: Box<Node>,
        /// Element index for array element stores.
        index: Option<Box<Node>>,
        /// Whether this assignment is the variable's declaration. Plain
        /// re-assignments compensate their net stack effect with `allc`
        /// so the statement-level `drop` stays balanced.
        new_variable: bool,
    },
    /// Statement block with its scope.
    Block {
        /// The block's lexical scope.
        scope: ScopeRef,
        /// Child statements in source order.
        nodes: Vec<Node>,
    },
    /// `if`/`else if`/`else` chain.
    If {
        /// Branch condition.
        condition: Box<Node>,
        /// Then branch.
        then_block: Box<Node>,
        /// Else branch (another `If` for `else if`).
        else_block: Option<Box<Node>>,
    },
    /// `for init; cond; post body`.
    For {
        /// Init statement, drop-balanced by the parser.
        init: Vec<Node>,
        /// Loop condition.
        condition: Box<Node>,
        /// Post statement, drop-balanced by the parser.
        post: Vec<Node>,
        /// Loop body block.
        body: Box<Node>,
        /// Labels shared with `break`/`continue`.
        loop_ctx: LoopRef,
    },
    /// `break` out of the nearest loop.
    Break {
        /// The loop broken out of.
        loop_ctx: LoopRef,
    },
    /// `continue` to the nearest loop's post expression.
    Continue {
        /// The loop continued.
        loop_ctx: LoopRef,
    },
    /// Function declaration; the body is emitted inline behind a jump.
    FuncDecl {
        /// The function's symbol; its entry address is assigned here.
        symbol: SymbolRef,
        /// Body block.
        body: Box<Node>,
        /// Parameter count.
        args: u16,
    },
    /// Call of a user-declared function.
    FuncCall {
        /// The callee's symbol.
        symbol: SymbolRef,
        /// Arguments in source order.
        args: Vec<Node>,
    },
    /// Call of a builtin function.
    BuiltinCall {
        /// Table entry driving emission.
        builtin: &'static Builtin,
        /// Arguments in source order.
        args: Vec<Node>,
    },
    /// `return expr`.
    Return {
        /// The returned expression.
        expr: Box<Node>,
    },
    /// Array literal; emits its elements in order, leaving them for the
    /// enclosing assignment's `astore`.
    ArrayLit {
        /// Common element type.
        element: TypeTag,
        /// Elements in source order.
        elements: Vec<Node>,
    },
    /// A bare opcode, e.g. the parser's statement-level `drop`.
    Op(Opcode),
}

impl Node {
    /// Node with the given type and payload.
    pub fn new(ty: TypeTag, kind: NodeKind) -> Self {
        Self { ty, kind }
    }

    /// Emit this node's bytecode into `vm`.
    pub fn emit(&self, vm: &mut Vm) -> Result<(), CompileError> {
        match &self.kind {
            NodeKind::Constant(value) => emit_constant(vm, self.ty, *value),
            NodeKind::Str(text) => emit_str(vm, text),
            NodeKind::Unary { op, expr } => {
                expr.emit(vm)?;
                emit_unary(vm, self.ty, *op)
            }
            NodeKind::Binary { op, lhs, rhs } => emit_binary(vm, *op, lhs, rhs),
            NodeKind::Variable { symbol, index } => {
                let slot = symbol.borrow().slot;
                if let Some(index) = index {
                    index.emit(vm)?;
                    emit_op_imm16(vm, Opcode::XLOADI, slot);
                } else {
                    emit_op_imm16(vm, Opcode::XLOAD, slot);
                }
                Ok(())
            }
            NodeKind::Assign {
                symbol,
                expr,
                index,
                new_variable,
            } => emit_assign(vm, symbol, expr, index.as_deref(), *new_variable),
            NodeKind::Block { scope, nodes } => {
                if scope.is_global() {
                    let vars = scope.allocated();
                    emit_op(vm, Opcode::ICONST_0);
                    emit_op(vm, Opcode::ICONST_0);
                    emit_op(vm, Opcode::PROC);
                    vm.code_emit(&0u16.to_le_bytes());
                    vm.code_emit(&vars.to_le_bytes());
                }

                for node in nodes {
                    node.emit(vm)?;
                }
                Ok(())
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => emit_if(vm, condition, then_block, else_block.as_deref()),
            NodeKind::For {
                init,
                condition,
                post,
                body,
                loop_ctx,
            } => emit_for(vm, init, condition, post, body, loop_ctx),
            NodeKind::Break { loop_ctx } => {
                loop_ctx.end.borrow_mut().jump_to(vm, Opcode::JMP);
                Ok(())
            }
            NodeKind::Continue { loop_ctx } => {
                loop_ctx.post.borrow_mut().jump_to(vm, Opcode::JMP);
                Ok(())
            }
            NodeKind::FuncDecl { symbol, body, args } => emit_func_decl(vm, symbol, body, *args),
            NodeKind::FuncCall { symbol, args } => {
                for arg in args {
                    arg.emit(vm)?;
                }

                let symbol = symbol.borrow();
                let SymbolExtra::Func {
                    addr: Some(addr), ..
                } = &symbol.extra
                else {
                    return Err(CompileError::internal(format!(
                        "Function '{}' has no address.",
                        symbol.name
                    )));
                };

                emit_op_imm16(vm, Opcode::CALL, *addr);
                Ok(())
            }
            NodeKind::BuiltinCall { builtin, args } => emit_builtin_call(vm, builtin, args),
            NodeKind::Return { expr } => {
                expr.emit(vm)?;
                emit_op(vm, Opcode::RET);
                Ok(())
            }
            NodeKind::ArrayLit { elements, .. } => {
                for element in elements {
                    element.emit(vm)?;
                }
                Ok(())
            }
            NodeKind::Op(op) => {
                emit_op(vm, *op);
                Ok(())
            }
        }
    }
}

fn emit_op(vm: &mut Vm, op: Opcode) {
    vm.code_emit(&[op as u8]);
}

fn emit_op_imm16(vm: &mut Vm, op: Opcode, imm: u16) {
    vm.code_emit(&[op as u8]);
    vm.code_emit(&imm.to_le_bytes());
}

fn emit_constant(vm: &mut Vm, ty: TypeTag, value: Value) -> Result<(), CompileError> {
    if ty.is_integer() || ty.is_bool() {
        match value.to_i64() {
            0 => emit_op(vm, Opcode::ICONST_0),
            1 => emit_op(vm, Opcode::ICONST_1),
            v => match ty {
                TypeTag::I8 | TypeTag::U8 => {
                    emit_op(vm, Opcode::I8CONST);
                    vm.code_emit(&[v as i8 as u8]);
                }
                TypeTag::I16 | TypeTag::U16 => {
                    emit_op(vm, Opcode::I16CONST);
                    vm.code_emit(&(v as i16).to_le_bytes());
                }
                TypeTag::I32 | TypeTag::U32 => {
                    emit_op(vm, Opcode::I32CONST);
                    vm.code_emit(&(v as i32).to_le_bytes());
                }
                _ => {
                    emit_op(vm, Opcode::I64CONST);
                    vm.code_emit(&v.to_le_bytes());
                }
            },
        }
        return Ok(());
    }

    if ty.is_real() {
        let real = value.to_real();
        if real == 0.0 {
            emit_op(vm, Opcode::RCONST_0);
        } else if real == 1.0 {
            emit_op(vm, Opcode::RCONST_1);
        } else {
            emit_op(vm, Opcode::RCONST);
            vm.code_emit(&value.to_bits().to_le_bytes());
        }
        return Ok(());
    }

    Err(CompileError::internal("Constant with non-scalar type."))
}

fn emit_str(vm: &mut Vm, text: &str) -> Result<(), CompileError> {
    let addr = vm.data_addr();
    if addr + text.len() + 1 > u16::MAX as usize {
        return Err(CompileError::internal("String data overflow."));
    }

    vm.data_emit(text.as_bytes());
    vm.data_emit(&[0]);
    emit_op_imm16(vm, Opcode::XCONST, addr as u16);

    Ok(())
}

fn emit_unary(vm: &mut Vm, ty: TypeTag, op: UnOp) -> Result<(), CompileError> {
    if ty.is_integer() || ty.is_bool() {
        match op {
            UnOp::Plus => {}
            UnOp::Neg => emit_op(vm, Opcode::INEG),
            UnOp::Not => emit_op(vm, Opcode::INOT),
        }
        return Ok(());
    }

    if ty.is_real() {
        match op {
            UnOp::Plus => {}
            UnOp::Neg => emit_op(vm, Opcode::RNEG),
            UnOp::Not => return Err(CompileError::internal("Unknown unary real operation.")),
        }
        return Ok(());
    }

    Err(CompileError::internal("Unknown unary operation."))
}

/// Binary emission: left operand, one-time `itor` promotion, the
/// short-circuit `dup` + branch for `&&`/`||`, right operand, symmetric
/// promotion, then the integer or real form of the operator. The
/// short-circuit label is marked right after the operation so the
/// duplicated left value is what remains when the branch fires.
fn emit_binary(vm: &mut Vm, op: BinOp, lhs: &Node, rhs: &Node) -> Result<(), CompileError> {
    let mut lhs_ty = lhs.ty;
    let mut rhs_ty = rhs.ty;

    lhs.emit(vm)?;

    if lhs_ty.is_integer() && rhs_ty.is_real() {
        emit_op(vm, Opcode::ITOR);
        lhs_ty = TypeTag::Real;
    }

    let mut short_circuit = Label::new();

    if op == BinOp::And {
        emit_op(vm, Opcode::DUP);
        short_circuit.jump_to(vm, Opcode::JEZ);
    } else if op == BinOp::Or {
        emit_op(vm, Opcode::DUP);
        short_circuit.jump_to(vm, Opcode::JNZ);
    }

    rhs.emit(vm)?;

    if rhs_ty.is_integer() && lhs_ty.is_real() {
        emit_op(vm, Opcode::ITOR);
        rhs_ty = TypeTag::Real;
    }

    if (lhs_ty.is_integer() && rhs_ty.is_integer()) || (lhs_ty.is_bool() && rhs_ty.is_bool()) {
        emit_op(vm, integer_opcode(op));
    } else if lhs_ty.is_real() || rhs_ty.is_real() {
        let Some(real_op) = real_opcode(op) else {
            return Err(CompileError::internal("Unknown real binary operation."));
        };
        emit_op(vm, real_op);
    } else {
        return Err(CompileError::internal("Unknown binary operand types."));
    }

    short_circuit.mark(vm);
    short_circuit.fix(vm);

    Ok(())
}

const fn integer_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::IADD,
        BinOp::Sub => Opcode::ISUB,
        BinOp::Mul => Opcode::IMUL,
        BinOp::Div => Opcode::IDIV,
        BinOp::Mod => Opcode::IMOD,
        BinOp::Eq => Opcode::IEQ,
        BinOp::Ne => Opcode::INQ,
        BinOp::Lt => Opcode::ILT,
        BinOp::Le => Opcode::ILE,
        BinOp::Gt => Opcode::IGT,
        BinOp::Ge => Opcode::IGE,
        BinOp::BitAnd => Opcode::IBAND,
        BinOp::BitOr => Opcode::IBOR,
        BinOp::BitXor => Opcode::IBXOR,
        BinOp::And => Opcode::IAND,
        BinOp::Or => Opcode::IOR,
    }
}

const fn real_opcode(op: BinOp) -> Option<Opcode> {
    match op {
        BinOp::Add => Some(Opcode::RADD),
        BinOp::Sub => Some(Opcode::RSUB),
        BinOp::Mul => Some(Opcode::RMUL),
        BinOp::Div => Some(Opcode::RDIV),
        BinOp::Mod => Some(Opcode::RMOD),
        BinOp::Eq => Some(Opcode::REQ),
        BinOp::Ne => Some(Opcode::RNQ),
        BinOp::Lt => Some(Opcode::RLT),
        BinOp::Le => Some(Opcode::RLE),
        BinOp::Gt => Some(Opcode::RGT),
        BinOp::Ge => Some(Opcode::RGE),
        _ => None,
    }
}

fn emit_if(
    vm: &mut Vm,
    condition: &Node,
    then_block: &Node,
    else_block: Option<&Node>,
) -> Result<(), CompileError> {
    let mut else_addr = Label::new();
    let mut exit_addr = Label::new();

    condition.emit(vm)?;
    else_addr.jump_to(vm, Opcode::JEZ);

    then_block.emit(vm)?;
    exit_addr.jump_to(vm, Opcode::JMP);

    else_addr.mark(vm);
    if let Some(else_block) = else_block {
        else_block.emit(vm)?;
    }
    exit_addr.mark(vm);

    else_addr.fix(vm);
    exit_addr.fix(vm);

    Ok(())
}

fn emit_assign(
    vm: &mut Vm,
    symbol: &SymbolRef,
    expr: &Node,
    index: Option<&Node>,
    new_variable: bool,
) -> Result<(), CompileError> {
    expr.emit(vm)?;

    let symbol = symbol.borrow();

    if let Some(index) = index {
        index.emit(vm)?;
        emit_op_imm16(vm, Opcode::XSTOREI, symbol.slot);
    } else if symbol.ty.is_array() {
        let SymbolExtra::Array { element, len } = &symbol.extra else {
            return Err(CompileError::internal("Array symbol without layout."));
        };
        emit_op(vm, Opcode::ASTORE);
        vm.code_emit(&symbol.slot.to_le_bytes());
        vm.code_emit(&len.to_le_bytes());
        vm.code_emit(&[*element as u8]);
    } else {
        emit_op_imm16(vm, Opcode::XSTORE, symbol.slot);
    }

    // Keep the statement's net effect at +1 so the parser's trailing
    // `drop` balances; a declaration has no trailing drop.
    if !new_variable {
        emit_op(vm, Opcode::ALLC);
    }

    Ok(())
}

fn emit_func_decl(
    vm: &mut Vm,
    symbol: &SymbolRef,
    body: &Node,
    args: u16,
) -> Result<(), CompileError> {
    let mut func_end = Label::new();
    let mut func_beg = Label::new();

    func_end.jump_to(vm, Opcode::JMP);
    func_beg.mark(vm);

    let NodeKind::Block { scope, .. } = &body.kind else {
        return Err(CompileError::internal("Function body is not a block."));
    };

    let vars = scope.allocated();
    emit_op(vm, Opcode::PROC);
    vm.code_emit(&args.to_le_bytes());
    vm.code_emit(&(vars - args).to_le_bytes());

    match &mut symbol.borrow_mut().extra {
        SymbolExtra::Func { addr, .. } => *addr = func_beg.addr(),
        _ => return Err(CompileError::internal("Function symbol without signature.")),
    }

    body.emit(vm)?;

    // Fall-through return value for bodies without a `return`.
    emit_op(vm, Opcode::ICONST_0);
    emit_op(vm, Opcode::RET);

    func_end.mark(vm);
    func_end.fix(vm);
    func_beg.fix(vm);

    Ok(())
}

fn emit_builtin_call(vm: &mut Vm, builtin: &Builtin, args: &[Node]) -> Result<(), CompileError> {
    match builtin.kind {
        BuiltinKind::Print => {
            for arg in args {
                arg.emit(vm)?;

                if arg.ty.is_integer() || arg.ty.is_bool() {
                    emit_op(vm, Opcode::IPRINT);
                    vm.code_emit(&[arg.ty as u8]);
                } else if arg.ty.is_real() {
                    emit_op(vm, Opcode::RPRINT);
                } else if arg.ty.is_str() {
                    emit_op(vm, Opcode::SPRINT);
                } else {
                    return Err(CompileError::internal("Print error. Unknown type."));
                }
            }

            // Sentinel for the statement-level drop.
            emit_op(vm, Opcode::ALLC);
            Ok(())
        }
        BuiltinKind::Abs => {
            let arg = &args[0];
            arg.emit(vm)?;
            emit_op(
                vm,
                if arg.ty.is_real() {
                    Opcode::RABS
                } else {
                    Opcode::IABS
                },
            );
            Ok(())
        }
        BuiltinKind::Len => {
            let arg = &args[0];
            if arg.ty.is_str() {
                arg.emit(vm)?;
                emit_op(vm, Opcode::SLEN);
                return Ok(());
            }

            // Arrays: the opcode wants the header's slot number, not the
            // header value, so only plain variable references qualify.
            let NodeKind::Variable {
                symbol,
                index: None,
            } = &arg.kind
            else {
                return Err(CompileError::internal("len expects an array variable."));
            };

            emit_op_imm16(vm, Opcode::XCONST, symbol.borrow().slot);
            emit_op(vm, Opcode::ALEN);
            Ok(())
        }
        BuiltinKind::Fixed(opcode) => {
            for arg in args {
                arg.emit(vm)?;
            }
            emit_op(vm, opcode);
            Ok(())
        }
    }
}

fn emit_for(
    vm: &mut Vm,
    init: &[Node],
    condition: &Node,
    post: &[Node],
    body: &Node,
    loop_ctx: &LoopRef,
) -> Result<(), CompileError> {
    for node in init {
        node.emit(vm)?;
    }

    loop_ctx.begin.borrow_mut().mark(vm);
    condition.emit(vm)?;
    loop_ctx.end.borrow_mut().jump_to(vm, Opcode::JEZ);

    body.emit(vm)?;

    loop_ctx.post.borrow_mut().mark(vm);
    for node in post {
        node.emit(vm)?;
    }
    loop_ctx.begin.borrow_mut().jump_to(vm, Opcode::JMP);

    loop_ctx.end.borrow_mut().mark(vm);

    loop_ctx.begin.borrow_mut().fix(vm);
    loop_ctx.end.borrow_mut().fix(vm);
    loop_ctx.post.borrow_mut().fix(vm);

    Ok(())
}
