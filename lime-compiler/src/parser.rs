//! Recursive-descent parser with precedence climbing.
//!
//! Parsing, symbol binding and type inference happen in one pass: every
//! expression node knows its result type by the time it is built, and every
//! mismatch is a fatal positioned diagnostic. The grammar's statement forms
//! mirror the emitter's stack discipline — an expression statement gets a
//! trailing `drop` so the operand stack stays balanced.

use itertools::Itertools;
use lime_asm::Opcode;
use lime_types::{TypeTag, Value};
use lime_vm::interpreter::Vm;
use tracing::debug;

use crate::ast::{BinOp, Node, NodeKind, UnOp};
use crate::builtins::{self, Builtin, BuiltinKind};
use crate::error::CompileError;
use crate::lexer::Lexer;
use crate::scope::{Scope, ScopeKind, ScopeRef, SymbolExtra, SymbolRef};
use crate::token::{Token, TokenKind};

/// Compile `source` into a fresh machine printing to stdout.
pub fn compile(source: &str) -> Result<Vm, CompileError> {
    let mut vm = Vm::new();
    compile_into(source, &mut vm)?;
    Ok(vm)
}

/// Compile `source` into an existing machine (whose output sink the caller
/// chose), leaving it ready to run from address zero.
pub fn compile_into(source: &str, vm: &mut Vm) -> Result<(), CompileError> {
    let mut parser = Parser::new(source);
    let program = parser.parse_program()?;

    program.emit(vm)?;
    vm.code_emit(&[Opcode::HALT as u8]);

    debug!(
        code = vm.code_addr(),
        data = vm.data_addr(),
        "compilation finished"
    );

    Ok(())
}

/// Binding power of a binary operator token; `-1` for non-operators.
fn token_prec(kind: &TokenKind) -> i16 {
    match kind {
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 90,
        TokenKind::Plus | TokenKind::Minus => 80,
        TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => 70,
        TokenKind::Eq | TokenKind::Ne => 60,
        TokenKind::BitAnd => 55,
        TokenKind::BitXor => 54,
        TokenKind::BitOr => 53,
        TokenKind::And => 50,
        TokenKind::Or => 40,
        _ => -1,
    }
}

fn bin_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::Ne => BinOp::Ne,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::BitAnd => BinOp::BitAnd,
        TokenKind::BitOr => BinOp::BitOr,
        TokenKind::BitXor => BinOp::BitXor,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => return None,
    })
}

/// A parsed type annotation; arrays carry their element type.
struct DeclType {
    tag: TypeTag,
    element: Option<TypeTag>,
}

/// The parser state: one token of lookahead plus the current scope.
pub struct Parser {
    lexer: Lexer,
    look: Token,
    scope: ScopeRef,
}

impl Parser {
    /// Parser over `source`, positioned at the first token.
    pub fn new(source: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let look = lexer.next_token();

        Self {
            lexer,
            look,
            scope: Scope::global(),
        }
    }

    /// Parse a whole program into the global block.
    pub fn parse_program(&mut self) -> Result<Node, CompileError> {
        let scope = self.scope.clone();
        let nodes = self.statements(&TokenKind::Fin)?;

        Ok(Node::new(TypeTag::Unknown, NodeKind::Block { scope, nodes }))
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(message, self.look.row, self.look.col)
    }

    fn advance(&mut self) {
        self.look = self.lexer.next_token();
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), CompileError> {
        if self.look.kind == *kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error("Not expected token."))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.look.kind == *kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_ident(&self) -> Result<String, CompileError> {
        if let TokenKind::Ident(name) = &self.look.kind {
            Ok(name.clone())
        } else {
            Err(self.error("An identifier is expected."))
        }
    }

    /* statements */

    fn statements(&mut self, finish: &TokenKind) -> Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();

        while self.look.kind != *finish {
            let (node, drop) = self.statement()?;

            if let Some(node) = node {
                nodes.push(node);
            }
            if drop {
                nodes.push(Node::new(TypeTag::Unknown, NodeKind::Op(Opcode::DROP)));
            }
        }

        Ok(nodes)
    }

    /// One statement; the flag asks the caller to append a `drop` because
    /// the statement is a bare expression that leaves its value behind.
    fn statement(&mut self) -> Result<(Option<Node>, bool), CompileError> {
        match &self.look.kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok((None, false))
            }
            TokenKind::Var => Ok((self.var()?, false)),
            TokenKind::If => Ok((Some(self.if_cond()?), false)),
            TokenKind::For => Ok((Some(self.for_loop()?), false)),
            TokenKind::Break => Ok((Some(self.break_loop()?), false)),
            TokenKind::Continue => Ok((Some(self.continue_loop()?), false)),
            TokenKind::Func => Ok((Some(self.func_decl()?), false)),
            TokenKind::Return => Ok((Some(self.func_return()?), false)),
            TokenKind::LBrace => Ok((Some(self.block(ScopeKind::Normal, &[])?), false)),
            TokenKind::Bad(_) => Err(self.error("Malformed token.")),
            _ => Ok((Some(self.expression()?), true)),
        }
    }

    fn var(&mut self) -> Result<Option<Node>, CompileError> {
        self.expect(&TokenKind::Var)?;

        let name = self.peek_ident()?;
        if self.scope.get_local(&name).is_some() {
            return Err(self.error("Identifier is already defined."));
        }
        self.advance();

        let symbol = self.scope.define(&name, TypeTag::Unknown);

        if self.eat(&TokenKind::Colon) {
            let decl = self.data_type()?;
            let mut sym = symbol.borrow_mut();
            sym.ty = decl.tag;
            if let Some(element) = decl.element {
                sym.extra = SymbolExtra::Array { element, len: 0 };
            }
        }

        if self.look.kind == TokenKind::Assign {
            return self.assign(symbol, None, true).map(Some);
        }

        // Declaration without initializer: the type must be complete.
        let ty = symbol.borrow().ty;
        if ty == TypeTag::Unknown {
            return Err(self.error("No type declared for the variable."));
        }
        if ty.is_array() {
            return Err(self.error("Array variable requires an initializer."));
        }
        symbol.borrow_mut().slot = self.scope.alloc_slots(1);

        Ok(None)
    }

    fn assign(
        &mut self,
        symbol: SymbolRef,
        index: Option<Box<Node>>,
        new_variable: bool,
    ) -> Result<Node, CompileError> {
        self.expect(&TokenKind::Assign)?;

        let expr = self.expression()?;
        if expr.ty == TypeTag::Unknown {
            return Err(self.error("No type to assign."));
        }

        {
            let mut sym = symbol.borrow_mut();

            if index.is_some() {
                let SymbolExtra::Array { element, .. } = &sym.extra else {
                    return Err(self.error("Identifier is not an array."));
                };
                if expr.ty != *element && !expr.ty.widens_to(*element) {
                    return Err(self.error("Assignment type mismatch."));
                }
            } else if let NodeKind::ArrayLit { element, elements } = &expr.kind {
                let lit_len = elements.len() as u16;

                if sym.ty == TypeTag::Unknown {
                    sym.ty = TypeTag::Array;
                    sym.extra = SymbolExtra::Array {
                        element: *element,
                        len: lit_len,
                    };
                } else if sym.ty.is_array() {
                    let SymbolExtra::Array {
                        element: declared,
                        len,
                    } = &mut sym.extra
                    else {
                        return Err(self.error("Identifier is not an array."));
                    };
                    if *element != *declared && !element.widens_to(*declared) {
                        return Err(self.error("Assignment type mismatch."));
                    }
                    if new_variable {
                        *len = lit_len;
                    } else if *len != lit_len {
                        return Err(self.error("Array length mismatch."));
                    }
                } else {
                    return Err(self.error("Assignment type mismatch."));
                }
            } else if sym.ty == TypeTag::Unknown {
                sym.ty = expr.ty;
            } else if sym.ty.is_array() {
                return Err(self.error("Assignment type mismatch."));
            } else if sym.ty != expr.ty && !expr.ty.widens_to(sym.ty) {
                return Err(self.error("Assignment type mismatch."));
            }

            if new_variable {
                let count = match &sym.extra {
                    SymbolExtra::Array { len, .. } => len + 1,
                    _ => 1,
                };
                sym.slot = self.scope.alloc_slots(count);
            }
        }

        Ok(Node::new(
            TypeTag::Unknown,
            NodeKind::Assign {
                symbol,
                expr: Box::new(expr),
                index,
                new_variable,
            },
        ))
    }

    fn if_cond(&mut self) -> Result<Node, CompileError> {
        self.expect(&TokenKind::If)?;

        let condition = self.expression()?;
        let then_block = self.block(ScopeKind::Normal, &[])?;

        let else_block = if self.eat(&TokenKind::Else) {
            if self.look.kind == TokenKind::If {
                Some(Box::new(self.if_cond()?))
            } else {
                Some(Box::new(self.block(ScopeKind::Normal, &[])?))
            }
        } else {
            None
        };

        Ok(Node::new(
            TypeTag::Unknown,
            NodeKind::If {
                condition: Box::new(condition),
                then_block: Box::new(then_block),
                else_block,
            },
        ))
    }

    fn for_loop(&mut self) -> Result<Node, CompileError> {
        // The init variable lives in a wrapper scope around the body.
        let wrapper = Scope::child(&self.scope, ScopeKind::Normal);
        let saved = std::mem::replace(&mut self.scope, wrapper);

        self.expect(&TokenKind::For)?;

        let mut init = Vec::new();
        if self.look.kind == TokenKind::Var {
            if let Some(node) = self.var()? {
                init.push(node);
            }
        } else {
            init.push(self.expression()?);
            init.push(Node::new(TypeTag::Unknown, NodeKind::Op(Opcode::DROP)));
        }
        self.expect(&TokenKind::Semicolon)?;

        let condition = self.expression()?;
        self.expect(&TokenKind::Semicolon)?;

        // The post expression is a statement in disguise; balance it.
        let post = vec![
            self.expression()?,
            Node::new(TypeTag::Unknown, NodeKind::Op(Opcode::DROP)),
        ];

        let body = self.block(ScopeKind::Loop, &[])?;
        let NodeKind::Block { scope, .. } = &body.kind else {
            return Err(CompileError::internal("Loop body is not a block."));
        };
        let loop_ctx = scope
            .innermost_loop()
            .ok_or_else(|| CompileError::internal("Loop body without loop handle."))?;

        self.scope = saved;

        Ok(Node::new(
            TypeTag::Unknown,
            NodeKind::For {
                init,
                condition: Box::new(condition),
                post,
                body: Box::new(body),
                loop_ctx,
            },
        ))
    }

    fn break_loop(&mut self) -> Result<Node, CompileError> {
        let Some(loop_ctx) = self.scope.innermost_loop() else {
            return Err(self.error("Break statement outside of loop."));
        };
        self.expect(&TokenKind::Break)?;

        Ok(Node::new(TypeTag::Unknown, NodeKind::Break { loop_ctx }))
    }

    fn continue_loop(&mut self) -> Result<Node, CompileError> {
        let Some(loop_ctx) = self.scope.innermost_loop() else {
            return Err(self.error("Continue statement outside of loop."));
        };
        self.expect(&TokenKind::Continue)?;

        Ok(Node::new(TypeTag::Unknown, NodeKind::Continue { loop_ctx }))
    }

    fn func_decl(&mut self) -> Result<Node, CompileError> {
        self.expect(&TokenKind::Func)?;

        let name = self.peek_ident()?;
        if self.scope.get(&name).is_some() {
            return Err(self.error("Identifier is already defined."));
        }
        self.advance();

        let symbol = self.scope.define(&name, TypeTag::Func);

        self.expect(&TokenKind::LParen)?;
        let mut params: Vec<(String, TypeTag)> = Vec::new();
        while self.look.kind != TokenKind::RParen {
            let param = self.peek_ident()?;
            self.advance();
            self.expect(&TokenKind::Colon)?;

            let decl = self.data_type()?;
            if decl.tag.is_array() {
                return Err(self.error("Array parameters are not supported."));
            }
            params.push((param, decl.tag));

            if self.look.kind == TokenKind::RParen {
                break;
            }
            self.expect(&TokenKind::Comma)?;
        }
        self.expect(&TokenKind::RParen)?;

        self.expect(&TokenKind::Colon)?;
        let ret = self.data_type()?;
        if ret.tag.is_array() {
            return Err(self.error("Array return types are not supported."));
        }

        symbol.borrow_mut().extra = SymbolExtra::Func {
            ret: ret.tag,
            params: params.iter().map(|(_, ty)| *ty).collect(),
            addr: None,
        };

        let body = self.block(ScopeKind::Func, &params)?;

        Ok(Node::new(
            ret.tag,
            NodeKind::FuncDecl {
                symbol,
                body: Box::new(body),
                args: params.len() as u16,
            },
        ))
    }

    fn func_return(&mut self) -> Result<Node, CompileError> {
        if !self.scope.in_function() {
            return Err(self.error("Return statement outside of function."));
        }
        self.expect(&TokenKind::Return)?;

        let expr = self.expression()?;

        Ok(Node::new(
            TypeTag::Unknown,
            NodeKind::Return {
                expr: Box::new(expr),
            },
        ))
    }

    fn block(&mut self, kind: ScopeKind, params: &[(String, TypeTag)]) -> Result<Node, CompileError> {
        self.expect(&TokenKind::LBrace)?;

        let scope = Scope::child(&self.scope, kind);
        for (name, ty) in params {
            let symbol = scope.define(name, *ty);
            symbol.borrow_mut().slot = scope.alloc_slots(1);
        }

        let saved = std::mem::replace(&mut self.scope, scope.clone());
        let nodes = self.statements(&TokenKind::RBrace)?;
        self.expect(&TokenKind::RBrace)?;
        self.scope = saved;

        Ok(Node::new(TypeTag::Unknown, NodeKind::Block { scope, nodes }))
    }

    /* expressions */

    fn expression(&mut self) -> Result<Node, CompileError> {
        let lhs = self.factor()?;
        self.binary_expr(0, lhs)
    }

    fn binary_expr(&mut self, min_prec: i16, mut lhs: Node) -> Result<Node, CompileError> {
        loop {
            let prec = token_prec(&self.look.kind);
            if prec < min_prec {
                break;
            }

            let Some(op) = bin_op(&self.look.kind) else {
                return Err(self.error("Not expected token."));
            };
            self.advance();

            let mut rhs = self.factor()?;

            let next_prec = token_prec(&self.look.kind);
            if prec < next_prec {
                rhs = self.binary_expr(prec + 1, rhs)?;
            }

            let ty = self.infer_binary(op, lhs.ty, rhs.ty)?;

            lhs = Node::new(
                ty,
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }

        Ok(lhs)
    }

    fn infer_binary(&self, op: BinOp, lhs: TypeTag, rhs: TypeTag) -> Result<TypeTag, CompileError> {
        let compatible = (lhs.is_integer() && rhs.is_integer())
            || (lhs.is_integer() && rhs.is_real())
            || (rhs.is_integer() && lhs.is_real())
            || (lhs.is_real() && rhs.is_real())
            || (lhs.is_bool() && rhs.is_bool());

        // Logical and bitwise operators have no real-typed form.
        let misfit = op.is_integer_only() && (lhs.is_real() || rhs.is_real());

        if !compatible || misfit {
            return Err(self.error("Type unknown or mismatch for binary expression."));
        }

        if op.is_logical() {
            return Ok(TypeTag::Bool);
        }

        match lhs.mix(rhs) {
            TypeTag::Unknown => Err(self.error("Type unknown or mismatch for binary expression.")),
            mixed => Ok(mixed),
        }
    }

    fn unary_expr(&mut self) -> Result<Node, CompileError> {
        let op = match self.look.kind {
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Not => UnOp::Not,
            _ => return Err(self.error("Not expected token.")),
        };
        self.advance();

        let expr = self.factor()?;
        let ty = self.infer_unary(op, expr.ty)?;

        Ok(Node::new(
            ty,
            NodeKind::Unary {
                op,
                expr: Box::new(expr),
            },
        ))
    }

    fn infer_unary(&self, op: UnOp, ty: TypeTag) -> Result<TypeTag, CompileError> {
        if !(ty.is_integer() || ty.is_bool() || ty.is_real()) {
            return Err(self.error("Type unknown or mismatch for unary expression."));
        }

        Ok(match op {
            UnOp::Not => TypeTag::Bool,
            UnOp::Plus | UnOp::Neg => ty,
        })
    }

    fn factor(&mut self) -> Result<Node, CompileError> {
        match &self.look.kind {
            TokenKind::Ident(_) => self.ident(),
            TokenKind::LParen => {
                self.advance();
                let node = self.expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::True => {
                self.advance();
                Ok(Node::new(TypeTag::Bool, NodeKind::Constant(Value::ONE)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Node::new(TypeTag::Bool, NodeKind::Constant(Value::ZERO)))
            }
            TokenKind::Int { value, ty } => {
                let node = Node::new(*ty, NodeKind::Constant(Value::from_i64(*value)));
                self.advance();
                Ok(node)
            }
            TokenKind::Real(value) => {
                let node = Node::new(TypeTag::Real, NodeKind::Constant(Value::from_real(*value)));
                self.advance();
                Ok(node)
            }
            TokenKind::Str(text) => {
                let node = Node::new(TypeTag::Str, NodeKind::Str(text.clone()));
                self.advance();
                Ok(node)
            }
            TokenKind::LBracket => self.array_literal(),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Not => self.unary_expr(),
            _ => Err(self.error("Unknown factor.")),
        }
    }

    fn array_literal(&mut self) -> Result<Node, CompileError> {
        self.expect(&TokenKind::LBracket)?;

        let mut elements = Vec::new();
        while self.look.kind != TokenKind::RBracket {
            elements.push(self.expression()?);
            if self.look.kind == TokenKind::RBracket {
                break;
            }
            self.expect(&TokenKind::Comma)?;
        }
        self.expect(&TokenKind::RBracket)?;

        let Some(first) = elements.first() else {
            return Err(self.error("Array literal cannot be empty."));
        };

        let mut element = first.ty;
        for node in &elements[1..] {
            if node.ty == element {
                continue;
            }
            element = match element.mix(node.ty) {
                TypeTag::Unknown => {
                    return Err(self.error("Array element type mismatch."));
                }
                mixed => mixed,
            };
        }

        if !(element.is_integer() || element.is_real() || element.is_bool()) {
            return Err(self.error("Array element type mismatch."));
        }

        Ok(Node::new(
            TypeTag::Array,
            NodeKind::ArrayLit { element, elements },
        ))
    }

    fn ident(&mut self) -> Result<Node, CompileError> {
        let name = self.peek_ident()?;
        self.advance();

        if self.look.kind == TokenKind::LParen {
            return self.call(&name);
        }

        let Some(symbol) = self.scope.get(&name) else {
            return Err(self.error("Identifier is not defined."));
        };

        let index = if self.eat(&TokenKind::LBracket) {
            if !symbol.borrow().ty.is_array() {
                return Err(self.error("Identifier is not an array."));
            }

            let index = self.expression()?;
            if !index.ty.is_integer() {
                return Err(self.error("Array index must be an integer."));
            }
            self.expect(&TokenKind::RBracket)?;

            Some(Box::new(index))
        } else {
            None
        };

        if self.look.kind == TokenKind::Assign {
            return self.assign(symbol, index, false);
        }

        let ty = {
            let sym = symbol.borrow();
            if index.is_some() {
                match &sym.extra {
                    SymbolExtra::Array { element, .. } => *element,
                    _ => return Err(self.error("Identifier is not an array.")),
                }
            } else {
                sym.ty
            }
        };

        Ok(Node::new(ty, NodeKind::Variable { symbol, index }))
    }

    fn call(&mut self, name: &str) -> Result<Node, CompileError> {
        if let Some(builtin) = builtins::lookup(name) {
            return self.builtin_call(builtin);
        }

        let Some(symbol) = self.scope.get(name) else {
            return Err(self.error("Identifier is not defined."));
        };

        let args = self.call_args()?;

        let ret = {
            let sym = symbol.borrow();
            let SymbolExtra::Func { ret, params, .. } = &sym.extra else {
                return Err(self.error("Identifier is not a function."));
            };

            if params.len() != args.len() {
                return Err(self.error("Function parameters passed count mismatch."));
            }

            for (arg, param) in args.iter().zip_eq(params) {
                if arg.ty == TypeTag::Unknown {
                    return Err(self.error("No type to pass as parameter."));
                }
                if arg.ty != *param && !arg.ty.widens_to(*param) {
                    return Err(self.error("Function parameter type mismatch."));
                }
            }

            *ret
        };

        Ok(Node::new(ret, NodeKind::FuncCall { symbol, args }))
    }

    fn builtin_call(&mut self, builtin: &'static Builtin) -> Result<Node, CompileError> {
        let args = self.call_args()?;

        if let Some(arity) = builtin.arity {
            if args.len() != arity {
                return Err(self.error("Builtin function argument count mismatch."));
            }
        }

        for arg in &args {
            if !builtin.acceptable.contains(&arg.ty) {
                return Err(self.error("Builtin function argument type mismatch."));
            }
        }

        // The array form of `len` reads the header slot, so the argument
        // has to be a plain variable reference.
        if builtin.kind == BuiltinKind::Len
            && args[0].ty.is_array()
            && !matches!(args[0].kind, NodeKind::Variable { index: None, .. })
        {
            return Err(self.error("len expects an array variable."));
        }

        let ret = match builtin.kind {
            BuiltinKind::Abs => args[0].ty,
            _ => builtin.ret,
        };

        Ok(Node::new(ret, NodeKind::BuiltinCall { builtin, args }))
    }

    fn call_args(&mut self) -> Result<Vec<Node>, CompileError> {
        self.expect(&TokenKind::LParen)?;

        let mut args = Vec::new();
        while self.look.kind != TokenKind::RParen {
            args.push(self.expression()?);
            if self.look.kind == TokenKind::RParen {
                break;
            }
            self.expect(&TokenKind::Comma)?;
        }
        self.expect(&TokenKind::RParen)?;

        Ok(args)
    }

    fn data_type(&mut self) -> Result<DeclType, CompileError> {
        let name = match &self.look.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(self.error("A data type is expected.")),
        };

        let Some(tag) = builtins::type_by_name(&name) else {
            return Err(self.error("Unknown data type."));
        };
        self.advance();

        if !tag.is_array() {
            return Ok(DeclType { tag, element: None });
        }

        self.expect(&TokenKind::LBracket)?;
        let element_name = self.peek_ident()?;
        let element = match builtins::type_by_name(&element_name) {
            Some(element)
                if element.is_integer() || element.is_real() || element.is_bool() =>
            {
                element
            }
            _ => return Err(self.error("Unknown data type.")),
        };
        self.advance();
        self.expect(&TokenKind::RBracket)?;

        Ok(DeclType {
            tag,
            element: Some(element),
        })
    }
}
