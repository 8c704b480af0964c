//! Arithmetic, bitwise, and string-concatenation lowering.
//!
//! Numeric operands promote to the wider of the two widths before the
//! typed instruction; a constant zero is pushed at the promoted width
//! directly. A string `+` tree folds into one builder: begin once,
//! append each leaf with a type tag, finish once, however deep the
//! nesting goes.

use veld_catalog::primitives;
use veld_core::{BinaryOp, CompileError, Expr, ExprKind, TypeId, TypeKind, Width};

use crate::bytecode::{AppendKind, OpCode};

use super::Lowerer;

impl Lowerer<'_> {
    pub(crate) fn lower_arithmetic(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        result: TypeId,
    ) -> Result<(), CompileError> {
        let width = self
            .catalog
            .width_of(result)
            .ok_or_else(|| CompileError::internal("arithmetic on a widthless type"))?;
        let shift = matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr);
        self.lower_operand_at(lhs, width)?;
        if shift {
            // Shift amounts stay i32 regardless of the value width.
            self.lower_operand_at(rhs, Width::I32)?;
        } else {
            self.lower_operand_at(rhs, width)?;
        }
        self.emitter.op(arith_op(op, width)?);
        Ok(())
    }

    /// Lower a string `+` tree as one builder sequence.
    pub(crate) fn lower_concat(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.emitter.op(OpCode::ConcatBegin);
        self.append_concat(expr)?;
        self.emitter.op(OpCode::ConcatFinish);
        Ok(())
    }

    /// Append one operand, descending into nested non-constant string
    /// additions instead of building intermediate strings.
    fn append_concat(&mut self, expr: &Expr) -> Result<(), CompileError> {
        if let ExprKind::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        } = &expr.kind
            && self.ty_of(expr)? == primitives::string()
            && self.const_of(expr).is_none()
        {
            self.append_concat(lhs)?;
            self.append_concat(rhs)?;
            return Ok(());
        }
        self.lower_expr(expr)?;
        let kind = self.catalog.kind_of(self.ty_of(expr)?)?;
        self.emitter
            .op_u8(OpCode::ConcatAppend, append_kind(kind) as u8);
        Ok(())
    }
}

/// The typed instruction for one operator at one width.
fn arith_op(op: BinaryOp, width: Width) -> Result<OpCode, CompileError> {
    use OpCode::*;
    use Width::*;
    let found = match (op, width) {
        (BinaryOp::Add, I32) => AddI32,
        (BinaryOp::Add, I64) => AddI64,
        (BinaryOp::Add, F32) => AddF32,
        (BinaryOp::Add, F64) => AddF64,
        (BinaryOp::Sub, I32) => SubI32,
        (BinaryOp::Sub, I64) => SubI64,
        (BinaryOp::Sub, F32) => SubF32,
        (BinaryOp::Sub, F64) => SubF64,
        (BinaryOp::Mul, I32) => MulI32,
        (BinaryOp::Mul, I64) => MulI64,
        (BinaryOp::Mul, F32) => MulF32,
        (BinaryOp::Mul, F64) => MulF64,
        (BinaryOp::Div, I32) => DivI32,
        (BinaryOp::Div, I64) => DivI64,
        (BinaryOp::Div, F32) => DivF32,
        (BinaryOp::Div, F64) => DivF64,
        (BinaryOp::Rem, I32) => RemI32,
        (BinaryOp::Rem, I64) => RemI64,
        (BinaryOp::Rem, F32) => RemF32,
        (BinaryOp::Rem, F64) => RemF64,
        (BinaryOp::BitAnd, I32) => AndI32,
        (BinaryOp::BitAnd, I64) => AndI64,
        (BinaryOp::BitOr, I32) => OrI32,
        (BinaryOp::BitOr, I64) => OrI64,
        (BinaryOp::BitXor, I32) => XorI32,
        (BinaryOp::BitXor, I64) => XorI64,
        (BinaryOp::Shl, I32) => ShlI32,
        (BinaryOp::Shl, I64) => ShlI64,
        (BinaryOp::Shr, I32) => ShrI32,
        (BinaryOp::Shr, I64) => ShrI64,
        (BinaryOp::Ushr, I32) => UshrI32,
        (BinaryOp::Ushr, I64) => UshrI64,
        _ => {
            return Err(CompileError::internal(format!(
                "no instruction for {op:?} at {width:?}"
            )));
        }
    };
    Ok(found)
}

/// Append tag for the static type of a concat operand.
fn append_kind(kind: TypeKind) -> AppendKind {
    match kind {
        TypeKind::Bool => AppendKind::Bool,
        TypeKind::Char => AppendKind::Char,
        TypeKind::Byte | TypeKind::Short | TypeKind::Int | TypeKind::Enum => AppendKind::I32,
        TypeKind::Long => AppendKind::I64,
        TypeKind::Float => AppendKind::F32,
        TypeKind::Double => AppendKind::F64,
        TypeKind::Str => AppendKind::Str,
        _ => AppendKind::Ref,
    }
}
