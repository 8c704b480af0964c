//! Branch-position lowering: short-circuit operators and comparisons.
//!
//! A condition never materializes a boolean. It receives a pair of
//! branch targets, emits conditional branches to `if_false` for the
//! failing paths, and falls through (or branches) toward `if_true`.
//! Comparisons pick the cheapest instruction form: two-operand i32
//! branches, single-operand zero tests when one side is a constant
//! zero, and a three-way compare plus zero test for wide operands.

use veld_core::{BinaryOp, CompileError, Expr, ExprKind, LogicalOp, TypeId, UnaryOp, Width};

use veld_catalog::primitives;

use crate::bytecode::OpCode;
use crate::emit::TargetLabels;

use super::Lowerer;

impl Lowerer<'_> {
    /// Lower an expression in branch position.
    pub(crate) fn lower_condition(
        &mut self,
        expr: &Expr,
        targets: TargetLabels,
    ) -> Result<(), CompileError> {
        self.emitter.set_line(expr.span.line);
        let info = self.expr_info(expr)?;
        let targets = if info.negate {
            targets.swapped()
        } else {
            targets
        };
        if let Some(value) = &info.value {
            let decided = value.as_bool().ok_or_else(|| {
                CompileError::internal("non-boolean constant in branch position")
            })?;
            self.emitter.jump(if decided {
                targets.if_true
            } else {
                targets.if_false
            });
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Logical {
                op: LogicalOp::And,
                lhs,
                rhs,
            } => {
                let mid = self.emitter.new_label();
                self.lower_condition(lhs, TargetLabels::new(mid, targets.if_false))?;
                self.emitter.mark(mid);
                self.lower_condition(rhs, targets)
            }
            ExprKind::Logical {
                op: LogicalOp::Or,
                lhs,
                rhs,
            } => {
                let mid = self.emitter.new_label();
                self.lower_condition(lhs, TargetLabels::new(targets.if_true, mid))?;
                self.emitter.mark(mid);
                self.lower_condition(rhs, targets)
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.lower_condition(operand, targets.swapped()),
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                self.lower_comparison(*op, lhs, rhs, targets)
            }
            _ => {
                // An opaque boolean value: test its i32 truth directly.
                self.lower_expr(expr)?;
                self.emitter.branch(OpCode::JumpIfFalse, targets.if_false);
                Ok(())
            }
        }
    }

    /// Lower a comparison to a conditional branch: jump to `if_false`
    /// when the negated comparison holds, fall through otherwise.
    fn lower_comparison(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        targets: TargetLabels,
    ) -> Result<(), CompileError> {
        // Null tests and reference identity first.
        if lhs.is_null_literal() || rhs.is_null_literal() {
            let operand = if lhs.is_null_literal() { rhs } else { lhs };
            self.lower_expr(operand)?;
            let fail = match op {
                BinaryOp::Eq => OpCode::JumpNonNull,
                BinaryOp::Ne => OpCode::JumpNull,
                _ => return Err(CompileError::internal("ordered comparison against null")),
            };
            self.emitter.branch(fail, targets.if_false);
            return Ok(());
        }
        let lt = self.ty_of(lhs)?;
        let rt = self.ty_of(rhs)?;
        if self.catalog.kind_of(lt)?.is_reference() || self.catalog.kind_of(rt)?.is_reference() {
            if !op.is_equality() {
                return Err(CompileError::internal("ordered comparison on references"));
            }
            self.lower_expr(lhs)?;
            self.lower_expr(rhs)?;
            let fail = match op {
                BinaryOp::Eq => OpCode::JumpNeRef,
                _ => OpCode::JumpEqRef,
            };
            self.emitter.branch(fail, targets.if_false);
            return Ok(());
        }

        let lw = self
            .catalog
            .width_of(lt)
            .ok_or_else(|| CompileError::internal("comparison on an unordered operand"))?;
        let rw = self
            .catalog
            .width_of(rt)
            .ok_or_else(|| CompileError::internal("comparison on an unordered operand"))?;
        let width = lw.max(rw);

        if width == Width::I32 {
            // Single-operand zero tests when one side is statically zero.
            if self.const_of(rhs).is_some_and(|v| v.is_zero()) {
                self.lower_expr(lhs)?;
                self.emitter
                    .branch(zero_test(negate_cmp(op)), targets.if_false);
                return Ok(());
            }
            if self.const_of(lhs).is_some_and(|v| v.is_zero()) {
                self.lower_expr(rhs)?;
                self.emitter
                    .branch(zero_test(negate_cmp(mirror_cmp(op))), targets.if_false);
                return Ok(());
            }
            self.lower_expr(lhs)?;
            self.lower_expr(rhs)?;
            self.emitter
                .branch(compare_i32(negate_cmp(op)), targets.if_false);
            return Ok(());
        }

        // Wide operands: three-way compare, then test the sign.
        self.lower_operand_at(lhs, width)?;
        self.lower_operand_at(rhs, width)?;
        self.emitter.op(match width {
            Width::I64 => OpCode::CmpI64,
            Width::F32 => OpCode::CmpF32,
            Width::F64 => OpCode::CmpF64,
            Width::I32 => unreachable!("i32 handled above"),
        });
        self.emitter
            .branch(zero_test(negate_cmp(op)), targets.if_false);
        Ok(())
    }

    /// Lower an operand promoted to the given width. A constant zero is
    /// pushed at that width directly, skipping the widening instruction.
    pub(crate) fn lower_operand_at(
        &mut self,
        expr: &Expr,
        width: Width,
    ) -> Result<(), CompileError> {
        if self.const_of(expr).is_some_and(|v| v.is_zero()) {
            self.emitter.load_zero(width);
            return Ok(());
        }
        self.lower_expr(expr)?;
        let ty = self.ty_of(expr)?;
        self.convert(ty, width_type(width))
    }
}

/// The primitive type carrying each stack width.
fn width_type(width: Width) -> TypeId {
    match width {
        Width::I32 => primitives::int(),
        Width::I64 => primitives::long(),
        Width::F32 => primitives::float(),
        Width::F64 => primitives::double(),
    }
}

/// The comparison that holds exactly when `op` does not.
fn negate_cmp(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Eq => BinaryOp::Ne,
        BinaryOp::Ne => BinaryOp::Eq,
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Le => BinaryOp::Gt,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Ge => BinaryOp::Lt,
        other => other,
    }
}

/// The comparison with its operands swapped.
fn mirror_cmp(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

/// Branch taken when the i32 on top satisfies `op` against zero.
fn zero_test(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Eq => OpCode::JumpZero,
        BinaryOp::Ne => OpCode::JumpNonZero,
        BinaryOp::Lt => OpCode::JumpLtZero,
        BinaryOp::Le => OpCode::JumpLeZero,
        BinaryOp::Gt => OpCode::JumpGtZero,
        BinaryOp::Ge => OpCode::JumpGeZero,
        _ => unreachable!("not a comparison"),
    }
}

/// Branch taken when the two i32 operands on top satisfy `op`.
fn compare_i32(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Eq => OpCode::JumpEqI32,
        BinaryOp::Ne => OpCode::JumpNeI32,
        BinaryOp::Lt => OpCode::JumpLtI32,
        BinaryOp::Le => OpCode::JumpLeI32,
        BinaryOp::Gt => OpCode::JumpGtI32,
        BinaryOp::Ge => OpCode::JumpGeI32,
        _ => unreachable!("not a comparison"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ExprBuilder, lower_one};
    use super::*;
    use crate::annotations::{AnnotationStore, ExprInfo};
    use veld_catalog::Catalog;
    use veld_core::{ConstValue, LocalId};

    fn branch_only(
        catalog: &mut Catalog,
        store: &AnnotationStore,
        params: &[LocalId],
        cond: &Expr,
    ) -> crate::bytecode::BytecodeChunk {
        lower_one(catalog, store, primitives::object(), params, |l| {
            let t = l.emitter.new_label();
            let f = l.emitter.new_label();
            l.lower_condition(cond, TargetLabels::new(t, f))?;
            l.emitter.mark(t);
            l.emitter.mark(f);
            Ok(())
        })
    }

    #[test]
    fn comparison_against_zero_uses_the_single_operand_form() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::int());
        let rhs = b.int(&mut store, 0);
        let cmp = b.binary(&mut store, BinaryOp::Lt, lhs, rhs, primitives::bool_ty());

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0)], &cmp);
        // x < 0 fails when x >= 0.
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::JumpGeZero]);
    }

    #[test]
    fn zero_on_the_left_mirrors_the_comparison() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.int(&mut store, 0);
        let rhs = b.local(&mut store, LocalId(0), primitives::int());
        let cmp = b.binary(&mut store, BinaryOp::Lt, lhs, rhs, primitives::bool_ty());

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0)], &cmp);
        // 0 < x is x > 0, which fails when x <= 0.
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::JumpLeZero]);
    }

    #[test]
    fn wide_comparison_goes_through_the_three_way_compare() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::long());
        let rhs = b.local(&mut store, LocalId(1), primitives::int());
        let cmp = b.binary(&mut store, BinaryOp::Le, lhs, rhs, primitives::bool_ty());

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0), LocalId(1)], &cmp);
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::I32toI64,
            OpCode::CmpI64,
            OpCode::JumpGtZero,
        ]);
    }

    #[test]
    fn null_test_uses_the_null_branches() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::string());
        let rhs = b.expr(ExprKind::Literal(ConstValue::Null));
        store.set_expr(rhs.id, ExprInfo::typed(primitives::object()));
        let cmp = b.binary(&mut store, BinaryOp::Ne, lhs, rhs, primitives::bool_ty());

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0)], &cmp);
        // x != null fails when x is null.
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::JumpNull]);
    }

    #[test]
    fn short_circuit_and_chains_through_the_middle_label() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let a = b.local(&mut store, LocalId(0), primitives::bool_ty());
        let c = b.local(&mut store, LocalId(1), primitives::bool_ty());
        let and = b.expr(ExprKind::Logical {
            op: LogicalOp::And,
            lhs: Box::new(a),
            rhs: Box::new(c),
        });
        store.set_expr(and.id, ExprInfo::typed(primitives::bool_ty()));

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0), LocalId(1)], &and);
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
        ]);
        // Both failure branches share the same destination.
        assert_eq!(chunk.read_u16(3), chunk.read_u16(8));
    }

    #[test]
    fn negated_comparison_swaps_polarity_without_extra_code() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::int());
        let rhs = b.local(&mut store, LocalId(1), primitives::int());
        let cmp = b.binary(&mut store, BinaryOp::Eq, lhs, rhs, primitives::bool_ty());
        let not = b.expr(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(cmp),
        });
        store.set_expr(not.id, ExprInfo::typed(primitives::bool_ty()));

        let chunk = branch_only(&mut catalog, &store, &[LocalId(0), LocalId(1)], &not);
        // !(a == b) fails (goes to if_false) when a == b.
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::GetLocal, OpCode::JumpEqI32]);
    }

    #[test]
    fn constant_condition_collapses_to_a_jump() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let cond = b.expr(ExprKind::Literal(ConstValue::Bool(true)));
        store.set_expr(
            cond.id,
            ExprInfo::constant(primitives::bool_ty(), ConstValue::Bool(true)),
        );

        let chunk = branch_only(&mut catalog, &store, &[], &cond);
        chunk.assert_opcodes(&[OpCode::Jump]);
    }
}
