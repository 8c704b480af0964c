//! Expression and statement lowering.
//!
//! One [`Lowerer`] compiles one function body into a [`BytecodeChunk`],
//! reading resolution results from the annotation store and never
//! re-resolving anything. Boolean expressions follow the branch-target
//! protocol: a condition in branch position receives a [`TargetLabels`]
//! pair instead of materializing a value, and comparisons lower straight
//! to conditional branch instructions.
//!
//! Lowering one body can synthesize more bodies: accessor bridges for
//! members the VM would reject, hoisted lambda functions, and adapter
//! classes for lambdas and method groups bound to interface or delegate
//! shapes. Those are queued as [`Pending`] jobs and compiled by the
//! driver after the main body finishes, deduplicated by method identity.

mod binary;
mod call;
mod closure;
mod logical;
mod stmt;

use rustc_hash::FxHashMap;

use veld_catalog::{Catalog, primitives};
use veld_core::{
    BinaryOp, CompileError, ConstValue, Expr, ExprKind, FieldId, LocalId, MethodId, NodeId, Stmt,
    TypeId, UnaryOp, Width,
};

use crate::annotations::{AnnotationStore, ExprInfo};
use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
use crate::emit::{Emitter, Label, TargetLabels};

/// A synthesized body waiting to be compiled.
#[derive(Debug)]
pub(crate) enum Pending {
    /// A lambda body, hoisted static or hosted on an adapter class.
    Lambda {
        method: MethodId,
        owner: TypeId,
        params: Vec<LocalId>,
        body: Expr,
        /// Captured locals and the adapter fields holding them.
        captures: Vec<(LocalId, FieldId)>,
    },
    /// An adapter method forwarding to a resolved method-group target.
    Forward {
        method: MethodId,
        target: MethodId,
        receiver_field: Option<FieldId>,
    },
    /// An adapter constructor storing captured values into fields.
    Ctor { method: MethodId, fields: Vec<FieldId> },
    /// A static bridge giving the VM an accessible path to a method.
    Bridge { method: MethodId, target: MethodId },
    /// A static bridge reading a field.
    FieldGet { method: MethodId, target: FieldId },
    /// A static bridge writing a field.
    FieldSet { method: MethodId, target: FieldId },
}

impl Pending {
    pub(crate) fn method_id(&self) -> MethodId {
        match self {
            Pending::Lambda { method, .. }
            | Pending::Forward { method, .. }
            | Pending::Ctor { method, .. }
            | Pending::Bridge { method, .. }
            | Pending::FieldGet { method, .. }
            | Pending::FieldSet { method, .. } => *method,
        }
    }
}

/// Jump labels of one enclosing loop or switch.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Where `continue` lands; switches have none.
    cont: Option<Label>,
    /// Where `break` (and a cascade past the last section) lands.
    brk: Label,
}

/// Compiles one function body.
pub struct Lowerer<'a> {
    catalog: &'a mut Catalog,
    store: &'a AnnotationStore,
    emitter: Emitter<'a>,
    /// The type whose code this is; accessibility checks run against it.
    context: TypeId,
    /// Declared return type; return values convert to it.
    return_type: Option<TypeId>,
    locals: FxHashMap<LocalId, u32>,
    next_slot: u32,
    /// Locals resolved through adapter fields instead of slots.
    captured: FxHashMap<LocalId, FieldId>,
    /// break/continue labels keyed by the loop or switch node.
    frames: FxHashMap<NodeId, Frame>,
    /// Labels marking the start of goto/goto-case destinations.
    entry_labels: FxHashMap<NodeId, Label>,
    /// Memoized accessor bridges, per member.
    method_bridges: FxHashMap<MethodId, MethodId>,
    field_get_bridges: FxHashMap<FieldId, MethodId>,
    field_set_bridges: FxHashMap<FieldId, MethodId>,
    pending: Vec<Pending>,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        catalog: &'a mut Catalog,
        store: &'a AnnotationStore,
        pool: &'a mut ConstantPool,
        context: TypeId,
    ) -> Self {
        Self {
            catalog,
            store,
            emitter: Emitter::new(pool),
            context,
            return_type: None,
            locals: FxHashMap::default(),
            next_slot: 0,
            captured: FxHashMap::default(),
            frames: FxHashMap::default(),
            entry_labels: FxHashMap::default(),
            method_bridges: FxHashMap::default(),
            field_get_bridges: FxHashMap::default(),
            field_set_bridges: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    pub fn set_return_type(&mut self, ty: TypeId) {
        self.return_type = Some(ty);
    }

    /// Assign the leading local slots to the function's parameters.
    pub fn declare_params(&mut self, params: &[LocalId]) {
        for &p in params {
            let slot = self.next_slot;
            self.next_slot += 1;
            self.locals.insert(p, slot);
        }
    }

    pub(crate) fn mark_captured(&mut self, local: LocalId, field: FieldId) {
        self.captured.insert(local, field);
    }

    /// Lower a whole body. Void functions get a trailing `ReturnVoid`.
    pub fn lower_body(&mut self, body: &Stmt, returns_value: bool) -> Result<(), CompileError> {
        self.lower_stmt(body)?;
        if !returns_value {
            self.emitter.op(OpCode::ReturnVoid);
        }
        Ok(())
    }

    /// Lower a lambda's expression body: return its value converted to
    /// the declared type, or evaluate and discard it for a void shape.
    pub fn lower_expr_body(&mut self, body: &Expr) -> Result<(), CompileError> {
        self.lower_expr(body)?;
        match self.return_type {
            Some(rt) if rt != primitives::void() => {
                if !body.is_null_literal() {
                    self.convert(self.ty_of(body)?, rt)?;
                }
                self.emitter.op(OpCode::Return);
            }
            _ => {
                if self.ty_of(body)? != primitives::void() {
                    self.emitter.op(OpCode::Pop);
                }
                self.emitter.op(OpCode::ReturnVoid);
            }
        }
        Ok(())
    }

    /// Resolve branches and hand back the chunk plus synthesized work.
    pub fn finish(self) -> Result<(BytecodeChunk, Vec<Pending>), CompileError> {
        Ok((self.emitter.finish()?, self.pending))
    }

    // =========================================================================
    // Expression lowering (value position)
    // =========================================================================

    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.emitter.set_line(expr.span.line);
        let info = self.expr_info(expr)?;
        if let Some(value) = &info.value {
            self.emitter.load_literal(value);
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Literal(v) => {
                self.emitter.load_literal(v);
                Ok(())
            }
            ExprKind::Local { local, .. } => self.load_local(*local),
            ExprKind::This | ExprKind::Base => {
                self.emitter.op(OpCode::GetThis);
                Ok(())
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => self.materialize_bool(expr),
                UnaryOp::Neg => {
                    self.lower_expr(operand)?;
                    let w = self.width_of_expr(operand)?;
                    self.emitter.op(match w {
                        Width::I32 => OpCode::NegI32,
                        Width::I64 => OpCode::NegI64,
                        Width::F32 => OpCode::NegF32,
                        Width::F64 => OpCode::NegF64,
                    });
                    Ok(())
                }
                UnaryOp::BitNot => {
                    self.lower_expr(operand)?;
                    let w = self.width_of_expr(operand)?;
                    self.emitter.op(match w {
                        Width::I32 => OpCode::NotI32,
                        Width::I64 => OpCode::NotI64,
                        _ => {
                            return Err(CompileError::internal(
                                "bitwise complement of a non-integral operand",
                            ));
                        }
                    });
                    Ok(())
                }
            },
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_comparison() {
                    self.materialize_bool(expr)
                } else if *op == BinaryOp::Add && info.ty == primitives::string() {
                    self.lower_concat(expr)
                } else {
                    self.lower_arithmetic(*op, lhs, rhs, info.ty)
                }
            }
            ExprKind::Logical { .. } => self.materialize_bool(expr),
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                let if_true = self.emitter.new_label();
                let if_false = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.lower_condition(cond, TargetLabels::new(if_true, if_false))?;
                self.emitter.mark(if_true);
                self.lower_expr(then_value)?;
                self.convert(self.ty_of(then_value)?, info.ty)?;
                self.emitter.jump(end);
                self.emitter.mark(if_false);
                self.lower_expr(else_value)?;
                self.convert(self.ty_of(else_value)?, info.ty)?;
                self.emitter.mark(end);
                Ok(())
            }
            ExprKind::Assign { .. } => self.lower_assign(expr, true),
            ExprKind::Call { .. } => self.lower_call(expr),
            ExprKind::Field { .. } => self.lower_field_get(expr),
            ExprKind::Index { object, index } => {
                let getter = info
                    .method
                    .ok_or_else(|| CompileError::internal("index read without an accessor"))?;
                let def = self.catalog.expect_method(getter)?.clone();
                self.lower_expr(object)?;
                self.lower_arg(index, def.params[0].ty)?;
                self.emit_invoke(&def, false)
            }
            ExprKind::Cast { ty, operand } => self.lower_cast(*ty, operand),
            ExprKind::New { .. } => self.lower_new(expr),
            ExprKind::Lambda { .. } | ExprKind::MethodGroup { .. } => self.lower_invocable(expr),
        }
    }

    /// Load a local, going through its capture field when the body runs
    /// inside an adapter.
    pub(crate) fn load_local(&mut self, local: LocalId) -> Result<(), CompileError> {
        if let Some(&field) = self.captured.get(&local) {
            self.emitter.op(OpCode::GetThis);
            let index = self.emitter.intern(Constant::Field(field));
            self.emitter.op_u16(OpCode::GetField, index);
            return Ok(());
        }
        let slot = self.slot(local);
        self.emitter.get_local(slot);
        Ok(())
    }

    /// Materialize a boolean expression as an i32 value on the stack.
    fn materialize_bool(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let if_true = self.emitter.new_label();
        let if_false = self.emitter.new_label();
        let end = self.emitter.new_label();
        self.lower_condition(expr, TargetLabels::new(if_true, if_false))?;
        self.emitter.mark(if_true);
        self.emitter.op(OpCode::PushTrue);
        self.emitter.jump(end);
        self.emitter.mark(if_false);
        self.emitter.op(OpCode::PushFalse);
        self.emitter.mark(end);
        Ok(())
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Lower an assignment; `keep_value` leaves the stored value on the
    /// stack for expression position.
    pub(crate) fn lower_assign(
        &mut self,
        expr: &Expr,
        keep_value: bool,
    ) -> Result<(), CompileError> {
        let ExprKind::Assign { target, value } = &expr.kind else {
            return Err(CompileError::internal("lower_assign on a non-assignment"));
        };
        let target_ty = self.ty_of(target)?;
        match &target.kind {
            ExprKind::Local { local, .. } => {
                self.lower_arg(value, target_ty)?;
                if keep_value {
                    self.emitter.op(OpCode::Dup);
                }
                if let Some(&field) = self.captured.get(local) {
                    // value; this; swap into receiver-then-value order.
                    self.emitter.op(OpCode::GetThis);
                    self.emitter.op(OpCode::Swap);
                    let index = self.emitter.intern(Constant::Field(field));
                    self.emitter.op_u16(OpCode::SetField, index);
                } else {
                    let slot = self.slot(*local);
                    self.emitter.set_local(slot);
                }
                Ok(())
            }
            ExprKind::Field { object, .. } => {
                let finfo = self.expr_info(target)?;
                let field = finfo
                    .field
                    .ok_or_else(|| CompileError::internal("assignment to unresolved field"))?;
                let def = self.catalog.expect_field(field)?.clone();
                if def.is_static() {
                    self.lower_arg(value, def.ty)?;
                    if keep_value {
                        self.emitter.op(OpCode::Dup);
                    }
                    if self.vm_accessible(def.visibility, def.declaring) {
                        let index = self.emitter.intern(Constant::Field(field));
                        self.emitter.op_u16(OpCode::SetStatic, index);
                    } else {
                        let bridge = self.field_set_bridge(&def)?;
                        self.emitter.call(OpCode::Call, bridge, 1);
                    }
                    return Ok(());
                }
                // Instance store wants receiver-then-value; stash the
                // value in a scratch slot to keep the order simple.
                let tmp = self.temp_slot();
                self.lower_arg(value, def.ty)?;
                self.emitter.set_local(tmp);
                match object {
                    Some(o) => self.lower_expr(o)?,
                    None => self.emitter.op(OpCode::GetThis),
                }
                self.emitter.get_local(tmp);
                if self.vm_accessible(def.visibility, def.declaring) {
                    let index = self.emitter.intern(Constant::Field(field));
                    self.emitter.op_u16(OpCode::SetField, index);
                } else {
                    let bridge = self.field_set_bridge(&def)?;
                    self.emitter.call(OpCode::Call, bridge, 2);
                }
                if keep_value {
                    self.emitter.get_local(tmp);
                }
                Ok(())
            }
            ExprKind::Index { object, index } => {
                let setter = self
                    .expr_info(target)?
                    .method
                    .ok_or_else(|| CompileError::internal("index write without an accessor"))?;
                let def = self.catalog.expect_method(setter)?.clone();
                let tmp = self.temp_slot();
                self.lower_arg(value, def.params[1].ty)?;
                self.emitter.set_local(tmp);
                self.lower_expr(object)?;
                self.lower_arg(index, def.params[0].ty)?;
                self.emitter.get_local(tmp);
                self.emit_invoke(&def, false)?;
                if def.return_type != primitives::void() {
                    self.emitter.op(OpCode::Pop);
                }
                if keep_value {
                    self.emitter.get_local(tmp);
                }
                Ok(())
            }
            _ => Err(CompileError::internal("unsupported assignment target")),
        }
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Lower an argument and convert it to the parameter's type.
    pub(crate) fn lower_arg(&mut self, arg: &Expr, param: TypeId) -> Result<(), CompileError> {
        self.lower_expr(arg)?;
        if arg.is_null_literal() {
            return Ok(());
        }
        self.convert(self.ty_of(arg)?, param)
    }

    /// Emit the representation change between two types, when one exists.
    /// Reference upcasts are free.
    pub(crate) fn convert(&mut self, from: TypeId, to: TypeId) -> Result<(), CompileError> {
        if from == to {
            return Ok(());
        }
        let fk = self.catalog.kind_of(from)?;
        let tk = self.catalog.kind_of(to)?;
        match (fk.width(), tk.width()) {
            (Some(fw), Some(tw)) => {
                if fw != tw {
                    self.emitter.op(conversion_op(fw, tw));
                }
                Ok(())
            }
            (Some(_), None) if tk.is_reference() => {
                let index = self.emitter.intern(Constant::Type(from));
                self.emitter.op_u16(OpCode::Box, index);
                Ok(())
            }
            (None, Some(_)) if fk.is_reference() => {
                let index = self.emitter.intern(Constant::Type(to));
                self.emitter.op_u16(OpCode::Unbox, index);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn lower_cast(&mut self, to: TypeId, operand: &Expr) -> Result<(), CompileError> {
        let from = self.ty_of(operand)?;
        self.lower_expr(operand)?;
        if from == to {
            return Ok(());
        }
        let fk = self.catalog.kind_of(from)?;
        let tk = self.catalog.kind_of(to)?;
        match (fk.width(), tk.width()) {
            (Some(fw), Some(tw)) => {
                if fw != tw {
                    self.emitter.op(conversion_op(fw, tw));
                }
            }
            (Some(_), None) if tk.is_reference() => {
                let index = self.emitter.intern(Constant::Type(from));
                self.emitter.op_u16(OpCode::Box, index);
            }
            (None, Some(_)) if fk.is_reference() => {
                let index = self.emitter.intern(Constant::Type(to));
                self.emitter.op_u16(OpCode::Unbox, index);
            }
            _ => {
                // Downcasts check at runtime; upcasts cost nothing.
                if !self.catalog.is_assignable_from(to, from) {
                    let index = self.emitter.intern(Constant::Type(to));
                    self.emitter.op_u16(OpCode::Cast, index);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessibility and bridges
    // =========================================================================

    /// Whether the VM itself would allow this access from the current
    /// context. Lexical nesting is a language notion the VM does not
    /// share, which is exactly the gap bridges fill.
    pub(crate) fn vm_accessible(
        &self,
        visibility: veld_core::Visibility,
        declaring: TypeId,
    ) -> bool {
        use veld_core::Visibility::*;
        match visibility {
            Public => true,
            Protected => self.catalog.is_same_or_derived(self.context, declaring),
            Internal => self.catalog.same_namespace(self.context, declaring),
            Private => self.context == declaring,
        }
    }

    // =========================================================================
    // Annotation and slot helpers
    // =========================================================================

    pub(crate) fn expr_info(&self, expr: &Expr) -> Result<ExprInfo, CompileError> {
        self.store
            .expr(expr.id)
            .cloned()
            .ok_or_else(|| CompileError::internal("expression reached lowering unresolved"))
    }

    pub(crate) fn ty_of(&self, expr: &Expr) -> Result<TypeId, CompileError> {
        Ok(self.expr_info(expr)?.ty)
    }

    pub(crate) fn const_of(&self, expr: &Expr) -> Option<ConstValue> {
        self.store.expr(expr.id).and_then(|i| i.value.clone())
    }

    pub(crate) fn width_of_expr(&self, expr: &Expr) -> Result<Width, CompileError> {
        let ty = self.ty_of(expr)?;
        self.catalog
            .width_of(ty)
            .ok_or_else(|| CompileError::internal("operand has no stack width"))
    }

    pub(crate) fn slot(&mut self, local: LocalId) -> u32 {
        if let Some(&slot) = self.locals.get(&local) {
            return slot;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.insert(local, slot);
        slot
    }

    pub(crate) fn is_local_slot(&self, local: LocalId) -> bool {
        self.locals.contains_key(&local) || self.captured.contains_key(&local)
    }

    fn temp_slot(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    /// Label marking the start of a goto or goto-case destination,
    /// allocated on first demand from either side.
    pub(crate) fn entry_label(&mut self, node: NodeId) -> Label {
        if let Some(&label) = self.entry_labels.get(&node) {
            return label;
        }
        let label = self.emitter.new_label();
        self.entry_labels.insert(node, label);
        label
    }
}

/// The instruction converting between two distinct stack widths.
fn conversion_op(from: Width, to: Width) -> OpCode {
    use OpCode::*;
    use Width::*;
    match (from, to) {
        (I32, I64) => I32toI64,
        (I32, F32) => I32toF32,
        (I32, F64) => I32toF64,
        (I64, I32) => I64toI32,
        (I64, F32) => I64toF32,
        (I64, F64) => I64toF64,
        (F32, I32) => F32toI32,
        (F32, I64) => F32toI64,
        (F32, F64) => F32toF64,
        (F64, I32) => F64toI32,
        (F64, I64) => F64toI64,
        (F64, F32) => F64toF32,
        (I32, I32) | (I64, I64) | (F32, F32) | (F64, F64) => {
            unreachable!("conversion between identical widths")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_core::Span;

    pub(super) struct ExprBuilder {
        next: u32,
    }

    impl ExprBuilder {
        pub(super) fn new() -> Self {
            Self { next: 0 }
        }

        pub(super) fn expr(&mut self, kind: ExprKind) -> Expr {
            self.next += 1;
            Expr::new(NodeId(self.next), Span::new(1, 1, 1), kind)
        }

        pub(super) fn int(&mut self, store: &mut AnnotationStore, v: i32) -> Expr {
            let e = self.expr(ExprKind::Literal(ConstValue::Int(v)));
            store.set_expr(
                e.id,
                ExprInfo::constant(primitives::int(), ConstValue::Int(v)),
            );
            e
        }

        pub(super) fn local(
            &mut self,
            store: &mut AnnotationStore,
            local: LocalId,
            ty: TypeId,
        ) -> Expr {
            let e = self.expr(ExprKind::Local {
                local,
                name: format!("v{}", local.0),
            });
            store.set_expr(e.id, ExprInfo::typed(ty));
            e
        }

        pub(super) fn binary(
            &mut self,
            store: &mut AnnotationStore,
            op: BinaryOp,
            lhs: Expr,
            rhs: Expr,
            ty: TypeId,
        ) -> Expr {
            let e = self.expr(ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
            store.set_expr(e.id, ExprInfo::typed(ty));
            e
        }
    }

    pub(super) fn lower_one(
        catalog: &mut Catalog,
        store: &AnnotationStore,
        context: TypeId,
        params: &[LocalId],
        f: impl FnOnce(&mut Lowerer<'_>) -> Result<(), CompileError>,
    ) -> BytecodeChunk {
        let mut pool = ConstantPool::new();
        let mut lowerer = Lowerer::new(catalog, store, &mut pool, context);
        lowerer.declare_params(params);
        f(&mut lowerer).unwrap();
        let (chunk, _) = lowerer.finish().unwrap();
        chunk
    }

    #[test]
    fn constants_fold_to_literal_loads() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        // A folded node carries its value; the operands are never lowered.
        let lhs = b.int(&mut store, 2);
        let rhs = b.int(&mut store, 3);
        let sum = b.binary(&mut store, BinaryOp::Add, lhs, rhs, primitives::int());
        store.set_expr(
            sum.id,
            ExprInfo::constant(primitives::int(), ConstValue::Int(5)),
        );

        let chunk = lower_one(&mut catalog, &store, primitives::object(), &[], |l| {
            l.lower_expr(&sum)
        });
        chunk.assert_opcodes(&[OpCode::Const]);
    }

    #[test]
    fn mixed_width_addition_widens_the_narrow_side() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::int());
        let rhs = b.local(&mut store, LocalId(1), primitives::long());
        let sum = b.binary(&mut store, BinaryOp::Add, lhs, rhs, primitives::long());

        let chunk = lower_one(
            &mut catalog,
            &store,
            primitives::object(),
            &[LocalId(0), LocalId(1)],
            |l| l.lower_expr(&sum),
        );
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::I32toI64,
            OpCode::GetLocal,
            OpCode::AddI64,
        ]);
    }

    #[test]
    fn conditional_converts_both_arms() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let cond = b.local(&mut store, LocalId(0), primitives::bool_ty());
        let then_value = b.local(&mut store, LocalId(1), primitives::int());
        let else_value = b.local(&mut store, LocalId(2), primitives::double());
        let pick = b.expr(ExprKind::Conditional {
            cond: Box::new(cond),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        });
        store.set_expr(pick.id, ExprInfo::typed(primitives::double()));

        let chunk = lower_one(
            &mut catalog,
            &store,
            primitives::object(),
            &[LocalId(0), LocalId(1), LocalId(2)],
            |l| l.lower_expr(&pick),
        );
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
            OpCode::GetLocal,
            OpCode::I32toF64,
            OpCode::Jump,
            OpCode::GetLocal,
        ]);
    }

    #[test]
    fn local_assignment_in_expression_position_duplicates() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let target = b.local(&mut store, LocalId(0), primitives::int());
        let value = b.int(&mut store, 7);
        let assign = b.expr(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        });
        store.set_expr(assign.id, ExprInfo::typed(primitives::int()));

        let chunk = lower_one(
            &mut catalog,
            &store,
            primitives::object(),
            &[LocalId(0)],
            |l| l.lower_expr(&assign),
        );
        chunk.assert_opcodes(&[OpCode::Const, OpCode::Dup, OpCode::SetLocal]);
    }

    #[test]
    fn boolean_value_position_materializes_both_outcomes() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut b = ExprBuilder::new();
        let lhs = b.local(&mut store, LocalId(0), primitives::int());
        let rhs = b.local(&mut store, LocalId(1), primitives::int());
        let cmp = b.binary(&mut store, BinaryOp::Lt, lhs, rhs, primitives::bool_ty());

        let chunk = lower_one(
            &mut catalog,
            &store,
            primitives::object(),
            &[LocalId(0), LocalId(1)],
            |l| l.lower_expr(&cmp),
        );
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::JumpGeI32,
            OpCode::PushTrue,
            OpCode::Jump,
            OpCode::PushFalse,
        ]);
    }
}
