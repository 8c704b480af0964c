//! Lambda and method-group lowering.
//!
//! An invocable expression takes its type from the target shape: a
//! delegate's `invoke` or a single-method interface. A capture-free
//! lambda bound to a delegate hoists to a static function and lowers to
//! a bare `FuncRef`; so does a static receiverless method group.
//! Everything else synthesizes an adapter class nested in the current
//! type: captured locals become fields, a constructor stores them, and
//! the shape method either hosts the lambda body or forwards to the
//! method-group target. The adapter bodies themselves are queued as
//! [`Pending`] jobs for the driver.

use rustc_hash::FxHashSet;

use veld_catalog::primitives;
use veld_core::{
    CompileError, Expr, ExprKind, FieldDef, FieldFlags, FieldId, LambdaParam, LocalId, MethodDef,
    MethodFlags, MethodId, ParamDef, TypeDef, TypeId, TypeKind, Visibility,
};

use crate::bytecode::{Constant, OpCode};

use super::{Lowerer, Pending};

/// Free variables of a lambda body: enclosing locals it reads or writes,
/// plus whether it touches `this`.
#[derive(Debug, Default)]
struct Captures {
    locals: Vec<(LocalId, TypeId)>,
    uses_this: bool,
}

impl Lowerer<'_> {
    pub(crate) fn lower_invocable(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let info = self.expr_info(expr)?;
        let shape = self
            .catalog
            .single_invokable(info.ty)
            .ok_or_else(|| CompileError::internal("invocable bound to a shapeless type"))?
            .clone();
        let target_kind = self.catalog.kind_of(info.ty)?;

        match &expr.kind {
            ExprKind::Lambda { params, body } => {
                let bound: FxHashSet<LocalId> = params.iter().map(|p| p.local).collect();
                let mut captures = Captures::default();
                self.collect_captures(body, &bound, &mut captures)?;

                let param_locals: Vec<LocalId> = params.iter().map(|p| p.local).collect();
                if target_kind == TypeKind::Delegate
                    && captures.locals.is_empty()
                    && !captures.uses_this
                {
                    return self.hoist_lambda(expr, &shape, params, param_locals, body);
                }
                self.adapt_lambda(expr, info.ty, &shape, params, param_locals, body, captures)
            }
            ExprKind::MethodGroup { receiver, .. } => {
                let target = info
                    .method
                    .ok_or_else(|| CompileError::internal("method group reached lowering unbound"))?;
                let def = self.catalog.expect_method(target)?.clone();
                if def.is_static()
                    && receiver.is_none()
                    && target_kind == TypeKind::Delegate
                    && self.vm_accessible(def.visibility, def.declaring)
                {
                    let index = self.emitter.intern(Constant::Method(target));
                    self.emitter.op_u16(OpCode::FuncRef, index);
                    return Ok(());
                }
                self.adapt_method_group(expr, info.ty, &shape, receiver.as_deref(), &def)
            }
            _ => Err(CompileError::internal("lower_invocable on a plain expression")),
        }
    }

    /// Capture-free delegate lambda: a hoisted static function plus a
    /// `FuncRef` at the site.
    fn hoist_lambda(
        &mut self,
        expr: &Expr,
        shape: &MethodDef,
        params: &[LambdaParam],
        param_locals: Vec<LocalId>,
        body: &Expr,
    ) -> Result<(), CompileError> {
        let name = format!("lambda${}", expr.id.0);
        let decl_params: Vec<ParamDef> = params
            .iter()
            .zip(&shape.params)
            .map(|(p, s)| ParamDef::new(&p.name, s.ty))
            .collect();
        let mut def = MethodDef::new(self.context, &name, decl_params, shape.return_type)
            .with_flags(MethodFlags::STATIC | MethodFlags::SYNTHETIC)
            .with_visibility(Visibility::Public);
        def.id = MethodId::synthesized(self.context, &name);
        let method = self.catalog.declare_synthetic_method(def);
        self.pending.push(Pending::Lambda {
            method,
            owner: self.context,
            params: param_locals,
            body: body.clone(),
            captures: Vec::new(),
        });
        let index = self.emitter.intern(Constant::Method(method));
        self.emitter.op_u16(OpCode::FuncRef, index);
        Ok(())
    }

    /// Capturing lambda: an adapter class holding the environment, with
    /// the shape method hosting the body.
    #[allow(clippy::too_many_arguments)]
    fn adapt_lambda(
        &mut self,
        expr: &Expr,
        target: TypeId,
        shape: &MethodDef,
        params: &[LambdaParam],
        param_locals: Vec<LocalId>,
        body: &Expr,
        captures: Captures,
    ) -> Result<(), CompileError> {
        let adapter = self.declare_adapter(expr, target)?;

        let mut ctor_fields = Vec::new();
        if captures.uses_this {
            let field = FieldDef::new(adapter, "$this", self.context)
                .with_flags(FieldFlags::SYNTHETIC | FieldFlags::READONLY);
            ctor_fields.push(self.catalog.declare_synthetic_field(field));
        }
        let mut capture_fields = Vec::new();
        for (local, ty) in &captures.locals {
            let field = FieldDef::new(adapter, &format!("$cap{}", local.0), *ty)
                .with_flags(FieldFlags::SYNTHETIC | FieldFlags::READONLY);
            let id = self.catalog.declare_synthetic_field(field);
            ctor_fields.push(id);
            capture_fields.push((*local, id));
        }
        let ctor = self.declare_adapter_ctor(adapter, &ctor_fields)?;

        let decl_params: Vec<ParamDef> = params
            .iter()
            .zip(&shape.params)
            .map(|(p, s)| ParamDef::new(&p.name, s.ty))
            .collect();
        let invoke = MethodDef::new(adapter, &shape.name, decl_params, shape.return_type)
            .with_flags(MethodFlags::VIRTUAL | MethodFlags::SYNTHETIC);
        let invoke = self.catalog.declare_synthetic_method(invoke);
        self.pending.push(Pending::Lambda {
            method: invoke,
            owner: adapter,
            params: param_locals,
            body: body.clone(),
            captures: capture_fields,
        });

        // Construct the adapter with the captured environment.
        if captures.uses_this {
            self.emitter.op(OpCode::GetThis);
        }
        for (local, _) in &captures.locals {
            self.load_local(*local)?;
        }
        let index = self.emitter.intern(Constant::Method(ctor));
        self.emitter
            .op_u16_u8(OpCode::New, index, ctor_fields.len() as u8);
        Ok(())
    }

    /// Method group that cannot be a bare `FuncRef`: an adapter whose
    /// shape method forwards to the resolved target.
    fn adapt_method_group(
        &mut self,
        expr: &Expr,
        target_ty: TypeId,
        shape: &MethodDef,
        receiver: Option<&Expr>,
        def: &MethodDef,
    ) -> Result<(), CompileError> {
        let adapter = self.declare_adapter(expr, target_ty)?;

        let mut ctor_fields = Vec::new();
        let mut receiver_field = None;
        if !def.is_static() {
            let recv_ty = match receiver {
                Some(r) => self.ty_of(r)?,
                None => self.context,
            };
            let field = FieldDef::new(adapter, "$recv", recv_ty)
                .with_flags(FieldFlags::SYNTHETIC | FieldFlags::READONLY);
            let id = self.catalog.declare_synthetic_field(field);
            ctor_fields.push(id);
            receiver_field = Some(id);
        }
        let ctor = self.declare_adapter_ctor(adapter, &ctor_fields)?;

        let decl_params: Vec<ParamDef> = shape
            .params
            .iter()
            .map(|p| ParamDef::new(&p.name, p.ty))
            .collect();
        let invoke = MethodDef::new(adapter, &shape.name, decl_params, shape.return_type)
            .with_flags(MethodFlags::VIRTUAL | MethodFlags::SYNTHETIC);
        let invoke = self.catalog.declare_synthetic_method(invoke);
        self.pending.push(Pending::Forward {
            method: invoke,
            target: def.id,
            receiver_field,
        });

        if !def.is_static() {
            match receiver {
                Some(r) => self.lower_expr(r)?,
                None => self.emitter.op(OpCode::GetThis),
            }
        }
        let index = self.emitter.intern(Constant::Method(ctor));
        self.emitter
            .op_u16_u8(OpCode::New, index, ctor_fields.len() as u8);
        Ok(())
    }

    /// The adapter class for one invocable site, nested in the current
    /// type and conforming to the target shape.
    fn declare_adapter(&mut self, expr: &Expr, target: TypeId) -> Result<TypeId, CompileError> {
        let name = format!("closure${}", expr.id.0);
        let mut def = TypeDef::new(&name, TypeKind::Class)
            .with_base(primitives::object())
            .with_enclosing(self.context)
            .with_visibility(Visibility::Internal);
        if self.catalog.kind_of(target)? == TypeKind::Delegate {
            def.base = Some(target);
        } else {
            def.interfaces.push(target);
        }
        def.id = TypeId::synthesized(self.context, &name);
        Ok(self.catalog.declare_synthetic_type(def))
    }

    fn declare_adapter_ctor(
        &mut self,
        adapter: TypeId,
        fields: &[FieldId],
    ) -> Result<MethodId, CompileError> {
        let mut params = Vec::with_capacity(fields.len());
        for &f in fields {
            let field = self.catalog.expect_field(f)?;
            params.push(ParamDef::new(&field.name, field.ty));
        }
        let mut def = MethodDef::new(adapter, "ctor", params, primitives::void())
            .with_flags(MethodFlags::SYNTHETIC);
        def.id = MethodId::synthesized(adapter, "ctor");
        let ctor = self.catalog.declare_synthetic_method(def);
        self.pending.push(Pending::Ctor {
            method: ctor,
            fields: fields.to_vec(),
        });
        Ok(ctor)
    }

    /// Walk a lambda body collecting enclosing locals it touches.
    fn collect_captures(
        &self,
        expr: &Expr,
        bound: &FxHashSet<LocalId>,
        out: &mut Captures,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Local { local, .. } => {
                if !bound.contains(local)
                    && self.is_local_slot(*local)
                    && !out.locals.iter().any(|(l, _)| l == local)
                {
                    out.locals.push((*local, self.ty_of(expr)?));
                }
            }
            ExprKind::This | ExprKind::Base => out.uses_this = true,
            ExprKind::Literal(_) => {}
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
                self.collect_captures(operand, bound, out)?;
            }
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
                self.collect_captures(lhs, bound, out)?;
                self.collect_captures(rhs, bound, out)?;
            }
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                self.collect_captures(cond, bound, out)?;
                self.collect_captures(then_value, bound, out)?;
                self.collect_captures(else_value, bound, out)?;
            }
            ExprKind::Assign { target, value } => {
                self.collect_captures(target, bound, out)?;
                self.collect_captures(value, bound, out)?;
            }
            ExprKind::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    self.collect_captures(r, bound, out)?;
                }
                for a in args {
                    self.collect_captures(a, bound, out)?;
                }
            }
            ExprKind::Field { object, .. } => {
                if let Some(o) = object {
                    self.collect_captures(o, bound, out)?;
                }
            }
            ExprKind::Index { object, index } => {
                self.collect_captures(object, bound, out)?;
                self.collect_captures(index, bound, out)?;
            }
            ExprKind::New { args, .. } => {
                for a in args {
                    self.collect_captures(a, bound, out)?;
                }
            }
            ExprKind::Lambda { params, body } => {
                // A nested lambda shadows its own parameters.
                let mut inner = bound.clone();
                inner.extend(params.iter().map(|p| p.local));
                self.collect_captures(body, &inner, out)?;
            }
            ExprKind::MethodGroup { receiver, .. } => {
                if let Some(r) = receiver {
                    self.collect_captures(r, bound, out)?;
                }
            }
        }
        Ok(())
    }
}
