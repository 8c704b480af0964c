//! Call, field-access, and construction lowering.
//!
//! Resolution has already committed every target; this file only picks
//! instruction forms. Dispatch is virtual for overridable instance
//! methods unless the call goes through `base`, vararg calls in
//! expanded form collect their trailing arguments into an array, and a
//! member the VM would refuse to touch from the current class goes
//! through a synthesized static bridge on the declaring type, memoized
//! per member.

use veld_catalog::primitives;
use veld_core::{
    CompileError, Expr, ExprKind, FieldDef, MethodDef, MethodFlags, MethodId, ParamDef, TypeKind,
    Visibility,
};

use crate::bytecode::{Constant, OpCode};

use super::{Lowerer, Pending};

impl Lowerer<'_> {
    pub(crate) fn lower_call(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let ExprKind::Call { receiver, args, .. } = &expr.kind else {
            return Err(CompileError::internal("lower_call on a non-call"));
        };
        let info = self.expr_info(expr)?;
        let method = info
            .method
            .ok_or_else(|| CompileError::internal("call reached lowering unresolved"))?;
        let def = self.catalog.expect_method(method)?.clone();

        if info.is_extension {
            // The receiver is the first declared parameter.
            let r = receiver
                .as_deref()
                .ok_or_else(|| CompileError::internal("extension call without a receiver"))?;
            self.lower_arg(r, def.params[0].ty)?;
            self.lower_args(&def.params[1..], args, def.is_varargs())?;
        } else {
            if !def.is_static() {
                match receiver {
                    Some(r) => self.lower_expr(r)?,
                    None => self.emitter.op(OpCode::GetThis),
                }
            }
            self.lower_args(&def.params, args, def.is_varargs())?;
        }
        self.emit_invoke(&def, info.is_base_call)
    }

    pub(crate) fn lower_new(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let ExprKind::New { args, .. } = &expr.kind else {
            return Err(CompileError::internal("lower_new on a non-construction"));
        };
        let ctor = self
            .expr_info(expr)?
            .method
            .ok_or_else(|| CompileError::internal("construction without a constructor"))?;
        let def = self.catalog.expect_method(ctor)?.clone();
        self.lower_args(&def.params, args, def.is_varargs())?;
        let index = self.emitter.intern(Constant::Method(ctor));
        self.emitter
            .op_u16_u8(OpCode::New, index, def.params.len() as u8);
        Ok(())
    }

    pub(crate) fn lower_field_get(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let ExprKind::Field { object, .. } = &expr.kind else {
            return Err(CompileError::internal("lower_field_get on a non-field"));
        };
        let field = self
            .expr_info(expr)?
            .field
            .ok_or_else(|| CompileError::internal("field access reached lowering unresolved"))?;
        let def = self.catalog.expect_field(field)?.clone();
        if def.is_static() {
            if self.vm_accessible(def.visibility, def.declaring) {
                let index = self.emitter.intern(Constant::Field(field));
                self.emitter.op_u16(OpCode::GetStatic, index);
            } else {
                let bridge = self.field_get_bridge(&def)?;
                self.emitter.call(OpCode::Call, bridge, 0);
            }
            return Ok(());
        }
        match object {
            Some(o) => self.lower_expr(o)?,
            None => self.emitter.op(OpCode::GetThis),
        }
        if self.vm_accessible(def.visibility, def.declaring) {
            let index = self.emitter.intern(Constant::Field(field));
            self.emitter.op_u16(OpCode::GetField, index);
        } else {
            let bridge = self.field_get_bridge(&def)?;
            self.emitter.call(OpCode::Call, bridge, 1);
        }
        Ok(())
    }

    /// Lower arguments against declared parameters, reshaping a vararg
    /// call in expanded form into a trailing array.
    pub(crate) fn lower_args(
        &mut self,
        params: &[ParamDef],
        args: &[Expr],
        varargs: bool,
    ) -> Result<(), CompileError> {
        let expanded = varargs
            && !params.is_empty()
            && args.len() >= params.len() - 1
            && self.is_expanded_varargs(params, args)?;
        if !expanded {
            for (param, arg) in params.iter().zip(args) {
                self.lower_arg(arg, param.ty)?;
            }
            return Ok(());
        }
        let fixed = params.len() - 1;
        for (param, arg) in params[..fixed].iter().zip(&args[..fixed]) {
            self.lower_arg(arg, param.ty)?;
        }
        let element = self
            .catalog
            .expect_type(params[fixed].ty)?
            .element
            .ok_or_else(|| CompileError::internal("vararg parameter is not an array"))?;
        let rest = &args[fixed..];
        for arg in rest {
            self.lower_arg(arg, element)?;
        }
        let index = self.emitter.intern(Constant::Type(element));
        self.emitter
            .op_u16_u8(OpCode::NewArray, index, rest.len() as u8);
        Ok(())
    }

    /// Whether this argument list uses the expanded vararg form (each
    /// trailing argument an element) rather than passing an array.
    fn is_expanded_varargs(
        &self,
        params: &[ParamDef],
        args: &[Expr],
    ) -> Result<bool, CompileError> {
        let last_param = params[params.len() - 1].ty;
        if self.catalog.kind_of(last_param)? != TypeKind::Array {
            return Ok(false);
        }
        if args.len() != params.len() {
            return Ok(true);
        }
        let last_arg = &args[args.len() - 1];
        if last_arg.is_null_literal() {
            return Ok(false);
        }
        let arg_ty = self.ty_of(last_arg)?;
        Ok(!self.catalog.is_assignable_from(last_param, arg_ty))
    }

    /// Emit the call instruction for a target whose operands are already
    /// on the stack in receiver-then-arguments order.
    pub(crate) fn emit_invoke(
        &mut self,
        def: &MethodDef,
        is_base_call: bool,
    ) -> Result<(), CompileError> {
        if !self.vm_accessible(def.visibility, def.declaring) {
            let bridge = self.method_bridge(def)?;
            let argc = def.params.len() + usize::from(!def.is_static());
            self.emitter.call(OpCode::Call, bridge, argc as u8);
            return Ok(());
        }
        let overridable = def
            .flags
            .intersects(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT)
            || self.catalog.kind_of(def.declaring)? == TypeKind::Interface;
        let op = if !def.is_static() && overridable && !is_base_call {
            OpCode::CallVirtual
        } else {
            OpCode::Call
        };
        self.emitter.call(op, def.id, def.params.len() as u8);
        Ok(())
    }

    // =========================================================================
    // Bridge synthesis
    // =========================================================================

    /// A static method on the declaring type forwarding to `target`;
    /// synthesized once per member.
    pub(crate) fn method_bridge(&mut self, target: &MethodDef) -> Result<MethodId, CompileError> {
        if let Some(&bridge) = self.method_bridges.get(&target.id) {
            return Ok(bridge);
        }
        let name = format!("bridge${}${:016x}", target.name, target.id.0);
        let mut params = Vec::with_capacity(target.params.len() + 1);
        if !target.is_static() {
            params.push(ParamDef::new("self", target.declaring));
        }
        params.extend(target.params.iter().cloned());
        let mut def = MethodDef::new(target.declaring, &name, params, target.return_type)
            .with_flags(MethodFlags::STATIC | MethodFlags::SYNTHETIC)
            .with_visibility(Visibility::Public);
        def.id = MethodId::synthesized(target.declaring, &name);
        let bridge = self.catalog.declare_synthetic_method(def);
        self.method_bridges.insert(target.id, bridge);
        self.pending.push(Pending::Bridge {
            method: bridge,
            target: target.id,
        });
        Ok(bridge)
    }

    pub(crate) fn field_get_bridge(&mut self, target: &FieldDef) -> Result<MethodId, CompileError> {
        if let Some(&bridge) = self.field_get_bridges.get(&target.id) {
            return Ok(bridge);
        }
        let name = format!("get${}", target.name);
        let params = if target.is_static() {
            vec![]
        } else {
            vec![ParamDef::new("self", target.declaring)]
        };
        let mut def = MethodDef::new(target.declaring, &name, params, target.ty)
            .with_flags(MethodFlags::STATIC | MethodFlags::SYNTHETIC)
            .with_visibility(Visibility::Public);
        def.id = MethodId::synthesized(target.declaring, &name);
        let bridge = self.catalog.declare_synthetic_method(def);
        self.field_get_bridges.insert(target.id, bridge);
        self.pending.push(Pending::FieldGet {
            method: bridge,
            target: target.id,
        });
        Ok(bridge)
    }

    pub(crate) fn field_set_bridge(&mut self, target: &FieldDef) -> Result<MethodId, CompileError> {
        if let Some(&bridge) = self.field_set_bridges.get(&target.id) {
            return Ok(bridge);
        }
        let name = format!("set${}", target.name);
        let mut params = Vec::new();
        if !target.is_static() {
            params.push(ParamDef::new("self", target.declaring));
        }
        params.push(ParamDef::new("value", target.ty));
        let mut def = MethodDef::new(target.declaring, &name, params, primitives::void())
            .with_flags(MethodFlags::STATIC | MethodFlags::SYNTHETIC)
            .with_visibility(Visibility::Public);
        def.id = MethodId::synthesized(target.declaring, &name);
        let bridge = self.catalog.declare_synthetic_method(def);
        self.field_set_bridges.insert(target.id, bridge);
        self.pending.push(Pending::FieldSet {
            method: bridge,
            target: target.id,
        });
        Ok(bridge)
    }
}
