//! The per-function compilation driver.
//!
//! [`lower_method`] runs the flow checker over one resolved body, lowers
//! it to bytecode, and then drains the queue of synthesized bodies the
//! lowering produced: hoisted lambdas, adapter methods and constructors,
//! and accessor bridges. Jobs are deduplicated by method identity, so a
//! bridge requested from several call sites compiles once.

use rustc_hash::FxHashSet;

use veld_catalog::{Catalog, primitives};
use veld_core::{
    CompileError, Diagnostics, LocalId, MethodDef, MethodFlags, MethodId, Stmt, TypeKind,
};

use crate::annotations::AnnotationStore;
use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
use crate::check::check_function;
use crate::emit::Emitter;
use crate::lower::{Lowerer, Pending};

/// One compiled function: the declared or synthesized method and its
/// instruction stream.
#[derive(Debug)]
pub struct LoweredFunction {
    pub method: MethodId,
    pub chunk: BytecodeChunk,
}

/// Check and lower one method body, then compile everything the body
/// synthesized. Returns an empty vector when the checker found errors;
/// the diagnostics carry the details.
pub fn lower_method(
    catalog: &mut Catalog,
    store: &mut AnnotationStore,
    diags: &mut Diagnostics,
    pool: &mut ConstantPool,
    method: MethodId,
    param_locals: &[LocalId],
    body: &Stmt,
) -> Result<Vec<LoweredFunction>, CompileError> {
    let def = catalog.expect_method(method)?.clone();
    let returns_value = def.return_type != primitives::void();

    let errors_before = diags.errors().len();
    check_function(store, diags, body, returns_value);
    if diags.errors().len() > errors_before {
        return Ok(Vec::new());
    }

    let mut lowerer = Lowerer::new(catalog, store, pool, def.declaring);
    lowerer.set_return_type(def.return_type);
    lowerer.declare_params(param_locals);
    lowerer.lower_body(body, returns_value)?;
    let (chunk, pending) = lowerer.finish()?;

    let mut out = vec![LoweredFunction { method, chunk }];
    let mut queue = pending;
    let mut done: FxHashSet<MethodId> = FxHashSet::default();
    done.insert(method);

    while let Some(job) = queue.pop() {
        if !done.insert(job.method_id()) {
            continue;
        }
        let (function, more) = compile_pending(catalog, store, pool, job)?;
        out.push(function);
        queue.extend(more);
    }
    Ok(out)
}

/// Compile one synthesized body. Lambda bodies go through the full
/// lowerer and may synthesize further work; the adapter plumbing is
/// mechanical enough to emit directly.
fn compile_pending(
    catalog: &mut Catalog,
    store: &AnnotationStore,
    pool: &mut ConstantPool,
    job: Pending,
) -> Result<(LoweredFunction, Vec<Pending>), CompileError> {
    match job {
        Pending::Lambda {
            method,
            owner,
            params,
            body,
            captures,
        } => {
            let def = catalog.expect_method(method)?.clone();
            let mut lowerer = Lowerer::new(catalog, store, pool, owner);
            lowerer.set_return_type(def.return_type);
            lowerer.declare_params(&params);
            for (local, field) in captures {
                lowerer.mark_captured(local, field);
            }
            lowerer.lower_expr_body(&body)?;
            let (chunk, more) = lowerer.finish()?;
            Ok((LoweredFunction { method, chunk }, more))
        }

        Pending::Forward {
            method,
            target,
            receiver_field,
        } => {
            let def = catalog.expect_method(method)?.clone();
            let target_def = catalog.expect_method(target)?.clone();
            let mut emitter = Emitter::new(pool);
            if let Some(field) = receiver_field {
                emitter.op(OpCode::GetThis);
                let index = emitter.intern(Constant::Field(field));
                emitter.op_u16(OpCode::GetField, index);
            }
            for slot in 0..def.params.len() {
                emitter.get_local(slot as u32);
            }
            let op = dispatch_op(catalog, &target_def)?;
            emitter.call(op, target, target_def.params.len() as u8);
            emit_adapter_return(&mut emitter, &def, &target_def);
            Ok((
                LoweredFunction {
                    method,
                    chunk: emitter.finish()?,
                },
                Vec::new(),
            ))
        }

        Pending::Ctor { method, fields } => {
            let mut emitter = Emitter::new(pool);
            for (slot, field) in fields.iter().enumerate() {
                emitter.op(OpCode::GetThis);
                emitter.get_local(slot as u32);
                let index = emitter.intern(Constant::Field(*field));
                emitter.op_u16(OpCode::SetField, index);
            }
            emitter.op(OpCode::ReturnVoid);
            Ok((
                LoweredFunction {
                    method,
                    chunk: emitter.finish()?,
                },
                Vec::new(),
            ))
        }

        Pending::Bridge { method, target } => {
            let def = catalog.expect_method(method)?.clone();
            let target_def = catalog.expect_method(target)?.clone();
            let mut emitter = Emitter::new(pool);
            // Slot 0 holds the receiver for instance targets; the rest
            // are the forwarded arguments either way.
            for slot in 0..def.params.len() {
                emitter.get_local(slot as u32);
            }
            let op = dispatch_op(catalog, &target_def)?;
            emitter.call(op, target, target_def.params.len() as u8);
            emit_adapter_return(&mut emitter, &def, &target_def);
            Ok((
                LoweredFunction {
                    method,
                    chunk: emitter.finish()?,
                },
                Vec::new(),
            ))
        }

        Pending::FieldGet { method, target } => {
            let field = catalog.expect_field(target)?.clone();
            let mut emitter = Emitter::new(pool);
            let index = emitter.intern(Constant::Field(target));
            if field.is_static() {
                emitter.op_u16(OpCode::GetStatic, index);
            } else {
                emitter.get_local(0);
                emitter.op_u16(OpCode::GetField, index);
            }
            emitter.op(OpCode::Return);
            Ok((
                LoweredFunction {
                    method,
                    chunk: emitter.finish()?,
                },
                Vec::new(),
            ))
        }

        Pending::FieldSet { method, target } => {
            let field = catalog.expect_field(target)?.clone();
            let mut emitter = Emitter::new(pool);
            let index = emitter.intern(Constant::Field(target));
            if field.is_static() {
                emitter.get_local(0);
                emitter.op_u16(OpCode::SetStatic, index);
            } else {
                emitter.get_local(0);
                emitter.get_local(1);
                emitter.op_u16(OpCode::SetField, index);
            }
            emitter.op(OpCode::ReturnVoid);
            Ok((
                LoweredFunction {
                    method,
                    chunk: emitter.finish()?,
                },
                Vec::new(),
            ))
        }
    }
}

/// Dispatch instruction for a forwarded call: virtual and interface
/// targets stay late-bound through the adapter.
fn dispatch_op(catalog: &Catalog, target: &MethodDef) -> Result<OpCode, CompileError> {
    if target.is_static() {
        return Ok(OpCode::Call);
    }
    let late = target
        .flags
        .intersects(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT)
        || catalog.kind_of(target.declaring)? == TypeKind::Interface;
    Ok(if late { OpCode::CallVirtual } else { OpCode::Call })
}

/// Return from an adapter or bridge body, reconciling a void shape with
/// a value-producing target.
fn emit_adapter_return(emitter: &mut Emitter<'_>, shape: &MethodDef, target: &MethodDef) {
    let target_returns = target.return_type != primitives::void();
    if shape.return_type == primitives::void() {
        if target_returns {
            emitter.op(OpCode::Pop);
        }
        emitter.op(OpCode::ReturnVoid);
    } else {
        emitter.op(OpCode::Return);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::ExprInfo;
    use veld_core::{
        ConstValue, Expr, ExprKind, LambdaParam, NodeId, ParamDef, Span, StmtKind, TypeDef,
        Visibility,
    };

    struct Builder {
        next: u32,
    }

    impl Builder {
        fn new() -> Self {
            Self { next: 0 }
        }

        fn expr(&mut self, kind: ExprKind) -> Expr {
            self.next += 1;
            Expr::new(NodeId(self.next), Span::new(self.next, 1, 1), kind)
        }

        fn stmt(&mut self, kind: StmtKind) -> Stmt {
            self.next += 1;
            Stmt::new(NodeId(self.next), Span::new(self.next, 1, 1), kind)
        }
    }

    fn host(catalog: &mut Catalog) -> veld_core::TypeId {
        catalog.register_type(
            TypeDef::new("Host", TypeKind::Class).with_base(primitives::object()),
        )
    }

    #[test]
    fn flow_errors_stop_before_lowering() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut diags = Diagnostics::new();
        let mut pool = ConstantPool::new();
        let mut b = Builder::new();
        let ctx = host(&mut catalog);
        let method = catalog.register_method(MethodDef::new(
            ctx,
            "broken",
            vec![],
            primitives::void(),
        ));

        // A break with no enclosing loop never reaches the lowerer.
        let stray = b.stmt(StmtKind::Break);
        let body = b.stmt(StmtKind::Block(vec![stray]));

        let out = lower_method(
            &mut catalog,
            &mut store,
            &mut diags,
            &mut pool,
            method,
            &[],
            &body,
        )
        .unwrap();
        assert!(out.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn hoisted_lambda_compiles_after_the_main_body() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut diags = Diagnostics::new();
        let mut pool = ConstantPool::new();
        let mut b = Builder::new();
        let ctx = host(&mut catalog);
        let method =
            catalog.register_method(MethodDef::new(ctx, "make", vec![], primitives::void()));

        let mut fn_def = TypeDef::new("IntFn", TypeKind::Delegate);
        let fn_ty = fn_def.id;
        let invoke = catalog.register_method(
            MethodDef::new(
                fn_ty,
                "invoke",
                vec![ParamDef::new("x", primitives::int())],
                primitives::int(),
            )
            .with_flags(MethodFlags::ABSTRACT),
        );
        fn_def.invoke = Some(invoke);
        catalog.register_type(fn_def);

        // var f = fn(x) => 1;
        let one = b.expr(ExprKind::Literal(ConstValue::Int(1)));
        store.set_expr(
            one.id,
            ExprInfo::constant(primitives::int(), ConstValue::Int(1)),
        );
        let lam = b.expr(ExprKind::Lambda {
            params: vec![LambdaParam {
                local: LocalId(1),
                name: "x".into(),
                ty: None,
            }],
            body: Box::new(one),
        });
        store.set_expr(lam.id, ExprInfo::typed(fn_ty));
        let decl = b.stmt(StmtKind::LocalDecl {
            local: LocalId(0),
            name: "f".into(),
            ty: fn_ty,
            init: Some(lam),
        });
        let body = b.stmt(StmtKind::Block(vec![decl]));

        let out = lower_method(
            &mut catalog,
            &mut store,
            &mut diags,
            &mut pool,
            method,
            &[],
            &body,
        )
        .unwrap();
        assert!(!diags.has_errors());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].method, method);
        out[0]
            .chunk
            .assert_opcodes(&[OpCode::FuncRef, OpCode::SetLocal, OpCode::ReturnVoid]);
        // The hoisted body returns its expression value.
        out[1]
            .chunk
            .assert_opcodes(&[OpCode::PushOne, OpCode::Return]);
        assert!(catalog.expect_method(out[1].method).unwrap().is_synthetic());
    }

    #[test]
    fn bridge_requested_twice_compiles_once() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut diags = Diagnostics::new();
        let mut pool = ConstantPool::new();
        let mut b = Builder::new();
        let ctx = host(&mut catalog);
        let other = catalog.register_type(
            TypeDef::new("Vault", TypeKind::Class)
                .with_base(primitives::object())
                .with_namespace(&["sealed"]),
        );
        let hidden = catalog.register_method(
            MethodDef::new(other, "peek", vec![], primitives::int())
                .with_visibility(Visibility::Private),
        );
        let method =
            catalog.register_method(MethodDef::new(ctx, "probe", vec![], primitives::void()));

        let call_stmt = |b: &mut Builder, store: &mut AnnotationStore| {
            let recv = b.expr(ExprKind::Local {
                local: LocalId(0),
                name: "v".into(),
            });
            store.set_expr(recv.id, ExprInfo::typed(other));
            let call = b.expr(ExprKind::Call {
                receiver: Some(Box::new(recv)),
                name: "peek".into(),
                args: vec![],
            });
            store.set_expr(call.id, ExprInfo::typed(primitives::int()).with_method(hidden));
            b.stmt(StmtKind::Expr(Some(call)))
        };
        let first = call_stmt(&mut b, &mut store);
        let second = call_stmt(&mut b, &mut store);
        let body = b.stmt(StmtKind::Block(vec![first, second]));

        let out = lower_method(
            &mut catalog,
            &mut store,
            &mut diags,
            &mut pool,
            method,
            &[LocalId(0)],
            &body,
        )
        .unwrap();
        assert!(!diags.has_errors());
        // Main body plus exactly one bridge.
        assert_eq!(out.len(), 2);
        out[1].chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::Call,
            OpCode::Return,
        ]);
    }

    #[test]
    fn capturing_lambda_produces_ctor_and_body() {
        let mut catalog = Catalog::with_builtins();
        let mut store = AnnotationStore::new();
        let mut diags = Diagnostics::new();
        let mut pool = ConstantPool::new();
        let mut b = Builder::new();
        let ctx = host(&mut catalog);
        let method = catalog.register_method(MethodDef::new(
            ctx,
            "make",
            vec![ParamDef::new("n", primitives::int())],
            primitives::void(),
        ));

        let mut fn_def = TypeDef::new("IntFn", TypeKind::Delegate);
        let fn_ty = fn_def.id;
        let invoke = catalog.register_method(
            MethodDef::new(
                fn_ty,
                "invoke",
                vec![ParamDef::new("x", primitives::int())],
                primitives::int(),
            )
            .with_flags(MethodFlags::ABSTRACT),
        );
        fn_def.invoke = Some(invoke);
        catalog.register_type(fn_def);

        // var f = fn(x) => x + n;
        let x = b.expr(ExprKind::Local {
            local: LocalId(2),
            name: "x".into(),
        });
        store.set_expr(x.id, ExprInfo::typed(primitives::int()));
        let n = b.expr(ExprKind::Local {
            local: LocalId(0),
            name: "n".into(),
        });
        store.set_expr(n.id, ExprInfo::typed(primitives::int()));
        let sum = b.expr(ExprKind::Binary {
            op: veld_core::BinaryOp::Add,
            lhs: Box::new(x),
            rhs: Box::new(n),
        });
        store.set_expr(sum.id, ExprInfo::typed(primitives::int()));
        let lam = b.expr(ExprKind::Lambda {
            params: vec![LambdaParam {
                local: LocalId(2),
                name: "x".into(),
                ty: None,
            }],
            body: Box::new(sum),
        });
        store.set_expr(lam.id, ExprInfo::typed(fn_ty));
        let decl = b.stmt(StmtKind::LocalDecl {
            local: LocalId(1),
            name: "f".into(),
            ty: fn_ty,
            init: Some(lam),
        });
        let body = b.stmt(StmtKind::Block(vec![decl]));

        let out = lower_method(
            &mut catalog,
            &mut store,
            &mut diags,
            &mut pool,
            method,
            &[LocalId(0)],
            &body,
        )
        .unwrap();
        assert!(!diags.has_errors());
        // Main body, adapter invoke, adapter ctor.
        assert_eq!(out.len(), 3);
        out[0].chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::New,
            OpCode::SetLocal,
            OpCode::ReturnVoid,
        ]);
        // The lambda body reads its parameter from a slot and the
        // capture through its adapter field.
        let invoke_chunk = &out
            .iter()
            .find(|f| {
                let def = catalog.expect_method(f.method).unwrap();
                def.name == "invoke" && def.is_synthetic()
            })
            .unwrap()
            .chunk;
        invoke_chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::GetThis,
            OpCode::GetField,
            OpCode::AddI32,
            OpCode::Return,
        ]);
        let ctor_chunk = &out
            .iter()
            .find(|f| catalog.expect_method(f.method).unwrap().name == "ctor")
            .unwrap()
            .chunk;
        ctor_chunk.assert_opcodes(&[
            OpCode::GetThis,
            OpCode::GetLocal,
            OpCode::SetField,
            OpCode::ReturnVoid,
        ]);
    }
}
