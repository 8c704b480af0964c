//! End-to-end tests over the public facade: resolve, check, and lower
//! whole method bodies, asserting on the instruction streams.

use veld::{
    AnnotationStore, BinaryOp, Catalog, CaseLabel, ConstValue, Diagnostics, Expr, ExprInfo,
    ExprKind, LocalId, LogicalOp, LoweredFunction, MethodDef, NodeId, OpCode, ParamDef, Resolver,
    Span, Stmt, StmtKind, SwitchSection, TypeDef, TypeId, TypeKind, Visibility, Warning,
    lower_method, primitives,
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

    fn int(&mut self, store: &mut AnnotationStore, v: i32) -> Expr {
        let e = self.expr(ExprKind::Literal(ConstValue::Int(v)));
        store.set_expr(
            e.id,
            ExprInfo::constant(primitives::int(), ConstValue::Int(v)),
        );
        e
    }

    fn local(&mut self, store: &mut AnnotationStore, local: LocalId, ty: TypeId) -> Expr {
        let e = self.expr(ExprKind::Local {
            local,
            name: format!("v{}", local.0),
        });
        store.set_expr(e.id, ExprInfo::typed(ty));
        e
    }

    /// `v<local> = <value>;`
    fn assign_stmt(&mut self, store: &mut AnnotationStore, local: LocalId, value: Expr) -> Stmt {
        let target = self.local(store, local, primitives::int());
        let assign = self.expr(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        });
        store.set_expr(assign.id, ExprInfo::typed(primitives::int()));
        self.stmt(StmtKind::Expr(Some(assign)))
    }
}

/// Register a host class with one method of the given return type, then
/// check and lower `body` as that method.
fn compile(
    catalog: &mut Catalog,
    store: &mut AnnotationStore,
    params: &[LocalId],
    return_type: TypeId,
    body: &Stmt,
) -> (Vec<LoweredFunction>, Diagnostics) {
    let ctx = catalog
        .register_type(TypeDef::new("Main", TypeKind::Class).with_base(primitives::object()));
    let method = catalog.register_method(MethodDef::new(ctx, "run", vec![], return_type));
    let mut diags = Diagnostics::new();
    let mut pool = veld::ConstantPool::new();
    let out = lower_method(catalog, store, &mut diags, &mut pool, method, params, body)
        .expect("lowering failed");
    (out, diags)
}

#[test]
fn exact_numeric_overload_wins_regardless_of_candidate_order() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();
    let owner = catalog
        .register_type(TypeDef::new("Math", TypeKind::Class).with_base(primitives::object()));
    let f_int = catalog.register_method(MethodDef::new(
        owner,
        "f",
        vec![ParamDef::new("x", primitives::int())],
        primitives::void(),
    ));
    let f_long = catalog.register_method(MethodDef::new(
        owner,
        "f",
        vec![ParamDef::new("x", primitives::long())],
        primitives::void(),
    ));

    let arg = b.int(&mut store, 7);
    let mut resolver = Resolver::new(&mut catalog, &mut store, owner);
    let first = resolver
        .resolve_method("f", Span::default(), &[f_int, f_long], &[arg.clone()], None)
        .unwrap();
    let second = resolver
        .resolve_method("f", Span::default(), &[f_long, f_int], &[arg], None)
        .unwrap();
    assert_eq!(first, f_int);
    assert_eq!(second, f_int);
}

#[test]
fn resolved_call_widens_its_argument_when_lowered() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();
    let owner = catalog
        .register_type(TypeDef::new("Math", TypeKind::Class).with_base(primitives::object()));
    let g = catalog.register_method(
        MethodDef::new(
            owner,
            "g",
            vec![ParamDef::new("x", primitives::long())],
            primitives::void(),
        )
        .with_flags(veld::MethodFlags::STATIC),
    );

    let arg = b.local(&mut store, LocalId(0), primitives::int());
    let mut resolver = Resolver::new(&mut catalog, &mut store, owner);
    let target = resolver
        .resolve_method("g", Span::default(), &[g], std::slice::from_ref(&arg), None)
        .unwrap();

    let call = b.expr(ExprKind::Call {
        receiver: None,
        name: "g".into(),
        args: vec![arg],
    });
    store.set_expr(
        call.id,
        ExprInfo::typed(primitives::void()).with_method(target),
    );
    let stmt = b.stmt(StmtKind::Expr(Some(call)));
    let body = b.stmt(StmtKind::Block(vec![stmt]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    out[0].chunk.assert_opcodes(&[
        OpCode::GetLocal,
        OpCode::I32toI64,
        OpCode::Call,
        OpCode::ReturnVoid,
    ]);
}

#[test]
fn comparison_against_zero_lowers_to_a_zero_test() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();

    // if (x > 0) y = 1;
    let x = b.local(&mut store, LocalId(0), primitives::int());
    let zero = b.int(&mut store, 0);
    let cmp = b.expr(ExprKind::Binary {
        op: BinaryOp::Gt,
        lhs: Box::new(x),
        rhs: Box::new(zero),
    });
    store.set_expr(cmp.id, ExprInfo::typed(primitives::bool_ty()));
    let one = b.int(&mut store, 1);
    let then_branch = b.assign_stmt(&mut store, LocalId(1), one);
    let the_if = b.stmt(StmtKind::If {
        cond: cmp,
        then_branch: Box::new(then_branch),
        else_branch: None,
    });
    let body = b.stmt(StmtKind::Block(vec![the_if]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0), LocalId(1)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    // x > 0 fails when x <= 0; no boolean ever materializes.
    out[0].chunk.assert_opcodes(&[
        OpCode::GetLocal,
        OpCode::JumpLeZero,
        OpCode::PushOne,
        OpCode::SetLocal,
        OpCode::ReturnVoid,
    ]);
}

#[test]
fn logical_and_short_circuits_in_branch_position() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();

    // if (a && c) x = 1;
    let a = b.local(&mut store, LocalId(0), primitives::bool_ty());
    let c = b.local(&mut store, LocalId(1), primitives::bool_ty());
    let and = b.expr(ExprKind::Logical {
        op: LogicalOp::And,
        lhs: Box::new(a),
        rhs: Box::new(c),
    });
    store.set_expr(and.id, ExprInfo::typed(primitives::bool_ty()));
    let one = b.int(&mut store, 1);
    let then_branch = b.assign_stmt(&mut store, LocalId(2), one);
    let the_if = b.stmt(StmtKind::If {
        cond: and,
        then_branch: Box::new(then_branch),
        else_branch: None,
    });
    let body = b.stmt(StmtKind::Block(vec![the_if]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0), LocalId(1), LocalId(2)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    let chunk = &out[0].chunk;
    chunk.assert_opcodes(&[
        OpCode::GetLocal,
        OpCode::JumpIfFalse,
        OpCode::GetLocal,
        OpCode::JumpIfFalse,
        OpCode::PushOne,
        OpCode::SetLocal,
        OpCode::ReturnVoid,
    ]);
    // Both failure branches land past the assignment.
    assert_eq!(chunk.read_u16(3), chunk.read_u16(8));
}

#[test]
fn constant_switch_selector_lowers_only_the_matching_section() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();

    let selector = b.int(&mut store, 2);
    let one = b.int(&mut store, 1);
    let dead = b.assign_stmt(&mut store, LocalId(0), one);
    let brk1 = b.stmt(StmtKind::Break);
    let two = b.int(&mut store, 2);
    let live = b.assign_stmt(&mut store, LocalId(0), two);
    let brk2 = b.stmt(StmtKind::Break);
    let sw = b.stmt(StmtKind::Switch {
        selector,
        sections: vec![
            SwitchSection {
                labels: vec![CaseLabel::Case(ConstValue::Int(1))],
                body: vec![dead, brk1],
                span: Span::new(1, 1, 1),
            },
            SwitchSection {
                labels: vec![CaseLabel::Case(ConstValue::Int(2))],
                body: vec![live, brk2],
                span: Span::new(2, 1, 1),
            },
        ],
    });
    let body = b.stmt(StmtKind::Block(vec![sw]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    // No selector load, no compare chain, no dead section.
    out[0].chunk.assert_opcodes(&[
        OpCode::Const,
        OpCode::SetLocal,
        OpCode::Jump,
        OpCode::ReturnVoid,
    ]);
}

#[test]
fn an_infinite_loop_satisfies_a_required_return() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();

    let cond = b.expr(ExprKind::Literal(ConstValue::Bool(true)));
    store.set_expr(
        cond.id,
        ExprInfo::constant(primitives::bool_ty(), ConstValue::Bool(true)),
    );
    let inner = b.stmt(StmtKind::Block(vec![]));
    let the_loop = b.stmt(StmtKind::While {
        cond,
        body: Box::new(inner),
    });
    let body = b.stmt(StmtKind::Block(vec![the_loop]));

    let (out, diags) = compile(&mut catalog, &mut store, &[], primitives::int(), &body);
    assert!(!diags.has_errors(), "{:?}", diags.errors());
    out[0].chunk.assert_opcodes(&[OpCode::Jump]);
}

#[test]
fn code_after_a_return_is_flagged_and_skipped() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();

    let ret = b.stmt(StmtKind::Return(None));
    let one = b.int(&mut store, 1);
    let dead = b.assign_stmt(&mut store, LocalId(0), one);
    let body = b.stmt(StmtKind::Block(vec![ret, dead]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    assert!(matches!(
        diags.warnings(),
        [Warning::UnreachableCode { .. }]
    ));
    // The dead assignment never emits.
    out[0]
        .chunk
        .assert_opcodes(&[OpCode::ReturnVoid, OpCode::ReturnVoid]);
}

#[test]
fn private_field_reads_share_one_synthesized_accessor() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();
    let vault = catalog
        .register_type(TypeDef::new("Vault", TypeKind::Class).with_base(primitives::object()));
    let hidden = catalog.register_field(
        veld::FieldDef::new(vault, "total", primitives::int())
            .with_visibility(Visibility::Private),
    );

    let read_stmt = |b: &mut Builder, store: &mut AnnotationStore| {
        let obj = b.local(store, LocalId(0), vault);
        let get = b.expr(ExprKind::Field {
            object: Some(Box::new(obj)),
            name: "total".into(),
        });
        store.set_expr(
            get.id,
            ExprInfo::typed(primitives::int()).with_field(hidden),
        );
        b.stmt(StmtKind::Expr(Some(get)))
    };
    let first = read_stmt(&mut b, &mut store);
    let second = read_stmt(&mut b, &mut store);
    let body = b.stmt(StmtKind::Block(vec![first, second]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    // Main body plus exactly one accessor, shared by both reads.
    assert_eq!(out.len(), 2);
    out[0].chunk.assert_opcodes(&[
        OpCode::GetLocal,
        OpCode::Call,
        OpCode::Pop,
        OpCode::GetLocal,
        OpCode::Call,
        OpCode::Pop,
        OpCode::ReturnVoid,
    ]);
    out[1]
        .chunk
        .assert_opcodes(&[OpCode::GetLocal, OpCode::GetField, OpCode::Return]);
}

#[test]
fn string_addition_folds_into_one_builder_sequence() {
    let mut catalog = Catalog::with_builtins();
    let mut store = AnnotationStore::new();
    let mut b = Builder::new();
    let s = primitives::string();

    // v2 = a + n + c;
    let a = b.local(&mut store, LocalId(0), s);
    let n = b.local(&mut store, LocalId(1), primitives::int());
    let c = b.local(&mut store, LocalId(2), s);
    let inner = b.expr(ExprKind::Binary {
        op: BinaryOp::Add,
        lhs: Box::new(a),
        rhs: Box::new(n),
    });
    store.set_expr(inner.id, ExprInfo::typed(s));
    let outer = b.expr(ExprKind::Binary {
        op: BinaryOp::Add,
        lhs: Box::new(inner),
        rhs: Box::new(c),
    });
    store.set_expr(outer.id, ExprInfo::typed(s));
    let target = b.local(&mut store, LocalId(3), s);
    let assign = b.expr(ExprKind::Assign {
        target: Box::new(target),
        value: Box::new(outer),
    });
    store.set_expr(assign.id, ExprInfo::typed(s));
    let stmt = b.stmt(StmtKind::Expr(Some(assign)));
    let body = b.stmt(StmtKind::Block(vec![stmt]));

    let (out, diags) = compile(
        &mut catalog,
        &mut store,
        &[LocalId(0), LocalId(1), LocalId(2), LocalId(3)],
        primitives::void(),
        &body,
    );
    assert!(!diags.has_errors());
    out[0].chunk.assert_opcodes(&[
        OpCode::ConcatBegin,
        OpCode::GetLocal,
        OpCode::ConcatAppend,
        OpCode::GetLocal,
        OpCode::ConcatAppend,
        OpCode::GetLocal,
        OpCode::ConcatAppend,
        OpCode::ConcatFinish,
        OpCode::SetLocal,
        OpCode::ReturnVoid,
    ]);
}
