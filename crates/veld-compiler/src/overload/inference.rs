//! Generic type inference for one candidate method.
//!
//! Two phases: bound collection over the fixed arguments (plus an
//! optional expected-return bound), then an explicit fixpoint loop that
//! fixes type variables in dependency order. A candidate whose variables
//! cannot all be fixed is silently dropped; inference never reports
//! diagnostics of its own.

use rustc_hash::FxHashMap;

use veld_catalog::{Catalog, primitives};
use veld_core::{CompileError, Expr, ExprKind, MethodDef, MethodId, TypeId, TypeKind};

use crate::annotations::AnnotationStore;

/// One unresolved generic parameter of the candidate under inference.
#[derive(Debug)]
struct TypeVar {
    placeholder: TypeId,
    /// Candidate inferred types, accumulated without conversion-based
    /// deduplication at insertion time.
    bounds: Vec<TypeId>,
    /// Indices of variables whose fixation this one waits on.
    deps: Vec<usize>,
    fixed: Option<TypeId>,
}

/// An invocable-shaped argument whose bounds may only become derivable
/// once other variables fix ("phase 2b").
#[derive(Debug)]
struct PendingShape {
    arg: usize,
    param: TypeId,
    /// Already revisited; a shape contributes at most once more.
    spent: bool,
}

/// Infer type arguments for an open generic `def` against `args`,
/// returning the instantiated method or `None` if the candidate fails.
pub(crate) fn infer_candidate(
    catalog: &mut Catalog,
    store: &AnnotationStore,
    def: &MethodDef,
    args: &[Expr],
    expected_return: Option<TypeId>,
) -> Result<Option<MethodId>, CompileError> {
    let placeholders = catalog.placeholders_of(def);
    let mut vars: Vec<TypeVar> = placeholders
        .iter()
        .map(|&placeholder| TypeVar {
            placeholder,
            bounds: Vec::new(),
            deps: Vec::new(),
            fixed: None,
        })
        .collect();
    if vars.is_empty() {
        return Ok(None);
    }

    // Positional pairing; vararg reshaping happens after instantiation,
    // during the closed applicability check.
    if args.len() != def.params.len() {
        return Ok(None);
    }

    let mut pending: Vec<PendingShape> = Vec::new();

    // ---- Phase 1: bound collection --------------------------------------
    for (i, (arg, param)) in args.iter().zip(&def.params).enumerate() {
        if !catalog.is_open(param.ty) {
            continue;
        }
        if arg.is_invocable_shape() {
            collect_shape_bounds(catalog, store, arg, param.ty, &mut vars)?;
            add_shape_dependencies(catalog, param.ty, &mut vars);
            pending.push(PendingShape {
                arg: i,
                param: param.ty,
                spent: false,
            });
        } else if let Some(info) = store.expr(arg.id) {
            collect_bound(catalog, info.ty, param.ty, &mut vars);
        } else if !arg.is_null_literal() {
            return Err(CompileError::internal(
                "untyped argument reached generic inference",
            ));
        }
    }
    if let Some(expected) = expected_return
        && catalog.is_open(def.return_type)
    {
        collect_bound(catalog, expected, def.return_type, &mut vars);
    }

    // ---- Phase 2: fixation fixpoint --------------------------------------
    loop {
        let mut progressed = false;
        for i in 0..vars.len() {
            if vars[i].fixed.is_some() {
                continue;
            }
            let blocked = vars[i].deps.iter().any(|&d| vars[d].fixed.is_none());
            if blocked {
                continue;
            }
            match fix_variable(catalog, &vars[i].bounds) {
                Fixation::Fixed(ty) => {
                    vars[i].fixed = Some(ty);
                    progressed = true;
                }
                Fixation::NoUniqueBound => return Ok(None),
            }
        }

        if vars.iter().all(|v| v.fixed.is_some()) {
            break;
        }
        if progressed {
            continue;
        }

        // Stuck: force-fix a variable that other unfixed variables wait
        // on, provided it has bounds of its own.
        let forced = (0..vars.len()).find(|&i| {
            vars[i].fixed.is_none()
                && !vars[i].bounds.is_empty()
                && vars
                    .iter()
                    .any(|v| v.fixed.is_none() && v.deps.contains(&i))
        });
        if let Some(i) = forced {
            match fix_variable(catalog, &vars[i].bounds) {
                Fixation::Fixed(ty) => {
                    vars[i].fixed = Some(ty);
                    continue;
                }
                Fixation::NoUniqueBound => return Ok(None),
            }
        }

        // Phase 2b: revisit invocable arguments whose shape has since
        // closed; newly derived bounds feed back into collection.
        if revisit_pending_shapes(catalog, store, args, &mut pending, &mut vars)? {
            continue;
        }
        return Ok(None);
    }

    let fixed: Vec<TypeId> = vars
        .iter()
        .map(|v| {
            v.fixed
                .ok_or_else(|| CompileError::internal("unfixed variable escaped fixation"))
        })
        .collect::<Result<_, _>>()?;
    catalog.instantiate_method(def.id, &fixed).map(Some)
}

enum Fixation {
    Fixed(TypeId),
    NoUniqueBound,
}

/// Pick the most specific bound: the unique type every other bound
/// implicitly converts to. An empty bound set fixes to the object root.
fn fix_variable(catalog: &Catalog, bounds: &[TypeId]) -> Fixation {
    if bounds.is_empty() {
        return Fixation::Fixed(primitives::object());
    }
    let mut unique: Vec<TypeId> = Vec::new();
    for &b in bounds {
        if !unique.contains(&b) {
            unique.push(b);
        }
    }
    let mut survivors = unique.iter().copied().filter(|&t| {
        unique
            .iter()
            .all(|&other| catalog.has_implicit_conversion(other, t))
    });
    match (survivors.next(), survivors.next()) {
        (Some(t), None) => Fixation::Fixed(t),
        _ => Fixation::NoUniqueBound,
    }
}

/// Record lower-bound inferences by structurally matching a concrete
/// `source` against an `open` parameter type.
fn collect_bound(catalog: &Catalog, source: TypeId, open: TypeId, vars: &mut [TypeVar]) {
    if let Some(i) = var_index(vars, open) {
        vars[i].bounds.push(source);
        return;
    }
    let (Some(open_def), Some(_)) = (catalog.get_type(open), catalog.get_type(source)) else {
        return;
    };
    if open_def.kind == TypeKind::Array {
        if let (Some(open_elem), Some(src_elem)) = (
            open_def.element,
            catalog.get_type(source).and_then(|d| d.element),
        ) {
            collect_bound(catalog, src_elem, open_elem, vars);
        }
        return;
    }
    if let Some(open_source) = open_def.generic_source {
        let open_args = open_def.generic_args.clone();
        if let Some(src_args) = instance_args_of(catalog, source, open_source) {
            for (s, o) in src_args.iter().zip(&open_args) {
                collect_bound(catalog, *s, *o, vars);
            }
        }
    }
}

/// The generic arguments `ty` (or one of its bases/interfaces) supplies
/// to the open declaration `generic_source`.
fn instance_args_of(catalog: &Catalog, ty: TypeId, generic_source: TypeId) -> Option<Vec<TypeId>> {
    let def = catalog.get_type(ty)?;
    if def.generic_source == Some(generic_source) {
        return Some(def.generic_args.clone());
    }
    for &iface in &def.interfaces {
        if let Some(found) = instance_args_of(catalog, iface, generic_source) {
            return Some(found);
        }
    }
    def.base
        .and_then(|base| instance_args_of(catalog, base, generic_source))
}

/// Bounds a lambda or method group contributes from its explicit types
/// against the candidate's declared invocable shape.
fn collect_shape_bounds(
    catalog: &Catalog,
    store: &AnnotationStore,
    arg: &Expr,
    param: TypeId,
    vars: &mut [TypeVar],
) -> Result<(), CompileError> {
    let Some(shape) = catalog.single_invokable(param) else {
        return Ok(());
    };
    let shape_params: Vec<TypeId> = shape.params.iter().map(|p| p.ty).collect();
    let shape_return = shape.return_type;

    if let ExprKind::Lambda { params, body } = &arg.kind {
        for (lp, &sp) in params.iter().zip(&shape_params) {
            if let Some(explicit) = lp.ty {
                collect_bound(catalog, explicit, sp, vars);
            }
        }
        if let Some(body_info) = store.expr(body.id) {
            collect_bound(catalog, body_info.ty, shape_return, vars);
        }
    }
    Ok(())
}

/// Variables free in an invocable shape's return type depend on the
/// variables free in its parameter types: the return bound only becomes
/// derivable once the inputs are known.
fn add_shape_dependencies(catalog: &Catalog, param: TypeId, vars: &mut [TypeVar]) {
    let Some(shape) = catalog.single_invokable(param) else {
        return;
    };
    let mut input_vars = Vec::new();
    for p in &shape.params {
        free_vars(catalog, p.ty, vars, &mut input_vars);
    }
    let mut output_vars = Vec::new();
    let return_type = shape.return_type;
    free_vars(catalog, return_type, vars, &mut output_vars);
    for &out in &output_vars {
        for &inp in &input_vars {
            if out != inp && !vars[out].deps.contains(&inp) {
                vars[out].deps.push(inp);
            }
        }
    }
}

fn free_vars(catalog: &Catalog, ty: TypeId, vars: &[TypeVar], out: &mut Vec<usize>) {
    if let Some(i) = var_index(vars, ty) {
        if !out.contains(&i) {
            out.push(i);
        }
        return;
    }
    let Some(def) = catalog.get_type(ty) else {
        return;
    };
    if let Some(element) = def.element {
        free_vars(catalog, element, vars, out);
    }
    for &a in &def.generic_args {
        free_vars(catalog, a, vars, out);
    }
}

fn var_index(vars: &[TypeVar], ty: TypeId) -> Option<usize> {
    vars.iter().position(|v| v.placeholder == ty)
}

/// Phase 2b: substitute the fixed variables into each pending shape; a
/// shape whose inputs have closed contributes its return-type bound.
fn revisit_pending_shapes(
    catalog: &mut Catalog,
    store: &AnnotationStore,
    args: &[Expr],
    pending: &mut [PendingShape],
    vars: &mut [TypeVar],
) -> Result<bool, CompileError> {
    let mut map = FxHashMap::default();
    for v in vars.iter() {
        if let Some(fixed) = v.fixed {
            map.insert(v.placeholder, fixed);
        }
    }
    let mut produced = false;
    for shape in pending.iter_mut() {
        if shape.spent {
            continue;
        }
        let substituted = catalog.substitute(shape.param, &map)?;
        let inputs_closed = catalog
            .single_invokable(substituted)
            .is_some_and(|m| m.params.iter().all(|p| !catalog.is_open(p.ty)));
        if !inputs_closed {
            continue;
        }
        shape.spent = true;
        let before: usize = vars.iter().map(|v| v.bounds.len()).sum();
        collect_shape_bounds(catalog, store, &args[shape.arg], shape.param, vars)?;
        let after: usize = vars.iter().map(|v| v.bounds.len()).sum();
        if after > before {
            produced = true;
        }
    }
    Ok(produced)
}
