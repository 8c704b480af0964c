//! Delegate-shape resolution for method groups and lambdas.

use veld_catalog::Catalog;
use veld_core::{CompileError, Expr, ExprKind, MethodId, TypeId};

use crate::annotations::AnnotationStore;

/// Outcome of matching an invocable expression against a target shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelegateMatch {
    None,
    One(MethodId),
    /// More than one equally valid member; an error when diagnosing, a
    /// silent failure when probing.
    Ambiguous,
}

/// Match an unresolved lambda or method group against the single
/// invokable shape of `target`.
///
/// Never reports diagnostics; callers map [`DelegateMatch::Ambiguous`]
/// to an error or swallow it depending on whether they are probing.
pub(crate) fn match_delegate(
    catalog: &Catalog,
    store: &AnnotationStore,
    context: TypeId,
    target: TypeId,
    expr: &Expr,
) -> Result<DelegateMatch, CompileError> {
    let Some(shape) = catalog.single_invokable(target) else {
        return Ok(DelegateMatch::None);
    };
    let shape_params: Vec<TypeId> = shape.params.iter().map(|p| p.ty).collect();
    let shape_varargs = shape.is_varargs();
    let shape_id = shape.id;

    match &expr.kind {
        ExprKind::Lambda { params, .. } => {
            // A lambda matches on arity alone; its parameter types come
            // from the shape when the binding commits.
            if params.len() == shape_params.len() {
                Ok(DelegateMatch::One(shape_id))
            } else {
                Ok(DelegateMatch::None)
            }
        }
        ExprKind::MethodGroup { receiver, name } => {
            let owner = match receiver {
                Some(r) => {
                    let info = store.expr(r.id).ok_or_else(|| {
                        CompileError::internal("method group receiver has no resolved type")
                    })?;
                    info.ty
                }
                None => context,
            };
            let mut matches: Vec<MethodId> = Vec::new();
            for m in catalog.methods_named(owner, name) {
                let def = catalog
                    .get_method(m)
                    .ok_or_else(|| CompileError::internal("member index names unknown method"))?;
                let param_types: Vec<TypeId> = def.params.iter().map(|p| p.ty).collect();
                if param_types == shape_params && def.is_varargs() == shape_varargs {
                    matches.push(m);
                }
            }
            match matches.as_slice() {
                [] => Ok(DelegateMatch::None),
                [only] => Ok(DelegateMatch::One(*only)),
                _ => Ok(DelegateMatch::Ambiguous),
            }
        }
        _ => Ok(DelegateMatch::None),
    }
}
