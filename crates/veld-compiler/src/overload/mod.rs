//! Overload resolution.
//!
//! `resolve_method` filters a candidate set down to the applicable
//! members, runs generic inference on the open ones, and picks the
//! unique best match by the better-function-member comparison. The two
//! externally visible failures are "no eligible overload" and
//! "ambiguous call"; every intermediate inference failure just drops
//! that candidate.

mod delegate;
mod inference;

pub(crate) use delegate::{DelegateMatch, match_delegate};

use veld_catalog::Catalog;
use veld_core::{CompileError, Expr, MethodDef, MethodId, Span, TypeId};

use crate::annotations::{AnnotationStore, ExprInfo};

/// One surviving candidate: the (possibly instantiated) method plus the
/// per-position deduced parameter types, which can differ in shape from
/// the declared signature after vararg expansion.
#[derive(Debug)]
struct Candidate {
    method: MethodId,
    declaring: TypeId,
    param_types: Vec<TypeId>,
    /// Vararg parameter consumed as individual trailing arguments.
    expanded: bool,
    generic_source: Option<MethodId>,
    declared_params: usize,
    synthetic: bool,
    extension: bool,
    varargs: bool,
}

/// Per-position preference between two candidates' parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preference {
    First,
    Second,
    Neither,
}

/// Resolves call sites against candidate method sets.
pub struct Resolver<'a> {
    catalog: &'a mut Catalog,
    store: &'a mut AnnotationStore,
    /// Type whose member body is being resolved; scopes receiverless
    /// method-group lookup.
    context: TypeId,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a mut Catalog, store: &'a mut AnnotationStore, context: TypeId) -> Self {
        Self {
            catalog,
            store,
            context,
        }
    }

    /// Resolve a call site to the unique best-applicable method.
    ///
    /// `expected_return` feeds return-type-directed inference only; it
    /// never filters candidates. On success, unresolved lambda and
    /// method-group arguments are committed to their parameter types.
    pub fn resolve_method(
        &mut self,
        name: &str,
        span: Span,
        candidates: &[MethodId],
        args: &[Expr],
        expected_return: Option<TypeId>,
    ) -> Result<MethodId, CompileError> {
        let mut applicable: Vec<Candidate> = Vec::new();
        for &id in candidates {
            let def = self.catalog.expect_method(id)?.clone();
            let def = if def.is_open_generic() {
                match inference::infer_candidate(
                    self.catalog,
                    self.store,
                    &def,
                    args,
                    expected_return,
                )? {
                    Some(instance) => self.catalog.expect_method(instance)?.clone(),
                    None => continue,
                }
            } else {
                def
            };
            if let Some((param_types, expanded)) = self.deduce_params(&def, args)? {
                applicable.push(Candidate {
                    method: def.id,
                    declaring: def.declaring,
                    param_types,
                    expanded,
                    generic_source: def.generic_source,
                    declared_params: def.fixed_arity(),
                    synthetic: def.is_synthetic(),
                    extension: def.is_extension(),
                    varargs: def.is_varargs(),
                });
            }
        }

        if applicable.is_empty() {
            return Err(CompileError::NoMatchingOverload {
                name: name.to_string(),
                span,
            });
        }

        // Extension-style candidates skip declaring-type preference.
        if applicable.iter().all(|c| !c.extension) {
            self.retain_most_derived(&mut applicable);
        }

        let winner = if applicable.len() == 1 {
            0
        } else {
            match self.pick_best(&applicable, args)? {
                Some(i) => i,
                None => {
                    return Err(CompileError::AmbiguousOverload {
                        name: name.to_string(),
                        span,
                    });
                }
            }
        };

        let chosen = applicable.swap_remove(winner);
        self.commit_invocable_args(&chosen, args)?;
        Ok(chosen.method)
    }

    /// Resolve a lone lambda/method group against a known target shape,
    /// reporting ambiguity through the returned error.
    pub fn resolve_delegate(
        &mut self,
        target: TypeId,
        expr: &Expr,
        name: &str,
    ) -> Result<Option<MethodId>, CompileError> {
        match match_delegate(self.catalog, self.store, self.context, target, expr)? {
            DelegateMatch::One(m) => Ok(Some(m)),
            DelegateMatch::None => Ok(None),
            DelegateMatch::Ambiguous => Err(CompileError::AmbiguousMember {
                name: name.to_string(),
                span: expr.span,
            }),
        }
    }

    // =========================================================================
    // Applicability
    // =========================================================================

    /// Per-argument parameter types for a closed candidate, or `None`
    /// if it is not applicable to these arguments.
    fn deduce_params(
        &self,
        def: &MethodDef,
        args: &[Expr],
    ) -> Result<Option<(Vec<TypeId>, bool)>, CompileError> {
        if !def.is_varargs() {
            if def.params.len() != args.len() {
                return Ok(None);
            }
            let mut types = Vec::with_capacity(args.len());
            for (arg, param) in args.iter().zip(&def.params) {
                if !self.arg_compatible(arg, param.ty)? {
                    return Ok(None);
                }
                types.push(param.ty);
            }
            return Ok(Some((types, false)));
        }

        let fixed = def.params.len() - 1;
        if args.len() < fixed {
            return Ok(None);
        }
        let mut types = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().take(fixed).zip(&def.params) {
            if !self.arg_compatible(arg, param.ty)? {
                return Ok(None);
            }
            types.push(param.ty);
        }

        let array_ty = def.params[fixed].ty;
        let element = self
            .catalog
            .expect_type(array_ty)?
            .element
            .ok_or_else(|| CompileError::internal("vararg parameter is not an array type"))?;
        let trailing = &args[fixed..];

        // A single trailing argument already satisfying the array
        // parameter prefers the unexpanded form outright.
        if trailing.len() == 1
            && !trailing[0].is_invocable_shape()
            && !trailing[0].is_null_literal()
            && let Some(info) = self.store.expr(trailing[0].id)
            && self.catalog.has_implicit_conversion(info.ty, array_ty)
        {
            types.push(array_ty);
            return Ok(Some((types, false)));
        }

        for arg in trailing {
            if !self.arg_compatible(arg, element)? {
                return Ok(None);
            }
            types.push(element);
        }
        Ok(Some((types, true)))
    }

    /// Whether one argument is compatible with one parameter type.
    fn arg_compatible(&self, arg: &Expr, param: TypeId) -> Result<bool, CompileError> {
        if arg.is_null_literal() {
            let kind = self.catalog.kind_of(param)?;
            return Ok(kind.is_reference());
        }
        if arg.is_invocable_shape() {
            // Speculative: failure stays silent, ambiguity rejects too.
            return Ok(matches!(
                match_delegate(self.catalog, self.store, self.context, param, arg)?,
                DelegateMatch::One(_)
            ));
        }
        let info = self
            .store
            .expr(arg.id)
            .ok_or_else(|| CompileError::internal("argument reached resolution untyped"))?;
        Ok(self.catalog.has_implicit_conversion(info.ty, param))
    }

    // =========================================================================
    // Tie-breaking
    // =========================================================================

    /// Drop candidates whose declaring type is a strict ancestor of
    /// another candidate's declaring type.
    fn retain_most_derived(&self, applicable: &mut Vec<Candidate>) {
        let declarings: Vec<TypeId> = applicable.iter().map(|c| c.declaring).collect();
        applicable.retain(|c| {
            !declarings.iter().any(|&other| {
                other != c.declaring && self.catalog.is_same_or_derived(other, c.declaring)
            })
        });
    }

    /// The candidate that beats every other, if one exists.
    fn pick_best(
        &self,
        applicable: &[Candidate],
        args: &[Expr],
    ) -> Result<Option<usize>, CompileError> {
        for i in 0..applicable.len() {
            let mut beats_all = true;
            for j in 0..applicable.len() {
                if i != j && !self.beats(&applicable[i], &applicable[j], args)? {
                    beats_all = false;
                    break;
                }
            }
            if beats_all {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Better-function-member comparison between two applicable
    /// candidates: never worse at any position, strictly better at one,
    /// with the declared tiebreakers on a full positional tie.
    fn beats(&self, a: &Candidate, b: &Candidate, args: &[Expr]) -> Result<bool, CompileError> {
        let mut better = false;
        let mut worse = false;
        for (i, arg) in args.iter().enumerate() {
            let arg_ty = if arg.is_null_literal() || arg.is_invocable_shape() {
                None
            } else {
                self.store.expr(arg.id).map(|info| info.ty)
            };
            match self.better_target(arg_ty, a.param_types[i], b.param_types[i]) {
                Preference::First => better = true,
                Preference::Second => worse = true,
                Preference::Neither => {}
            }
        }
        if worse {
            return Ok(false);
        }
        if better {
            return Ok(true);
        }

        // Full positional tie.
        if a.generic_source.is_none() && b.generic_source.is_some() {
            return Ok(true);
        }
        if a.expanded && b.expanded && a.declared_params < b.declared_params {
            return Ok(true);
        }
        if !a.varargs && b.varargs && b.expanded {
            return Ok(true);
        }
        if let (Some(src_a), Some(src_b)) = (a.generic_source, b.generic_source)
            && src_a == src_b
        {
            let mut more = false;
            let mut less = false;
            for (&pa, &pb) in a.param_types.iter().zip(&b.param_types) {
                if pa != pb {
                    if self.catalog.has_implicit_conversion(pa, pb) {
                        more = true;
                    } else if self.catalog.has_implicit_conversion(pb, pa) {
                        less = true;
                    }
                }
            }
            if more && !less {
                return Ok(true);
            }
        }
        if !a.synthetic && b.synthetic {
            return Ok(true);
        }
        Ok(false)
    }

    /// Which of two parameter types is the better conversion target for
    /// an argument of the given static type. Exact match wins outright;
    /// otherwise the narrower of two mutually related types wins;
    /// unrelated types contribute no preference.
    fn better_target(&self, arg_ty: Option<TypeId>, pa: TypeId, pb: TypeId) -> Preference {
        if pa == pb {
            return Preference::Neither;
        }
        if let Some(t) = arg_ty {
            if t == pa {
                return Preference::First;
            }
            if t == pb {
                return Preference::Second;
            }
        }
        let a_to_b = self.catalog.has_implicit_conversion(pa, pb);
        let b_to_a = self.catalog.has_implicit_conversion(pb, pa);
        match (a_to_b, b_to_a) {
            (true, false) => Preference::First,
            (false, true) => Preference::Second,
            _ => Preference::Neither,
        }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Bind lambda and method-group arguments to the winner's parameter
    /// types; this is the point where a probed shape becomes permanent.
    fn commit_invocable_args(
        &mut self,
        chosen: &Candidate,
        args: &[Expr],
    ) -> Result<(), CompileError> {
        for (arg, &param) in args.iter().zip(&chosen.param_types) {
            if !arg.is_invocable_shape() {
                continue;
            }
            match match_delegate(self.catalog, self.store, self.context, param, arg)? {
                DelegateMatch::One(target) => {
                    self.store
                        .set_expr(arg.id, ExprInfo::typed(param).with_method(target));
                }
                _ => {
                    return Err(CompileError::internal(
                        "committed argument no longer matches its shape",
                    ));
                }
            }
        }
        Ok(())
    }
}
