//! Reachability and definite-assignment checking.
//!
//! One pre-order walk over a method body does three jobs at once:
//! resolve every jump statement against the lexical scope chain, decide
//! for each reachable statement whether control can flow off its end,
//! and track local-variable reads and writes conservatively. A second
//! walk ([`report_unreachable`]) turns the absence of recorded info into
//! dead-code warnings.
//!
//! Reachability is deliberately syntactic: a condition counts as decided
//! only when constant folding annotated it with a boolean value. Dead
//! branches of a constant `if` are still visited as if reachable so that
//! jumps inside them resolve and lowering can emit them; only their
//! contribution to the parent's end point is discarded. A `while (false)`
//! body, by contrast, is never visited at all and gets flagged by the
//! second walk.

mod scope;
mod unreachable;

pub use scope::{CaseEntry, ScopeKind, StatementScope};
pub use unreachable::report_unreachable;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use veld_core::{
    CaseKey, CaseLabel, CompileError, Diagnostics, Expr, ExprKind, LocalId, NodeId, Span, Stmt,
    StmtKind, Warning,
};

use crate::annotations::{AnnotationStore, StmtInfo};

/// Read/write bookkeeping for one tracked local.
#[derive(Debug)]
struct VarUse {
    name: String,
    decl_span: Span,
    reads: u32,
    first_read: Option<Span>,
}

/// Check one method body. Records [`StmtInfo`] for every reachable
/// statement, reports jump-resolution errors and flow warnings, and
/// finishes with the unreachable-code walk.
pub fn check_function(
    store: &mut AnnotationStore,
    diags: &mut Diagnostics,
    body: &Stmt,
    returns_value: bool,
) {
    let mut checker = Checker {
        store,
        diags,
        unassigned: FxHashMap::default(),
        unread: FxHashMap::default(),
        yield_count: 0,
    };
    let end = checker.visit(body, None, true);
    // Iterator bodies produce values through yield, not return.
    if returns_value && end && checker.yield_count == 0 {
        checker
            .diags
            .report_error(CompileError::MissingReturn { span: body.span });
    }
    let yields = checker.yield_count;
    checker.flush_locals();
    if let Some(info) = store.stmt_mut(body.id) {
        info.yield_count = yields;
    }
    report_unreachable(store, diags, body);
}

struct Checker<'a> {
    store: &'a mut AnnotationStore,
    diags: &'a mut Diagnostics,
    /// Declared without an initializer, not yet written.
    unassigned: FxHashMap<LocalId, VarUse>,
    /// Written, not yet read.
    unread: FxHashMap<LocalId, VarUse>,
    yield_count: u32,
}

impl Checker<'_> {
    /// Visit one statement; returns whether its end point is reachable.
    ///
    /// `reachable` false means the statement follows a completed jump: it
    /// is still walked for jump resolution and variable tracking, but no
    /// info is recorded, which is what the second pass keys off.
    fn visit(&mut self, stmt: &Stmt, scope: Option<&Rc<StatementScope>>, reachable: bool) -> bool {
        let end = match &stmt.kind {
            StmtKind::Expr(expr) => {
                if let Some(e) = expr {
                    self.track_expr(e);
                }
                true
            }

            StmtKind::LocalDecl {
                local, name, init, ..
            } => {
                if let Some(e) = init {
                    self.track_expr(e);
                }
                let usage = VarUse {
                    name: name.clone(),
                    decl_span: stmt.span,
                    reads: 0,
                    first_read: None,
                };
                if init.is_some() {
                    self.unread.insert(*local, usage);
                } else {
                    self.unassigned.insert(*local, usage);
                }
                true
            }

            StmtKind::Block(stmts) => {
                // Labels declared by immediate children are in scope for
                // the whole block, so forward gotos resolve.
                let mut table = FxHashMap::default();
                for s in stmts {
                    if let StmtKind::Labeled { label, .. } = &s.kind {
                        table.insert(label.clone(), s.id);
                    }
                }
                let labels_scope;
                let scope = if table.is_empty() {
                    scope
                } else {
                    labels_scope =
                        StatementScope::push(scope, stmt.id, ScopeKind::Labels { table });
                    Some(&labels_scope)
                };
                let mut cur = reachable;
                for s in stmts {
                    // A jump into the block resumes reachability at its
                    // target even after a completed jump above it.
                    let live = cur || self.is_targeted(s.id);
                    let end = self.visit(s, scope, live);
                    cur = live && end;
                }
                cur
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.track_expr(cond);
                match self.const_bool(cond) {
                    Some(true) => {
                        let t = self.visit(then_branch, scope, reachable);
                        // Dead branch: visited and recorded so its jumps
                        // resolve, but its end point is discarded.
                        if let Some(e) = else_branch {
                            self.visit(e, scope, reachable);
                        }
                        t
                    }
                    Some(false) => {
                        self.visit(then_branch, scope, reachable);
                        match else_branch {
                            Some(e) => self.visit(e, scope, reachable),
                            None => true,
                        }
                    }
                    None => {
                        let t = self.visit(then_branch, scope, reachable);
                        let e = match else_branch {
                            Some(e) => self.visit(e, scope, reachable),
                            None => true,
                        };
                        t || e
                    }
                }
            }

            StmtKind::While { cond, body } => {
                self.track_expr(cond);
                match self.const_bool(cond) {
                    // Never entered; the body is left unvisited and the
                    // second pass flags it.
                    Some(false) => true,
                    Some(true) => {
                        let inner = StatementScope::push(scope, stmt.id, ScopeKind::Loop);
                        self.visit(body, Some(&inner), reachable);
                        self.is_targeted(stmt.id)
                    }
                    None => {
                        let inner = StatementScope::push(scope, stmt.id, ScopeKind::Loop);
                        self.visit(body, Some(&inner), reachable);
                        // Zero iterations are possible.
                        true
                    }
                }
            }

            StmtKind::DoWhile { body, cond } => {
                let inner = StatementScope::push(scope, stmt.id, ScopeKind::Loop);
                let b = self.visit(body, Some(&inner), reachable);
                self.track_expr(cond);
                match self.const_bool(cond) {
                    Some(true) => self.is_targeted(stmt.id),
                    _ => b || self.is_targeted(stmt.id),
                }
            }

            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(i) = init {
                    self.visit(i, scope, reachable);
                }
                if let Some(c) = cond {
                    self.track_expr(c);
                }
                if let Some(u) = update {
                    self.track_expr(u);
                }
                let decided = match cond {
                    None => Some(true),
                    Some(c) => self.const_bool(c),
                };
                match decided {
                    Some(false) => true,
                    Some(true) => {
                        let inner = StatementScope::push(scope, stmt.id, ScopeKind::Loop);
                        self.visit(body, Some(&inner), reachable);
                        self.is_targeted(stmt.id)
                    }
                    None => {
                        let inner = StatementScope::push(scope, stmt.id, ScopeKind::Loop);
                        self.visit(body, Some(&inner), reachable);
                        true
                    }
                }
            }

            StmtKind::Switch { selector, sections } => {
                self.track_expr(selector);
                return self.visit_switch(stmt, selector, sections, scope, reachable);
            }

            StmtKind::Break => {
                match scope.and_then(|s| s.break_target()) {
                    Some(target) => {
                        if reachable {
                            self.record_jump(stmt.id, Some(target));
                            self.store.mark_targeted(target);
                        }
                    }
                    None => self
                        .diags
                        .report_error(CompileError::BreakOutsideLoop { span: stmt.span }),
                }
                false
            }

            StmtKind::Continue => {
                match scope.and_then(|s| s.continue_target()) {
                    Some(target) => {
                        // Continue jumps to the loop head, not past its
                        // end, so the loop is not marked targeted.
                        if reachable {
                            self.record_jump(stmt.id, Some(target));
                        }
                    }
                    None => self
                        .diags
                        .report_error(CompileError::ContinueOutsideLoop { span: stmt.span }),
                }
                false
            }

            StmtKind::Labeled { body, .. } => self.visit(body, scope, reachable),

            StmtKind::Goto { label } => {
                match scope.and_then(|s| s.find_label(label)) {
                    Some(target) => {
                        if reachable {
                            self.record_jump(stmt.id, Some(target));
                            self.store.mark_targeted(target);
                        }
                    }
                    None => self.diags.report_error(CompileError::UnresolvedLabel {
                        label: label.clone(),
                        span: stmt.span,
                    }),
                }
                false
            }

            StmtKind::GotoCase { value } => {
                self.resolve_goto_case(stmt, value.as_ref(), scope, reachable);
                false
            }

            StmtKind::Return(expr) => {
                if let Some(e) = expr {
                    self.track_expr(e);
                }
                false
            }

            StmtKind::Throw(expr) => {
                self.track_expr(expr);
                false
            }

            StmtKind::Try {
                body,
                catch,
                finally,
            } => {
                let inner = StatementScope::push(scope, stmt.id, ScopeKind::Try);
                let b = self.visit(body, Some(&inner), reachable);
                // A handler is entered whenever the protected region
                // faults, so it is as reachable as the try itself.
                let after_handlers = match catch {
                    Some(c) => b || self.visit(c, scope, reachable),
                    None => b,
                };
                let f = match finally {
                    Some(f) => self.visit(f, scope, reachable),
                    None => true,
                };
                after_handlers && f
            }

            StmtKind::Using { resource, body, .. } => {
                self.track_expr(resource);
                let inner = StatementScope::push(scope, stmt.id, ScopeKind::Using);
                self.visit(body, Some(&inner), reachable)
            }

            StmtKind::Yield(expr) => {
                self.track_expr(expr);
                self.yield_count += 1;
                true
            }
        };

        if reachable {
            self.record(stmt.id, end);
        }
        end
    }

    fn visit_switch(
        &mut self,
        stmt: &Stmt,
        selector: &Expr,
        sections: &[veld_core::SwitchSection],
        scope: Option<&Rc<StatementScope>>,
        reachable: bool,
    ) -> bool {
        // Duplicate detection and the case table happen up front, before
        // any body is visited, so `goto case` resolves forward.
        let mut seen: FxHashMap<CaseKey, Span> = FxHashMap::default();
        let mut entries: Vec<CaseEntry> = Vec::new();
        let mut has_default = false;
        for (idx, section) in sections.iter().enumerate() {
            let target = cascade_target(sections, idx);
            for label in &section.labels {
                match label {
                    CaseLabel::Case(v) => {
                        let Some(key) = v.case_key() else {
                            self.diags.report_error(CompileError::DuplicateCase {
                                label: v.to_string(),
                                span: section.span,
                            });
                            continue;
                        };
                        if seen.insert(key.clone(), section.span).is_some() {
                            self.diags.report_error(CompileError::DuplicateCase {
                                label: v.to_string(),
                                span: section.span,
                            });
                        }
                        entries.push(CaseEntry {
                            key: Some(key),
                            target,
                        });
                    }
                    CaseLabel::Default => {
                        if has_default {
                            self.diags.report_error(CompileError::DuplicateCase {
                                label: "default".to_string(),
                                span: section.span,
                            });
                        }
                        has_default = true;
                        entries.push(CaseEntry { key: None, target });
                    }
                }
            }
        }

        // A constant selector picks exactly one section (after cascading
        // through empty ones); every other section is left dead.
        let const_key = self
            .store
            .expr(selector.id)
            .and_then(|i| i.value.as_ref())
            .and_then(|v| v.case_key());
        let selected = const_key.as_ref().map(|key| {
            sections
                .iter()
                .position(|s| {
                    s.labels
                        .iter()
                        .any(|l| matches!(l, CaseLabel::Case(v) if v.case_key().as_ref() == Some(key)))
                })
                .or_else(|| {
                    sections
                        .iter()
                        .position(|s| s.labels.contains(&CaseLabel::Default))
                })
                .and_then(|idx| first_nonempty(sections, idx))
        });

        let inner = StatementScope::push(scope, stmt.id, ScopeKind::Switch { entries });
        let mut any_end_reachable = false;
        let last = sections.len().saturating_sub(1);
        for (idx, section) in sections.iter().enumerate() {
            let section_reachable = reachable
                && match &selected {
                    Some(sel) => *sel == Some(Some(idx)),
                    None => true,
                };
            let mut cur = section_reachable;
            let mut entered = section_reachable;
            for s in &section.body {
                // `goto case` can land in an otherwise dead section.
                let live = cur || self.is_targeted(s.id);
                entered |= live;
                let end = self.visit(s, Some(&inner), live);
                cur = live && end;
            }
            if entered && !section.is_empty() {
                if cur && idx != last {
                    self.diags
                        .report_error(CompileError::CaseFallthrough { span: section.span });
                }
                any_end_reachable |= cur;
            }
        }

        let end = if !reachable {
            false
        } else {
            let targeted = self.is_targeted(stmt.id);
            match &selected {
                // Constant selector that matches nothing: the whole body
                // is skipped at runtime.
                Some(None) => true,
                Some(Some(_)) => any_end_reachable || targeted,
                None => any_end_reachable || !has_default || targeted,
            }
        };
        if reachable {
            self.record(stmt.id, end);
        }
        end
    }

    fn resolve_goto_case(
        &mut self,
        stmt: &Stmt,
        value: Option<&veld_core::ConstValue>,
        scope: Option<&Rc<StatementScope>>,
        reachable: bool,
    ) {
        let Some((entries, switch_node)) = scope.and_then(|s| s.enclosing_switch()) else {
            self.diags
                .report_error(CompileError::UnresolvedCase { span: stmt.span });
            return;
        };
        let wanted = match value {
            Some(v) => match v.case_key() {
                Some(key) => Some(key),
                None => {
                    self.diags
                        .report_error(CompileError::UnresolvedCase { span: stmt.span });
                    return;
                }
            },
            None => None,
        };
        let Some(entry) = entries.iter().find(|e| e.key == wanted) else {
            self.diags
                .report_error(CompileError::UnresolvedCase { span: stmt.span });
            return;
        };
        // An all-empty cascade jumps past the switch, same as a break.
        let target = entry.target.unwrap_or(switch_node);
        if reachable {
            self.record_jump(stmt.id, Some(target));
            self.store.mark_targeted(target);
        }
    }

    // ---- Recording helpers ------------------------------------------------

    fn record(&mut self, node: NodeId, end: bool) {
        if let Some(info) = self.store.stmt_mut(node) {
            info.end_reachable = end;
        } else {
            self.store.set_stmt(
                node,
                StmtInfo {
                    end_reachable: end,
                    ..StmtInfo::default()
                },
            );
        }
    }

    fn record_jump(&mut self, node: NodeId, target: Option<NodeId>) {
        if let Some(info) = self.store.stmt_mut(node) {
            info.end_reachable = false;
            info.target = target;
        } else {
            self.store.set_stmt(
                node,
                StmtInfo {
                    end_reachable: false,
                    target,
                    ..StmtInfo::default()
                },
            );
        }
    }

    fn is_targeted(&self, node: NodeId) -> bool {
        self.store.stmt(node).is_some_and(|i| i.targeted)
    }

    fn const_bool(&self, cond: &Expr) -> Option<bool> {
        self.store
            .expr(cond.id)
            .and_then(|i| i.value.as_ref())
            .and_then(|v| v.as_bool())
    }

    // ---- Definite assignment ----------------------------------------------

    fn track_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Local { local, .. } => self.note_read(*local, expr.span),
            ExprKind::Assign { target, value } => {
                self.track_expr(value);
                if let ExprKind::Local { local, .. } = &target.kind {
                    self.note_write(*local);
                } else {
                    self.track_expr(target);
                }
            }
            ExprKind::Unary { operand, .. } => self.track_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
                self.track_expr(lhs);
                self.track_expr(rhs);
            }
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                self.track_expr(cond);
                self.track_expr(then_value);
                self.track_expr(else_value);
            }
            ExprKind::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    self.track_expr(r);
                }
                for a in args {
                    self.track_expr(a);
                }
            }
            ExprKind::Field { object, .. } => {
                if let Some(o) = object {
                    self.track_expr(o);
                }
            }
            ExprKind::Index { object, index } => {
                self.track_expr(object);
                self.track_expr(index);
            }
            ExprKind::Cast { operand, .. } => self.track_expr(operand),
            ExprKind::New { args, .. } => {
                for a in args {
                    self.track_expr(a);
                }
            }
            // Captured locals count as reads, wherever the body runs.
            ExprKind::Lambda { body, .. } => self.track_expr(body),
            ExprKind::MethodGroup { receiver, .. } => {
                if let Some(r) = receiver {
                    self.track_expr(r);
                }
            }
            ExprKind::Literal(_) | ExprKind::This | ExprKind::Base => {}
        }
    }

    fn note_read(&mut self, local: LocalId, span: Span) {
        if let Some(usage) = self.unassigned.get_mut(&local) {
            usage.reads += 1;
            usage.first_read.get_or_insert(span);
        } else {
            self.unread.remove(&local);
        }
    }

    fn note_write(&mut self, local: LocalId) {
        if let Some(usage) = self.unassigned.remove(&local) {
            if usage.reads > 0 {
                self.diags.report_warning(Warning::UseBeforeAssignment {
                    name: usage.name.clone(),
                    span: usage.first_read.unwrap_or(usage.decl_span),
                });
            }
            self.unread.insert(local, usage);
        }
        // Re-assignment of an unread variable keeps it unread.
    }

    /// End-of-body sweep over what is still tracked.
    fn flush_locals(&mut self) {
        let mut leftovers: Vec<(bool, VarUse)> = self
            .unassigned
            .drain()
            .map(|(_, u)| (true, u))
            .chain(self.unread.drain().map(|(_, u)| (false, u)))
            .collect();
        leftovers.sort_by_key(|(_, u)| (u.decl_span.line, u.decl_span.col));
        for (never_written, usage) in leftovers {
            let warning = if never_written {
                if usage.reads > 0 {
                    Warning::UseBeforeAssignment {
                        name: usage.name,
                        span: usage.first_read.unwrap_or(usage.decl_span),
                    }
                } else {
                    Warning::UnusedVariable {
                        name: usage.name,
                        span: usage.decl_span,
                    }
                }
            } else {
                Warning::AssignedNeverRead {
                    name: usage.name,
                    span: usage.decl_span,
                }
            };
            self.diags.report_warning(warning);
        }
    }
}

/// First statement of the first non-empty section at or after `idx`.
fn cascade_target(sections: &[veld_core::SwitchSection], idx: usize) -> Option<NodeId> {
    first_nonempty(sections, idx)
        .flatten()
        .and_then(|i| sections[i].body.first().map(|s| s.id))
}

/// Index of the first non-empty section at or after `idx`, wrapped so the
/// caller can distinguish "cascades past the end" from "no cascade".
fn first_nonempty(sections: &[veld_core::SwitchSection], idx: usize) -> Option<Option<usize>> {
    Some((idx..sections.len()).find(|&i| !sections[i].is_empty()))
}
