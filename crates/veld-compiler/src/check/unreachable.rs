//! Dead-code reporting.
//!
//! The main checker records [`crate::annotations::StmtInfo`] only for
//! statements it reached; this pass walks the same tree and turns the
//! gaps into warnings. Within one statement list only the first gap is
//! reported, then the rest of the list is skipped: one warning per dead
//! region, not per statement.

use veld_core::{Diagnostics, Stmt, StmtKind, Warning};

use crate::annotations::AnnotationStore;

/// Report one [`Warning::UnreachableCode`] per dead region of `body`.
pub fn report_unreachable(store: &AnnotationStore, diags: &mut Diagnostics, body: &Stmt) {
    if !store.has_stmt(body.id) {
        diags.report_warning(Warning::UnreachableCode { span: body.span });
        return;
    }
    walk(store, diags, body);
}

/// Recurse into a statement already known to be recorded.
fn walk(store: &AnnotationStore, diags: &mut Diagnostics, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(stmts) => walk_list(store, diags, stmts),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            enter(store, diags, then_branch);
            if let Some(e) = else_branch {
                enter(store, diags, e);
            }
        }
        // Loop bodies are walked even when the loop's own end point is
        // dead; a `while (false)` body surfaces here.
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. }
        | StmtKind::Using { body, .. } => enter(store, diags, body),
        StmtKind::For { init, body, .. } => {
            if let Some(i) = init {
                enter(store, diags, i);
            }
            enter(store, diags, body);
        }
        StmtKind::Switch { sections, .. } => {
            for section in sections {
                walk_list(store, diags, &section.body);
            }
        }
        StmtKind::Try {
            body,
            catch,
            finally,
        } => {
            enter(store, diags, body);
            if let Some(c) = catch {
                enter(store, diags, c);
            }
            if let Some(f) = finally {
                enter(store, diags, f);
            }
        }
        StmtKind::Expr(_)
        | StmtKind::LocalDecl { .. }
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto { .. }
        | StmtKind::GotoCase { .. }
        | StmtKind::Return(_)
        | StmtKind::Throw(_)
        | StmtKind::Yield(_) => {}
    }
}

/// Flag `stmt` if it was never reached, otherwise recurse into it.
fn enter(store: &AnnotationStore, diags: &mut Diagnostics, stmt: &Stmt) {
    if !store.has_stmt(stmt.id) {
        diags.report_warning(Warning::UnreachableCode { span: stmt.span });
    } else {
        walk(store, diags, stmt);
    }
}

fn walk_list(store: &AnnotationStore, diags: &mut Diagnostics, stmts: &[Stmt]) {
    let mut flagged = false;
    for s in stmts {
        if !store.has_stmt(s.id) {
            if !flagged {
                diags.report_warning(Warning::UnreachableCode { span: s.span });
                flagged = true;
            }
        } else {
            walk(store, diags, s);
        }
    }
}
