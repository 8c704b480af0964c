//! Statement lowering.
//!
//! Only statements the checker recorded are emitted; a statement with no
//! recorded info was proven unreachable and is skipped wholesale. Loops
//! and switches register break/continue labels in a frame table keyed by
//! their node, which is where the already-resolved jump statements find
//! their destinations. Constant conditions emit the live side only.

use veld_core::{
    CaseKey, CaseLabel, CompileError, ConstValue, Expr, ExprKind, NodeId, Stmt, StmtKind,
    SwitchSection, TypeId, TypeKind, Width,
};

use veld_catalog::primitives;

use crate::bytecode::{Constant, OpCode};
use crate::emit::{Label, TargetLabels};

use super::{Frame, Lowerer};

impl Lowerer<'_> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let Some(info) = self.store.stmt(stmt.id) else {
            return Ok(());
        };
        let targeted = info.targeted;
        let target = info.target;
        self.emitter.set_line(stmt.span.line);

        // Goto and goto-case destinations get their landing label marked
        // here; loops and switches resolve jumps through frames instead.
        if targeted
            && !matches!(
                stmt.kind,
                StmtKind::While { .. }
                    | StmtKind::DoWhile { .. }
                    | StmtKind::For { .. }
                    | StmtKind::Switch { .. }
            )
        {
            let label = self.entry_label(stmt.id);
            self.emitter.mark(label);
        }

        match &stmt.kind {
            StmtKind::Expr(expr) => match expr {
                Some(e) => self.lower_expr_stmt(e),
                None => Ok(()),
            },

            StmtKind::LocalDecl {
                local, ty, init, ..
            } => {
                let slot = self.slot(*local);
                if let Some(e) = init {
                    self.lower_arg(e, *ty)?;
                    self.emitter.set_local(slot);
                }
                Ok(())
            }

            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                }
                Ok(())
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => match self.const_of(cond).and_then(|v| v.as_bool()) {
                Some(true) => self.lower_stmt(then_branch),
                Some(false) => match else_branch {
                    Some(e) => self.lower_stmt(e),
                    None => Ok(()),
                },
                None => {
                    let then_l = self.emitter.new_label();
                    let else_l = self.emitter.new_label();
                    self.lower_condition(cond, TargetLabels::new(then_l, else_l))?;
                    self.emitter.mark(then_l);
                    self.lower_stmt(then_branch)?;
                    match else_branch {
                        Some(e) => {
                            let end = self.emitter.new_label();
                            self.emitter.jump(end);
                            self.emitter.mark(else_l);
                            self.lower_stmt(e)?;
                            self.emitter.mark(end);
                        }
                        None => self.emitter.mark(else_l),
                    }
                    Ok(())
                }
            },

            StmtKind::While { cond, body } => {
                match self.const_of(cond).and_then(|v| v.as_bool()) {
                    // Never entered; nothing to emit.
                    Some(false) => Ok(()),
                    Some(true) => {
                        let head = self.emitter.new_label();
                        let end = self.emitter.new_label();
                        self.emitter.mark(head);
                        self.frames.insert(
                            stmt.id,
                            Frame {
                                cont: Some(head),
                                brk: end,
                            },
                        );
                        self.lower_stmt(body)?;
                        self.emitter.jump(head);
                        self.emitter.mark(end);
                        Ok(())
                    }
                    None => {
                        let head = self.emitter.new_label();
                        let body_l = self.emitter.new_label();
                        let end = self.emitter.new_label();
                        self.emitter.mark(head);
                        self.frames.insert(
                            stmt.id,
                            Frame {
                                cont: Some(head),
                                brk: end,
                            },
                        );
                        self.lower_condition(cond, TargetLabels::new(body_l, end))?;
                        self.emitter.mark(body_l);
                        self.lower_stmt(body)?;
                        self.emitter.jump(head);
                        self.emitter.mark(end);
                        Ok(())
                    }
                }
            }

            StmtKind::DoWhile { body, cond } => {
                let top = self.emitter.new_label();
                let cond_l = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.mark(top);
                self.frames.insert(
                    stmt.id,
                    Frame {
                        cont: Some(cond_l),
                        brk: end,
                    },
                );
                self.lower_stmt(body)?;
                self.emitter.mark(cond_l);
                match self.const_of(cond).and_then(|v| v.as_bool()) {
                    Some(true) => self.emitter.jump(top),
                    Some(false) => {}
                    None => {
                        let back = self.emitter.new_label();
                        self.lower_condition(cond, TargetLabels::new(back, end))?;
                        self.emitter.mark(back);
                        self.emitter.jump(top);
                    }
                }
                self.emitter.mark(end);
                Ok(())
            }

            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(i) = init {
                    self.lower_stmt(i)?;
                }
                let decided = match cond {
                    None => Some(true),
                    Some(c) => self.const_of(c).and_then(|v| v.as_bool()),
                };
                if decided == Some(false) {
                    return Ok(());
                }
                let head = self.emitter.new_label();
                let update_l = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.mark(head);
                self.frames.insert(
                    stmt.id,
                    Frame {
                        cont: Some(update_l),
                        brk: end,
                    },
                );
                if let (None, Some(c)) = (decided, cond) {
                    let body_l = self.emitter.new_label();
                    self.lower_condition(c, TargetLabels::new(body_l, end))?;
                    self.emitter.mark(body_l);
                }
                self.lower_stmt(body)?;
                self.emitter.mark(update_l);
                if let Some(u) = update {
                    self.lower_expr_stmt(u)?;
                }
                self.emitter.jump(head);
                self.emitter.mark(end);
                Ok(())
            }

            StmtKind::Switch { selector, sections } => {
                self.lower_switch(stmt, selector, sections)
            }

            StmtKind::Break => {
                let frame = self.jump_frame(target, "break")?;
                self.emitter.jump(frame.brk);
                Ok(())
            }

            StmtKind::Continue => {
                let frame = self.jump_frame(target, "continue")?;
                let head = frame
                    .cont
                    .ok_or_else(|| CompileError::internal("continue resolved to a switch"))?;
                self.emitter.jump(head);
                Ok(())
            }

            StmtKind::Labeled { body, .. } => self.lower_stmt(body),

            StmtKind::Goto { .. } => {
                let node = target
                    .ok_or_else(|| CompileError::internal("goto without a resolved target"))?;
                let label = self.entry_label(node);
                self.emitter.jump(label);
                Ok(())
            }

            StmtKind::GotoCase { .. } => {
                let node = target
                    .ok_or_else(|| CompileError::internal("goto case without a resolved target"))?;
                // An all-empty cascade resolved to the switch itself and
                // behaves as a break.
                let label = match self.frames.get(&node) {
                    Some(frame) => frame.brk,
                    None => self.entry_label(node),
                };
                self.emitter.jump(label);
                Ok(())
            }

            StmtKind::Return(value) => {
                match value {
                    Some(e) => {
                        self.lower_expr(e)?;
                        if let Some(rt) = self.return_type
                            && !e.is_null_literal()
                        {
                            self.convert(self.ty_of(e)?, rt)?;
                        }
                        self.emitter.op(OpCode::Return);
                    }
                    None => self.emitter.op(OpCode::ReturnVoid),
                }
                Ok(())
            }

            StmtKind::Throw(e) => {
                self.lower_expr(e)?;
                self.emitter.op(OpCode::Throw);
                Ok(())
            }

            StmtKind::Try {
                body,
                catch,
                finally,
            } => {
                let handler = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.branch(OpCode::TryBegin, handler);
                self.lower_stmt(body)?;
                self.emitter.op(OpCode::TryEnd);
                if let Some(f) = finally {
                    self.lower_stmt(f)?;
                }
                self.emitter.jump(end);
                self.emitter.mark(handler);
                match catch {
                    Some(c) => {
                        // The VM delivers the exception on the stack.
                        self.emitter.op(OpCode::Pop);
                        self.lower_stmt(c)?;
                        if let Some(f) = finally {
                            self.lower_stmt(f)?;
                        }
                    }
                    None => {
                        if let Some(f) = finally {
                            self.lower_stmt(f)?;
                        }
                        self.emitter.op(OpCode::Throw);
                    }
                }
                self.emitter.mark(end);
                Ok(())
            }

            StmtKind::Using {
                local,
                ty,
                resource,
                body,
                ..
            } => {
                let slot = self.slot(*local);
                self.lower_arg(resource, *ty)?;
                self.emitter.set_local(slot);
                let handler = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.branch(OpCode::TryBegin, handler);
                self.lower_stmt(body)?;
                self.emitter.op(OpCode::TryEnd);
                self.emit_dispose(slot, *ty)?;
                self.emitter.jump(end);
                self.emitter.mark(handler);
                self.emit_dispose(slot, *ty)?;
                self.emitter.op(OpCode::Throw);
                self.emitter.mark(end);
                Ok(())
            }

            StmtKind::Yield(e) => {
                self.lower_expr(e)?;
                self.emitter.op(OpCode::Yield);
                Ok(())
            }
        }
    }

    /// Evaluate an expression for effect, discarding any produced value.
    fn lower_expr_stmt(&mut self, e: &Expr) -> Result<(), CompileError> {
        if matches!(e.kind, ExprKind::Assign { .. }) {
            return self.lower_assign(e, false);
        }
        self.lower_expr(e)?;
        if self.ty_of(e)? != primitives::void() {
            self.emitter.op(OpCode::Pop);
        }
        Ok(())
    }

    fn jump_frame(&self, target: Option<NodeId>, what: &str) -> Result<Frame, CompileError> {
        let node = target
            .ok_or_else(|| CompileError::internal(format!("{what} without a resolved target")))?;
        self.frames
            .get(&node)
            .copied()
            .ok_or_else(|| CompileError::internal(format!("{what} target has no open frame")))
    }

    // =========================================================================
    // Switch
    // =========================================================================

    /// Non-constant selectors dispatch through a compare chain: the
    /// selector stays on the stack while each case key is tested, every
    /// landing pops it, and a miss falls to the default section or past
    /// the end. A constant selector emits no dispatch at all; the checker
    /// left only the matching section recorded.
    fn lower_switch(
        &mut self,
        stmt: &Stmt,
        selector: &Expr,
        sections: &[SwitchSection],
    ) -> Result<(), CompileError> {
        let end = self.emitter.new_label();
        self.frames.insert(stmt.id, Frame { cont: None, brk: end });

        if self.const_of(selector).is_none() {
            self.lower_expr(selector)?;
            let sel_kind = self.catalog.kind_of(self.ty_of(selector)?)?;
            let mut stubs: Vec<(Label, Label)> = Vec::new();
            let mut default_body: Option<Label> = None;
            for (idx, section) in sections.iter().enumerate() {
                let body_label = self.section_body_label(sections, idx, end);
                for label in &section.labels {
                    match label {
                        CaseLabel::Case(v) => {
                            let hit = self.emitter.new_label();
                            self.emitter.op(OpCode::Dup);
                            self.load_case_key(v, sel_kind)?;
                            match sel_kind {
                                TypeKind::Str => self.emitter.branch(OpCode::JumpEqRef, hit),
                                k if k.width() == Some(Width::I64) => {
                                    self.emitter.op(OpCode::CmpI64);
                                    self.emitter.branch(OpCode::JumpZero, hit);
                                }
                                k if k.width() == Some(Width::I32) => {
                                    self.emitter.branch(OpCode::JumpEqI32, hit);
                                }
                                _ => {
                                    return Err(CompileError::internal(
                                        "switch selector has no dispatchable kind",
                                    ));
                                }
                            }
                            stubs.push((hit, body_label));
                        }
                        CaseLabel::Default => default_body = Some(body_label),
                    }
                }
            }
            // No case matched: drop the selector and take the default.
            self.emitter.op(OpCode::Pop);
            self.emitter.jump(default_body.unwrap_or(end));
            for (hit, body) in stubs {
                self.emitter.mark(hit);
                self.emitter.op(OpCode::Pop);
                self.emitter.jump(body);
            }
        }

        for section in sections {
            if let Some(first) = section.body.first() {
                let label = self.entry_label(first.id);
                self.emitter.mark(label);
            }
            for s in &section.body {
                self.lower_stmt(s)?;
            }
        }
        self.emitter.mark(end);
        Ok(())
    }

    /// First statement of the cascade target at or after `idx`; an
    /// all-empty tail lands past the switch.
    fn section_body_label(
        &mut self,
        sections: &[SwitchSection],
        idx: usize,
        end: Label,
    ) -> Label {
        match (idx..sections.len()).find(|&i| !sections[i].is_empty()) {
            Some(i) => self.entry_label(sections[i].body[0].id),
            None => end,
        }
    }

    /// Push one case key at the selector's comparison width. Keys are
    /// normalized, so `case 'a'` and `case 97` load identically.
    fn load_case_key(&mut self, value: &ConstValue, sel_kind: TypeKind) -> Result<(), CompileError> {
        match value.case_key() {
            Some(CaseKey::Integral(n)) => {
                if sel_kind.width() == Some(Width::I64) {
                    self.emitter.load_constant(Constant::Int(n));
                } else {
                    self.emitter.load_i32(n as i32);
                }
                Ok(())
            }
            Some(CaseKey::Text(s)) => {
                self.emitter.load_constant(Constant::Str(s));
                Ok(())
            }
            None => Err(CompileError::internal("case label is not a constant key")),
        }
    }

    fn emit_dispose(&mut self, slot: u32, ty: TypeId) -> Result<(), CompileError> {
        let dispose = self
            .catalog
            .methods_named(ty, "dispose")
            .into_iter()
            .find_map(|m| {
                let def = self.catalog.get_method(m)?;
                (!def.is_static() && def.params.is_empty()).then(|| def.clone())
            })
            .ok_or_else(|| CompileError::internal("using resource has no dispose method"))?;
        self.emitter.get_local(slot);
        self.emit_invoke(&dispose, false)?;
        if dispose.return_type != primitives::void() {
            self.emitter.op(OpCode::Pop);
        }
        Ok(())
    }
}
