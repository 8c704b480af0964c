//! Out-of-band per-node annotations.
//!
//! Node structs stay free of optional analysis fields; resolution and
//! checking attach their results here, keyed by [`NodeId`]. Speculative
//! inference ("probing") relies on the store being transactional: a
//! probed node either keeps its info permanently or has it removed in
//! full, never partially.

use rustc_hash::FxHashMap;

use veld_core::{ConstValue, FieldId, MethodId, NodeId, TypeId};

/// Facts about one expression node.
#[derive(Debug, Clone)]
pub struct ExprInfo {
    /// Resolved static type.
    pub ty: TypeId,
    /// Compile-time constant value, when known.
    pub value: Option<ConstValue>,
    /// Whether a boolean-producing node's branch test is inverted;
    /// avoids double negation when chaining comparisons.
    pub negate: bool,
    /// Resolved call target.
    pub method: Option<MethodId>,
    /// Resolved field target.
    pub field: Option<FieldId>,
    /// Whether this call dispatches non-virtually on `base`.
    pub is_base_call: bool,
    /// Extension-style call; receiver becomes the first argument.
    pub is_extension: bool,
}

impl ExprInfo {
    /// Info carrying only a resolved type.
    pub fn typed(ty: TypeId) -> Self {
        Self {
            ty,
            value: None,
            negate: false,
            method: None,
            field: None,
            is_base_call: false,
            is_extension: false,
        }
    }

    /// Info for a compile-time constant.
    pub fn constant(ty: TypeId, value: ConstValue) -> Self {
        Self {
            value: Some(value),
            ..Self::typed(ty)
        }
    }

    pub fn with_method(mut self, method: MethodId) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_field(mut self, field: FieldId) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_negate(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn is_constant(&self) -> bool {
        self.value.is_some()
    }

    /// Whether this node is statically the numeric zero.
    pub fn is_const_zero(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_zero())
    }
}

/// Facts about one statement node, produced by the checker.
#[derive(Debug, Clone, Default)]
pub struct StmtInfo {
    /// Whether control can flow off the bottom of this statement.
    pub end_reachable: bool,
    /// Whether some jump resolved to this statement; an end-point-
    /// unreachable loop becomes reachable again when a break targets it.
    pub targeted: bool,
    /// Resolved destination of a break/continue/goto.
    pub target: Option<NodeId>,
    /// Number of `yield` statements in the subtree (method level only).
    pub yield_count: u32,
}

impl StmtInfo {
    pub fn reachable_end() -> Self {
        Self {
            end_reachable: true,
            ..Self::default()
        }
    }

    pub fn unreachable_end() -> Self {
        Self::default()
    }
}

/// Side table mapping node identity to annotations.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    exprs: FxHashMap<NodeId, ExprInfo>,
    stmts: FxHashMap<NodeId, StmtInfo>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expr(&mut self, node: NodeId, info: ExprInfo) {
        self.exprs.insert(node, info);
    }

    pub fn expr(&self, node: NodeId) -> Option<&ExprInfo> {
        self.exprs.get(&node)
    }

    pub fn expr_mut(&mut self, node: NodeId) -> Option<&mut ExprInfo> {
        self.exprs.get_mut(&node)
    }

    /// Remove and return an expression annotation; the rollback half of
    /// a probe.
    pub fn remove_expr(&mut self, node: NodeId) -> Option<ExprInfo> {
        self.exprs.remove(&node)
    }

    pub fn set_stmt(&mut self, node: NodeId, info: StmtInfo) {
        self.stmts.insert(node, info);
    }

    pub fn stmt(&self, node: NodeId) -> Option<&StmtInfo> {
        self.stmts.get(&node)
    }

    pub fn stmt_mut(&mut self, node: NodeId) -> Option<&mut StmtInfo> {
        self.stmts.get_mut(&node)
    }

    pub fn has_stmt(&self, node: NodeId) -> bool {
        self.stmts.contains_key(&node)
    }

    /// Flag `node` as the destination of a jump, creating the info entry
    /// if the jump resolved before the target was visited.
    pub fn mark_targeted(&mut self, node: NodeId) {
        self.stmts.entry(node).or_default().targeted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_rollback_restores_absence() {
        let mut store = AnnotationStore::new();
        let node = NodeId(7);
        store.set_expr(node, ExprInfo::typed(TypeId::from_name("int")));
        assert!(store.expr(node).is_some());
        let removed = store.remove_expr(node);
        assert!(removed.is_some());
        assert!(store.expr(node).is_none());
    }

    #[test]
    fn constant_info_knows_zero() {
        let int = TypeId::from_name("int");
        assert!(ExprInfo::constant(int, ConstValue::Int(0)).is_const_zero());
        assert!(!ExprInfo::constant(int, ConstValue::Int(3)).is_const_zero());
        assert!(!ExprInfo::typed(int).is_constant());
    }

    #[test]
    fn targeting_before_visit_creates_entry() {
        let mut store = AnnotationStore::new();
        let node = NodeId(1);
        store.mark_targeted(node);
        assert!(store.stmt(node).unwrap().targeted);
        assert!(!store.stmt(node).unwrap().end_reachable);
    }
}
