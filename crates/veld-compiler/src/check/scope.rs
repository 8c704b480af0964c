//! Lexical statement scopes for jump resolution.
//!
//! One scope per enclosing loop/switch/label-table/try/using construct,
//! kept as an immutable cons-list threaded through the checker pass.
//! Resolving `break`/`continue`/`goto`/`goto case` is a pure function of
//! (node, scope chain): walk outward for the nearest construct of the
//! required kind.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use veld_core::{CaseKey, NodeId};

/// What the scope's construct is, plus the lookup data jumps need.
#[derive(Debug)]
pub enum ScopeKind {
    Loop,
    Switch {
        entries: Vec<CaseEntry>,
    },
    /// Labels declared by the statements of one block.
    Labels {
        table: FxHashMap<String, NodeId>,
    },
    Try,
    Using,
}

/// One `case`/`default` label of an enclosing switch, with its jump
/// destination after cascading through empty sections.
#[derive(Debug, Clone)]
pub struct CaseEntry {
    /// Normalized label key; `None` is the `default` label.
    pub key: Option<CaseKey>,
    /// First statement of the first non-empty section at or after the
    /// labeled one; `None` means the jump lands on the switch's end.
    pub target: Option<NodeId>,
}

/// A link in the lexical scope chain.
#[derive(Debug)]
pub struct StatementScope {
    kind: ScopeKind,
    node: NodeId,
    parent: Option<Rc<StatementScope>>,
}

impl StatementScope {
    /// Extend the chain with a new innermost scope.
    pub fn push(parent: Option<&Rc<StatementScope>>, node: NodeId, kind: ScopeKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            node,
            parent: parent.cloned(),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    fn chain(&self) -> impl Iterator<Item = &StatementScope> {
        std::iter::successors(Some(self), |scope| scope.parent.as_deref())
    }

    /// Nearest enclosing construct a `break` exits: loop or switch.
    pub fn break_target(&self) -> Option<NodeId> {
        self.chain()
            .find(|s| matches!(s.kind, ScopeKind::Loop | ScopeKind::Switch { .. }))
            .map(|s| s.node)
    }

    /// Nearest enclosing loop; switches do not absorb `continue`.
    pub fn continue_target(&self) -> Option<NodeId> {
        self.chain()
            .find(|s| matches!(s.kind, ScopeKind::Loop))
            .map(|s| s.node)
    }

    /// Resolve a `goto` label through the enclosing label tables.
    pub fn find_label(&self, name: &str) -> Option<NodeId> {
        self.chain().find_map(|s| match &s.kind {
            ScopeKind::Labels { table } => table.get(name).copied(),
            _ => None,
        })
    }

    /// Nearest enclosing switch's case entries, for `goto case`.
    pub fn enclosing_switch(&self) -> Option<(&[CaseEntry], NodeId)> {
        self.chain().find_map(|s| match &s.kind {
            ScopeKind::Switch { entries } => Some((entries.as_slice(), s.node)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_prefers_the_innermost_breakable() {
        let outer = StatementScope::push(None, NodeId(1), ScopeKind::Loop);
        let sw = StatementScope::push(
            Some(&outer),
            NodeId(2),
            ScopeKind::Switch { entries: vec![] },
        );
        assert_eq!(sw.break_target(), Some(NodeId(2)));
        // A switch does not catch continue; it falls out to the loop.
        assert_eq!(sw.continue_target(), Some(NodeId(1)));
    }

    #[test]
    fn continue_needs_a_loop() {
        let sw = StatementScope::push(None, NodeId(2), ScopeKind::Switch { entries: vec![] });
        assert_eq!(sw.continue_target(), None);
        assert_eq!(sw.break_target(), Some(NodeId(2)));
    }

    #[test]
    fn labels_resolve_outward() {
        let mut table = FxHashMap::default();
        table.insert("done".to_string(), NodeId(9));
        let block = StatementScope::push(None, NodeId(1), ScopeKind::Labels { table });
        let inner = StatementScope::push(Some(&block), NodeId(2), ScopeKind::Loop);
        assert_eq!(inner.find_label("done"), Some(NodeId(9)));
        assert_eq!(inner.find_label("missing"), None);
    }

    #[test]
    fn goto_case_finds_the_nearest_switch() {
        let entries = vec![CaseEntry {
            key: Some(CaseKey::Integral(2)),
            target: Some(NodeId(7)),
        }];
        let sw = StatementScope::push(None, NodeId(3), ScopeKind::Switch { entries });
        let body = StatementScope::push(Some(&sw), NodeId(4), ScopeKind::Try);
        let (found, node) = body.enclosing_switch().unwrap();
        assert_eq!(node, NodeId(3));
        assert_eq!(found[0].target, Some(NodeId(7)));
    }
}
