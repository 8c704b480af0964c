//! The typed expression and statement tree.
//!
//! Nodes form a closed set of variants; resolution, lowering, and
//! checking are each written as one exhaustive match over these kinds,
//! so an unhandled kind is a compile-time hole rather than a runtime
//! fallback. Name binding happens before this tree reaches the core:
//! local references carry their resolved [`LocalId`], while member and
//! method targets are attached out of band in the annotation store.

use crate::ids::{LocalId, NodeId, TypeId};
use crate::span::Span;
use crate::value::ConstValue;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean negation.
    Not,
    /// Bitwise complement.
    BitNot,
}

/// Binary operators (short-circuit forms live in [`ExprKind::Logical`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Ushr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Whether this operator produces a boolean from two operands.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Whether this operator tests equality rather than ordering.
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }
}

/// Short-circuit boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Self {
        Self { id, span, kind }
    }

    /// Whether this is the untyped `null` literal.
    pub fn is_null_literal(&self) -> bool {
        matches!(&self.kind, ExprKind::Literal(v) if v.is_null())
    }

    /// Whether this node is an unresolved invocable shape (a lambda or a
    /// method group) whose type comes from context, not from itself.
    pub fn is_invocable_shape(&self) -> bool {
        matches!(
            &self.kind,
            ExprKind::Lambda { .. } | ExprKind::MethodGroup { .. }
        )
    }
}

/// A lambda parameter; the type is `None` until inference commits one.
#[derive(Debug, Clone)]
pub struct LambdaParam {
    pub local: LocalId,
    pub name: String,
    pub ty: Option<TypeId>,
}

/// Expression variants.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(ConstValue),
    /// A resolved local variable or parameter read.
    Local { local: LocalId, name: String },
    This,
    /// The `base` receiver of a base-class member access.
    Base,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    Field {
        object: Option<Box<Expr>>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Cast {
        ty: TypeId,
        operand: Box<Expr>,
    },
    New {
        ty: TypeId,
        args: Vec<Expr>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: Box<Expr>,
    },
    /// A bare method reference awaiting delegate-shape resolution.
    MethodGroup {
        receiver: Option<Box<Expr>>,
        name: String,
    },
}

/// A statement node.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(id: NodeId, span: Span, kind: StmtKind) -> Self {
        Self { id, span, kind }
    }
}

/// One `case`/`default` section of a switch.
#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl SwitchSection {
    /// Whether this section has no statements (fallthrough-by-omission).
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A switch section label.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Case(ConstValue),
    Default,
}

/// Statement variants.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// An expression evaluated for effect; `None` is the empty statement.
    Expr(Option<Expr>),
    LocalDecl {
        local: LocalId,
        name: String,
        ty: TypeId,
        init: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        selector: Expr,
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Goto {
        label: String,
    },
    /// `goto case <const>` or, with `None`, `goto default`.
    GotoCase {
        value: Option<ConstValue>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Box<Stmt>,
        catch: Option<Box<Stmt>>,
        finally: Option<Box<Stmt>>,
    },
    Using {
        local: LocalId,
        name: String,
        ty: TypeId,
        resource: Expr,
        body: Box<Stmt>,
    },
    /// `yield return`; counted on the method-level info.
    Yield(Expr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_literal_detection() {
        let e = Expr::new(NodeId(0), Span::default(), ExprKind::Literal(ConstValue::Null));
        assert!(e.is_null_literal());
        let e = Expr::new(
            NodeId(1),
            Span::default(),
            ExprKind::Literal(ConstValue::Int(0)),
        );
        assert!(!e.is_null_literal());
    }

    #[test]
    fn invocable_shapes() {
        let group = Expr::new(
            NodeId(0),
            Span::default(),
            ExprKind::MethodGroup {
                receiver: None,
                name: "f".into(),
            },
        );
        assert!(group.is_invocable_shape());
    }

    #[test]
    fn comparison_classification() {
        assert!(BinaryOp::Lt.is_comparison());
        assert!(BinaryOp::Eq.is_equality());
        assert!(!BinaryOp::Add.is_comparison());
    }
}
