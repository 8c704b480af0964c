//! Veld core data model.
//!
//! Shared foundation for the Veld compiler: source spans, hash-based
//! identity handles, the closed-variant expression/statement tree,
//! compile-time constant values, type and member descriptor entries,
//! the diagnostics sink, and the unified error hierarchy.
//!
//! ## Modules
//!
//! - [`ast`]: expression and statement nodes (one variant per kind)
//! - [`diagnostics`]: collecting error/warning sink
//! - [`error`]: [`CompileError`]
//! - [`ids`]: deterministic hash handles for types and members
//! - [`span`]: source positions
//! - [`types`]: `TypeDef`/`MethodDef`/`FieldDef` descriptor entries
//! - [`value`]: compile-time constants

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod span;
pub mod types;
pub mod value;

pub use ast::{
    BinaryOp, CaseLabel, Expr, ExprKind, LambdaParam, LogicalOp, Stmt, StmtKind, SwitchSection,
    UnaryOp,
};
pub use diagnostics::{Diagnostics, Warning};
pub use error::CompileError;
pub use ids::{FieldId, LocalId, MethodId, NodeId, TypeId};
pub use span::Span;
pub use types::{
    FieldDef, FieldFlags, MethodDef, MethodFlags, ParamDef, TypeDef, TypeKind, Visibility, Width,
};
pub use value::{CaseKey, ConstValue};
