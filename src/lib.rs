//! Veld semantic core: overload resolution, flow checking, and bytecode
//! lowering for a stack virtual machine.
//!
//! This crate is a facade over the workspace members:
//!
//! - [`veld_core`]: spans, id handles, the AST, constants, descriptor
//!   entries, diagnostics, and errors
//! - [`veld_catalog`]: the type/member catalog with conversion queries
//!   and generic instantiation
//! - [`veld_compiler`]: the resolver, the flow checker, and the
//!   bytecode lowerer with its synthesis driver
//!
//! A typical compilation of one method body resolves its call sites
//! with a [`Resolver`], then hands the annotated body to
//! [`lower_method`], which runs [`check_function`] and compiles the
//! body plus everything it synthesizes.

pub use veld_catalog::{Catalog, primitives};
pub use veld_compiler::{
    AnnotationStore, AppendKind, BytecodeChunk, Constant, ConstantPool, ExprInfo, LoweredFunction,
    OpCode, Resolver, StmtInfo, check_function, lower_method,
};
pub use veld_core::{
    BinaryOp, CaseKey, CaseLabel, CompileError, ConstValue, Diagnostics, Expr, ExprKind, FieldDef,
    FieldFlags, FieldId, LambdaParam, LocalId, LogicalOp, MethodDef, MethodFlags, MethodId, NodeId,
    ParamDef, Span, Stmt, StmtKind, SwitchSection, TypeDef, TypeId, TypeKind, UnaryOp, Visibility,
    Warning, Width,
};
