//! Semantic resolution and bytecode lowering for Veld method bodies.
//!
//! The pipeline runs in three stages over a resolved AST and a type
//! [`Catalog`](veld_catalog::Catalog):
//!
//! 1. [`overload::Resolver`] binds call sites, picking overloads and
//!    inferring generic arguments; results land in an
//!    [`annotations::AnnotationStore`].
//! 2. [`check::check_function`] walks the body once for reachability,
//!    jump resolution, and definite assignment.
//! 3. [`function_lowering::lower_method`] compiles the body and every
//!    function it synthesizes (lambdas, adapters, accessor bridges) to
//!    stack-machine bytecode.

pub mod annotations;
pub mod bytecode;
pub mod check;
mod emit;
pub mod function_lowering;
mod lower;
pub mod overload;

pub use annotations::{AnnotationStore, ExprInfo, StmtInfo};
pub use bytecode::{AppendKind, BytecodeChunk, Constant, ConstantPool, OpCode};
pub use check::check_function;
pub use function_lowering::{LoweredFunction, lower_method};
pub use overload::Resolver;
