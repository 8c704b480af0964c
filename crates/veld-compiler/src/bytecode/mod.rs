//! Bytecode representation for compiled Veld functions.
//!
//! A function compiles into a [`BytecodeChunk`] (instruction bytes plus
//! parallel line numbers); literal values, member handles, and type
//! handles live in a module-level [`ConstantPool`] shared by every chunk
//! in the module.

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::{AppendKind, OpCode};
