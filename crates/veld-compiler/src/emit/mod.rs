//! Bytecode emitter.
//!
//! The [`Emitter`] layers labels over a raw [`BytecodeChunk`]. Branch
//! targets are handed to expression lowering before their positions are
//! known, so every branch writes a placeholder and records a patch; the
//! absolute offsets are resolved once in [`Emitter::finish`].

use veld_core::{CompileError, ConstValue, Width};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};

/// An instruction-stream address, resolved at finish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

/// The short-circuit protocol token: where a boolean expression should
/// transfer control instead of materializing a value.
///
/// Convention: a lowered condition branches to `if_false` when it fails
/// and falls through toward `if_true`; the caller marks both.
#[derive(Debug, Clone, Copy)]
pub struct TargetLabels {
    pub if_true: Label,
    pub if_false: Label,
}

impl TargetLabels {
    pub fn new(if_true: Label, if_false: Label) -> Self {
        Self { if_true, if_false }
    }

    /// The same targets with polarity flipped; used when a node carries
    /// the negate flag.
    pub fn swapped(self) -> Self {
        Self {
            if_true: self.if_false,
            if_false: self.if_true,
        }
    }
}

/// Emits instructions for a single function.
///
/// Constants go to the shared module pool; the chunk is per function.
pub struct Emitter<'pool> {
    chunk: BytecodeChunk,
    constants: &'pool mut ConstantPool,
    /// Label positions; `None` until marked.
    labels: Vec<Option<usize>>,
    /// Chunk offsets holding a placeholder for the given label.
    patches: Vec<(usize, Label)>,
    line: u32,
}

impl<'pool> Emitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            labels: Vec::new(),
            patches: Vec::new(),
            line: 1,
        }
    }

    /// Set the source line attached to subsequent instructions.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    // =========================================================================
    // Basic emission
    // =========================================================================

    /// Emit an opcode with no operands.
    pub fn op(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.line);
    }

    /// Emit an opcode with an 8-bit operand.
    pub fn op_u8(&mut self, op: OpCode, value: u8) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_byte(value, self.line);
    }

    /// Emit an opcode with a 16-bit operand.
    pub fn op_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_u16(value, self.line);
    }

    /// Emit a constant load, narrow or wide by pool index.
    pub fn load_constant(&mut self, constant: Constant) {
        let index = self.constants.add(constant);
        if index < 256 {
            self.op_u8(OpCode::Const, index as u8);
        } else {
            self.op_u16(OpCode::ConstWide, index as u16);
        }
    }

    /// Intern a constant without emitting a load; returns the pool index.
    pub fn intern(&mut self, constant: Constant) -> u16 {
        self.constants.add(constant) as u16
    }

    // =========================================================================
    // Literals
    // =========================================================================

    /// Emit a literal in its instruction form.
    pub fn load_literal(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Null => self.op(OpCode::PushNull),
            ConstValue::Bool(true) => self.op(OpCode::PushTrue),
            ConstValue::Bool(false) => self.op(OpCode::PushFalse),
            ConstValue::Char(c) => self.load_i32(*c as i32),
            ConstValue::Int(v) => self.load_i32(*v),
            ConstValue::Long(v) => self.load_constant(Constant::Int(*v)),
            ConstValue::Float(v) => self.load_constant(Constant::Float32(*v)),
            ConstValue::Double(v) => self.load_constant(Constant::Float64(*v)),
            ConstValue::Str(s) => self.load_constant(Constant::Str(s.clone())),
        }
    }

    /// Emit an i32 immediate, using the short forms for 0 and 1.
    pub fn load_i32(&mut self, value: i32) {
        match value {
            0 => self.op(OpCode::PushZero),
            1 => self.op(OpCode::PushOne),
            _ => self.load_constant(Constant::Int(value as i64)),
        }
    }

    /// Push the zero of the given stack width.
    pub fn load_zero(&mut self, width: Width) {
        match width {
            Width::I32 => self.op(OpCode::PushZero),
            Width::I64 => self.load_constant(Constant::Int(0)),
            Width::F32 => self.load_constant(Constant::Float32(0.0)),
            Width::F64 => self.load_constant(Constant::Float64(0.0)),
        }
    }

    // =========================================================================
    // Locals
    // =========================================================================

    pub fn get_local(&mut self, slot: u32) {
        if slot < 256 {
            self.op_u8(OpCode::GetLocal, slot as u8);
        } else {
            self.op_u16(OpCode::GetLocalWide, slot as u16);
        }
    }

    pub fn set_local(&mut self, slot: u32) {
        if slot < 256 {
            self.op_u8(OpCode::SetLocal, slot as u8);
        } else {
            self.op_u16(OpCode::SetLocalWide, slot as u16);
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Emit a call with the method handle interned in the pool.
    pub fn call(&mut self, op: OpCode, method: veld_core::MethodId, arg_count: u8) {
        let index = self.constants.add(Constant::Method(method)) as u16;
        self.op_u16_u8(op, index, arg_count);
    }

    /// Emit an opcode with a 16-bit index and an 8-bit count (the
    /// call/new/array family).
    pub fn op_u16_u8(&mut self, op: OpCode, index: u16, count: u8) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_u16(index, self.line);
        self.chunk.write_byte(count, self.line);
    }

    // =========================================================================
    // Labels and branches
    // =========================================================================

    /// Allocate a fresh unmarked label.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Pin a label to the current offset. Each label is marked once.
    pub fn mark(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.chunk.current_offset());
    }

    /// Emit a branch instruction targeting `label`; the offset operand
    /// is patched at finish.
    pub fn branch(&mut self, op: OpCode, label: Label) {
        self.chunk.write_op(op, self.line);
        self.patches.push((self.chunk.current_offset(), label));
        self.chunk.write_u16(0xFFFF, self.line);
    }

    /// Emit an unconditional jump to `label`.
    pub fn jump(&mut self, label: Label) {
        self.branch(OpCode::Jump, label);
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Resolve every recorded branch and return the finished chunk.
    ///
    /// Faults if a branched-to label was never marked or if the function
    /// outgrew the 16-bit address space.
    pub fn finish(mut self) -> Result<BytecodeChunk, CompileError> {
        for (at, label) in &self.patches {
            let position = self.labels[label.0 as usize]
                .ok_or_else(|| CompileError::internal(format!("unmarked branch label {label:?}")))?;
            if position > u16::MAX as usize {
                return Err(CompileError::internal(format!(
                    "branch target {position} exceeds the 16-bit code space"
                )));
            }
            self.chunk.patch_u16(*at, position as u16);
        }
        Ok(self.chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_branch_is_patched() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);

        let end = emitter.new_label();
        emitter.op(OpCode::PushTrue);
        emitter.branch(OpCode::JumpIfFalse, end);
        emitter.op(OpCode::PushOne);
        emitter.mark(end);
        emitter.op(OpCode::Pop);

        let chunk = emitter.finish().unwrap();
        // PushTrue(1) + JumpIfFalse(3) + PushOne(1) = Pop at offset 5.
        assert_eq!(chunk.read_u16(2), Some(5));
        assert_eq!(chunk.read_op(5), Some(OpCode::Pop));
    }

    #[test]
    fn backward_branch_targets_marked_offset() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);

        let top = emitter.new_label();
        emitter.mark(top);
        emitter.op(OpCode::PushZero);
        emitter.op(OpCode::Pop);
        emitter.jump(top);

        let chunk = emitter.finish().unwrap();
        assert_eq!(chunk.read_op(2), Some(OpCode::Jump));
        assert_eq!(chunk.read_u16(3), Some(0));
    }

    #[test]
    fn unmarked_label_faults() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        let dangling = emitter.new_label();
        emitter.jump(dangling);
        assert!(matches!(
            emitter.finish(),
            Err(CompileError::Internal { .. })
        ));
    }

    #[test]
    fn short_literal_forms() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.load_i32(0);
        emitter.load_i32(1);
        emitter.load_i32(42);
        let chunk = emitter.finish().unwrap();
        chunk.assert_opcodes(&[OpCode::PushZero, OpCode::PushOne, OpCode::Const]);
        assert_eq!(pool.get(0), Some(&Constant::Int(42)));
    }

    #[test]
    fn constant_pool_deduplicates_across_loads() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.load_literal(&ConstValue::Str("hi".into()));
        emitter.load_literal(&ConstValue::Str("hi".into()));
        emitter.finish().unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn wide_local_slots() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.get_local(3);
        emitter.set_local(700);
        let chunk = emitter.finish().unwrap();
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::SetLocalWide]);
        assert_eq!(chunk.read_u16(3), Some(700));
    }

    #[test]
    fn line_tracking() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.set_line(10);
        emitter.op(OpCode::PushTrue);
        emitter.set_line(20);
        emitter.op(OpCode::Pop);
        let chunk = emitter.finish().unwrap();
        assert_eq!(chunk.line_at(0), Some(10));
        assert_eq!(chunk.line_at(1), Some(20));
    }
}
