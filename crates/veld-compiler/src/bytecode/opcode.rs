//! Instruction set of the Veld stack VM.
//!
//! One byte per opcode, operands inline. Branch operands are absolute
//! 16-bit code offsets patched in by the emitter at finish time.

/// Bytecode operation codes.
///
/// The VM is a stack machine; arithmetic is typed by operand-stack width
/// (everything narrower than `int` is widened to i32 before it reaches
/// the stack). Comparisons do not produce booleans: they are branch
/// instructions, and a zero-valued operand uses the single-operand test
/// forms instead of the two-operand compare forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool.
    /// Operand: u8 constant index
    Const = 0,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index (big-endian)
    ConstWide,
    /// Push the null reference.
    PushNull,
    /// Push boolean true (i32 one).
    PushTrue,
    /// Push boolean false (i32 zero).
    PushFalse,
    /// Push i32 zero.
    PushZero,
    /// Push i32 one.
    PushOne,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Duplicate top of stack.
    Dup,
    /// Swap top two stack values.
    Swap,

    // =========================================================================
    // Locals
    // =========================================================================
    /// Load local slot.
    /// Operand: u8 slot
    GetLocal,
    /// Store to local slot.
    /// Operand: u8 slot
    SetLocal,
    /// Load local slot (16-bit).
    /// Operand: u16 slot (big-endian)
    GetLocalWide,
    /// Store to local slot (16-bit).
    /// Operand: u16 slot (big-endian)
    SetLocalWide,

    // =========================================================================
    // Receiver and Fields
    // =========================================================================
    /// Push the `this` reference.
    GetThis,
    /// Load instance field; receiver on stack.
    /// Operand: u16 constant index (field handle)
    GetField,
    /// Store instance field; receiver then value on stack.
    /// Operand: u16 constant index (field handle)
    SetField,
    /// Load static field.
    /// Operand: u16 constant index (field handle)
    GetStatic,
    /// Store static field.
    /// Operand: u16 constant index (field handle)
    SetStatic,

    // =========================================================================
    // Arithmetic (i32)
    // =========================================================================
    AddI32,
    SubI32,
    MulI32,
    DivI32,
    RemI32,
    NegI32,

    // =========================================================================
    // Arithmetic (i64)
    // =========================================================================
    AddI64,
    SubI64,
    MulI64,
    DivI64,
    RemI64,
    NegI64,

    // =========================================================================
    // Arithmetic (f32)
    // =========================================================================
    AddF32,
    SubF32,
    MulF32,
    DivF32,
    RemF32,
    NegF32,

    // =========================================================================
    // Arithmetic (f64)
    // =========================================================================
    AddF64,
    SubF64,
    MulF64,
    DivF64,
    RemF64,
    NegF64,

    // =========================================================================
    // Bitwise (i32)
    // =========================================================================
    AndI32,
    OrI32,
    XorI32,
    /// Bitwise complement.
    NotI32,
    ShlI32,
    ShrI32,
    UshrI32,

    // =========================================================================
    // Bitwise (i64)
    // =========================================================================
    AndI64,
    OrI64,
    XorI64,
    NotI64,
    ShlI64,
    ShrI64,
    UshrI64,

    // =========================================================================
    // Numeric Conversions
    // =========================================================================
    I32toI64,
    I32toF32,
    I32toF64,
    I64toI32,
    I64toF32,
    I64toF64,
    F32toI32,
    F32toI64,
    F32toF64,
    F64toI32,
    F64toI64,
    F64toF32,

    // =========================================================================
    // Boxing
    // =========================================================================
    /// Box the primitive on top of the stack.
    /// Operand: u16 constant index (boxed type handle)
    Box,
    /// Unbox a reference to the given primitive type.
    /// Operand: u16 constant index (primitive type handle)
    Unbox,

    // =========================================================================
    // Branches
    // =========================================================================
    /// Unconditional branch.
    /// Operand: u16 absolute code offset (big-endian)
    Jump,
    /// Branch if the i32 on top is nonzero.
    /// Operand: u16 absolute code offset
    JumpIfTrue,
    /// Branch if the i32 on top is zero.
    /// Operand: u16 absolute code offset
    JumpIfFalse,

    // =========================================================================
    // Zero-Test Branches (single i32 operand)
    // =========================================================================
    /// Branch if top == 0.
    JumpZero,
    /// Branch if top != 0.
    JumpNonZero,
    /// Branch if top < 0.
    JumpLtZero,
    /// Branch if top <= 0.
    JumpLeZero,
    /// Branch if top > 0.
    JumpGtZero,
    /// Branch if top >= 0.
    JumpGeZero,

    // =========================================================================
    // Two-Operand i32 Compare Branches
    // =========================================================================
    JumpEqI32,
    JumpNeI32,
    JumpLtI32,
    JumpLeI32,
    JumpGtI32,
    JumpGeI32,

    // =========================================================================
    // Wide Comparisons (push i32 -1/0/+1, then zero-test)
    // =========================================================================
    CmpI64,
    CmpF32,
    CmpF64,

    // =========================================================================
    // Reference Branches
    // =========================================================================
    /// Branch if the two references on top are the same object.
    JumpEqRef,
    /// Branch if the two references on top differ.
    JumpNeRef,
    /// Branch if the reference on top is null.
    JumpNull,
    /// Branch if the reference on top is non-null.
    JumpNonNull,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Direct call.
    /// Operands: u16 constant index (method handle), u8 arg count
    Call,
    /// Virtual dispatch on the receiver under the arguments.
    /// Operands: u16 constant index (method handle), u8 arg count
    CallVirtual,
    /// Return with value.
    Return,
    /// Return from a void function.
    ReturnVoid,
    /// Yield the value on top to the enclosing iterator frame.
    Yield,

    // =========================================================================
    // Object Creation
    // =========================================================================
    /// Allocate and construct.
    /// Operands: u16 constant index (constructor handle), u8 arg count
    New,
    /// Allocate an array from the top N stack values.
    /// Operands: u16 constant index (element type handle), u8 count
    NewArray,
    /// Push a function reference.
    /// Operand: u16 constant index (method handle)
    FuncRef,
    /// Checked downcast; faults at runtime on mismatch.
    /// Operand: u16 constant index (target type handle)
    Cast,

    // =========================================================================
    // String Building
    // =========================================================================
    /// Begin a string builder.
    ConcatBegin,
    /// Append the value on top, converting per the kind tag.
    /// Operand: u8 append kind
    ConcatAppend,
    /// Finish the builder and push the resulting string.
    ConcatFinish,

    // =========================================================================
    // Exceptions
    // =========================================================================
    /// Throw the reference on top.
    Throw,
    /// Push an exception handler.
    /// Operand: u16 absolute code offset of the handler
    TryBegin,
    /// Pop the handler (try body completed normally).
    TryEnd,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        if value <= OpCode::TryEnd as u8 {
            // SAFETY: OpCode is repr(u8) and the value is in range.
            Some(unsafe { std::mem::transmute::<u8, OpCode>(value) })
        } else {
            None
        }
    }

    /// Operand size in bytes, not counting the opcode byte.
    pub fn operand_size(&self) -> usize {
        use OpCode::*;
        match self {
            PushNull | PushTrue | PushFalse | PushZero | PushOne | Pop | Dup | Swap | GetThis
            | AddI32 | SubI32 | MulI32 | DivI32 | RemI32 | NegI32 | AddI64 | SubI64 | MulI64
            | DivI64 | RemI64 | NegI64 | AddF32 | SubF32 | MulF32 | DivF32 | RemF32 | NegF32
            | AddF64 | SubF64 | MulF64 | DivF64 | RemF64 | NegF64 | AndI32 | OrI32 | XorI32
            | NotI32 | ShlI32 | ShrI32 | UshrI32 | AndI64 | OrI64 | XorI64 | NotI64 | ShlI64
            | ShrI64 | UshrI64 | I32toI64 | I32toF32 | I32toF64 | I64toI32 | I64toF32
            | I64toF64 | F32toI32 | F32toI64 | F32toF64 | F64toI32 | F64toI64 | F64toF32
            | CmpI64 | CmpF32 | CmpF64 | Return | ReturnVoid | Yield | ConcatBegin
            | ConcatFinish | Throw | TryEnd => 0,

            Const | GetLocal | SetLocal | ConcatAppend => 1,

            ConstWide | GetLocalWide | SetLocalWide | GetField | SetField | GetStatic
            | SetStatic | Box | Unbox | Jump | JumpIfTrue | JumpIfFalse | JumpZero
            | JumpNonZero | JumpLtZero | JumpLeZero | JumpGtZero | JumpGeZero | JumpEqI32
            | JumpNeI32 | JumpLtI32 | JumpLeI32 | JumpGtI32 | JumpGeI32 | JumpEqRef
            | JumpNeRef | JumpNull | JumpNonNull | FuncRef | Cast | TryBegin => 2,

            Call | CallVirtual | New | NewArray => 3,
        }
    }

    /// Debug name of this opcode.
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            Const => "CONST",
            ConstWide => "CONST_WIDE",
            PushNull => "PUSH_NULL",
            PushTrue => "PUSH_TRUE",
            PushFalse => "PUSH_FALSE",
            PushZero => "PUSH_ZERO",
            PushOne => "PUSH_ONE",
            Pop => "POP",
            Dup => "DUP",
            Swap => "SWAP",
            GetLocal => "GET_LOCAL",
            SetLocal => "SET_LOCAL",
            GetLocalWide => "GET_LOCAL_WIDE",
            SetLocalWide => "SET_LOCAL_WIDE",
            GetThis => "GET_THIS",
            GetField => "GET_FIELD",
            SetField => "SET_FIELD",
            GetStatic => "GET_STATIC",
            SetStatic => "SET_STATIC",
            AddI32 => "ADD_I32",
            SubI32 => "SUB_I32",
            MulI32 => "MUL_I32",
            DivI32 => "DIV_I32",
            RemI32 => "REM_I32",
            NegI32 => "NEG_I32",
            AddI64 => "ADD_I64",
            SubI64 => "SUB_I64",
            MulI64 => "MUL_I64",
            DivI64 => "DIV_I64",
            RemI64 => "REM_I64",
            NegI64 => "NEG_I64",
            AddF32 => "ADD_F32",
            SubF32 => "SUB_F32",
            MulF32 => "MUL_F32",
            DivF32 => "DIV_F32",
            RemF32 => "REM_F32",
            NegF32 => "NEG_F32",
            AddF64 => "ADD_F64",
            SubF64 => "SUB_F64",
            MulF64 => "MUL_F64",
            DivF64 => "DIV_F64",
            RemF64 => "REM_F64",
            NegF64 => "NEG_F64",
            AndI32 => "AND_I32",
            OrI32 => "OR_I32",
            XorI32 => "XOR_I32",
            NotI32 => "NOT_I32",
            ShlI32 => "SHL_I32",
            ShrI32 => "SHR_I32",
            UshrI32 => "USHR_I32",
            AndI64 => "AND_I64",
            OrI64 => "OR_I64",
            XorI64 => "XOR_I64",
            NotI64 => "NOT_I64",
            ShlI64 => "SHL_I64",
            ShrI64 => "SHR_I64",
            UshrI64 => "USHR_I64",
            I32toI64 => "I32_TO_I64",
            I32toF32 => "I32_TO_F32",
            I32toF64 => "I32_TO_F64",
            I64toI32 => "I64_TO_I32",
            I64toF32 => "I64_TO_F32",
            I64toF64 => "I64_TO_F64",
            F32toI32 => "F32_TO_I32",
            F32toI64 => "F32_TO_I64",
            F32toF64 => "F32_TO_F64",
            F64toI32 => "F64_TO_I32",
            F64toI64 => "F64_TO_I64",
            F64toF32 => "F64_TO_F32",
            Box => "BOX",
            Unbox => "UNBOX",
            Jump => "JUMP",
            JumpIfTrue => "JUMP_IF_TRUE",
            JumpIfFalse => "JUMP_IF_FALSE",
            JumpZero => "JUMP_ZERO",
            JumpNonZero => "JUMP_NON_ZERO",
            JumpLtZero => "JUMP_LT_ZERO",
            JumpLeZero => "JUMP_LE_ZERO",
            JumpGtZero => "JUMP_GT_ZERO",
            JumpGeZero => "JUMP_GE_ZERO",
            JumpEqI32 => "JUMP_EQ_I32",
            JumpNeI32 => "JUMP_NE_I32",
            JumpLtI32 => "JUMP_LT_I32",
            JumpLeI32 => "JUMP_LE_I32",
            JumpGtI32 => "JUMP_GT_I32",
            JumpGeI32 => "JUMP_GE_I32",
            CmpI64 => "CMP_I64",
            CmpF32 => "CMP_F32",
            CmpF64 => "CMP_F64",
            JumpEqRef => "JUMP_EQ_REF",
            JumpNeRef => "JUMP_NE_REF",
            JumpNull => "JUMP_NULL",
            JumpNonNull => "JUMP_NON_NULL",
            Call => "CALL",
            CallVirtual => "CALL_VIRTUAL",
            Return => "RETURN",
            ReturnVoid => "RETURN_VOID",
            Yield => "YIELD",
            New => "NEW",
            NewArray => "NEW_ARRAY",
            FuncRef => "FUNC_REF",
            Cast => "CAST",
            ConcatBegin => "CONCAT_BEGIN",
            ConcatAppend => "CONCAT_APPEND",
            ConcatFinish => "CONCAT_FINISH",
            Throw => "THROW",
            TryBegin => "TRY_BEGIN",
            TryEnd => "TRY_END",
        }
    }
}

/// Operand tag for [`OpCode::ConcatAppend`]: the static type of the
/// value being appended, so the builder picks the right append overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AppendKind {
    I32 = 0,
    I64,
    F32,
    F64,
    Bool,
    Char,
    Str,
    /// Any reference type; appended via its string conversion.
    Ref,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for byte in 0..=OpCode::TryEnd as u8 {
            let op = OpCode::from_u8(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
        assert_eq!(OpCode::from_u8(OpCode::TryEnd as u8 + 1), None);
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::AddI32.operand_size(), 0);
        assert_eq!(OpCode::Const.operand_size(), 1);
        assert_eq!(OpCode::Jump.operand_size(), 2);
        assert_eq!(OpCode::Call.operand_size(), 3);
        assert_eq!(OpCode::ConcatAppend.operand_size(), 1);
    }

    #[test]
    fn names_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for byte in 0..=OpCode::TryEnd as u8 {
            let op = OpCode::from_u8(byte).unwrap();
            assert!(seen.insert(op.name()), "duplicate name {}", op.name());
        }
    }
}
