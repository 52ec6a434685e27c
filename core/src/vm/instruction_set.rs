//! Bytecode instructions.
//!
//! # Instruction Format
//!
//! Every instruction is a tag plus at most one 32-bit operand: a jump
//! target (absolute index into the same script), a constant-pool index, an
//! interned variable id or a small count. Primitive operations carry a
//! one-byte sub-opcode instead.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`.
//! Every complete expression has a net effect of exactly one pushed value.

use core::fmt;

use static_assertions::assert_eq_size;

use crate::intern::VarId;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // ========================================================================
    // Special
    // ========================================================================
    /// Does nothing.
    Nop,

    /// Name of an argument, trailing a `Call` or `MakeClosure`. Never executed.
    Arg(VarId),

    // ========================================================================
    // Stack & Constants
    // ========================================================================
    /// Stack: [...] -> [..., constants[i]]
    PushConst(u32),

    /// Stack: [..., a] -> [...]
    Pop,

    /// Duplicate the value N below the top (top is N=0).
    /// Stack: [..., aN, ..., a0] -> [..., aN, ..., a0, aN]
    Dup(u32),

    /// Finish the script with the top value.
    /// Stack: [..., result] -> [...]
    Return,

    // ========================================================================
    // Control Flow
    // ========================================================================
    /// Continue at the given instruction.
    Jump(u32),

    /// Stack: [..., cond] -> [...], jumps when `cond` is false.
    JumpIfNot(u32),

    /// Short-circuit `and`: if the top is false, jump and keep it, otherwise pop it.
    JumpShortAnd(u32),

    /// Short-circuit `or`: if the top is true, jump and keep it, otherwise pop it.
    JumpShortOr(u32),

    // ========================================================================
    // Variables & Members
    // ========================================================================
    /// Stack: [...] -> [..., value]
    GetVar(VarId),

    /// Assign without popping.
    /// Stack: [..., value] -> [..., value]
    SetVar(VarId),

    /// Member named by a string constant.
    /// Stack: [..., object] -> [..., object.name]
    MemberConst(u32),

    // ========================================================================
    // Iteration
    // ========================================================================
    /// Advance the iterator below the accumulator.
    /// Stack: [..., iter, acc] -> [..., iter, acc, value]
    /// or, when exhausted, [..., iter, acc] -> [..., acc] and jump.
    Loop(u32),

    /// Like `Loop`, also pushing the key.
    /// Stack: [..., iter, acc] -> [..., iter, acc, value, key]
    LoopWithKey(u32),

    // ========================================================================
    // Calls & Construction
    // ========================================================================
    /// Call with N named arguments, named by the N `Arg` instructions that follow.
    /// Stack: [..., callee, arg1, ..., argN] -> [..., result]
    Call(u32),

    /// Bind N named default arguments to a function, names as for `Call`.
    /// Stack: [..., function, arg1, ..., argN] -> [..., closure]
    MakeClosure(u32),

    /// Build a collection from N key/value pairs; a nil key appends.
    /// Stack: [..., k1, v1, ..., kN, vN] -> [..., collection]
    MakeCollection(u32),

    // ========================================================================
    // Primitive Operations
    // ========================================================================
    /// Stack: [..., a] -> [..., op(a)]
    Unary(UnaryOp),

    /// Stack: [..., a, b] -> [..., op(a, b)]
    Binary(BinaryOp),

    /// Stack: [..., a, b, c] -> [..., op(a, b, c)]
    Ternary(TernaryOp),

    /// Stack: [..., a, b, c, d] -> [..., op(a, b, c, d)]
    Quaternary(QuaternaryOp),
}

assert_eq_size!(Instruction, u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    MakeIterator,
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// `/`, real division.
    FDiv,
    /// `div`, integer division.
    Div,
    Mod,
    Pow,
    Xor,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Min,
    Max,
    /// `a or else b`: `b` when `a` is a delayed error.
    OrElse,
    /// `a[b]`
    Member,
    /// Inclusive integer range iterator, `for x from a to b`.
    RangeIterator,
    /// Fail with message `b` unless `a` is true.
    Assert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryOp {
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuaternaryOp {
    Rgba,
}

impl Instruction {
    /// The jump target, for instructions that may transfer control.
    pub fn jump_target(&self) -> Option<u32> {
        match self {
            Instruction::Jump(target)
            | Instruction::JumpIfNot(target)
            | Instruction::JumpShortAnd(target)
            | Instruction::JumpShortOr(target)
            | Instruction::Loop(target)
            | Instruction::LoopWithKey(target) => Some(*target),
            _ => None,
        }
    }

    /// Replace the jump target of a jump instruction.
    pub fn with_jump_target(self, target: u32) -> Instruction {
        match self {
            Instruction::Jump(_) => Instruction::Jump(target),
            Instruction::JumpIfNot(_) => Instruction::JumpIfNot(target),
            Instruction::JumpShortAnd(_) => Instruction::JumpShortAnd(target),
            Instruction::JumpShortOr(_) => Instruction::JumpShortOr(target),
            Instruction::Loop(_) => Instruction::Loop(target),
            Instruction::LoopWithKey(_) => Instruction::LoopWithKey(target),
            other => other,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "Nop"),
            Self::Arg(id) => write!(f, "Arg({id})"),
            Self::PushConst(i) => write!(f, "PushConst({i})"),
            Self::Pop => write!(f, "Pop"),
            Self::Dup(n) => write!(f, "Dup({n})"),
            Self::Return => write!(f, "Return"),
            Self::Jump(t) => write!(f, "Jump({t})"),
            Self::JumpIfNot(t) => write!(f, "JumpIfNot({t})"),
            Self::JumpShortAnd(t) => write!(f, "JumpShortAnd({t})"),
            Self::JumpShortOr(t) => write!(f, "JumpShortOr({t})"),
            Self::GetVar(id) => write!(f, "GetVar({id})"),
            Self::SetVar(id) => write!(f, "SetVar({id})"),
            Self::MemberConst(i) => write!(f, "MemberConst({i})"),
            Self::Loop(t) => write!(f, "Loop({t})"),
            Self::LoopWithKey(t) => write!(f, "LoopWithKey({t})"),
            Self::Call(n) => write!(f, "Call({n})"),
            Self::MakeClosure(n) => write!(f, "MakeClosure({n})"),
            Self::MakeCollection(n) => write!(f, "MakeCollection({n})"),
            Self::Unary(op) => write!(f, "Unary({op:?})"),
            Self::Binary(op) => write!(f, "Binary({op:?})"),
            Self::Ternary(op) => write!(f, "Ternary({op:?})"),
            Self::Quaternary(op) => write!(f, "Quaternary({op:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_size() {
        assert_eq!(core::mem::size_of::<Instruction>(), 8);
    }

    #[test]
    fn test_jump_targets() {
        assert_eq!(Instruction::Jump(4).jump_target(), Some(4));
        assert_eq!(Instruction::Loop(9).with_jump_target(2), Instruction::Loop(2));
        assert_eq!(Instruction::Pop.jump_target(), None);
        assert_eq!(Instruction::Pop.with_jump_target(3), Instruction::Pop);
    }

    #[test]
    fn test_debug_formatting() {
        assert_eq!(format!("{:?}", Instruction::Binary(BinaryOp::Add)), "Binary(Add)");
        assert_eq!(format!("{:?}", Instruction::GetVar(VarId::INPUT)), "GetVar(input)");
    }
}
