mod code;
mod context;
mod dependency;
mod instruction_set;
mod operators;

#[cfg(test)]
mod context_test;


pub use code::{Script, ScriptBuilder};
pub use context::Context;
pub use dependency::{Dependency, DependencyKind, unify};
pub use instruction_set::{BinaryOp, Instruction, QuaternaryOp, TernaryOp, UnaryOp};
