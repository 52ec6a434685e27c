use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::errors::ScriptError;
use crate::intern::VarId;
use crate::values::Value;
use crate::vm::Instruction;

/// A compiled unit: instructions plus a constant pool. Immutable once built.
///
/// Function literals compile to their own `Script`, stored as a constant of
/// the enclosing one.
pub struct Script {
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    /// Call instruction index -> name of the variable holding the callee.
    call_names: HashMap<u32, VarId>,
}

impl Script {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: u32) -> Result<&Value, ScriptError> {
        self.constants
            .get(index as usize)
            .ok_or_else(|| ScriptError::Internal(ecow::eco_format!("no constant {index}")))
    }

    /// Name of the function called by the `Call` at `call_ip`, when the
    /// callee was a plain variable or member.
    pub fn function_name_at(&self, call_ip: usize) -> Option<VarId> {
        self.call_names.get(&(call_ip as u32)).copied()
    }
}

/// Incremental construction of a [`Script`] by the compiler.
#[derive(Default)]
pub struct ScriptBuilder {
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    call_names: HashMap<u32, VarId>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // === Emission ===

    pub fn emit(&mut self, instruction: Instruction) -> u32 {
        let at = self.label();
        self.instructions.push(instruction);
        at
    }

    pub fn add_constant(&mut self, value: Value) -> u32 {
        let index = self.constants.len() as u32;
        self.constants.push(value);
        index
    }

    pub fn push_constant(&mut self, value: Value) {
        let index = self.add_constant(value);
        self.emit(Instruction::PushConst(index));
    }

    /// Index of the next instruction to be emitted.
    pub fn label(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Emit a forward jump whose target is filled in by [`patch_jump`](Self::patch_jump).
    pub fn jump_placeholder(&mut self, jump: Instruction) -> u32 {
        self.emit(jump.with_jump_target(u32::MAX))
    }

    /// Point the jump at `at` to the next instruction.
    pub fn patch_jump(&mut self, at: u32) {
        let target = self.label();
        if let Some(instruction) = self.instructions.get_mut(at as usize) {
            *instruction = instruction.with_jump_target(target);
        }
    }

    pub fn constant(&self, index: u32) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    pub fn last(&self) -> Option<Instruction> {
        self.instructions.last().copied()
    }

    pub fn pop_last(&mut self) -> Option<Instruction> {
        self.instructions.pop()
    }

    pub fn name_call(&mut self, call_ip: u32, name: VarId) {
        self.call_names.insert(call_ip, name);
    }

    /// Finish with a `Return`. Dangling jump targets become the `Return`.
    pub fn finish(mut self) -> Script {
        self.emit(Instruction::Return);
        let end = self.label() - 1;
        for instruction in &mut self.instructions {
            if instruction.jump_target().is_some_and(|t| t > end) {
                *instruction = instruction.with_jump_target(end);
            }
        }
        Script {
            instructions: self.instructions,
            constants: self.constants,
            call_names: self.call_names,
        }
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Script {{")?;

        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        }

        // Label every jump target, in address order.
        let targets: HashSet<u32> = self
            .instructions
            .iter()
            .filter_map(Instruction::jump_target)
            .collect();
        let mut sorted: Vec<u32> = targets.into_iter().collect();
        sorted.sort_unstable();
        let labels: HashMap<u32, usize> = sorted
            .into_iter()
            .enumerate()
            .map(|(label, addr)| (addr, label))
            .collect();

        writeln!(f, "  instructions:")?;
        for (addr, instr) in self.instructions.iter().enumerate() {
            let prefix = labels
                .get(&(addr as u32))
                .map(|label| format!("L{label}:"))
                .unwrap_or_default();
            match instr.jump_target() {
                Some(target) => {
                    let target = labels
                        .get(&target)
                        .map(|label| format!("L{label}"))
                        .unwrap_or_else(|| format!("@{target}"));
                    writeln!(f, "    {:4} {:>4}  {:?} (to {})", addr, prefix, instr, target)?;
                }
                None => writeln!(f, "    {:4} {:>4}  {:?}", addr, prefix, instr)?,
            }
        }

        write!(f, "}}")
    }
}
