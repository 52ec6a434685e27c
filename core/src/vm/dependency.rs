//! Dependency analysis: abstract interpretation of a [`Script`].
//!
//! Hosts cache the results of scripts and must know which inputs a script
//! reads to invalidate those caches. Running the analysis executes the
//! script over *abstract* values: host objects see member accesses through
//! [`ScriptObject::dependency_member`] and record the [`Dependency`] being
//! traced, while everything the analysis cannot know becomes a dummy value.
//!
//! Control flow is explored without evaluating conditions:
//!
//! - A conditional jump forks. The taken branch is queued as a
//!   `JumpRecord` (target, operand stack, bindings) and the fall-through
//!   continues.
//! - A forward `Jump` resumes the queued branch with the lowest target
//!   first when that target comes earlier, so both arms of an `if` run
//!   before the code after it.
//! - Whenever execution reaches the target of queued records they are
//!   merged into the running state by unifying values.
//! - Iterators yield a single dummy value, so every loop body runs once.

use core::any::Any;
use core::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ecow::EcoString;

use super::context::{arg_names, internal};
use super::{BinaryOp, Context, Instruction, Script, UnaryOp};
use crate::errors::ScriptError;
use crate::intern::VarId;
use crate::scope_stack::ScopeMark;
use crate::values::{
    Closure, Collection, IterStep, ScriptIterator, ScriptObject, Value, ValueIterator,
};

/// The kind of host data whose change is being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    /// A field of the card being rendered.
    CardField,
    /// The same field of every card in the set.
    CardsField,
    SetField,
    Style,
    ExtraCardField,
    /// Copy the dependencies of a card field.
    CardCopyDep,
    /// Copy the dependencies of a set field.
    SetCopyDep,
    Dummy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub kind: DependencyKind,
    /// Index of the dependent item in its host's list.
    pub index: usize,
}

impl Dependency {
    pub fn new(kind: DependencyKind, index: usize) -> Self {
        Self { kind, index }
    }

    pub fn dummy() -> Self {
        Self::new(DependencyKind::Dummy, 0)
    }
}

// ============================================================================
// Abstract values
// ============================================================================

/// A value the analysis knows nothing about.
struct DependencyDummy;

impl ScriptObject for DependencyDummy {
    fn type_name(&self) -> &'static str {
        "dependency dummy"
    }

    fn get_member(&self, _name: &str) -> Value {
        Value::dependency_dummy()
    }

    fn make_iterator(&self) -> Value {
        once_dummy_iterator()
    }

    fn to_string(&self) -> Result<EcoString, ScriptError> {
        Ok(EcoString::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A variable read before it was assigned.
struct MissingVariable(VarId);

impl ScriptObject for MissingVariable {
    fn type_name(&self) -> &'static str {
        "missing variable"
    }

    fn make_iterator(&self) -> Value {
        once_dummy_iterator()
    }

    fn to_code(&self) -> EcoString {
        ecow::eco_format!("<missing variable {}>", self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Either of two values, when control flow merged two paths.
struct DependencyUnion(Value, Value);

impl ScriptObject for DependencyUnion {
    fn type_name(&self) -> &'static str {
        "dependency union"
    }

    fn dependency_member(&self, name: &str, dep: &Dependency) -> Value {
        unify(
            self.0.dependency_member(name, dep),
            self.1.dependency_member(name, dep),
        )
    }

    fn make_iterator(&self) -> Value {
        once_dummy_iterator()
    }

    fn dependencies(&self, ctx: &mut Context, dep: &Dependency) -> Result<Value, ScriptError> {
        let a = self.0.dependencies(ctx, dep)?;
        let b = self.1.dependencies(ctx, dep)?;
        Ok(unify(a, b))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Yields one dummy, then stops.
struct OnceDummy(bool);

impl ValueIterator for OnceDummy {
    fn next_step(&mut self) -> Option<IterStep> {
        if self.0 {
            return None;
        }
        self.0 = true;
        Some(IterStep {
            value: Value::dependency_dummy(),
            key: Some(Value::dependency_dummy()),
            index: Some(0),
        })
    }
}

fn once_dummy_iterator() -> Value {
    Value::Iterator(ScriptIterator::new(OnceDummy(false)))
}

/// A value standing for both `a` and `b`.
pub fn unify(a: Value, b: Value) -> Value {
    if a.is_dependency_dummy() {
        return b;
    }
    if b.is_dependency_dummy() {
        return a;
    }
    if a.equal(&b) {
        return a;
    }
    Value::object(DependencyUnion(a, b))
}

impl Value {
    pub fn dependency_dummy() -> Value {
        Value::object(DependencyDummy)
    }

    pub fn is_dependency_dummy(&self) -> bool {
        match self {
            Value::Object(object) => {
                let any = object.as_any();
                any.is::<DependencyDummy>() || any.is::<MissingVariable>()
            }
            _ => false,
        }
    }

    /// Member access during dependency analysis.
    pub fn dependency_member(&self, name: &str, dep: &Dependency) -> Value {
        match self {
            Value::Object(object) => object.dependency_member(name, dep),
            Value::Collection(_) => match self.member(name) {
                Value::Error(_) => Value::dependency_dummy(),
                member => member,
            },
            _ => Value::dependency_dummy(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// A queued branch: resume at `target` with this state.
struct JumpRecord {
    target: u32,
    stack: Vec<Value>,
    bindings: Vec<(VarId, Value)>,
}

// Lowest target first.
impl Ord for JumpRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        other.target.cmp(&self.target)
    }
}

impl PartialOrd for JumpRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for JumpRecord {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for JumpRecord {}

impl Context {
    /// Run the dependency analysis of `script` for changes described by `dep`.
    ///
    /// The result is the abstract value of the script. The operand stack and
    /// the variable table are left as they were.
    pub fn dependencies(&mut self, dep: &Dependency, script: &Script) -> Result<Value, ScriptError> {
        if self.depth() >= self.options().max_depth {
            return Err(ScriptError::StackOverflow {
                depth: self.depth(),
                max_depth: self.options().max_depth,
            });
        }
        let stack_size = self.stack.len();
        self.depth += 1;
        self.open_scope();
        let result = self.analyze(dep, script);
        self.close_scope();
        self.depth -= 1;
        self.stack.truncate(stack_size);
        result
    }

    fn analyze(&mut self, dep: &Dependency, script: &Script) -> Result<Value, ScriptError> {
        let instructions = script.instructions();
        let base = self.stack.len();
        let mark = self.scopes.mark();
        let mut jumps: BinaryHeap<JumpRecord> = BinaryHeap::new();
        let mut ip: u32 = 0;

        loop {
            while jumps.peek().is_some_and(|jump| jump.target == ip) {
                if let Some(jump) = jumps.pop() {
                    self.merge(base, jump);
                }
            }

            let instruction = *instructions
                .get(ip as usize)
                .ok_or_else(|| internal("instruction pointer out of bounds"))?;
            let next = ip + 1;
            ip = next;

            use Instruction::*;
            match instruction {
                Nop | Arg(_) => {}
                PushConst(index) => {
                    let value = script.constant(index)?.clone();
                    self.stack.push(value);
                }
                Pop => {
                    self.pop()?;
                }
                Dup(n) => {
                    let index = self
                        .stack
                        .len()
                        .checked_sub(n as usize + 1)
                        .ok_or_else(|| internal("stack underflow"))?;
                    let value = self.stack[index].clone();
                    self.stack.push(value);
                }
                Return => return self.pop(),

                Jump(target) => {
                    if target < next {
                        // Loop back-edge: the abstract iterator ends the loop.
                        ip = target;
                    } else if jumps.peek().is_some_and(|jump| jump.target < target) {
                        let record = self.record(base, mark, target);
                        jumps.push(record);
                        if let Some(jump) = jumps.pop() {
                            ip = jump.target;
                            self.restore(base, mark, jump);
                        }
                    } else {
                        ip = target;
                    }
                }
                JumpIfNot(target) => {
                    self.pop()?;
                    jumps.push(self.record(base, mark, target));
                }
                JumpShortAnd(target) | JumpShortOr(target) => {
                    jumps.push(self.record(base, mark, target));
                    self.pop()?;
                }

                GetVar(var) => {
                    let value = match self.get_variable_opt(var) {
                        Some(value) => value.clone(),
                        None => Value::object(MissingVariable(var)),
                    };
                    self.stack.push(value);
                }
                SetVar(var) => {
                    let value = self.top()?.clone();
                    self.set_variable(var, value);
                }
                MemberConst(index) => {
                    let name = script.constant(index)?.to_string()?;
                    let object = self.pop()?;
                    self.stack.push(object.dependency_member(&name, dep));
                }

                Loop(end) | LoopWithKey(end) => {
                    let with_key = matches!(instruction, LoopWithKey(_));
                    let iterator = self
                        .stack
                        .len()
                        .checked_sub(2)
                        .map(|i| self.stack[i].clone())
                        .ok_or_else(|| internal("stack underflow"))?;
                    let step = match &iterator {
                        Value::Iterator(iterator) => iterator.next_step(),
                        _ => None,
                    };
                    match step {
                        Some(step) => {
                            self.stack.push(step.value);
                            if with_key {
                                self.stack.push(step.key.unwrap_or_default());
                            }
                        }
                        None => {
                            let accumulator = self.pop()?;
                            self.pop()?;
                            self.stack.push(accumulator);
                            ip = end;
                        }
                    }
                }

                Call(argc) => {
                    let names = arg_names(instructions, next as usize, argc)?;
                    ip += argc;
                    let args = self.pop_n(argc as usize)?;
                    let callee = self.pop()?;
                    let result = self.scoped(true, |ctx| {
                        for (var, value) in names.iter().zip(args) {
                            ctx.set_variable(*var, value);
                        }
                        callee.dependencies(ctx, dep)
                    });
                    match result {
                        Ok(value) => self.stack.push(value),
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(_) => self.stack.push(Value::dependency_dummy()),
                    }
                }
                MakeClosure(argc) => {
                    let names = arg_names(instructions, next as usize, argc)?;
                    ip += argc;
                    let args = self.pop_n(argc as usize)?;
                    let function = self.pop()?;
                    let closure = Closure::new(function, names.into_iter().zip(args));
                    self.stack.push(Value::Closure(Arc::new(closure)));
                }
                MakeCollection(count) => {
                    let pairs = self.pop_n(2 * count as usize)?;
                    let mut collection = Collection::new();
                    let mut pairs = pairs.into_iter();
                    while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
                        match key.to_string() {
                            Ok(key) if !key.is_empty() => collection.insert(key, value),
                            _ => collection.push(value),
                        }
                    }
                    self.stack.push(Value::collection(collection));
                }

                Unary(op) => {
                    self.pop()?;
                    self.stack.push(match op {
                        UnaryOp::MakeIterator => once_dummy_iterator(),
                        _ => Value::dependency_dummy(),
                    });
                }
                Binary(op) => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(match op {
                        BinaryOp::Add => unify(a, b),
                        BinaryOp::OrElse => unify(a, b),
                        BinaryOp::Member => match b.to_string() {
                            Ok(name) => a.dependency_member(&name, dep),
                            Err(_) => Value::dependency_dummy(),
                        },
                        BinaryOp::RangeIterator => once_dummy_iterator(),
                        _ => Value::dependency_dummy(),
                    });
                }
                Ternary(_) => {
                    self.pop_n(3)?;
                    self.stack.push(Value::dependency_dummy());
                }
                Quaternary(_) => {
                    self.pop_n(4)?;
                    self.stack.push(Value::dependency_dummy());
                }
            }
        }
    }

    fn record(&self, base: usize, mark: ScopeMark, target: u32) -> JumpRecord {
        JumpRecord {
            target,
            stack: self.stack[base.min(self.stack.len())..].to_vec(),
            bindings: self.scopes.bindings_since(mark),
        }
    }

    fn restore(&mut self, base: usize, mark: ScopeMark, jump: JumpRecord) {
        self.stack.truncate(base);
        self.stack.extend(jump.stack);
        self.scopes.reset_to(mark, &jump.bindings);
    }

    /// Merge a queued branch that reached the current instruction.
    fn merge(&mut self, base: usize, jump: JumpRecord) {
        if self.stack.len() >= base && self.stack.len() - base == jump.stack.len() {
            for (slot, other) in self.stack[base..].iter_mut().zip(jump.stack) {
                *slot = unify(core::mem::take(slot), other);
            }
        }
        for (var, other) in jump.bindings {
            let merged = match self.get_variable_opt(var) {
                Some(current) => unify(current.clone(), other),
                None => other,
            };
            self.set_variable(var, merged);
        }
    }
}
