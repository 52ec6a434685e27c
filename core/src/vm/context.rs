//! The virtual machine.
//!
//! A [`Context`] owns everything that changes during evaluation: the
//! variable table (see [`ScopeStack`]), the operand stack shared by nested
//! evaluations and the recursion depth. Scripts themselves are immutable and
//! can be evaluated by any number of contexts.
//!
//! Function arguments are passed by name: a call opens a scope, assigns each
//! argument to its variable and invokes the callee, which reads them back.
//! Every exit path of a call or evaluation closes the scopes it opened and
//! restores the operand stack to its size on entry.

use std::sync::Arc;

use ecow::EcoString;
use tracing::{debug, trace};

use super::operators;
use super::{Instruction, Script};
use crate::api::ExecutionOptions;
use crate::errors::ScriptError;
use crate::intern::{self, VarId};
use crate::scope_stack::ScopeStack;
use crate::values::{Closure, Collection, FromValue, Function, NativeFunction, Value};

pub struct Context {
    pub(super) scopes: ScopeStack,
    pub(super) stack: Vec<Value>,
    pub(super) depth: usize,
    iterations: usize,
    options: ExecutionOptions,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(ExecutionOptions::default())
    }

    pub fn with_options(options: ExecutionOptions) -> Self {
        Self {
            scopes: ScopeStack::new(),
            stack: Vec::new(),
            depth: 0,
            iterations: 0,
            options,
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    // === Variables ===

    pub fn set_variable(&mut self, var: VarId, value: Value) {
        self.scopes.set(var, value);
    }

    /// Set a variable by name, interning it.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.scopes.set(intern::intern(name), value.into());
    }

    pub fn get_variable(&self, var: VarId) -> Result<Value, ScriptError> {
        self.scopes
            .get(var)
            .cloned()
            .ok_or_else(|| ScriptError::NoSuchVariable { name: var.name() })
    }

    pub fn get_variable_opt(&self, var: VarId) -> Option<&Value> {
        self.scopes.get(var)
    }

    /// Look a variable up by name.
    pub fn get(&self, name: &str) -> Result<Value, ScriptError> {
        match intern::lookup(name) {
            Some(var) => self.get_variable(var),
            None => Err(ScriptError::NoSuchVariable {
                name: intern::canonical_name(name),
            }),
        }
    }

    /// Names of all variables with a value, builtins included.
    pub fn variable_names(&self) -> Vec<EcoString> {
        self.scopes.bound().map(VarId::name).collect()
    }

    pub fn register_builtin(&mut self, function: NativeFunction) {
        let var = intern::intern(function.name());
        self.set_variable(var, Value::native(function));
    }

    // === Parameters ===

    /// A required argument of the running function.
    pub fn param<T: FromValue>(&self, name: &str) -> Result<T, ScriptError> {
        T::from_value(&self.get(name)?)
    }

    /// An optional argument, `None` when the caller did not bind it.
    pub fn param_opt<T: FromValue>(&self, name: &str) -> Result<Option<T>, ScriptError> {
        match intern::lookup(name).and_then(|var| self.scopes.get(var)) {
            Some(value) => T::from_value(value).map(Some),
            None => Ok(None),
        }
    }

    pub fn param_or<T: FromValue>(&self, name: &str, default: T) -> Result<T, ScriptError> {
        Ok(self.param_opt(name)?.unwrap_or(default))
    }

    /// The implicit first argument.
    pub fn input(&self) -> Result<Value, ScriptError> {
        self.get_variable(VarId::INPUT)
    }

    // === Scopes ===

    pub fn open_scope(&mut self) {
        self.scopes.open_scope();
        trace!(level = self.scopes.level(), "open scope");
    }

    pub fn close_scope(&mut self) {
        trace!(level = self.scopes.level(), "close scope");
        self.scopes.close_scope();
    }

    /// Run `f`, inside a fresh scope when `open` is set.
    pub fn scoped<R>(&mut self, open: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        if !open {
            return f(self);
        }
        self.open_scope();
        let result = f(self);
        self.close_scope();
        result
    }

    pub fn is_bound_in_current_scope(&self, var: VarId) -> bool {
        self.scopes.is_bound_in_current_scope(var)
    }

    /// Bundle `function` with every variable bound in the current scope.
    pub fn make_closure(&self, function: Value) -> Value {
        Value::Closure(Arc::new(Closure::new(
            function,
            self.scopes.current_scope_bindings(),
        )))
    }

    /// Size of the operand stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of nested evaluations in progress.
    pub fn depth(&self) -> usize {
        self.depth
    }

    // === Evaluation ===

    /// Evaluate `script`, optionally in a new scope.
    ///
    /// On error the operand stack and the scope level are restored to their
    /// state on entry.
    pub fn evaluate(&mut self, script: &Script, open_scope: bool) -> Result<Value, ScriptError> {
        let stack_size = self.stack.len();
        let result = self.nested(|ctx| ctx.scoped(open_scope, |ctx| ctx.run(script)));

        if result.is_err() {
            self.stack.truncate(stack_size);
        }
        debug_assert!(result.is_err() || self.stack.len() == stack_size);
        result
    }

    /// Run `f` one call level deeper. Fails with `StackOverflow` instead
    /// once `max_depth` levels are in progress.
    pub(crate) fn nested<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ScriptError>,
    ) -> Result<R, ScriptError> {
        if self.depth >= self.options.max_depth {
            debug!(depth = self.depth, "stack overflow");
            return Err(ScriptError::StackOverflow {
                depth: self.depth,
                max_depth: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn run(&mut self, script: &Script) -> Result<Value, ScriptError> {
        let instructions = script.instructions();
        let mut ip = 0;

        loop {
            let instruction = *instructions
                .get(ip)
                .ok_or_else(|| internal("instruction pointer out of bounds"))?;
            let call_ip = ip;
            ip += 1;

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

                Jump(target) => ip = target as usize,
                JumpIfNot(target) => {
                    if !self.pop()?.to_bool()? {
                        ip = target as usize;
                    }
                }
                JumpShortAnd(target) => {
                    if !self.top()?.to_bool()? {
                        ip = target as usize;
                    } else {
                        self.pop()?;
                    }
                }
                JumpShortOr(target) => {
                    if self.top()?.to_bool()? {
                        ip = target as usize;
                    } else {
                        self.pop()?;
                    }
                }

                GetVar(var) => {
                    let value = self.get_variable(var)?;
                    self.stack.push(value);
                }
                SetVar(var) => {
                    let value = self.top()?.clone();
                    self.set_variable(var, value);
                }
                MemberConst(index) => {
                    let name = script.constant(index)?;
                    let object = self.pop()?;
                    self.stack.push(object.get_member(name));
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
                        Value::Error(error) => return Err((**error).clone()),
                        other => return Err(ScriptError::conversion(other.type_name(), "iterator")),
                    };
                    match step {
                        Some(step) => {
                            self.count_iteration()?;
                            self.stack.push(step.value);
                            if with_key {
                                self.stack.push(step.key.unwrap_or_default());
                            }
                        }
                        None => {
                            let accumulator = self.pop()?;
                            self.pop()?;
                            self.stack.push(accumulator);
                            ip = end as usize;
                        }
                    }
                }

                Call(argc) => {
                    let names = arg_names(instructions, ip, argc)?;
                    ip += argc as usize;
                    let args = self.pop_n(argc as usize)?;
                    let callee = self.pop()?;
                    let result = self.call_with_args(&callee, &names, args);
                    match result {
                        Ok(value) => self.stack.push(value),
                        Err(error) => {
                            let error = match function_name(script, call_ip, &callee) {
                                Some(name) => error.in_function(name),
                                None => error,
                            };
                            if error.is_fatal() || !is_native(&callee) {
                                return Err(error);
                            }
                            self.stack.push(Value::delayed_error(error));
                        }
                    }
                }
                MakeClosure(argc) => {
                    let names = arg_names(instructions, ip, argc)?;
                    ip += argc as usize;
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
                        match key {
                            Value::Nil => collection.push(value),
                            key => collection.insert(key.to_string()?, value),
                        }
                    }
                    self.stack.push(Value::collection(collection));
                }

                Unary(op) => {
                    let a = self.pop()?;
                    self.stack.push(operators::unary(op, a));
                }
                Binary(op) => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(operators::binary(op, a, b)?);
                }
                Ternary(op) => {
                    let c = self.pop()?;
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(operators::ternary(op, a, b, c));
                }
                Quaternary(op) => {
                    let d = self.pop()?;
                    let c = self.pop()?;
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(operators::quaternary(op, a, b, c, d));
                }
            }
        }
    }

    /// Call `callee` in a new scope with the given named arguments.
    pub fn call_with_args(
        &mut self,
        callee: &Value,
        names: &[VarId],
        args: Vec<Value>,
    ) -> Result<Value, ScriptError> {
        self.scoped(true, |ctx| {
            for (var, value) in names.iter().zip(args) {
                ctx.set_variable(*var, value);
            }
            callee.call(ctx, false)
        })
    }

    /// Call `callee` with `input` bound to `value`.
    pub fn call_with_input(&mut self, callee: &Value, value: Value) -> Result<Value, ScriptError> {
        self.call_with_args(callee, &[VarId::INPUT], vec![value])
    }

    pub(super) fn pop(&mut self) -> Result<Value, ScriptError> {
        self.stack.pop().ok_or_else(|| internal("stack underflow"))
    }

    pub(super) fn top(&self) -> Result<&Value, ScriptError> {
        self.stack.last().ok_or_else(|| internal("stack underflow"))
    }

    /// Pop `n` values, returned in push order.
    pub(super) fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, ScriptError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or_else(|| internal("stack underflow"))?;
        Ok(self.stack.split_off(start))
    }

    fn count_iteration(&mut self) -> Result<(), ScriptError> {
        self.iterations += 1;
        match self.options.max_iterations {
            Some(limit) if self.iterations > limit => Err(ScriptError::IterationLimit { limit }),
            _ => Ok(()),
        }
    }
}

/// Names of the `argc` arguments encoded by the `Arg` instructions at `ip`.
pub(super) fn arg_names(
    instructions: &[Instruction],
    ip: usize,
    argc: u32,
) -> Result<Vec<VarId>, ScriptError> {
    instructions
        .get(ip..ip + argc as usize)
        .ok_or_else(|| internal("missing call arguments"))?
        .iter()
        .map(|instruction| match instruction {
            Instruction::Arg(var) => Ok(*var),
            other => Err(internal(&format!("expected argument name, found {other:?}"))),
        })
        .collect()
}

fn function_name(script: &Script, call_ip: usize, callee: &Value) -> Option<EcoString> {
    if let Some(var) = script.function_name_at(call_ip) {
        return Some(var.name());
    }
    match callee {
        Value::Function(function) => function.name().cloned(),
        _ => None,
    }
}

/// Natives, and closures over them, have their failures turned into
/// DelayedErrors by the caller.
fn is_native(callee: &Value) -> bool {
    match callee {
        Value::Function(Function::Native(_)) | Value::Function(Function::Rule(_)) => true,
        Value::Closure(closure) => is_native(closure.function()),
        _ => false,
    }
}

pub(super) fn internal(message: &str) -> ScriptError {
    ScriptError::Internal(message.into())
}
