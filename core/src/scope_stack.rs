//! Variable table with dynamic scoping.
//!
//! Every interned variable has exactly one live binding, indexed by its
//! [`VarId`]. Opening a scope is O(1): nothing is copied. Instead, the first
//! time a variable is assigned inside a deeper scope its previous binding is
//! pushed onto a *shadow log*, and closing the scope pops the log back to
//! where the scope started, restoring each saved binding.
//!
//! ```text
//! level 0:  x = 1                 bindings[x] = (1, 0)     log = []
//! level 1:  x = 2                 bindings[x] = (2, 1)     log = [(x, (1, 0))]
//! level 1:  x = 3                 bindings[x] = (3, 1)     log = [(x, (1, 0))]
//! close                           bindings[x] = (1, 0)     log = []
//! ```
//!
//! The log entries made since a scope opened are also exactly the variables
//! assigned in that scope, which is what closures capture.

use crate::intern::VarId;
use crate::values::Value;

#[derive(Debug, Clone, Default)]
pub struct Binding {
    pub value: Option<Value>,
    /// Scope level at which the value was assigned.
    pub level: u32,
}

/// A position in the shadow log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMark(usize);

#[derive(Debug, Default)]
pub struct ScopeStack {
    bindings: Vec<Binding>,
    shadowed: Vec<(VarId, Binding)>,
    level: u32,
    scope_starts: Vec<usize>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn open_scope(&mut self) {
        self.scope_starts.push(self.shadowed.len());
        self.level += 1;
    }

    pub fn close_scope(&mut self) {
        let Some(start) = self.scope_starts.pop() else {
            return;
        };
        self.unwind_to(start);
        self.level -= 1;
    }

    pub fn get(&self, var: VarId) -> Option<&Value> {
        self.bindings
            .get(var.0 as usize)
            .and_then(|binding| binding.value.as_ref())
    }

    /// Variables that currently have a value.
    pub fn bound(&self) -> impl Iterator<Item = VarId> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, binding)| binding.value.is_some())
            .map(|(index, _)| VarId(index as u32))
    }

    pub fn set(&mut self, var: VarId, value: Value) {
        let index = var.0 as usize;
        if index >= self.bindings.len() {
            self.bindings.resize_with(index + 1, Binding::default);
        }
        let binding = &mut self.bindings[index];
        if binding.level < self.level {
            let previous = core::mem::replace(
                binding,
                Binding {
                    value: None,
                    level: self.level,
                },
            );
            self.shadowed.push((var, previous));
        }
        binding.value = Some(value);
    }

    /// Whether `var` was assigned in the innermost open scope.
    pub fn is_bound_in_current_scope(&self, var: VarId) -> bool {
        self.bindings
            .get(var.0 as usize)
            .is_some_and(|binding| binding.level == self.level && binding.value.is_some())
    }

    /// Current values of every variable assigned since the innermost scope opened.
    pub fn current_scope_bindings(&self) -> Vec<(VarId, Value)> {
        let start = self.scope_starts.last().copied().unwrap_or(0);
        self.bindings_since(ScopeMark(start))
    }

    pub fn mark(&self) -> ScopeMark {
        ScopeMark(self.shadowed.len())
    }

    /// Current values of every variable assigned since `mark`.
    pub fn bindings_since(&self, mark: ScopeMark) -> Vec<(VarId, Value)> {
        self.shadowed[mark.0.min(self.shadowed.len())..]
            .iter()
            .filter_map(|(var, _)| self.get(*var).map(|value| (*var, value.clone())))
            .collect()
    }

    /// Undo every assignment made since `mark`, then apply `bindings`.
    /// The scope level is left unchanged.
    pub fn reset_to(&mut self, mark: ScopeMark, bindings: &[(VarId, Value)]) {
        self.unwind_to(mark.0);
        for (var, value) in bindings {
            self.set(*var, value.clone());
        }
    }

    fn unwind_to(&mut self, start: usize) {
        while self.shadowed.len() > start {
            if let Some((var, previous)) = self.shadowed.pop() {
                self.bindings[var.0 as usize] = previous;
            }
        }
    }
}
