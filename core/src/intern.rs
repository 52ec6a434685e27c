//! Process-wide interning of variable names.
//!
//! Every identifier the compiler sees, and every name a host uses with
//! `Context::set_variable`, maps 1:1 onto a small integer [`VarId`]. The
//! table only ever grows, so ids stay valid for the lifetime of the process.

use core::fmt;
use std::sync::RwLock;

use ecow::EcoString;
use hashbrown::HashMap;
use once_cell::sync::Lazy;

/// Interned variable identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    /// The implicit first argument of every call.
    pub const INPUT: VarId = VarId(0);

    /// Intern `name` (after canonicalization) and return its id.
    pub fn new(name: &str) -> VarId {
        intern(name)
    }

    pub fn name(self) -> EcoString {
        name_of(self)
    }

    /// Name bound by the `position`-th positional argument of a call.
    ///
    /// The first positional argument is `input`, later ones are `_1`, `_2`, ...
    pub fn positional(position: usize) -> VarId {
        if position == 0 {
            VarId::INPUT
        } else {
            intern(&format!("_{position}"))
        }
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", name_of(*self), self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&name_of(*self))
    }
}

struct Interner {
    ids: HashMap<EcoString, VarId>,
    names: Vec<EcoString>,
}

impl Interner {
    fn with_reserved(reserved: &[&str]) -> Self {
        let mut interner = Interner {
            ids: HashMap::new(),
            names: Vec::new(),
        };
        for name in reserved {
            interner.insert(EcoString::from(*name));
        }
        interner
    }

    fn insert(&mut self, name: EcoString) -> VarId {
        let id = VarId(self.names.len() as u32);
        self.names.push(name.clone());
        self.ids.insert(name, id);
        id
    }
}

// Order matters: the position of a name here is its fixed id.
static INTERNER: Lazy<RwLock<Interner>> =
    Lazy::new(|| RwLock::new(Interner::with_reserved(&["input"])));

/// Canonical spelling of a variable name: spaces become underscores.
pub fn canonical_name(name: &str) -> EcoString {
    if name.contains(' ') {
        EcoString::from(name.replace(' ', "_"))
    } else {
        EcoString::from(name)
    }
}

pub fn intern(name: &str) -> VarId {
    let name = canonical_name(name);
    {
        let table = INTERNER.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(&id) = table.ids.get(&name) {
            return id;
        }
    }
    let mut table = INTERNER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    // Another writer may have raced us between the two locks.
    if let Some(&id) = table.ids.get(&name) {
        return id;
    }
    table.insert(name)
}

/// Look up an already interned name without inserting it.
pub fn lookup(name: &str) -> Option<VarId> {
    let name = canonical_name(name);
    let table = INTERNER.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    table.ids.get(&name).copied()
}

pub fn name_of(id: VarId) -> EcoString {
    let table = INTERNER.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    table
        .names
        .get(id.0 as usize)
        .cloned()
        .unwrap_or_else(|| EcoString::from("<unknown>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let a = intern("card_name");
        let b = intern("card_name");
        assert_eq!(a, b);
        assert_eq!(name_of(a), "card_name");
    }

    #[test]
    fn test_spaces_are_canonicalized() {
        assert_eq!(intern("casting cost"), intern("casting_cost"));
        assert_eq!(name_of(intern("casting cost")), "casting_cost");
    }

    #[test]
    fn test_input_is_reserved() {
        assert_eq!(intern("input"), VarId::INPUT);
        assert_eq!(VarId::positional(0), VarId::INPUT);
        assert_eq!(VarId::positional(2).name(), "_2");
    }

    #[test]
    fn test_lookup_does_not_insert() {
        assert_eq!(lookup("never_interned_name_xyz"), None);
        let id = intern("now_interned_name_xyz");
        assert_eq!(lookup("now_interned_name_xyz"), Some(id));
    }
}
