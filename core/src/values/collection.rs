use std::collections::BTreeMap;

use ecow::EcoString;

use super::Value;

/// An ordered sequence plus a string-keyed mapping.
///
/// Collections are immutable once wrapped in a [`Value`]; builders mutate
/// them before sharing.
#[derive(Clone, Default)]
pub struct Collection {
    items: Vec<Value>,
    entries: BTreeMap<EcoString, Value>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Value>) -> Self {
        Self {
            items,
            entries: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn insert(&mut self, key: impl Into<EcoString>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn entries(&self) -> &BTreeMap<EcoString, Value> {
        &self.entries
    }

    /// Total number of elements, sequence and keyed.
    pub fn len(&self) -> usize {
        self.items.len() + self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th element in iteration order.
    pub fn nth(&self, index: usize) -> Option<&Value> {
        match index.checked_sub(self.items.len()) {
            None => self.items.get(index),
            Some(rest) => self.entries.values().nth(rest),
        }
    }

    /// Look up by integer position or string key. Keys that spell an
    /// integer also index the sequence.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match key {
            Value::Int(index) => usize::try_from(*index).ok().and_then(|i| self.items.get(i)),
            Value::Double(d) if d.fract() == 0.0 && *d >= 0.0 => self.items.get(*d as usize),
            Value::String(name) => self.get_by_name(name),
            _ => None,
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).or_else(|| {
            name.parse::<usize>()
                .ok()
                .and_then(|index| self.items.get(index))
        })
    }

    /// Sequence of `self` followed by `other`; keyed entries of `other` win.
    pub fn concat(&self, other: &Collection) -> Collection {
        let mut result = self.clone();
        result.items.extend(other.items.iter().cloned());
        for (key, value) in &other.entries {
            result.entries.insert(key.clone(), value.clone());
        }
        result
    }

    /// All elements in iteration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().chain(self.entries.values())
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Collection::from_items(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Collection {
        let mut c = Collection::from_items(vec![Value::Int(1), Value::Int(2)]);
        c.insert("name", Value::string("x"));
        c
    }

    #[test]
    fn test_lookup() {
        let c = sample();
        assert_eq!(c.len(), 3);
        assert!(c.get(&Value::Int(1)).is_some_and(|v| v.equal(&Value::Int(2))));
        assert!(c.get(&Value::Int(2)).is_none());
        assert!(c.get(&Value::Int(-1)).is_none());
        assert!(c.get(&Value::string("name")).is_some());
        assert!(c.get(&Value::string("0")).is_some_and(|v| v.equal(&Value::Int(1))));
    }

    #[test]
    fn test_nth_follows_iteration_order() {
        let c = sample();
        assert!(c.nth(0).is_some_and(|v| v.equal(&Value::Int(1))));
        assert!(c.nth(2).is_some_and(|v| v.equal(&Value::string("x"))));
        assert!(c.nth(3).is_none());
    }

    #[test]
    fn test_concat() {
        let mut other = Collection::from_items(vec![Value::Int(3)]);
        other.insert("name", Value::string("y"));
        let joined = sample().concat(&other);
        assert_eq!(joined.items().len(), 3);
        assert!(
            joined
                .get_by_name("name")
                .is_some_and(|v| v.equal(&Value::string("y")))
        );
    }
}
