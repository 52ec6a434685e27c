//! The iterator protocol behind `for` loops and collection traversal.

use core::fmt;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use ecow::EcoString;

use super::{Collection, Value};

/// One step of an iteration.
#[derive(Debug, Clone)]
pub struct IterStep {
    pub value: Value,
    pub key: Option<Value>,
    pub index: Option<i64>,
}

impl IterStep {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            key: None,
            index: None,
        }
    }
}

/// A source of loop values. Iterators are one-shot: once `next_step`
/// returns `None` they stay exhausted.
pub trait ValueIterator: Send {
    fn next_step(&mut self) -> Option<IterStep>;
}

/// Shared handle to a running iterator.
///
/// Cloning the handle does not copy the iteration state, all clones advance
/// the same underlying iterator.
#[derive(Clone)]
pub struct ScriptIterator(Arc<Mutex<Box<dyn ValueIterator>>>);

impl ScriptIterator {
    pub fn new(iterator: impl ValueIterator + 'static) -> Self {
        ScriptIterator(Arc::new(Mutex::new(Box::new(iterator))))
    }

    pub fn next_step(&self) -> Option<IterStep> {
        let mut inner = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.next_step()
    }

    pub fn ptr_eq(&self, other: &ScriptIterator) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ScriptIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<iterator>")
    }
}

/// Yields the sequence part of a collection, then its keyed entries.
pub struct CollectionIter {
    collection: Arc<Collection>,
    position: usize,
    last_key: Option<EcoString>,
    done: bool,
}

impl CollectionIter {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self {
            collection,
            position: 0,
            last_key: None,
            done: false,
        }
    }
}

impl ValueIterator for CollectionIter {
    fn next_step(&mut self) -> Option<IterStep> {
        if self.done {
            return None;
        }
        let index = self.position as i64;
        if let Some(value) = self.collection.items().get(self.position) {
            self.position += 1;
            return Some(IterStep {
                value: value.clone(),
                key: Some(Value::Int(index)),
                index: Some(index),
            });
        }

        let lower = match &self.last_key {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let Some((key, value)) = self
            .collection
            .entries()
            .range((lower, Bound::Unbounded))
            .next()
        else {
            self.done = true;
            return None;
        };
        self.position += 1;
        self.last_key = Some(key.clone());
        Some(IterStep {
            value: value.clone(),
            key: Some(Value::String(key.clone())),
            index: Some(index),
        })
    }
}

/// Inclusive integer range produced by `for x from a to b`.
pub struct RangeIter {
    start: i64,
    /// `None` once the range is exhausted, including past `i64::MAX`.
    next: Option<i64>,
    end: i64,
}

impl RangeIter {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            next: Some(start),
            end,
        }
    }
}

impl ValueIterator for RangeIter {
    fn next_step(&mut self) -> Option<IterStep> {
        let value = self.next.filter(|&value| value <= self.end)?;
        self.next = value.checked_add(1);
        let index = value.saturating_sub(self.start);
        Some(IterStep {
            value: Value::Int(value),
            key: Some(Value::Int(index)),
            index: Some(index),
        })
    }
}
