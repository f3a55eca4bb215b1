//! Opaque identity ids for shared inputs.
//!
//! [`IdentityIds`] maps an `Arc` allocation to a stable `u64` for as long as
//! the allocation is alive. Entries hold only a [`Weak`], so the map never
//! keeps an input alive, and dead entries are pruned on every lookup.
//! One instance belongs to one editing session; nothing here is global.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::value::Value;

#[derive(Default)]
pub struct IdentityIds {
    next_id: u64,
    entries: HashMap<usize, (Weak<dyn Any + Send + Sync>, u64)>,
}

/// Identity of a document value: shared containers get an id, scalars are
/// compared by value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueId {
    Shared(u64),
    Scalar(Value),
}

impl IdentityIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of the allocation behind `value`.
    pub fn id_of<T: Any + Send + Sync>(&mut self, value: &Arc<T>) -> u64 {
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);

        let addr = Arc::as_ptr(value) as *const () as usize;
        if let Some((_, id)) = self.entries.get(&addr) {
            return *id;
        }

        self.next_id += 1;
        let id = self.next_id;
        let weak: Weak<T> = Arc::downgrade(value);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.entries.insert(addr, (weak, id));
        id
    }

    pub fn value_id(&mut self, value: &Value) -> ValueId {
        match value {
            Value::Array(items) => ValueId::Shared(self.id_of(items)),
            Value::Object(map) => ValueId::Shared(self.id_of(map)),
            scalar => ValueId::Scalar(scalar.clone()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(weak, _)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_allocation_same_id() {
        let mut ids = IdentityIds::new();
        let a = Arc::new(String::from("a"));
        let b = Arc::new(String::from("a"));
        assert_eq!(ids.id_of(&a), ids.id_of(&Arc::clone(&a)));
        assert_ne!(ids.id_of(&a), ids.id_of(&b));
    }

    #[test]
    fn test_entries_do_not_keep_values_alive() {
        let mut ids = IdentityIds::new();
        let a = Arc::new(vec![1, 2, 3]);
        ids.id_of(&a);
        assert_eq!(ids.len(), 1);
        drop(a);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_value_ids() {
        let mut ids = IdentityIds::new();
        let doc = Value::from(json!({"a": 1}));
        let same = doc.clone();
        let equal = Value::from(json!({"a": 1}));
        assert_eq!(ids.value_id(&doc), ids.value_id(&same));
        assert_ne!(ids.value_id(&doc), ids.value_id(&equal));
        assert_eq!(
            ids.value_id(&Value::from(3)),
            ValueId::Scalar(Value::from(3))
        );
    }
}
