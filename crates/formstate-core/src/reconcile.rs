//! Immutable structural reconciliation.
//!
//! Given a previous and a next version of an immutable structure, produce a
//! value equal to `next` that reuses every `Arc` from `previous` whose
//! subtree did not change. Neither input is mutated.
//!
//! Rules, in priority order:
//!
//! 1. Identical instances are returned immediately.
//! 2. No previous value: `next` is returned as-is.
//! 3. Different shapes (variant, scalar vs container): `next`.
//! 4. Sequences of different length: `next` wholesale. Equal lengths are
//!    reconciled element-wise; `previous` is returned when every element
//!    came back as its previous instance.
//! 5. Atomic nodes (schema types, or whatever an injected predicate says)
//!    are returned as `next` without being inspected.
//! 6. Maps and records are reconciled entry by entry; an added or removed
//!    key always counts as a change.
//!
//! Termination relies on the input shape, not on visited-set tracking.
//! Schema types are the only cyclic values in this crate and are atomic;
//! a cyclic plain structure is not supported and may overflow the stack.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crate::path::Path;
use crate::schema::SchemaType;
use crate::state_tree::StateTree;
use crate::value::{Map, Value};

/// Structural reconciliation against a previous instance.
pub trait Reconcile: Sized {
    /// Merge `next` against `previous`, reusing unchanged parts of `previous`.
    fn reconcile(previous: &Self, next: Self) -> Self;

    /// `true` when `self` is the same instance as `other`.
    fn same(&self, other: &Self) -> bool;
}

/// Record types whose fields are reconciled one by one.
///
/// Return `None` when every reconciled field is the same instance as in
/// `previous`, so the caller can keep the previous `Arc`.
pub trait ReconcileFields: Sized {
    fn reconcile_fields(previous: &Self, next: Self) -> Option<Self>;
}

/// Reconcile `next` against an optional previous value.
pub fn reconcile<T: Reconcile>(previous: Option<&T>, next: T) -> T {
    match previous {
        None => next,
        Some(previous) => T::reconcile(previous, next),
    }
}

/// Implement [`ReconcileFields`] for a struct by listing every field.
macro_rules! reconcile_fields {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::reconcile::ReconcileFields for $ty {
            fn reconcile_fields(previous: &Self, next: Self) -> Option<Self> {
                let mut unchanged = true;
                $(
                    let $field =
                        $crate::reconcile::Reconcile::reconcile(&previous.$field, next.$field);
                    unchanged &= $crate::reconcile::Reconcile::same(&$field, &previous.$field);
                )*
                if unchanged {
                    None
                } else {
                    Some(Self { $($field),* })
                }
            }
        }
    };
}
pub(crate) use reconcile_fields;

/// Implement [`Reconcile`] for an enum whose variants each hold one
/// reconcilable payload. A variant change always yields `next`.
macro_rules! reconcile_variants {
    ($ty:ident { $($variant:ident),* $(,)? }) => {
        impl $crate::reconcile::Reconcile for $ty {
            fn reconcile(previous: &Self, next: Self) -> Self {
                match (previous, next) {
                    $(
                        ($ty::$variant(p), $ty::$variant(n)) => {
                            $ty::$variant($crate::reconcile::Reconcile::reconcile(p, n))
                        }
                    )*
                    #[allow(unreachable_patterns)]
                    (_, next) => next,
                }
            }

            fn same(&self, other: &Self) -> bool {
                match (self, other) {
                    $(
                        ($ty::$variant(a), $ty::$variant(b)) => {
                            $crate::reconcile::Reconcile::same(a, b)
                        }
                    )*
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
pub(crate) use reconcile_variants;

// ---------------------------------------------------------------------------
// Scalars: identity is equality
// ---------------------------------------------------------------------------

macro_rules! reconcile_by_equality {
    ($($ty:ty),*) => {
        $(
            impl $crate::reconcile::Reconcile for $ty {
                fn reconcile(previous: &Self, next: Self) -> Self {
                    if *previous == next { previous.clone() } else { next }
                }

                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

pub(crate) use reconcile_by_equality;

reconcile_by_equality!(bool, u32, usize, String, Path);

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

impl<T: Reconcile> Reconcile for Option<T> {
    fn reconcile(previous: &Self, next: Self) -> Self {
        match (previous, next) {
            (Some(p), Some(n)) => Some(T::reconcile(p, n)),
            (_, next) => next,
        }
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }
}

impl<T: ReconcileFields + Clone> Reconcile for Arc<T> {
    fn reconcile(previous: &Self, next: Self) -> Self {
        if Arc::ptr_eq(previous, &next) {
            return next;
        }
        match T::reconcile_fields(previous, Arc::unwrap_or_clone(next)) {
            None => Arc::clone(previous),
            Some(merged) => Arc::new(merged),
        }
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Reconcile + Clone> Reconcile for Arc<[T]> {
    fn reconcile(previous: &Self, next: Self) -> Self {
        if Arc::ptr_eq(previous, &next) || previous.len() != next.len() {
            return next;
        }
        let mut unchanged = true;
        let items: Vec<T> = previous
            .iter()
            .zip(next.iter())
            .map(|(p, n)| {
                let item = T::reconcile(p, n.clone());
                unchanged &= item.same(p);
                item
            })
            .collect();
        if unchanged {
            Arc::clone(previous)
        } else {
            items.into()
        }
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// Schema types are cyclic and reference-stable: always atomic.
impl Reconcile for Arc<SchemaType> {
    fn reconcile(_previous: &Self, next: Self) -> Self {
        next
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Reconcile + Clone + PartialEq> Reconcile for Arc<StateTree<T>> {
    fn reconcile(previous: &Self, next: Self) -> Self {
        if Arc::ptr_eq(previous, &next) {
            return next;
        }
        let merged = match (previous.as_ref(), next.as_ref()) {
            (StateTree::Empty, StateTree::Empty) => Some(None),
            (StateTree::Leaf(p), StateTree::Leaf(n)) if p.same(n) => Some(None),
            (
                StateTree::Branch {
                    value: prev_value,
                    children: prev_children,
                },
                StateTree::Branch { value, children },
            ) => {
                let value = Option::reconcile(prev_value, value.clone());
                let mut unchanged = value.same(prev_value);
                let children = reconcile_map(prev_children, children.clone(), &mut unchanged);
                if unchanged {
                    Some(None)
                } else {
                    Some(Some(StateTree::Branch { value, children }))
                }
            }
            _ => None,
        };
        match merged {
            Some(None) => Arc::clone(previous),
            Some(Some(tree)) => Arc::new(tree),
            None => next,
        }
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// Key-by-key reconciliation of a map. Clears `unchanged` on any added,
/// removed or changed entry.
fn reconcile_map<T: Reconcile>(
    previous: &BTreeMap<String, T>,
    next: BTreeMap<String, T>,
    unchanged: &mut bool,
) -> BTreeMap<String, T> {
    if previous.len() != next.len() {
        *unchanged = false;
    }
    next.into_iter()
        .map(|(key, value)| match previous.get(&key) {
            Some(prev) => {
                let value = T::reconcile(prev, value);
                *unchanged &= value.same(prev);
                (key, value)
            }
            None => {
                *unchanged = false;
                (key, value)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dynamic values
// ---------------------------------------------------------------------------

type AtomicPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Reconciler for dynamic [`Value`] graphs with an injectable predicate
/// deciding which nodes are atomic (returned as `next` without diffing).
pub struct Reconciler {
    is_atomic: AtomicPredicate,
}

impl Default for Reconciler {
    /// Treats schema-type-shaped objects (a string `name` and a string
    /// `jsonType`) as atomic.
    fn default() -> Self {
        Self::with_atomic(is_schema_type_shaped)
    }
}

impl Reconciler {
    pub fn with_atomic<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            is_atomic: Box::new(predicate),
        }
    }

    /// Reconcile `next` against `previous` (`None` meaning no prior state).
    pub fn reconcile(&self, previous: Option<&Value>, next: &Value) -> Value {
        match previous {
            None => next.clone(),
            Some(previous) => self.reconcile_value(previous, next),
        }
    }

    fn reconcile_value(&self, previous: &Value, next: &Value) -> Value {
        if previous.ptr_eq(next) {
            return previous.clone();
        }
        match (previous, next) {
            (Value::Array(prev), Value::Array(items)) => {
                if prev.len() != items.len() {
                    return next.clone();
                }
                let mut unchanged = true;
                let reconciled: Vec<Value> = prev
                    .iter()
                    .zip(items.iter())
                    .map(|(p, n)| {
                        let item = self.reconcile_value(p, n);
                        unchanged &= item.ptr_eq(p);
                        item
                    })
                    .collect();
                if unchanged {
                    previous.clone()
                } else {
                    Value::array(reconciled)
                }
            }
            (Value::Object(_), Value::Object(_)) if (self.is_atomic)(next) => next.clone(),
            (Value::Object(prev), Value::Object(map)) => {
                let mut unchanged = prev.len() == map.len();
                let reconciled: Map = map
                    .iter()
                    .map(|(key, value)| match prev.get(key) {
                        Some(p) => {
                            let value = self.reconcile_value(p, value);
                            unchanged &= value.ptr_eq(p);
                            (key.clone(), value)
                        }
                        None => {
                            unchanged = false;
                            (key.clone(), value.clone())
                        }
                    })
                    .collect();
                if unchanged {
                    previous.clone()
                } else {
                    Value::object(reconciled)
                }
            }
            _ => next.clone(),
        }
    }
}

/// An object carrying both a string `name` and a string `jsonType`.
pub fn is_schema_type_shaped(value: &Value) -> bool {
    value.get("name").and_then(Value::as_str).is_some()
        && value.get("jsonType").and_then(Value::as_str).is_some()
}

static DEFAULT_RECONCILER: LazyLock<Reconciler> = LazyLock::new(Reconciler::default);

impl Reconcile for Value {
    fn reconcile(previous: &Self, next: Self) -> Self {
        DEFAULT_RECONCILER.reconcile_value(previous, &next)
    }

    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(raw: serde_json::Value) -> Value {
        Value::from(raw)
    }

    #[test]
    fn test_unchanged_branch_is_reused() {
        let previous = v(json!({"a": [1, 2], "b": {"x": 1}}));
        let next = v(json!({"a": [1, 2], "b": {"x": 2}}));

        let result = Reconciler::default().reconcile(Some(&previous), &next);

        assert!(result.get("a").unwrap().ptr_eq(previous.get("a").unwrap()));
        assert!(!result.get("b").unwrap().ptr_eq(previous.get("b").unwrap()));
        assert_eq!(result.get("b").unwrap().get("x"), Some(&Value::from(2)));
        assert!(!result.ptr_eq(&previous));
        assert_eq!(result, next);
    }

    #[test]
    fn test_deep_equal_returns_previous() {
        let previous = v(json!({"a": [1, {"b": "c"}], "d": null}));
        let next = v(json!({"a": [1, {"b": "c"}], "d": null}));
        let result = Reconciler::default().reconcile(Some(&previous), &next);
        assert!(result.ptr_eq(&previous));
    }

    #[test]
    fn test_length_change_returns_next() {
        let previous = v(json!(["a", "b"]));
        let next = v(json!(["a"]));
        let result = Reconciler::default().reconcile(Some(&previous), &next);
        assert!(!result.ptr_eq(&previous));
        assert!(result.ptr_eq(&next));
    }

    #[test]
    fn test_no_previous_returns_next() {
        let next = v(json!({"a": 1}));
        assert!(Reconciler::default().reconcile(None, &next).ptr_eq(&next));
    }

    #[test]
    fn test_shape_change_returns_next() {
        let previous = v(json!({"a": {"x": 1}}));
        let next = v(json!({"a": [1]}));
        let result = Reconciler::default().reconcile(Some(&previous), &next);
        assert!(result.get("a").unwrap().ptr_eq(next.get("a").unwrap()));
    }

    #[test]
    fn test_added_and_removed_keys_count_as_change() {
        let previous = v(json!({"a": 1, "b": 2}));
        let removed = v(json!({"a": 1}));
        let added = v(json!({"a": 1, "b": 2, "c": 3}));
        let swapped = v(json!({"a": 1, "c": 2}));
        let r = Reconciler::default();
        assert!(!r.reconcile(Some(&previous), &removed).ptr_eq(&previous));
        assert!(!r.reconcile(Some(&previous), &added).ptr_eq(&previous));
        assert!(!r.reconcile(Some(&previous), &swapped).ptr_eq(&previous));
    }

    #[test]
    fn test_schema_shaped_objects_are_atomic() {
        let previous = v(json!({"t": {"name": "book", "jsonType": "object"}}));
        let next = v(json!({"t": {"name": "book", "jsonType": "object"}}));
        let result = Reconciler::default().reconcile(Some(&previous), &next);
        assert!(result.get("t").unwrap().ptr_eq(next.get("t").unwrap()));
        // The parent changed identity because its child did.
        assert!(!result.ptr_eq(&previous));
    }

    #[test]
    fn test_injected_atomic_predicate() {
        let r = Reconciler::with_atomic(|v| v.get("opaque").is_some());
        let previous = v(json!({"x": {"opaque": true, "n": 1}, "y": {"n": 1}}));
        let next = v(json!({"x": {"opaque": true, "n": 1}, "y": {"n": 1}}));
        let result = r.reconcile(Some(&previous), &next);
        assert!(result.get("x").unwrap().ptr_eq(next.get("x").unwrap()));
        assert!(result.get("y").unwrap().ptr_eq(previous.get("y").unwrap()));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let previous = v(json!({"a": {"b": 1}}));
        let next = v(json!({"a": {"b": 2}}));
        let snapshot_prev = previous.clone();
        let snapshot_next = next.clone();
        let _ = Reconciler::default().reconcile(Some(&previous), &next);
        assert!(previous.ptr_eq(&snapshot_prev));
        assert_eq!(previous, v(json!({"a": {"b": 1}})));
        assert!(next.ptr_eq(&snapshot_next));
    }

    #[test]
    fn test_state_tree_reconcile() {
        let previous = Arc::new(StateTree::at_path(["a", "b"], true));
        let next = Arc::new(StateTree::at_path(["a", "b"], true));
        let result = Reconcile::reconcile(&previous, next);
        assert!(Arc::ptr_eq(&result, &previous));

        let changed = Arc::new(StateTree::at_path(["a", "c"], true));
        let result = Reconcile::reconcile(&previous, changed);
        assert!(!Arc::ptr_eq(&result, &previous));
    }

    #[test]
    fn test_slice_reconcile_reuses_previous() {
        let previous: Arc<[usize]> = vec![1, 2, 3].into();
        let next: Arc<[usize]> = vec![1, 2, 3].into();
        assert!(Arc::ptr_eq(&Reconcile::reconcile(&previous, next), &previous));

        let shorter: Arc<[usize]> = vec![1, 2].into();
        let result = Reconcile::reconcile(&previous, shorter.clone());
        assert!(Arc::ptr_eq(&result, &shorter));
    }
}
