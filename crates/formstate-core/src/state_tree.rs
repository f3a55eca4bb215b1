//! Sparse, path-shaped state trees.
//!
//! A [`StateTree`] records decisions only where one was made. "Nothing
//! recorded" ([`StateTree::Empty`], or a missing child) is structurally
//! distinct from a recorded `false`.
//!
//! Conditional trees (hidden / read-only) only ever hold `Leaf(true)` and
//! value-less branches: a `true` applies to the whole subtree beneath it.
//! UI state trees (collapsed paths, selected field groups) may carry a value
//! and children at the same node.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

pub type StateTreeRef<T> = Arc<StateTree<T>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTree<T> {
    Empty,
    Leaf(T),
    Branch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<T>,
        #[serde(default)]
        children: BTreeMap<String, StateTreeRef<T>>,
    },
}

static SET: LazyLock<StateTreeRef<bool>> = LazyLock::new(|| Arc::new(StateTree::Leaf(true)));

impl<T> StateTree<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            StateTree::Empty => None,
            StateTree::Leaf(value) => Some(value),
            StateTree::Branch { value, .. } => value.as_ref(),
        }
    }

    pub fn child(&self, key: &str) -> Option<&StateTreeRef<T>> {
        match self {
            StateTree::Branch { children, .. } => children.get(key),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StateTree::Empty => true,
            StateTree::Leaf(_) => false,
            StateTree::Branch { value, children } => value.is_none() && children.is_empty(),
        }
    }

    /// A branch holding only children.
    pub fn branch(children: BTreeMap<String, StateTreeRef<T>>) -> Self {
        StateTree::Branch {
            value: None,
            children,
        }
    }

    /// Build a tree with `value` recorded at `path` (given as tree keys).
    pub fn at_path<'a>(path: impl IntoIterator<Item = &'a str>, value: T) -> Self {
        let keys: Vec<&str> = path.into_iter().collect();
        keys.iter().rev().fold(StateTree::Leaf(value), |tree, key| {
            StateTree::branch(BTreeMap::from([(key.to_string(), Arc::new(tree))]))
        })
    }
}

impl StateTree<bool> {
    /// The shared `Leaf(true)` instance.
    pub fn set() -> StateTreeRef<bool> {
        Arc::clone(&SET)
    }

    /// `true` when a `true` decision is recorded at this node.
    pub fn is_set(&self) -> bool {
        self.value() == Some(&true)
    }
}

/// `true` when the (possibly missing) conditional tree is set at its root.
pub fn is_set(tree: Option<&StateTree<bool>>) -> bool {
    tree.is_some_and(StateTree::is_set)
}

/// Scope a conditional tree to one child. A set tree is inherited as-is:
/// once hidden or read-only, always hidden or read-only below.
pub fn scope<'a>(tree: Option<&'a StateTree<bool>>, key: &str) -> Option<&'a StateTree<bool>> {
    match tree {
        Some(t) if t.is_set() => Some(t),
        Some(t) => t.child(key).map(Arc::as_ref),
        None => None,
    }
}

/// Scope a UI state tree to one child, with no inheritance.
pub fn child<'a, T>(tree: Option<&'a StateTree<T>>, key: &str) -> Option<&'a StateTree<T>> {
    tree.and_then(|t| t.child(key)).map(Arc::as_ref)
}
