//! Property-based tests for reconciliation and member ordering.
//!
//! Invariants:
//! - reconciling a value against a structurally equal copy returns the
//!   previous instance;
//! - the reconciled value always equals `next`;
//! - object members follow schema declaration order, whatever the document
//!   holds.

use formstate_core::{
    prepare_form_state, ObjectField, Reconciler, RootFormStateOptions, SchemaType, Value,
};
use proptest::prelude::*;
use serde_json::{json, Map};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_leaf() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i32>().prop_map(serde_json::Value::from),
        "[a-z ]{0,8}".prop_map(serde_json::Value::from),
    ]
}

/// Arbitrary JSON documents, depth-limited.
fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    arb_leaf().prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-z]{1,3}", inner, 0..5)
                .prop_map(|map| serde_json::Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// A shuffled list of distinct field names.
fn arb_field_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,6}", 1..8)
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn reconcile_with_equal_copy_returns_previous(raw in arb_json()) {
        let previous = Value::from(raw.clone());
        let copy = Value::from(raw);

        let result = Reconciler::default().reconcile(Some(&previous), &copy);

        prop_assert!(result.ptr_eq(&previous));
    }

    #[test]
    fn reconcile_result_equals_next(a in arb_json(), b in arb_json()) {
        let previous = Value::from(a);
        let next = Value::from(b);

        let result = Reconciler::default().reconcile(Some(&previous), &next);

        prop_assert_eq!(&result, &next);
    }

    #[test]
    fn members_follow_declaration_order(
        names in arb_field_names(),
        filled in prop::collection::vec(any::<bool>(), 8),
    ) {
        let string = SchemaType::string("string").into_ref();
        let fields = names
            .iter()
            .map(|name| ObjectField::new(name, string.clone()))
            .collect();
        let doc_type = SchemaType::object("doc", fields).into_ref();

        let mut raw = serde_json::Map::new();
        for (name, fill) in names.iter().zip(&filled) {
            if *fill {
                raw.insert(name.clone(), json!(format!("value of {name}")));
            }
        }
        let doc = Value::from(serde_json::Value::Object(raw));

        let node = prepare_form_state(&RootFormStateOptions::new(&doc_type, Some(&doc)))
            .unwrap()
            .unwrap();

        let keys: Vec<String> = node.members.iter().map(|m| m.key().to_string()).collect();
        let expected: Vec<String> = names.iter().map(|name| format!("field-{name}")).collect();
        prop_assert_eq!(keys, expected);
    }
}
