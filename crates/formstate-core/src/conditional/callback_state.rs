//! Sparse hidden / read-only trees for a whole document.
//!
//! The walk evaluates the property at a node first. When it resolves `true`
//! (or the depth cap is reached) the node is recorded as `Leaf(true)` and its
//! children are never visited: the flag is inherited downward regardless of
//! what they would say. Otherwise the walk descends into object fields,
//! fieldsets and keyed array items, and returns `None` where nothing below
//! was recorded.
//!
//! Keys in the resulting tree are field names, array item `_key`s,
//! `fieldset:<name>` for fieldset-level flags and `group:<name>` for
//! field-group flags.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::BuilderOptions;
use crate::error::FormStateError;
use crate::item_type::resolve_item_type;
use crate::markers::CurrentUser;
use crate::path::Path;
use crate::reconcile::Reconcile;
use crate::schema::{NormalizedMember, ObjectField, SchemaType, SchemaTypeKind, SchemaTypeRef};
use crate::state_tree::{StateTree, StateTreeRef};
use crate::value::Value;

use super::identity::{IdentityIds, ValueId};
use super::{resolve_conditional_property, ConditionalContext, ConditionalKind, ConditionalProperty};

/// Inputs of one callback-state resolution.
#[derive(Debug, Clone, Copy)]
pub struct CallbackStateOptions<'a> {
    pub schema_type: &'a SchemaTypeRef,
    pub document_value: Option<&'a Value>,
    pub current_user: Option<&'a Arc<CurrentUser>>,
    /// Forces the property for the whole document (e.g. a document the
    /// current user may not edit). Short-circuits to the shared `Leaf(true)`.
    pub forced: bool,
}

/// Resolve the sparse tree for `kind` in one full walk.
pub fn resolve_callback_tree(
    kind: ConditionalKind,
    options: &CallbackStateOptions<'_>,
    config: &BuilderOptions,
) -> Result<Option<StateTreeRef<bool>>, FormStateError> {
    if options.forced {
        return Ok(Some(StateTree::set()));
    }
    let walker = Walker {
        kind,
        document: options.document_value,
        current_user: options.current_user.map(Arc::as_ref),
        max_depth: config.max_depth,
    };
    walker.resolve(
        options.document_value,
        None,
        options.schema_type,
        None,
        &Path::root(),
        0,
    )
}

struct Walker<'a> {
    kind: ConditionalKind,
    document: Option<&'a Value>,
    current_user: Option<&'a CurrentUser>,
    max_depth: usize,
}

impl<'a> Walker<'a> {
    fn context<'c>(
        &self,
        value: Option<&'c Value>,
        parent: Option<&'c Value>,
        path: &'c Path,
    ) -> ConditionalContext<'c>
    where
        'a: 'c,
    {
        ConditionalContext {
            value,
            parent,
            document: self.document,
            current_user: self.current_user,
            path,
        }
    }

    fn evaluate(
        &self,
        property: &ConditionalProperty,
        context: &ConditionalContext<'_>,
    ) -> Result<bool, FormStateError> {
        resolve_conditional_property(property, context).map_err(|source| {
            FormStateError::ConditionalCallback {
                property: self.kind.as_str(),
                path: context.path.to_string(),
                source,
            }
        })
    }

    fn resolve(
        &self,
        value: Option<&Value>,
        parent: Option<&Value>,
        schema_type: &SchemaType,
        field: Option<&ObjectField>,
        path: &Path,
        level: usize,
    ) -> Result<Option<StateTreeRef<bool>>, FormStateError> {
        let context = self.context(value, parent, path);
        let field_set = match field {
            Some(field) => self.evaluate(self.kind.of_field(field), &context)?,
            None => false,
        };
        if field_set
            || self.evaluate(self.kind.of_type(schema_type), &context)?
            || level == self.max_depth
        {
            return Ok(Some(StateTree::set()));
        }

        let mut children: BTreeMap<String, StateTreeRef<bool>> = BTreeMap::new();

        match &schema_type.kind {
            SchemaTypeKind::Object(object) => {
                for member in object.normalized_members() {
                    match member {
                        NormalizedMember::Single(field) => {
                            self.resolve_field(field, value, path, level, &mut children)?;
                        }
                        NormalizedMember::Fieldset { fieldset, fields } => {
                            let slice = value
                                .unwrap_or(&Value::Null)
                                .pick(fields.iter().map(|f| f.name.as_str()));
                            let fieldset_path = path.field(&fieldset.name);
                            let fieldset_context =
                                self.context(Some(&slice), value, &fieldset_path);
                            if self.evaluate(self.kind.of_fieldset(fieldset), &fieldset_context)? {
                                let key = format!("fieldset:{}", fieldset.name);
                                children.insert(key, StateTree::set());
                            }
                            for field in fields {
                                self.resolve_field(field, value, path, level, &mut children)?;
                            }
                        }
                    }
                }
                for group in &object.groups {
                    let Some(property) = self.kind.of_group(group) else {
                        continue;
                    };
                    if self.evaluate(property, &context)? {
                        children.insert(format!("group:{}", group.name), StateTree::set());
                    }
                }
            }
            SchemaTypeKind::Array(array) if array.is_array_of_objects() => {
                if let Some(items) = value.and_then(Value::as_array) {
                    for item in items {
                        let Some(key) = item.key() else {
                            continue;
                        };
                        let Some(item_type) = resolve_item_type(array, item) else {
                            continue;
                        };
                        let child = self.resolve(
                            Some(item),
                            value,
                            item_type,
                            None,
                            &path.keyed(key),
                            level + 1,
                        )?;
                        if let Some(child) = child {
                            children.insert(key.to_string(), child);
                        }
                    }
                }
            }
            _ => {}
        }

        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Arc::new(StateTree::branch(children))))
        }
    }

    fn resolve_field(
        &self,
        field: &ObjectField,
        parent: Option<&Value>,
        path: &Path,
        level: usize,
        children: &mut BTreeMap<String, StateTreeRef<bool>>,
    ) -> Result<(), FormStateError> {
        let child = self.resolve(
            parent.and_then(|p| p.get(&field.name)),
            parent,
            &field.schema_type,
            Some(field),
            &path.field(&field.name),
            level + 1,
        )?;
        if let Some(child) = child {
            children.insert(field.name.clone(), child);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memoized resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct MemoKey {
    current_user: Option<u64>,
    schema_type: u64,
    document: Option<ValueId>,
}

/// Caller-owned, memoized callback-state resolver for one property.
///
/// Keeps only the last result. Repeated calls with the same current user,
/// schema type and document instances return the previous tree without
/// walking; fresh trees are reconciled against the previous one so an
/// unchanged map keeps its identity.
pub struct CallbackStateResolver {
    kind: ConditionalKind,
    config: BuilderOptions,
    ids: IdentityIds,
    last: Option<(MemoKey, Option<StateTreeRef<bool>>)>,
}

impl CallbackStateResolver {
    pub fn new(kind: ConditionalKind) -> Self {
        Self::with_config(kind, BuilderOptions::default())
    }

    pub fn with_config(kind: ConditionalKind, config: BuilderOptions) -> Self {
        Self {
            kind,
            config,
            ids: IdentityIds::new(),
            last: None,
        }
    }

    pub fn kind(&self) -> ConditionalKind {
        self.kind
    }

    pub fn resolve(
        &mut self,
        options: &CallbackStateOptions<'_>,
    ) -> Result<Option<StateTreeRef<bool>>, FormStateError> {
        if options.forced {
            return Ok(Some(StateTree::set()));
        }

        let key = MemoKey {
            current_user: options.current_user.map(|user| self.ids.id_of(user)),
            schema_type: self.ids.id_of(options.schema_type),
            document: options.document_value.map(|doc| self.ids.value_id(doc)),
        };

        if let Some((last_key, last_result)) = &self.last {
            if *last_key == key {
                tracing::trace!(property = self.kind.as_str(), "callback state unchanged");
                return Ok(last_result.clone());
            }
        }

        let fresh = resolve_callback_tree(self.kind, options, &self.config)?;
        let previous = self.last.as_ref().and_then(|(_, result)| result.as_ref());
        let result = match (previous, fresh) {
            (Some(previous), Some(fresh)) => Some(Reconcile::reconcile(previous, fresh)),
            (_, fresh) => fresh,
        };
        self.last = Some((key, result.clone()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldGroupDefinition, FieldsetDefinition};
    use crate::state_tree::is_set;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn string() -> SchemaTypeRef {
        SchemaType::string("string").into_ref()
    }

    fn hidden_when_title_empty() -> ConditionalProperty {
        ConditionalProperty::callback(|ctx| {
            let title = ctx.document.and_then(|d| d.get("title")).and_then(Value::as_str);
            Ok(Value::Bool(title.map_or(true, str::is_empty)))
        })
    }

    fn options<'a>(schema_type: &'a SchemaTypeRef, doc: &'a Value) -> CallbackStateOptions<'a> {
        CallbackStateOptions {
            schema_type,
            document_value: Some(doc),
            current_user: None,
            forced: false,
        }
    }

    fn resolve(
        kind: ConditionalKind,
        schema_type: &SchemaTypeRef,
        doc: &Value,
    ) -> Result<Option<StateTreeRef<bool>>, FormStateError> {
        resolve_callback_tree(kind, &options(schema_type, doc), &BuilderOptions::default())
    }

    #[test]
    fn test_records_only_hidden_paths() {
        let ty = SchemaType::object(
            "doc",
            vec![
                ObjectField::new("title", string()),
                ObjectField::new("subtitle", string()).with_hidden(hidden_when_title_empty()),
            ],
        )
        .into_ref();

        let empty = Value::from(json!({"title": ""}));
        let tree = resolve(ConditionalKind::Hidden, &ty, &empty).unwrap().unwrap();
        assert!(is_set(tree.child("subtitle").map(Arc::as_ref)));
        assert!(tree.child("title").is_none());

        let filled = Value::from(json!({"title": "Hello"}));
        let tree = resolve(ConditionalKind::Hidden, &ty, &filled).unwrap();
        assert!(tree.is_none());
    }

    #[test]
    fn test_hidden_parent_skips_children() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let child = ObjectField::new("inner", string()).with_hidden(ConditionalProperty::callback(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bool(false))
            },
        ));
        let nested = SchemaType::object("nested", vec![child]).into_ref();
        let ty = SchemaType::object(
            "doc",
            vec![ObjectField::new("nested", nested).with_hidden(true)],
        )
        .into_ref();

        let doc = Value::from(json!({"nested": {"inner": "x"}}));
        let tree = resolve(ConditionalKind::Hidden, &ty, &doc).unwrap().unwrap();
        let nested = tree.child("nested").unwrap();
        assert!(nested.is_set());
        assert!(Arc::ptr_eq(nested, &StateTree::set()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fieldset_and_group_keys() {
        let ty = SchemaType::object(
            "doc",
            vec![
                ObjectField::new("a", string()).in_fieldset("meta"),
                ObjectField::new("b", string()).in_fieldset("meta"),
            ],
        )
        .with_fieldsets(vec![FieldsetDefinition {
            hidden: ConditionalProperty::callback(|ctx| {
                // The fieldset sees only its own fields.
                let keys = ctx.value.and_then(Value::as_object).map(|m| m.len());
                Ok(Value::Bool(keys == Some(2)))
            }),
            ..FieldsetDefinition::new("meta")
        }])
        .with_groups(vec![FieldGroupDefinition {
            hidden: true.into(),
            ..FieldGroupDefinition::new("seo")
        }])
        .into_ref();

        let doc = Value::from(json!({"a": "1", "b": "2", "c": "3"}));
        let tree = resolve(ConditionalKind::Hidden, &ty, &doc).unwrap().unwrap();
        assert!(is_set(tree.child("fieldset:meta").map(Arc::as_ref)));
        assert!(is_set(tree.child("group:seo").map(Arc::as_ref)));

        // Groups never carry read-only state.
        let read_only = resolve(ConditionalKind::ReadOnly, &ty, &doc).unwrap();
        assert!(read_only.is_none());
    }

    #[test]
    fn test_array_items_keyed_by_key() {
        let locked = ObjectField::new("locked", SchemaType::boolean("boolean").into_ref());
        let item = SchemaType::object("item", vec![locked])
            .with_read_only(ConditionalProperty::callback(|ctx| {
                Ok(Value::Bool(
                    ctx.value.and_then(|v| v.get("locked")).and_then(Value::as_bool) == Some(true),
                ))
            }))
            .into_ref();
        let ty = SchemaType::object(
            "doc",
            vec![ObjectField::new("items", SchemaType::array("array", vec![item]).into_ref())],
        )
        .into_ref();

        let doc = Value::from(json!({"items": [
            {"_key": "a", "locked": true},
            {"_key": "b", "locked": false},
            {"locked": true},
            "primitive"
        ]}));
        let tree = resolve(ConditionalKind::ReadOnly, &ty, &doc).unwrap().unwrap();
        let items = tree.child("items").unwrap();
        assert!(is_set(items.child("a").map(Arc::as_ref)));
        assert!(items.child("b").is_none());
        match items.as_ref() {
            StateTree::Branch { children, .. } => assert_eq!(children.len(), 1),
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn test_max_depth_is_set() {
        let config = BuilderOptions {
            max_depth: 1,
            ..BuilderOptions::default()
        };
        let inner = SchemaType::object("inner", vec![ObjectField::new("x", string())]).into_ref();
        let ty = SchemaType::object("doc", vec![ObjectField::new("inner", inner)]).into_ref();
        let doc = Value::from(json!({}));
        let tree = resolve_callback_tree(ConditionalKind::Hidden, &options(&ty, &doc), &config)
            .unwrap()
            .unwrap();
        assert!(is_set(tree.child("inner").map(Arc::as_ref)));
    }

    #[test]
    fn test_callback_error_carries_path() {
        let ty = SchemaType::object(
            "doc",
            vec![ObjectField::new("title", string())
                .with_hidden(ConditionalProperty::callback(|_| Err("broken".into())))],
        )
        .into_ref();
        let doc = Value::from(json!({}));
        let err = resolve(ConditionalKind::Hidden, &ty, &doc).unwrap_err();
        match err {
            FormStateError::ConditionalCallback { property, path, .. } => {
                assert_eq!(property, "hidden");
                assert_eq!(path, "title");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_memoized_resolver_reuses_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ty = SchemaType::object(
            "doc",
            vec![ObjectField::new("title", string()).with_hidden(ConditionalProperty::callback(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Bool(true))
                },
            ))],
        )
        .into_ref();

        let mut resolver = CallbackStateResolver::new(ConditionalKind::Hidden);
        let doc = Value::from(json!({"title": "a"}));
        let first = resolver.resolve(&options(&ty, &doc)).unwrap().unwrap();
        let second = resolver.resolve(&options(&ty, &doc)).unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));

        // New document instance with the same outcome: walked again, but the
        // reconciled tree keeps its identity.
        let edited = Value::from(json!({"title": "b"}));
        let third = resolver.resolve(&options(&ty, &edited)).unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_forced_returns_shared_constant() {
        let ty = SchemaType::object("doc", vec![]).into_ref();
        let doc = Value::from(json!({}));
        let mut resolver = CallbackStateResolver::new(ConditionalKind::ReadOnly);
        let forced = resolver
            .resolve(&CallbackStateOptions {
                forced: true,
                ..options(&ty, &doc)
            })
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&forced, &StateTree::set()));
    }
}
