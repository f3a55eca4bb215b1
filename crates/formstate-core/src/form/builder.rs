//! The form-state builder.
//!
//! Turns a schema type, a document value and the surrounding UI state into
//! an immutable tree of form nodes. The builder is a pure function of its
//! inputs: hidden and read-only decisions arrive as precomputed sparse trees
//! (see [`crate::conditional::callback_state`]), so no user callback runs
//! here.
//!
//! Construction is split into seven steps (field member, object input,
//! array-of-objects input, array-of-primitives input, primitive input and
//! the two array member steps). Each public `prepare_*` method runs one step
//! through its optional [decorator](super::decorators).

use std::sync::Arc;

use crate::config::BuilderOptions;
use crate::error::FormStateError;
use crate::item_type::{resolve_item_type, resolve_primitive_item_type};
use crate::markers::{presence_at, validation_at, FormNodePresence, ValidationMarker};
use crate::path::Path;
use crate::schema::{
    ArraySchema, NormalizedMember, ObjectField, ObjectSchema, SchemaTypeKind, SchemaTypeRef,
};
use crate::state_tree::{child, is_set, scope, StateTree};
use crate::value::{is_truthy, resolve_type_name, Value};

use super::collapsible::collapsed_with_defaults;
use super::decorators::Decorators;
use super::groups::{is_field_enabled_by_group_filter, resolve_groups, ALL_FIELDS_GROUP};
use super::nodes::{
    ArrayItemError, ArrayOfObjectsFormNode, ArrayOfObjectsItem, ArrayOfObjectsMember,
    ArrayOfPrimitivesFormNode, ArrayOfPrimitivesItem, ArrayOfPrimitivesMember, FieldError,
    FieldMember, FieldSetMember, FieldsetState, FormFieldGroup, FormNode, HiddenField,
    MemberErrorKind, ObjectFormNode, ObjectMember, PrimitiveFormNode,
};

pub type BuildResult<T> = Result<T, FormStateError>;

/// Inputs of a root build.
#[derive(Debug, Clone)]
pub struct RootFormStateOptions<'a> {
    pub schema_type: &'a SchemaTypeRef,
    pub document_value: Option<&'a Value>,
    /// Snapshot the `changed` flags compare against (e.g. the published
    /// version).
    pub comparison_value: Option<&'a Value>,
    pub hidden: Option<&'a StateTree<bool>>,
    pub read_only: Option<&'a StateTree<bool>>,
    pub open_path: Path,
    pub focus_path: Path,
    pub presence: &'a [FormNodePresence],
    pub validation: &'a [ValidationMarker],
    /// Selected field group per object path.
    pub field_group_state: Option<&'a StateTree<String>>,
    pub collapsed_paths: Option<&'a StateTree<bool>>,
    pub collapsed_field_sets: Option<&'a StateTree<bool>>,
    /// The review-changes panel is open.
    pub changes_open: bool,
}

impl<'a> RootFormStateOptions<'a> {
    pub fn new(schema_type: &'a SchemaTypeRef, document_value: Option<&'a Value>) -> Self {
        Self {
            schema_type,
            document_value,
            comparison_value: None,
            hidden: None,
            read_only: None,
            open_path: Path::root(),
            focus_path: Path::root(),
            presence: &[],
            validation: &[],
            field_group_state: None,
            collapsed_paths: None,
            collapsed_field_sets: None,
            changes_open: false,
        }
    }
}

/// Props of the input-state steps, scoped to one node.
#[derive(Debug, Clone)]
pub struct InputProps<'a> {
    pub schema_type: &'a SchemaTypeRef,
    pub path: Path,
    pub level: usize,
    pub value: Option<&'a Value>,
    pub comparison_value: Option<&'a Value>,
    /// Precomputed change flag of the value against its comparison value.
    pub changed: bool,
    pub hidden: Option<&'a StateTree<bool>>,
    pub read_only: Option<&'a StateTree<bool>>,
    pub open_path: &'a Path,
    pub focus_path: &'a Path,
    pub presence: &'a [FormNodePresence],
    pub validation: &'a [ValidationMarker],
    pub field_group_state: Option<&'a StateTree<String>>,
    pub collapsed_paths: Option<&'a StateTree<bool>>,
    pub collapsed_field_sets: Option<&'a StateTree<bool>>,
    pub changes_open: bool,
}

impl<'a> InputProps<'a> {
    /// Props for the value under `key` (a field name, item key or index).
    fn scoped(
        &self,
        key: &str,
        schema_type: &'a SchemaTypeRef,
        path: Path,
        level: usize,
        value: Option<&'a Value>,
        comparison_value: Option<&'a Value>,
    ) -> InputProps<'a> {
        InputProps {
            schema_type,
            path,
            level,
            value,
            comparison_value,
            changed: is_changed_value(value, comparison_value),
            hidden: scope(self.hidden, key),
            read_only: scope(self.read_only, key),
            open_path: self.open_path,
            focus_path: self.focus_path,
            presence: self.presence,
            validation: self.validation,
            field_group_state: child(self.field_group_state, key),
            collapsed_paths: child(self.collapsed_paths, key),
            collapsed_field_sets: child(self.collapsed_field_sets, key),
            changes_open: self.changes_open,
        }
    }
}

/// Props of the field member step.
#[derive(Debug, Clone, Copy)]
pub struct FieldMemberProps<'a> {
    pub field: &'a ObjectField,
    pub parent: &'a InputProps<'a>,
    pub groups: &'a [FormFieldGroup],
    pub selected_group: Option<&'a FormFieldGroup>,
    /// Position of the field's member (or fieldset) in the parent.
    pub index: usize,
}

/// Props of the array member steps.
#[derive(Debug, Clone, Copy)]
pub struct ArrayMemberProps<'a> {
    pub item: &'a Value,
    pub parent: &'a InputProps<'a>,
    pub index: usize,
}

/// Whether `value` counts as changed against `comparison`.
///
/// An array against a missing value (either way round) is never a change,
/// so removing the last item does not leave a stale indicator behind.
pub fn is_changed_value(value: Option<&Value>, comparison: Option<&Value>) -> bool {
    match (value, comparison) {
        (Some(Value::Array(_)), None) | (None, Some(Value::Array(_))) => false,
        _ if is_truthy(value) && !is_truthy(comparison) => true,
        _ => value != comparison,
    }
}

/// Build a form-state tree with default options and no decorators.
pub fn prepare_form_state(
    options: &RootFormStateOptions<'_>,
) -> BuildResult<Option<Arc<ObjectFormNode>>> {
    FormStateBuilder::new().prepare(options)
}

#[derive(Debug, Clone, Default)]
pub struct FormStateBuilder {
    options: BuilderOptions,
    decorators: Decorators,
}

impl FormStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_decorators(mut self, decorators: Decorators) -> Self {
        self.decorators = decorators;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Build the tree for a whole document.
    ///
    /// `Ok(None)` means there is nothing to render: every member of the root
    /// is hidden, or the root itself is past the depth cap. `Err` is reserved
    /// for contract violations such as a non-object document.
    pub fn prepare(
        &self,
        root: &RootFormStateOptions<'_>,
    ) -> BuildResult<Option<Arc<ObjectFormNode>>> {
        let props = InputProps {
            schema_type: root.schema_type,
            path: Path::root(),
            level: 0,
            value: root.document_value,
            comparison_value: root.comparison_value,
            changed: is_changed_value(root.document_value, root.comparison_value),
            hidden: root.hidden,
            read_only: root.read_only,
            open_path: &root.open_path,
            focus_path: &root.focus_path,
            presence: root.presence,
            validation: root.validation,
            field_group_state: root.field_group_state,
            collapsed_paths: root.collapsed_paths,
            collapsed_field_sets: root.collapsed_field_sets,
            changes_open: root.changes_open,
        };
        self.prepare_object_input(&props, true)
    }

    // -----------------------------------------------------------------------
    // Decorated steps
    // -----------------------------------------------------------------------

    pub fn prepare_field_member(
        &self,
        props: &FieldMemberProps<'_>,
    ) -> BuildResult<Option<ObjectMember>> {
        match &self.decorators.field_member {
            Some(decorate) => decorate(props, &|props| self.build_field_member(props)),
            None => self.build_field_member(props),
        }
    }

    /// Build an object node. With `enable_hidden_check`, a node without a
    /// single visible member is `None`.
    pub fn prepare_object_input(
        &self,
        props: &InputProps<'_>,
        enable_hidden_check: bool,
    ) -> BuildResult<Option<Arc<ObjectFormNode>>> {
        match &self.decorators.object_input {
            Some(decorate) => decorate(props, enable_hidden_check, &|props, check| {
                self.build_object_input(props, check)
            }),
            None => self.build_object_input(props, enable_hidden_check),
        }
    }

    pub fn prepare_array_of_objects_input(
        &self,
        props: &InputProps<'_>,
    ) -> BuildResult<Option<Arc<ArrayOfObjectsFormNode>>> {
        match &self.decorators.array_of_objects_input {
            Some(decorate) => decorate(props, &|props| self.build_array_of_objects_input(props)),
            None => self.build_array_of_objects_input(props),
        }
    }

    pub fn prepare_array_of_primitives_input(
        &self,
        props: &InputProps<'_>,
    ) -> BuildResult<Option<Arc<ArrayOfPrimitivesFormNode>>> {
        match &self.decorators.array_of_primitives_input {
            Some(decorate) => {
                decorate(props, &|props| self.build_array_of_primitives_input(props))
            }
            None => self.build_array_of_primitives_input(props),
        }
    }

    pub fn prepare_primitive_input(
        &self,
        props: &InputProps<'_>,
    ) -> BuildResult<Arc<PrimitiveFormNode>> {
        match &self.decorators.primitive_input {
            Some(decorate) => decorate(props, &|props| Ok(self.build_primitive_input(props))),
            None => Ok(self.build_primitive_input(props)),
        }
    }

    pub fn prepare_array_of_objects_member(
        &self,
        props: &ArrayMemberProps<'_>,
    ) -> BuildResult<Option<ArrayOfObjectsMember>> {
        match &self.decorators.array_of_objects_member {
            Some(decorate) => decorate(props, &|props| self.build_array_of_objects_member(props)),
            None => self.build_array_of_objects_member(props),
        }
    }

    pub fn prepare_array_of_primitives_member(
        &self,
        props: &ArrayMemberProps<'_>,
    ) -> BuildResult<ArrayOfPrimitivesMember> {
        match &self.decorators.array_of_primitives_member {
            Some(decorate) => {
                decorate(props, &|props| self.build_array_of_primitives_member(props))
            }
            None => self.build_array_of_primitives_member(props),
        }
    }

    // -----------------------------------------------------------------------
    // Field members
    // -----------------------------------------------------------------------

    fn build_field_member(
        &self,
        props: &FieldMemberProps<'_>,
    ) -> BuildResult<Option<ObjectMember>> {
        let FieldMemberProps {
            field,
            parent,
            selected_group,
            index,
            ..
        } = *props;

        if let Some(value) = parent.value.filter(|v| !v.is_object()) {
            return Err(FormStateError::UnexpectedNonObjectValue {
                path: parent.path.to_string(),
                found: value.type_name().to_string(),
            });
        }

        let field_path = parent.path.field(&field.name);
        let field_level = parent.level + 1;
        let field_value = parent.value.and_then(|v| v.get(&field.name));
        let field_comparison = parent
            .comparison_value
            .filter(|v| v.is_object())
            .and_then(|v| v.get(&field.name));

        let member = |node: FormNode, collapsible: bool, collapsed: bool| {
            ObjectMember::Field(Arc::new(FieldMember {
                key: format!("field-{}", field.name),
                name: field.name.clone(),
                index,
                in_selected_group: is_field_enabled_by_group_filter(&field.group, selected_group),
                groups: field.group.clone().into(),
                open: parent.open_path.starts_with(&field_path),
                collapsible,
                collapsed,
                field: node,
            }))
        };

        let field_props = || {
            parent.scoped(
                &field.name,
                &field.schema_type,
                field_path.clone(),
                field_level,
                field_value,
                field_comparison,
            )
        };

        match &field.schema_type.kind {
            SchemaTypeKind::Object(_) => {
                if let Some(value) = field_value.filter(|v| !v.is_object()) {
                    return Ok(Some(field_error(
                        field,
                        &field_path,
                        MemberErrorKind::IncompatibleType {
                            expected_schema_type: Arc::clone(&field.schema_type),
                            resolved_value_type: value.type_name().to_string(),
                            value: value.clone(),
                        },
                    )));
                }

                if is_set(scope(parent.hidden, &field.name)) {
                    return Ok(Some(ObjectMember::Hidden(Arc::new(HiddenField {
                        key: format!("field-{}", field.name),
                        name: field.name.clone(),
                        index,
                    }))));
                }

                let props = field_props();
                let Some(node) = self.prepare_object_input(&props, true)? else {
                    return Ok(None);
                };

                let defaults = collapsed_with_defaults(
                    &field.schema_type.options,
                    field_level,
                    self.options.collapsible_level,
                );
                let collapsed = props
                    .collapsed_paths
                    .and_then(|tree| tree.value().copied())
                    .unwrap_or(defaults.collapsed);

                Ok(Some(member(
                    FormNode::Object(node),
                    defaults.collapsible,
                    collapsed,
                )))
            }

            SchemaTypeKind::Array(array) if array.is_array_of_objects() => {
                if let Some(items) = field_value {
                    if let Some(error) = validate_array_of_objects(field, items) {
                        return Ok(Some(field_error(field, &field_path, error)));
                    }
                }

                let Some(node) = self.prepare_array_of_objects_input(&field_props())? else {
                    return Ok(None);
                };
                Ok(Some(member(FormNode::ArrayOfObjects(node), false, false)))
            }

            SchemaTypeKind::Array(_) => {
                if let Some(value) = field_value.filter(|v| !v.is_array()) {
                    return Ok(Some(field_error(
                        field,
                        &field_path,
                        MemberErrorKind::IncompatibleType {
                            expected_schema_type: Arc::clone(&field.schema_type),
                            resolved_value_type: value.type_name().to_string(),
                            value: value.clone(),
                        },
                    )));
                }

                let Some(node) = self.prepare_array_of_primitives_input(&field_props())? else {
                    return Ok(None);
                };
                Ok(Some(member(FormNode::ArrayOfPrimitives(node), false, false)))
            }

            SchemaTypeKind::Boolean | SchemaTypeKind::Number | SchemaTypeKind::String => {
                // Primitive fields leave no placeholder behind.
                if is_set(scope(parent.hidden, &field.name)) {
                    return Ok(None);
                }
                let node = self.prepare_primitive_input(&field_props())?;
                Ok(Some(member(FormNode::Primitive(node), false, false)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    fn build_object_input(
        &self,
        props: &InputProps<'_>,
        enable_hidden_check: bool,
    ) -> BuildResult<Option<Arc<ObjectFormNode>>> {
        if props.level >= self.options.max_depth {
            return Ok(None);
        }

        let object = expect_object(props)?;
        if let Some(value) = props.value.filter(|v| !v.is_object()) {
            return Err(FormStateError::UnexpectedNonObjectValue {
                path: props.path.to_string(),
                found: value.type_name().to_string(),
            });
        }

        let groups = resolve_groups(
            &object.groups,
            props.hidden,
            props.field_group_state.and_then(|t| t.value()).map(String::as_str),
            props.changes_open,
        );
        let selected_group = groups.iter().find(|g| g.selected);

        let mut members: Vec<ObjectMember> = Vec::new();
        for (index, normalized) in object.normalized_members().into_iter().enumerate() {
            match normalized {
                NormalizedMember::Single(field) => {
                    let member = self.prepare_field_member(&FieldMemberProps {
                        field,
                        parent: props,
                        groups: &groups,
                        selected_group,
                        index,
                    })?;
                    members.extend(member);
                }
                NormalizedMember::Fieldset { fieldset, fields } => {
                    let tree_key = format!("fieldset:{}", fieldset.name);
                    let fieldset_hidden = is_set(scope(props.hidden, &tree_key));
                    let set = StateTree::set();
                    let field_parent = if is_set(scope(props.read_only, &tree_key)) {
                        InputProps {
                            read_only: Some(set.as_ref()),
                            ..props.clone()
                        }
                    } else {
                        props.clone()
                    };

                    // A hidden fieldset keeps no members at all.
                    let mut fieldset_members = Vec::new();
                    for field in fields.into_iter().filter(|_| !fieldset_hidden) {
                        let member = self.prepare_field_member(&FieldMemberProps {
                            field,
                            parent: &field_parent,
                            groups: &groups,
                            selected_group,
                            index,
                        })?;
                        fieldset_members.extend(member.filter(|m| !m.is_hidden()));
                    }

                    let defaults = collapsed_with_defaults(
                        &fieldset.options,
                        props.level,
                        self.options.collapsible_level,
                    );
                    let collapsed = child(props.collapsed_field_sets, &fieldset.name)
                        .and_then(|tree| tree.value().copied())
                        .unwrap_or(defaults.collapsed);

                    members.push(ObjectMember::FieldSet(Arc::new(FieldSetMember {
                        key: format!("fieldset-{}", fieldset.name),
                        in_selected_group: is_field_enabled_by_group_filter(
                            &fieldset.group,
                            selected_group,
                        ),
                        groups: fieldset.group.clone().into(),
                        field_set: Arc::new(FieldsetState {
                            path: props.path.field(&fieldset.name),
                            name: fieldset.name.clone(),
                            title: fieldset.title.clone(),
                            description: fieldset.description.clone(),
                            hidden: false,
                            level: props.level + 1,
                            members: fieldset_members.into(),
                            collapsible: defaults.collapsible,
                            collapsed,
                            columns: fieldset.options.columns,
                        }),
                    })));
                }
            }
        }

        let visible: Vec<&ObjectMember> = members.iter().filter(|m| is_visible(m)).collect();
        if visible.is_empty() && enable_hidden_check {
            return Ok(None);
        }

        let visible_groups: Vec<FormFieldGroup> = if object.groups.is_empty() {
            Vec::new()
        } else {
            groups
                .iter()
                .filter(|group| {
                    group.name == ALL_FIELDS_GROUP
                        || group.selected
                        || visible.iter().any(|m| member_in_group(m, &group.name))
                })
                .cloned()
                .collect()
        };

        let filtered: Vec<ObjectMember> = visible
            .iter()
            .filter_map(|member| filter_by_group(member))
            .collect();

        Ok(Some(Arc::new(ObjectFormNode {
            id: props.path.to_string(),
            schema_type: Arc::clone(props.schema_type),
            value: props.value.cloned(),
            changed: is_changed_value(props.value, props.comparison_value),
            read_only: is_set(props.read_only),
            path: props.path.clone(),
            level: props.level,
            focused: props.path == *props.focus_path,
            focus_path: props.path.trim_child_path(props.focus_path),
            presence: presence_at(props.presence, &props.path).into(),
            validation: validation_at(props.validation, &props.path).into(),
            members: filtered.into(),
            groups: visible_groups.into(),
            all_members: members.into(),
        })))
    }

    // -----------------------------------------------------------------------
    // Arrays of objects
    // -----------------------------------------------------------------------

    fn build_array_of_objects_input(
        &self,
        props: &InputProps<'_>,
    ) -> BuildResult<Option<Arc<ArrayOfObjectsFormNode>>> {
        if props.level >= self.options.max_depth || is_set(props.hidden) {
            return Ok(None);
        }
        expect_array(props)?;

        let items = props.value.and_then(Value::as_array).unwrap_or_default();
        let mut members = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let member = self.prepare_array_of_objects_member(&ArrayMemberProps {
                item,
                parent: props,
                index,
            })?;
            members.extend(member);
        }

        // The array's own flag, or any item's.
        let changed = props.changed
            || members.iter().any(|m| match m {
                ArrayOfObjectsMember::Item(item) => item.item.changed,
                ArrayOfObjectsMember::Error(_) => false,
            });

        Ok(Some(Arc::new(ArrayOfObjectsFormNode {
            id: props.path.to_string(),
            schema_type: Arc::clone(props.schema_type),
            value: props.value.cloned(),
            changed,
            read_only: is_set(props.read_only),
            path: props.path.clone(),
            level: props.level,
            focused: props.path == *props.focus_path,
            focus_path: props.path.trim_child_path(props.focus_path),
            presence: presence_at(props.presence, &props.path).into(),
            validation: validation_at(props.validation, &props.path).into(),
            members: members.into(),
        })))
    }

    fn build_array_of_objects_member(
        &self,
        props: &ArrayMemberProps<'_>,
    ) -> BuildResult<Option<ArrayOfObjectsMember>> {
        let ArrayMemberProps {
            item,
            parent,
            index,
        } = *props;
        let array = expect_array(parent)?;
        let key = item.key().unwrap_or_default();

        let Some(item_type) = resolve_item_type(array, item) else {
            return Ok(Some(ArrayOfObjectsMember::Error(Arc::new(item_error(
                parent,
                key.to_string(),
                index,
                item,
                array,
            )))));
        };

        let item_path = parent.path.keyed(key);
        let item_level = parent.level + 1;
        let comparison = parent
            .comparison_value
            .and_then(Value::as_array)
            .and_then(|items| items.iter().find(|i| i.key() == Some(key)));

        let item_props = parent.scoped(
            key,
            item_type,
            item_path.clone(),
            item_level,
            Some(item),
            comparison,
        );
        // Items always render, even when hidden or empty.
        let Some(node) = self.prepare_object_input(&item_props, false)? else {
            return Ok(None);
        };

        let defaults =
            collapsed_with_defaults(&item_type.options, item_level, self.options.collapsible_level);
        let collapsed = item_props
            .collapsed_paths
            .and_then(|tree| tree.value().copied())
            .unwrap_or(defaults.collapsed);

        Ok(Some(ArrayOfObjectsMember::Item(Arc::new(ArrayOfObjectsItem {
            key: key.to_string(),
            index,
            open: parent.open_path.starts_with(&item_path),
            collapsible: true,
            collapsed,
            parent_schema_type: Arc::clone(parent.schema_type),
            item: node,
        }))))
    }

    // -----------------------------------------------------------------------
    // Arrays of primitives
    // -----------------------------------------------------------------------

    fn build_array_of_primitives_input(
        &self,
        props: &InputProps<'_>,
    ) -> BuildResult<Option<Arc<ArrayOfPrimitivesFormNode>>> {
        if props.level >= self.options.max_depth || is_set(props.hidden) {
            return Ok(None);
        }
        expect_array(props)?;

        let items = props.value.and_then(Value::as_array).unwrap_or_default();
        let members = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.prepare_array_of_primitives_member(&ArrayMemberProps {
                    item,
                    parent: props,
                    index,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        let changed = props.changed
            || members.iter().any(|m| match m {
                ArrayOfPrimitivesMember::Item(item) => item.item.changed,
                ArrayOfPrimitivesMember::Error(_) => false,
            });

        Ok(Some(Arc::new(ArrayOfPrimitivesFormNode {
            id: props.path.to_string(),
            schema_type: Arc::clone(props.schema_type),
            value: props.value.cloned(),
            changed,
            read_only: is_set(props.read_only),
            path: props.path.clone(),
            level: props.level,
            focused: props.path == *props.focus_path,
            focus_path: props.path.trim_child_path(props.focus_path),
            presence: presence_at(props.presence, &props.path).into(),
            validation: validation_at(props.validation, &props.path).into(),
            members: members.into(),
        })))
    }

    fn build_array_of_primitives_member(
        &self,
        props: &ArrayMemberProps<'_>,
    ) -> BuildResult<ArrayOfPrimitivesMember> {
        let ArrayMemberProps {
            item,
            parent,
            index,
        } = *props;
        let array = expect_array(parent)?;
        let item_type = resolve_primitive_item_type(array, item);
        let key = format!(
            "{}-{index}",
            item_type.map_or("invalid-type", |t| t.name.as_str())
        );

        let Some(item_type) = item_type else {
            return Ok(ArrayOfPrimitivesMember::Error(Arc::new(item_error(
                parent, key, index, item, array,
            ))));
        };

        let item_path = parent.path.index(index);
        let comparison = parent
            .comparison_value
            .and_then(Value::as_array)
            .and_then(|items| items.get(index));
        let item_props = parent.scoped(
            &index.to_string(),
            item_type,
            item_path.clone(),
            parent.level + 1,
            Some(item),
            comparison,
        );
        let node = self.prepare_primitive_input(&item_props)?;

        Ok(ArrayOfPrimitivesMember::Item(Arc::new(ArrayOfPrimitivesItem {
            key,
            index,
            open: item_path == *parent.open_path,
            parent_schema_type: Arc::clone(parent.schema_type),
            item: node,
        })))
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    fn build_primitive_input(&self, props: &InputProps<'_>) -> Arc<PrimitiveFormNode> {
        Arc::new(PrimitiveFormNode {
            id: props.path.to_string(),
            schema_type: Arc::clone(props.schema_type),
            value: props.value.cloned(),
            changed: is_changed_value(props.value, props.comparison_value),
            read_only: is_set(props.read_only),
            path: props.path.clone(),
            level: props.level,
            focused: props.path == *props.focus_path,
            presence: presence_at(props.presence, &props.path).into(),
            validation: validation_at(props.validation, &props.path).into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn expect_object<'a>(props: &InputProps<'a>) -> BuildResult<&'a ObjectSchema> {
    props
        .schema_type
        .as_object()
        .ok_or_else(|| FormStateError::SchemaError {
            path: props.path.to_string(),
            message: format!("`{}` is not an object type", props.schema_type.name),
        })
}

fn expect_array<'a>(props: &InputProps<'a>) -> BuildResult<&'a ArraySchema> {
    props
        .schema_type
        .as_array()
        .ok_or_else(|| FormStateError::SchemaError {
            path: props.path.to_string(),
            message: format!("`{}` is not an array type", props.schema_type.name),
        })
}

fn field_error(field: &ObjectField, path: &Path, error: MemberErrorKind) -> ObjectMember {
    tracing::debug!(
        path = %path,
        error = error.code(),
        "document value does not match field type"
    );
    ObjectMember::Error(Arc::new(FieldError {
        key: field.name.clone(),
        field_name: field.name.clone(),
        error,
    }))
}

fn item_error(
    parent: &InputProps<'_>,
    key: String,
    index: usize,
    item: &Value,
    array: &ArraySchema,
) -> ArrayItemError {
    let resolved_value_type = resolve_type_name(Some(item));
    tracing::debug!(
        path = %parent.path,
        index,
        item_type = %resolved_value_type,
        "array item matches none of the member types"
    );
    ArrayItemError {
        key,
        index,
        error: MemberErrorKind::InvalidItemType {
            resolved_value_type,
            value: Some(item.clone()),
            valid_types: array.of().to_vec(),
        },
    }
}

/// The four array-of-objects checks, in precedence order.
fn validate_array_of_objects(field: &ObjectField, value: &Value) -> Option<MemberErrorKind> {
    let schema_type = Arc::clone(&field.schema_type);
    let Some(items) = value.as_array() else {
        return Some(MemberErrorKind::IncompatibleType {
            expected_schema_type: schema_type,
            resolved_value_type: value.type_name().to_string(),
            value: value.clone(),
        });
    };
    if !items.iter().all(Value::is_object) {
        return Some(MemberErrorKind::MixedArray {
            schema_type,
            value: value.clone(),
        });
    }
    if !items.iter().all(|item| item.key().is_some()) {
        return Some(MemberErrorKind::MissingKeys {
            schema_type,
            value: value.clone(),
        });
    }
    let duplicates = find_duplicate_keys(items);
    if !duplicates.is_empty() {
        return Some(MemberErrorKind::DuplicateKeys {
            schema_type,
            duplicates,
        });
    }
    None
}

/// Every `(index, key)` whose key occurs more than once, first occurrence
/// included, in index order.
fn find_duplicate_keys(items: &[Value]) -> Vec<(usize, String)> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for key in items.iter().filter_map(Value::key) {
        *counts.entry(key).or_default() += 1;
    }
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let key = item.key()?;
            (counts.get(key).copied().unwrap_or_default() > 1).then(|| (index, key.to_string()))
        })
        .collect()
}

fn is_visible(member: &ObjectMember) -> bool {
    match member {
        ObjectMember::Hidden(_) => false,
        ObjectMember::FieldSet(fieldset) => !fieldset.field_set.members.is_empty(),
        ObjectMember::Field(_) | ObjectMember::Error(_) => true,
    }
}

fn member_in_group(member: &ObjectMember, group: &str) -> bool {
    match member {
        ObjectMember::Field(field) => field.groups.iter().any(|g| g == group),
        ObjectMember::FieldSet(fieldset) => {
            fieldset.groups.iter().any(|g| g == group)
                || fieldset
                    .field_set
                    .members
                    .iter()
                    .any(|m| m.as_field().is_some_and(|f| f.groups.iter().any(|g| g == group)))
        }
        ObjectMember::Error(_) | ObjectMember::Hidden(_) => false,
    }
}

/// Apply the selected-group filter to one visible member.
fn filter_by_group(member: &ObjectMember) -> Option<ObjectMember> {
    match member {
        ObjectMember::Error(_) => Some(member.clone()),
        ObjectMember::Field(field) => field.in_selected_group.then(|| member.clone()),
        ObjectMember::FieldSet(fieldset) => {
            let all = &fieldset.field_set.members;
            let kept: Vec<ObjectMember> = all
                .iter()
                .filter(|m| m.as_field().map_or(true, |f| f.in_selected_group))
                .cloned()
                .collect();
            if kept.is_empty() {
                None
            } else if kept.len() == all.len() {
                Some(member.clone())
            } else {
                Some(ObjectMember::FieldSet(Arc::new(FieldSetMember {
                    field_set: Arc::new(FieldsetState {
                        members: kept.into(),
                        ..(*fieldset.field_set).clone()
                    }),
                    ..(**fieldset).clone()
                })))
            }
        }
        ObjectMember::Hidden(_) => None,
    }
}
