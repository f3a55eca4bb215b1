//! Form nodes and members: the immutable output of the builder.
//!
//! Every node and member is shared as an `Arc` and every sequence as an
//! `Arc<[T]>`, so a reconciled tree can hand back whole unchanged subtrees
//! from the previous pass.

use std::sync::Arc;

use serde::Serialize;

use crate::markers::{FormNodePresence, ValidationMarker};
use crate::path::Path;
use crate::reconcile::{reconcile_by_equality, reconcile_fields, reconcile_variants};
use crate::schema::SchemaTypeRef;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFormNode {
    pub id: String,
    pub schema_type: SchemaTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub changed: bool,
    pub read_only: bool,
    pub path: Path,
    pub level: usize,
    pub focused: bool,
    pub focus_path: Path,
    pub presence: Arc<[FormNodePresence]>,
    pub validation: Arc<[ValidationMarker]>,
    /// Members after group filtering, in declaration order.
    pub members: Arc<[ObjectMember]>,
    /// Visible field groups. Empty when the type declares none.
    pub groups: Arc<[FormFieldGroup]>,
    /// Every member before group filtering, hidden placeholders included.
    /// Used by expand-to-reveal logic; not part of the rendered tree.
    #[serde(skip)]
    pub all_members: Arc<[ObjectMember]>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOfObjectsFormNode {
    pub id: String,
    pub schema_type: SchemaTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub changed: bool,
    pub read_only: bool,
    pub path: Path,
    pub level: usize,
    pub focused: bool,
    pub focus_path: Path,
    pub presence: Arc<[FormNodePresence]>,
    pub validation: Arc<[ValidationMarker]>,
    pub members: Arc<[ArrayOfObjectsMember]>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOfPrimitivesFormNode {
    pub id: String,
    pub schema_type: SchemaTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub changed: bool,
    pub read_only: bool,
    pub path: Path,
    pub level: usize,
    pub focused: bool,
    pub focus_path: Path,
    pub presence: Arc<[FormNodePresence]>,
    pub validation: Arc<[ValidationMarker]>,
    pub members: Arc<[ArrayOfPrimitivesMember]>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveFormNode {
    pub id: String,
    pub schema_type: SchemaTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub changed: bool,
    pub read_only: bool,
    pub path: Path,
    pub level: usize,
    pub focused: bool,
    pub presence: Arc<[FormNodePresence]>,
    pub validation: Arc<[ValidationMarker]>,
}

/// The node behind a field member, by schema-type category.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "nodeType", rename_all = "camelCase")]
pub enum FormNode {
    Object(Arc<ObjectFormNode>),
    ArrayOfObjects(Arc<ArrayOfObjectsFormNode>),
    ArrayOfPrimitives(Arc<ArrayOfPrimitivesFormNode>),
    Primitive(Arc<PrimitiveFormNode>),
}

impl FormNode {
    pub fn path(&self) -> &Path {
        match self {
            FormNode::Object(node) => &node.path,
            FormNode::ArrayOfObjects(node) => &node.path,
            FormNode::ArrayOfPrimitives(node) => &node.path,
            FormNode::Primitive(node) => &node.path,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            FormNode::Object(node) => node.value.as_ref(),
            FormNode::ArrayOfObjects(node) => node.value.as_ref(),
            FormNode::ArrayOfPrimitives(node) => node.value.as_ref(),
            FormNode::Primitive(node) => node.value.as_ref(),
        }
    }

    pub fn changed(&self) -> bool {
        match self {
            FormNode::Object(node) => node.changed,
            FormNode::ArrayOfObjects(node) => node.changed,
            FormNode::ArrayOfPrimitives(node) => node.changed,
            FormNode::Primitive(node) => node.changed,
        }
    }

    pub fn read_only(&self) -> bool {
        match self {
            FormNode::Object(node) => node.read_only,
            FormNode::ArrayOfObjects(node) => node.read_only,
            FormNode::ArrayOfPrimitives(node) => node.read_only,
            FormNode::Primitive(node) => node.read_only,
        }
    }

    pub fn level(&self) -> usize {
        match self {
            FormNode::Object(node) => node.level,
            FormNode::ArrayOfObjects(node) => node.level,
            FormNode::ArrayOfPrimitives(node) => node.level,
            FormNode::Primitive(node) => node.level,
        }
    }

    pub fn schema_type(&self) -> &SchemaTypeRef {
        match self {
            FormNode::Object(node) => &node.schema_type,
            FormNode::ArrayOfObjects(node) => &node.schema_type,
            FormNode::ArrayOfPrimitives(node) => &node.schema_type,
            FormNode::Primitive(node) => &node.schema_type,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectFormNode>> {
        match self {
            FormNode::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_array_of_objects(&self) -> Option<&Arc<ArrayOfObjectsFormNode>> {
        match self {
            FormNode::ArrayOfObjects(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_array_of_primitives(&self) -> Option<&Arc<ArrayOfPrimitivesFormNode>> {
        match self {
            FormNode::ArrayOfPrimitives(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Arc<PrimitiveFormNode>> {
        match self {
            FormNode::Primitive(node) => Some(node),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Object members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ObjectMember {
    Field(Arc<FieldMember>),
    FieldSet(Arc<FieldSetMember>),
    Error(Arc<FieldError>),
    Hidden(Arc<HiddenField>),
}

impl ObjectMember {
    pub fn key(&self) -> &str {
        match self {
            ObjectMember::Field(member) => &member.key,
            ObjectMember::FieldSet(member) => &member.key,
            ObjectMember::Error(member) => &member.key,
            ObjectMember::Hidden(member) => &member.key,
        }
    }

    pub fn as_field(&self) -> Option<&Arc<FieldMember>> {
        match self {
            ObjectMember::Field(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_field_set(&self) -> Option<&Arc<FieldSetMember>> {
        match self {
            ObjectMember::FieldSet(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Arc<FieldError>> {
        match self {
            ObjectMember::Error(member) => Some(member),
            _ => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, ObjectMember::Hidden(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMember {
    pub key: String,
    pub name: String,
    /// Position of the field (or its fieldset) among the type's members.
    pub index: usize,
    pub in_selected_group: bool,
    pub groups: Arc<[String]>,
    pub open: bool,
    pub collapsible: bool,
    pub collapsed: bool,
    pub field: FormNode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSetMember {
    pub key: String,
    pub in_selected_group: bool,
    pub groups: Arc<[String]>,
    pub field_set: Arc<FieldsetState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsetState {
    pub path: Path,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub hidden: bool,
    pub level: usize,
    /// Field and error members of the fieldset. Hidden placeholders are kept
    /// out of this list.
    pub members: Arc<[ObjectMember]>,
    pub collapsible: bool,
    pub collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
}

/// Placeholder for a field that exists but is suppressed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenField {
    pub key: String,
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub key: String,
    pub field_name: String,
    pub error: MemberErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub selected: bool,
    pub disabled: bool,
}

// ---------------------------------------------------------------------------
// Array members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArrayOfObjectsMember {
    Item(Arc<ArrayOfObjectsItem>),
    Error(Arc<ArrayItemError>),
}

impl ArrayOfObjectsMember {
    pub fn key(&self) -> &str {
        match self {
            ArrayOfObjectsMember::Item(member) => &member.key,
            ArrayOfObjectsMember::Error(member) => &member.key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOfObjectsItem {
    /// The item's `_key`.
    pub key: String,
    pub index: usize,
    pub open: bool,
    pub collapsible: bool,
    pub collapsed: bool,
    pub parent_schema_type: SchemaTypeRef,
    pub item: Arc<ObjectFormNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArrayOfPrimitivesMember {
    Item(Arc<ArrayOfPrimitivesItem>),
    Error(Arc<ArrayItemError>),
}

impl ArrayOfPrimitivesMember {
    pub fn key(&self) -> &str {
        match self {
            ArrayOfPrimitivesMember::Item(member) => &member.key,
            ArrayOfPrimitivesMember::Error(member) => &member.key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOfPrimitivesItem {
    /// `<typeName>-<index>`: positional, not stable across reordering.
    pub key: String,
    pub index: usize,
    pub open: bool,
    pub parent_schema_type: SchemaTypeRef,
    pub item: Arc<PrimitiveFormNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayItemError {
    pub key: String,
    pub index: usize,
    pub error: MemberErrorKind,
}

// ---------------------------------------------------------------------------
// Data-shape errors
// ---------------------------------------------------------------------------

/// Why a document value could not be rendered with its schema type.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum MemberErrorKind {
    /// The value has the wrong JSON type for the field.
    IncompatibleType {
        expected_schema_type: SchemaTypeRef,
        resolved_value_type: String,
        value: Value,
    },
    /// An array of objects holds non-object items.
    MixedArray {
        schema_type: SchemaTypeRef,
        value: Value,
    },
    /// An array of objects holds items without `_key`.
    MissingKeys {
        schema_type: SchemaTypeRef,
        value: Value,
    },
    /// Two or more items share a `_key`. Lists the `(index, key)` pair of
    /// every item involved.
    DuplicateKeys {
        schema_type: SchemaTypeRef,
        duplicates: Vec<(usize, String)>,
    },
    /// No member type of the array matches the item.
    InvalidItemType {
        resolved_value_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        valid_types: Vec<SchemaTypeRef>,
    },
}

impl MemberErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            MemberErrorKind::IncompatibleType { .. } => "INCOMPATIBLE_TYPE",
            MemberErrorKind::MixedArray { .. } => "MIXED_ARRAY",
            MemberErrorKind::MissingKeys { .. } => "MISSING_KEYS",
            MemberErrorKind::DuplicateKeys { .. } => "DUPLICATE_KEYS",
            MemberErrorKind::InvalidItemType { .. } => "INVALID_ITEM_TYPE",
        }
    }
}

// Schema types compare by identity.
impl PartialEq for MemberErrorKind {
    fn eq(&self, other: &Self) -> bool {
        use MemberErrorKind::*;
        match (self, other) {
            (
                IncompatibleType {
                    expected_schema_type: a,
                    resolved_value_type: ta,
                    value: va,
                },
                IncompatibleType {
                    expected_schema_type: b,
                    resolved_value_type: tb,
                    value: vb,
                },
            ) => Arc::ptr_eq(a, b) && ta == tb && va == vb,
            (
                MixedArray {
                    schema_type: a,
                    value: va,
                },
                MixedArray {
                    schema_type: b,
                    value: vb,
                },
            )
            | (
                MissingKeys {
                    schema_type: a,
                    value: va,
                },
                MissingKeys {
                    schema_type: b,
                    value: vb,
                },
            ) => Arc::ptr_eq(a, b) && va == vb,
            (
                DuplicateKeys {
                    schema_type: a,
                    duplicates: da,
                },
                DuplicateKeys {
                    schema_type: b,
                    duplicates: db,
                },
            ) => Arc::ptr_eq(a, b) && da == db,
            (
                InvalidItemType {
                    resolved_value_type: ta,
                    value: va,
                    valid_types: a,
                },
                InvalidItemType {
                    resolved_value_type: tb,
                    value: vb,
                    valid_types: b,
                },
            ) => {
                ta == tb
                    && va == vb
                    && a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

reconcile_by_equality!(FormFieldGroup, MemberErrorKind, ValidationMarker, FormNodePresence);

reconcile_fields!(ObjectFormNode {
    id,
    schema_type,
    value,
    changed,
    read_only,
    path,
    level,
    focused,
    focus_path,
    presence,
    validation,
    members,
    groups,
    all_members,
});

reconcile_fields!(ArrayOfObjectsFormNode {
    id,
    schema_type,
    value,
    changed,
    read_only,
    path,
    level,
    focused,
    focus_path,
    presence,
    validation,
    members,
});

reconcile_fields!(ArrayOfPrimitivesFormNode {
    id,
    schema_type,
    value,
    changed,
    read_only,
    path,
    level,
    focused,
    focus_path,
    presence,
    validation,
    members,
});

reconcile_fields!(PrimitiveFormNode {
    id,
    schema_type,
    value,
    changed,
    read_only,
    path,
    level,
    focused,
    presence,
    validation,
});

reconcile_fields!(FieldMember {
    key,
    name,
    index,
    in_selected_group,
    groups,
    open,
    collapsible,
    collapsed,
    field,
});

reconcile_fields!(FieldSetMember {
    key,
    in_selected_group,
    groups,
    field_set,
});

reconcile_fields!(FieldsetState {
    path,
    name,
    title,
    description,
    hidden,
    level,
    members,
    collapsible,
    collapsed,
    columns,
});

reconcile_fields!(HiddenField { key, name, index });

reconcile_fields!(FieldError {
    key,
    field_name,
    error,
});

reconcile_fields!(ArrayOfObjectsItem {
    key,
    index,
    open,
    collapsible,
    collapsed,
    parent_schema_type,
    item,
});

reconcile_fields!(ArrayOfPrimitivesItem {
    key,
    index,
    open,
    parent_schema_type,
    item,
});

reconcile_fields!(ArrayItemError { key, index, error });

reconcile_variants!(FormNode {
    Object,
    ArrayOfObjects,
    ArrayOfPrimitives,
    Primitive,
});

reconcile_variants!(ObjectMember {
    Field,
    FieldSet,
    Error,
    Hidden,
});

reconcile_variants!(ArrayOfObjectsMember { Item, Error });

reconcile_variants!(ArrayOfPrimitivesMember { Item, Error });
