//! Conditional `hidden` / `readOnly` resolution.
//!
//! - [`resolve_conditional_property`] evaluates one declaration for one subject.
//! - [`callback_state`] walks a schema/document pair once and records every
//!   path where the property resolved to `true` in a sparse [`StateTree`].
//! - [`identity`] hands out opaque ids for shared inputs so the walk can be
//!   skipped when nothing changed.
//!
//! [`StateTree`]: crate::state_tree::StateTree

pub mod callback_state;
pub mod identity;

use crate::error::CallbackError;
use crate::markers::CurrentUser;
use crate::path::Path;
use crate::schema::{
    ConditionalProperty, FieldGroupDefinition, FieldsetDefinition, ObjectField, SchemaType,
};
use crate::value::Value;

pub use callback_state::{resolve_callback_tree, CallbackStateOptions, CallbackStateResolver};
pub use identity::IdentityIds;

/// What a conditional callback gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalContext<'a> {
    /// The value of the subject (field, fieldset slice, item or document).
    pub value: Option<&'a Value>,
    /// The value containing the subject.
    pub parent: Option<&'a Value>,
    pub document: Option<&'a Value>,
    pub current_user: Option<&'a CurrentUser>,
    pub path: &'a Path,
}

/// Evaluate a single `hidden` / `readOnly` declaration.
///
/// Unset and `false` resolve to `false`. A callback counts only when it
/// returns exactly `Value::Bool(true)`; truthy non-boolean results are
/// `false`. Callback errors are returned to the caller untouched.
pub fn resolve_conditional_property(
    property: &ConditionalProperty,
    context: &ConditionalContext<'_>,
) -> Result<bool, CallbackError> {
    match property {
        ConditionalProperty::Unset => Ok(false),
        ConditionalProperty::Static(b) => Ok(*b),
        ConditionalProperty::Callback(callback) => {
            Ok(matches!(callback(context)?, Value::Bool(true)))
        }
    }
}

/// Which conditional property a resolver is computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalKind {
    Hidden,
    ReadOnly,
}

impl ConditionalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionalKind::Hidden => "hidden",
            ConditionalKind::ReadOnly => "readOnly",
        }
    }

    pub fn of_type(self, schema_type: &SchemaType) -> &ConditionalProperty {
        match self {
            ConditionalKind::Hidden => &schema_type.hidden,
            ConditionalKind::ReadOnly => &schema_type.read_only,
        }
    }

    pub fn of_field(self, field: &ObjectField) -> &ConditionalProperty {
        match self {
            ConditionalKind::Hidden => &field.hidden,
            ConditionalKind::ReadOnly => &field.read_only,
        }
    }

    pub fn of_fieldset(self, fieldset: &FieldsetDefinition) -> &ConditionalProperty {
        match self {
            ConditionalKind::Hidden => &fieldset.hidden,
            ConditionalKind::ReadOnly => &fieldset.read_only,
        }
    }

    /// Groups only declare `hidden`.
    pub fn of_group(self, group: &FieldGroupDefinition) -> Option<&ConditionalProperty> {
        match self {
            ConditionalKind::Hidden if !group.hidden.is_unset() => Some(&group.hidden),
            _ => None,
        }
    }
}
