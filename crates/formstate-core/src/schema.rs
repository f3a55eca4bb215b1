//! The compiled schema-type graph consumed by the builder.
//!
//! Types are shared as [`SchemaTypeRef`] and are treated as read-only,
//! reference-stable values. Object fields and array members can be defined
//! after the type itself is allocated, which is how recursive (cyclic) type
//! graphs are closed.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::conditional::ConditionalContext;
use crate::error::{CallbackError, FormStateError};
use crate::value::Value;

pub type SchemaTypeRef = Arc<SchemaType>;

/// User-authored conditional callback for `hidden` / `readOnly`.
///
/// Only a returned `Value::Bool(true)` counts as set.
pub type ConditionalCallback =
    Arc<dyn Fn(&ConditionalContext<'_>) -> Result<Value, CallbackError> + Send + Sync>;

#[derive(Clone, Default)]
pub enum ConditionalProperty {
    #[default]
    Unset,
    Static(bool),
    Callback(ConditionalCallback),
}

impl ConditionalProperty {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&ConditionalContext<'_>) -> Result<Value, CallbackError> + Send + Sync + 'static,
    {
        ConditionalProperty::Callback(Arc::new(f))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, ConditionalProperty::Unset)
    }
}

impl From<bool> for ConditionalProperty {
    fn from(b: bool) -> Self {
        ConditionalProperty::Static(b)
    }
}

impl fmt::Debug for ConditionalProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionalProperty::Unset => f.write_str("Unset"),
            ConditionalProperty::Static(b) => write!(f, "Static({b})"),
            ConditionalProperty::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    Boolean,
    Number,
    String,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
        }
    }
}

/// Presentation options shared by types and fieldsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    pub collapsible: Option<bool>,
    pub collapsed: Option<bool>,
    pub columns: Option<u32>,
}

pub struct SchemaType {
    pub name: String,
    pub title: Option<String>,
    pub kind: SchemaTypeKind,
    pub hidden: ConditionalProperty,
    pub read_only: ConditionalProperty,
    pub options: TypeOptions,
}

pub enum SchemaTypeKind {
    Object(ObjectSchema),
    Array(ArraySchema),
    Boolean,
    Number,
    String,
}

impl SchemaType {
    fn with_kind(name: &str, kind: SchemaTypeKind) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            kind,
            hidden: ConditionalProperty::Unset,
            read_only: ConditionalProperty::Unset,
            options: TypeOptions::default(),
        }
    }

    pub fn string(name: &str) -> Self {
        Self::with_kind(name, SchemaTypeKind::String)
    }

    pub fn number(name: &str) -> Self {
        Self::with_kind(name, SchemaTypeKind::Number)
    }

    pub fn boolean(name: &str) -> Self {
        Self::with_kind(name, SchemaTypeKind::Boolean)
    }

    pub fn object(name: &str, fields: Vec<ObjectField>) -> Self {
        let object = ObjectSchema::deferred();
        let _ = object.fields.set(fields);
        Self::with_kind(name, SchemaTypeKind::Object(object))
    }

    /// An object type whose fields are supplied later via
    /// [`ObjectSchema::define_fields`].
    pub fn object_deferred(name: &str) -> Self {
        Self::with_kind(name, SchemaTypeKind::Object(ObjectSchema::deferred()))
    }

    pub fn array(name: &str, of: Vec<SchemaTypeRef>) -> Self {
        let array = ArraySchema::deferred();
        let _ = array.of.set(of);
        Self::with_kind(name, SchemaTypeKind::Array(array))
    }

    /// An array type whose member types are supplied later via
    /// [`ArraySchema::define_of`].
    pub fn array_deferred(name: &str) -> Self {
        Self::with_kind(name, SchemaTypeKind::Array(ArraySchema::deferred()))
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_hidden(mut self, hidden: impl Into<ConditionalProperty>) -> Self {
        self.hidden = hidden.into();
        self
    }

    pub fn with_read_only(mut self, read_only: impl Into<ConditionalProperty>) -> Self {
        self.read_only = read_only.into();
        self
    }

    pub fn with_options(mut self, options: TypeOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach fieldset definitions. Ignored for non-object types.
    pub fn with_fieldsets(mut self, fieldsets: Vec<FieldsetDefinition>) -> Self {
        if let SchemaTypeKind::Object(object) = &mut self.kind {
            object.fieldsets = fieldsets;
        }
        self
    }

    /// Attach field-group definitions. Ignored for non-object types.
    pub fn with_groups(mut self, groups: Vec<FieldGroupDefinition>) -> Self {
        if let SchemaTypeKind::Object(object) = &mut self.kind {
            object.groups = groups;
        }
        self
    }

    pub fn into_ref(self) -> SchemaTypeRef {
        Arc::new(self)
    }

    pub fn json_type(&self) -> JsonType {
        match self.kind {
            SchemaTypeKind::Object(_) => JsonType::Object,
            SchemaTypeKind::Array(_) => JsonType::Array,
            SchemaTypeKind::Boolean => JsonType::Boolean,
            SchemaTypeKind::Number => JsonType::Number,
            SchemaTypeKind::String => JsonType::String,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaTypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySchema> {
        match &self.kind {
            SchemaTypeKind::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaTypeKind::Object(_))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.kind,
            SchemaTypeKind::Boolean | SchemaTypeKind::Number | SchemaTypeKind::String
        )
    }
}

impl fmt::Debug for SchemaType {
    // Types may be cyclic: never descend into fields or members.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("json_type", &self.json_type())
            .finish_non_exhaustive()
    }
}

impl Serialize for SchemaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SchemaType", 2)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("jsonType", &self.json_type())?;
        s.end()
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ObjectSchema {
    fields: OnceLock<Vec<ObjectField>>,
    pub fieldsets: Vec<FieldsetDefinition>,
    pub groups: Vec<FieldGroupDefinition>,
}

impl ObjectSchema {
    fn deferred() -> Self {
        Self {
            fields: OnceLock::new(),
            fieldsets: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Declared fields, in declaration order. Empty until defined.
    pub fn fields(&self) -> &[ObjectField] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn define_fields(&self, fields: Vec<ObjectField>) -> Result<(), FormStateError> {
        self.fields
            .set(fields)
            .map_err(|_| FormStateError::SchemaError {
                path: "fields".to_string(),
                message: "object fields are already defined".to_string(),
            })
    }

    pub fn field(&self, name: &str) -> Option<&ObjectField> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Fields and fieldsets as one ordered sequence.
    ///
    /// A field outside any fieldset is a [`NormalizedMember::Single`]; a
    /// fieldset appears where its first field is declared and gathers all of
    /// its fields in declaration order.
    pub fn normalized_members(&self) -> Vec<NormalizedMember<'_>> {
        let mut members = Vec::new();
        let mut emitted: Vec<&str> = Vec::new();

        for field in self.fields() {
            let Some(fieldset_name) = field.fieldset.as_deref() else {
                members.push(NormalizedMember::Single(field));
                continue;
            };
            let Some(fieldset) = self.fieldsets.iter().find(|fs| fs.name == fieldset_name) else {
                tracing::warn!(
                    field = %field.name,
                    fieldset = %fieldset_name,
                    "field refers to an undeclared fieldset; treating it as a plain field"
                );
                members.push(NormalizedMember::Single(field));
                continue;
            };
            if emitted.contains(&fieldset_name) {
                continue;
            }
            emitted.push(fieldset_name);
            let fields = self
                .fields()
                .iter()
                .filter(|f| f.fieldset.as_deref() == Some(fieldset_name))
                .collect();
            members.push(NormalizedMember::Fieldset { fieldset, fields });
        }

        members
    }
}

#[derive(Debug, Clone)]
pub struct ObjectField {
    pub name: String,
    pub schema_type: SchemaTypeRef,
    pub hidden: ConditionalProperty,
    pub read_only: ConditionalProperty,
    pub group: Vec<String>,
    pub fieldset: Option<String>,
}

impl ObjectField {
    pub fn new(name: &str, schema_type: SchemaTypeRef) -> Self {
        Self {
            name: name.to_string(),
            schema_type,
            hidden: ConditionalProperty::Unset,
            read_only: ConditionalProperty::Unset,
            group: Vec::new(),
            fieldset: None,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group.push(group.to_string());
        self
    }

    pub fn in_fieldset(mut self, fieldset: &str) -> Self {
        self.fieldset = Some(fieldset.to_string());
        self
    }

    pub fn with_hidden(mut self, hidden: impl Into<ConditionalProperty>) -> Self {
        self.hidden = hidden.into();
        self
    }

    pub fn with_read_only(mut self, read_only: impl Into<ConditionalProperty>) -> Self {
        self.read_only = read_only.into();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldsetDefinition {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hidden: ConditionalProperty,
    pub read_only: ConditionalProperty,
    pub group: Vec<String>,
    pub options: TypeOptions,
}

impl FieldsetDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldGroupDefinition {
    pub name: String,
    pub title: Option<String>,
    pub hidden: ConditionalProperty,
    pub default: bool,
}

impl FieldGroupDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub enum NormalizedMember<'a> {
    Single(&'a ObjectField),
    Fieldset {
        fieldset: &'a FieldsetDefinition,
        fields: Vec<&'a ObjectField>,
    },
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ArraySchema {
    of: OnceLock<Vec<SchemaTypeRef>>,
}

impl ArraySchema {
    fn deferred() -> Self {
        Self {
            of: OnceLock::new(),
        }
    }

    /// Candidate member types, in declaration order. Empty until defined.
    pub fn of(&self) -> &[SchemaTypeRef] {
        self.of.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn define_of(&self, of: Vec<SchemaTypeRef>) -> Result<(), FormStateError> {
        self.of.set(of).map_err(|_| FormStateError::SchemaError {
            path: "of".to_string(),
            message: "array members are already defined".to_string(),
        })
    }

    /// Every candidate member type is an object.
    pub fn is_array_of_objects(&self) -> bool {
        self.of().iter().all(|t| t.is_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_field(name: &str) -> ObjectField {
        ObjectField::new(name, SchemaType::string("string").into_ref())
    }

    #[test]
    fn test_normalized_members_follow_declaration_order() {
        let ty = SchemaType::object(
            "doc",
            vec![
                string_field("a"),
                string_field("b").in_fieldset("meta"),
                string_field("c"),
                string_field("d").in_fieldset("meta"),
            ],
        )
        .with_fieldsets(vec![FieldsetDefinition::new("meta")]);

        let object = ty.as_object().unwrap();
        let members = object.normalized_members();
        assert_eq!(members.len(), 3);
        assert!(matches!(members[0], NormalizedMember::Single(f) if f.name == "a"));
        match &members[1] {
            NormalizedMember::Fieldset { fieldset, fields } => {
                assert_eq!(fieldset.name, "meta");
                let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, ["b", "d"]);
            }
            other => panic!("expected fieldset, got {other:?}"),
        }
        assert!(matches!(members[2], NormalizedMember::Single(f) if f.name == "c"));
    }

    #[test]
    fn test_unknown_fieldset_is_plain_field() {
        let ty = SchemaType::object("doc", vec![string_field("a").in_fieldset("nope")]);
        let members = ty.as_object().unwrap().normalized_members();
        assert!(matches!(members[0], NormalizedMember::Single(_)));
    }

    #[test]
    fn test_cyclic_type_graph() {
        let node = SchemaType::object_deferred("node").into_ref();
        let object = node.as_object().unwrap();
        object
            .define_fields(vec![ObjectField::new("child", Arc::clone(&node))])
            .unwrap();

        let child = &node.as_object().unwrap().fields()[0];
        assert!(Arc::ptr_eq(&child.schema_type, &node));
        assert!(object.define_fields(Vec::new()).is_err());
        // Debug must not recurse through the cycle.
        assert!(format!("{node:?}").contains("node"));
    }

    #[test]
    fn test_array_of_objects_classification() {
        let objects = SchemaType::array(
            "list",
            vec![SchemaType::object("item", vec![]).into_ref()],
        );
        let primitives = SchemaType::array("tags", vec![SchemaType::string("string").into_ref()]);
        assert!(objects.as_array().unwrap().is_array_of_objects());
        assert!(!primitives.as_array().unwrap().is_array_of_objects());
    }
}
