//! JSON schema descriptors and their compilation into a type graph.
//!
//! A [`SchemaDescriptor`] lists named types. Fields and array members refer
//! to other types either by name (including the built-in `string`, `number`
//! and `boolean`) or by an inline anonymous definition. Named references may
//! form cycles; [`SchemaRegistry::compile`] allocates every named type first
//! and fills in fields and members afterwards.
//!
//! Conditional properties can only be static here. Callbacks are attached
//! in code with [`SchemaType::with_hidden`] and friends.
//!
//! ```json
//! {
//!   "types": [
//!     {
//!       "name": "person",
//!       "jsonType": "object",
//!       "fields": [
//!         {"name": "name", "type": "string"},
//!         {"name": "friends", "type": {"jsonType": "array", "of": ["person"]}}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FormStateError;
use crate::schema::{
    ConditionalProperty, FieldGroupDefinition, FieldsetDefinition, JsonType, ObjectField,
    SchemaType, SchemaTypeRef, TypeOptions,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub types: Vec<TypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    /// Required for top-level types; inline types default to their JSON type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub json_type: JsonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub options: TypeOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fieldsets: Vec<FieldsetDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub of: Vec<TypeRef>,
}

/// A reference to a type: its name, or an inline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    Named(String),
    Inline(Box<TypeDescriptor>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub group: OneOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsetDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub group: OneOrMany,
    #[serde(default)]
    pub options: TypeOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub default: bool,
}

/// A group name or a list of group names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::None => true,
            OneOrMany::One(_) => false,
            OneOrMany::Many(names) => names.is_empty(),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(name) => vec![name.clone()],
            OneOrMany::Many(names) => names.clone(),
        }
    }
}

fn conditional(flag: Option<bool>) -> ConditionalProperty {
    flag.map_or(ConditionalProperty::Unset, ConditionalProperty::Static)
}

/// Named types compiled from a [`SchemaDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, SchemaTypeRef>,
}

impl SchemaRegistry {
    pub fn from_json(json: &str) -> Result<Self, FormStateError> {
        let descriptor: SchemaDescriptor = serde_json::from_str(json)?;
        Self::compile(&descriptor)
    }

    pub fn compile(descriptor: &SchemaDescriptor) -> Result<Self, FormStateError> {
        let mut registry = SchemaRegistry::default();

        // Allocate every named type so references (and cycles) can resolve.
        for ty in &descriptor.types {
            let Some(name) = ty.name.as_deref() else {
                return Err(FormStateError::SchemaError {
                    path: "types".to_string(),
                    message: "top-level types must have a name".to_string(),
                });
            };
            if registry.types.contains_key(name) || is_builtin(name) {
                return Err(FormStateError::SchemaError {
                    path: name.to_string(),
                    message: "duplicate type name".to_string(),
                });
            }
            registry.types.insert(name.to_string(), allocate(name, ty));
        }

        for ty in &descriptor.types {
            let name = ty.name.as_deref().unwrap_or_default();
            if let Some(shell) = registry.types.get(name).cloned() {
                registry.define(&shell, ty, name)?;
            }
        }

        tracing::debug!(types = registry.types.len(), "compiled schema registry");
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaTypeRef> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Fill in the fields or members of an allocated type.
    fn define(
        &self,
        shell: &SchemaTypeRef,
        ty: &TypeDescriptor,
        path: &str,
    ) -> Result<(), FormStateError> {
        if let Some(object) = shell.as_object() {
            let mut fields = Vec::with_capacity(ty.fields.len());
            for field in &ty.fields {
                let field_path = format!("{path}.{}", field.name);
                let mut compiled =
                    ObjectField::new(&field.name, self.resolve(&field.type_ref, &field_path)?)
                        .with_hidden(conditional(field.hidden))
                        .with_read_only(conditional(field.read_only));
                compiled.group = field.group.to_vec();
                compiled.fieldset = field.fieldset.clone();
                fields.push(compiled);
            }
            for fieldset in &ty.fieldsets {
                if !ty.fields.iter().any(|f| f.fieldset.as_ref() == Some(&fieldset.name)) {
                    tracing::warn!(
                        path,
                        fieldset = %fieldset.name,
                        "fieldset has no fields"
                    );
                }
            }
            object.define_fields(fields)?;
        } else if let Some(array) = shell.as_array() {
            let of = ty
                .of
                .iter()
                .enumerate()
                .map(|(i, member)| self.resolve(member, &format!("{path}.of[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            array.define_of(of)?;
        }
        Ok(())
    }

    fn resolve(&self, type_ref: &TypeRef, path: &str) -> Result<SchemaTypeRef, FormStateError> {
        match type_ref {
            TypeRef::Named(name) => self
                .types
                .get(name)
                .cloned()
                .or_else(|| builtin(name))
                .ok_or_else(|| FormStateError::UnknownType {
                    path: path.to_string(),
                    name: name.clone(),
                }),
            TypeRef::Inline(ty) => {
                let name = ty
                    .name
                    .clone()
                    .unwrap_or_else(|| ty.json_type.as_str().to_string());
                let shell = allocate(&name, ty);
                self.define(&shell, ty, path)?;
                Ok(shell)
            }
        }
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(name, "string" | "number" | "boolean")
}

fn builtin(name: &str) -> Option<SchemaTypeRef> {
    let ty = match name {
        "string" => SchemaType::string(name),
        "number" => SchemaType::number(name),
        "boolean" => SchemaType::boolean(name),
        _ => return None,
    };
    Some(ty.into_ref())
}

/// A type with everything but its fields / members.
fn allocate(name: &str, ty: &TypeDescriptor) -> SchemaTypeRef {
    let base = match ty.json_type {
        JsonType::Object => SchemaType::object_deferred(name)
            .with_fieldsets(
                ty.fieldsets
                    .iter()
                    .map(|fs| FieldsetDefinition {
                        name: fs.name.clone(),
                        title: fs.title.clone(),
                        description: fs.description.clone(),
                        hidden: conditional(fs.hidden),
                        read_only: conditional(fs.read_only),
                        group: fs.group.to_vec(),
                        options: fs.options,
                    })
                    .collect(),
            )
            .with_groups(
                ty.groups
                    .iter()
                    .map(|g| FieldGroupDefinition {
                        name: g.name.clone(),
                        title: g.title.clone(),
                        hidden: conditional(g.hidden),
                        default: g.default,
                    })
                    .collect(),
            ),
        JsonType::Array => SchemaType::array_deferred(name),
        JsonType::Boolean => SchemaType::boolean(name),
        JsonType::Number => SchemaType::number(name),
        JsonType::String => SchemaType::string(name),
    };
    let mut base = base
        .with_hidden(conditional(ty.hidden))
        .with_read_only(conditional(ty.read_only))
        .with_options(ty.options);
    base.title = ty.title.clone();
    base.into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_compile_cyclic_types() {
        let registry = SchemaRegistry::from_json(
            r#"{
                "types": [{
                    "name": "person",
                    "jsonType": "object",
                    "fields": [
                        {"name": "name", "type": "string"},
                        {"name": "friends", "type": {"jsonType": "array", "of": ["person"]}}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let person = registry.get("person").unwrap();
        let friends = person.as_object().unwrap().field("friends").unwrap();
        let of = friends.schema_type.as_array().unwrap().of();
        assert!(Arc::ptr_eq(&of[0], person));
        assert_eq!(friends.schema_type.name, "array");
    }

    #[test]
    fn test_fieldsets_groups_and_flags() {
        let registry = SchemaRegistry::from_json(
            r#"{
                "types": [{
                    "name": "article",
                    "jsonType": "object",
                    "fieldsets": [
                        {"name": "meta", "title": "Meta", "options": {"collapsible": true}}
                    ],
                    "groups": [{"name": "seo", "default": true}],
                    "fields": [
                        {"name": "title", "type": "string", "group": "seo"},
                        {
                            "name": "slug",
                            "type": "string",
                            "group": ["seo", "content"],
                            "fieldset": "meta",
                            "readOnly": true
                        },
                        {"name": "secret", "type": "string", "hidden": true}
                    ]
                }]
            }"#,
        )
        .unwrap();
        let article = registry.get("article").unwrap().as_object().unwrap();
        assert_eq!(article.fieldsets[0].options.collapsible, Some(true));
        assert!(article.groups[0].default);
        let slug = article.field("slug").unwrap();
        assert_eq!(slug.group, ["seo", "content"]);
        assert_eq!(slug.fieldset.as_deref(), Some("meta"));
        assert!(matches!(slug.read_only, ConditionalProperty::Static(true)));
        assert!(matches!(
            article.field("secret").unwrap().hidden,
            ConditionalProperty::Static(true)
        ));
        assert!(article.field("title").unwrap().read_only.is_unset());
    }

    #[test]
    fn test_unknown_type_reference() {
        let err = SchemaRegistry::from_json(
            r#"{"types": [{
                "name": "a",
                "jsonType": "object",
                "fields": [{"name": "b", "type": "nope"}]
            }]}"#,
        )
        .unwrap_err();
        match err {
            FormStateError::UnknownType { path, name } => {
                assert_eq!(path, "a.b");
                assert_eq!(name, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_and_unnamed_types_are_rejected() {
        let duplicate = r#"{"types": [
            {"name": "a", "jsonType": "string"},
            {"name": "a", "jsonType": "number"}
        ]}"#;
        assert!(matches!(
            SchemaRegistry::from_json(duplicate),
            Err(FormStateError::SchemaError { .. })
        ));
        let unnamed = r#"{"types": [{"jsonType": "string"}]}"#;
        assert!(SchemaRegistry::from_json(unnamed).is_err());
        assert!(matches!(
            SchemaRegistry::from_json("{"),
            Err(FormStateError::JsonError(_))
        ));
    }
}
