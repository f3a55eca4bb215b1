//! Resolve which member type of an array a runtime item is.

use crate::schema::{ArraySchema, SchemaTypeRef};
use crate::value::Value;

/// The member type of an object-ish array item.
///
/// A single candidate type accepts any object item regardless of its
/// `_type`. Otherwise the item's type name (its `_type`, or its runtime JSON
/// type) must match a candidate's name. `None` is a data error for the
/// caller to report, never a panic.
pub fn resolve_item_type<'a>(array: &'a ArraySchema, item: &Value) -> Option<&'a SchemaTypeRef> {
    let of = array.of();
    if of.len() == 1 && item.is_object() {
        return of.first();
    }
    let type_name = item.type_name();
    of.iter().find(|member| member.name == type_name)
}

/// The member type of a primitive array item, matched on JSON type.
pub fn resolve_primitive_item_type<'a>(
    array: &'a ArraySchema,
    item: &Value,
) -> Option<&'a SchemaTypeRef> {
    let js_type = item.js_type();
    array
        .of()
        .iter()
        .find(|member| member.json_type().as_str() == js_type)
}
