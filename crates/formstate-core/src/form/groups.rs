//! Field-group (tab) selection and filtering.

use crate::schema::FieldGroupDefinition;
use crate::state_tree::{is_set, scope, StateTree};

use super::nodes::FormFieldGroup;

/// Name of the implicit group that shows every field.
pub const ALL_FIELDS_GROUP: &str = "all-fields";

const ALL_FIELDS_TITLE: &str = "All fields";

/// Resolve the group list of one object node.
///
/// The implicit all-fields group comes first, followed by the declared groups
/// in declaration order. Hidden groups are dropped. Exactly one of the
/// remaining groups is selected: the externally selected group when it is
/// still visible, else the first visible default group, else all-fields.
/// While the changes panel is open, all-fields is forced and every other
/// group is disabled.
pub fn resolve_groups(
    declared: &[FieldGroupDefinition],
    hidden: Option<&StateTree<bool>>,
    group_state: Option<&str>,
    changes_open: bool,
) -> Vec<FormFieldGroup> {
    let all_fields = FormFieldGroup {
        name: ALL_FIELDS_GROUP.to_string(),
        title: Some(ALL_FIELDS_TITLE.to_string()),
        selected: false,
        disabled: false,
    };

    // The implicit group can never be hidden.
    let mut groups: Vec<FormFieldGroup> = std::iter::once(all_fields)
        .chain(
            declared
                .iter()
                .filter(|group| !is_set(scope(hidden, &format!("group:{}", group.name))))
                .map(|group| FormFieldGroup {
                    name: group.name.clone(),
                    title: group.title.clone(),
                    selected: false,
                    disabled: false,
                }),
        )
        .collect();

    let visible = |name: &str| groups.iter().any(|g| g.name == name);
    let default_group = declared
        .iter()
        .find(|g| g.default && visible(&g.name))
        .map(|g| g.name.as_str());
    let selected_name = if changes_open {
        ALL_FIELDS_GROUP.to_string()
    } else {
        group_state
            .filter(|name| visible(*name))
            .or(default_group)
            .unwrap_or(ALL_FIELDS_GROUP)
            .to_string()
    };

    for group in &mut groups {
        group.selected = group.name == selected_name;
        group.disabled = changes_open && !group.selected;
    }
    groups
}

/// Whether a field (or fieldset) with the given group membership is shown
/// under the selected group.
pub fn is_field_enabled_by_group_filter(
    field_groups: &[String],
    selected_group: Option<&FormFieldGroup>,
) -> bool {
    match selected_group {
        None => false,
        Some(selected) if selected.name == ALL_FIELDS_GROUP => true,
        Some(selected) => field_groups.iter().any(|g| *g == selected.name),
    }
}
