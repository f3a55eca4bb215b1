//! Default collapsible / collapsed state from type options and nesting level.

use crate::schema::TypeOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapsibleState {
    pub collapsible: bool,
    pub collapsed: bool,
}

/// Defaults for a container at `level`.
///
/// `collapsible: false` in the options wins over everything. Otherwise each
/// flag comes from the options when given, and from `level > collapsible_level`
/// when not. A container that cannot collapse is never collapsed.
pub fn collapsed_with_defaults(
    options: &TypeOptions,
    level: usize,
    collapsible_level: usize,
) -> CollapsibleState {
    if options.collapsible == Some(false) {
        return CollapsibleState {
            collapsible: false,
            collapsed: false,
        };
    }
    let deep = level > collapsible_level;
    let collapsible = options.collapsible.unwrap_or(deep);
    CollapsibleState {
        collapsible,
        collapsed: collapsible && options.collapsed.unwrap_or(deep),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_containers_are_expanded() {
        let state = collapsed_with_defaults(&TypeOptions::default(), 1, 2);
        assert_eq!(
            state,
            CollapsibleState {
                collapsible: false,
                collapsed: false
            }
        );
    }

    #[test]
    fn test_deep_containers_collapse() {
        let state = collapsed_with_defaults(&TypeOptions::default(), 3, 2);
        assert!(state.collapsible);
        assert!(state.collapsed);
    }

    #[test]
    fn test_options_override_level() {
        let opts = TypeOptions {
            collapsible: Some(true),
            collapsed: Some(false),
            columns: None,
        };
        let state = collapsed_with_defaults(&opts, 0, 2);
        assert!(state.collapsible);
        assert!(!state.collapsed);

        let never = TypeOptions {
            collapsible: Some(false),
            collapsed: Some(true),
            columns: None,
        };
        assert!(!collapsed_with_defaults(&never, 10, 2).collapsed);
    }

    #[test]
    fn test_collapsed_only_when_collapsible() {
        let opts = TypeOptions {
            collapsed: Some(true),
            ..TypeOptions::default()
        };
        assert!(!collapsed_with_defaults(&opts, 0, 2).collapsed);
        assert!(collapsed_with_defaults(&opts, 5, 2).collapsed);
    }
}
