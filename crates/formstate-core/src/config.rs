//! Configuration for form-state derivation.

use serde::{Deserialize, Serialize};

/// Default nesting cap for objects and arrays.
pub const MAX_FIELD_DEPTH: usize = 20;

/// Options shared by the form-state builder and the callback-state resolver.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `max-depth`, `collapsible-level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BuilderOptions {
    /// Nesting level at which recursion stops. Nodes at this level are
    /// treated as hidden. Default: 20.
    pub max_depth: usize,
    /// Object fields and fieldsets nested deeper than this level are
    /// collapsible (and collapsed) unless their type options say otherwise.
    /// Default: 2.
    pub collapsible_level: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_FIELD_DEPTH,
            collapsible_level: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options_serde_round_trip() {
        let opts = BuilderOptions {
            max_depth: 8,
            collapsible_level: 4,
        };

        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"max-depth\""));
        assert!(json.contains("\"collapsible-level\""));

        let deserialized: BuilderOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, opts);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let opts: BuilderOptions = serde_json::from_str(r#"{"max-depth": 5}"#).unwrap();
        assert_eq!(opts.max_depth, 5);
        assert_eq!(opts.collapsible_level, 2);
    }
}
