//! Form-state derivation.

pub mod builder;
pub mod collapsible;
pub mod decorators;
pub mod groups;
pub mod nodes;

pub use builder::{
    is_changed_value, prepare_form_state, ArrayMemberProps, BuildResult, FieldMemberProps,
    FormStateBuilder, InputProps, RootFormStateOptions,
};
pub use decorators::Decorators;
pub use groups::ALL_FIELDS_GROUP;
pub use nodes::*;
