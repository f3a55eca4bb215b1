//! # formstate-core
//!
//! Derive an immutable tree of form nodes from a content schema, a document
//! and the editor's UI state, and reconcile successive trees so unchanged
//! subtrees keep their identity.
//!
//! The usual flow per edit:
//!
//! 1. Resolve the sparse hidden and read-only trees with a
//!    [`CallbackStateResolver`] (memoized, one per editing session).
//! 2. Build the form tree with [`FormStateBuilder::prepare`].
//! 3. [`reconcile`](reconcile::reconcile) it against the previous tree.
//!
//! ```
//! use formstate_core::{
//!     prepare_form_state, ObjectField, RootFormStateOptions, SchemaType, Value,
//! };
//!
//! let book = SchemaType::object(
//!     "book",
//!     vec![ObjectField::new("title", SchemaType::string("string").into_ref())],
//! )
//! .into_ref();
//! let doc = Value::from(serde_json::json!({"title": "Dune"}));
//!
//! let node = prepare_form_state(&RootFormStateOptions::new(&book, Some(&doc)))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(node.members.len(), 1);
//! ```

pub mod conditional;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod form;
pub mod item_type;
pub mod markers;
pub mod path;
pub mod reconcile;
pub mod schema;
pub mod state_tree;
pub mod value;

pub use conditional::{
    resolve_callback_tree, resolve_conditional_property, CallbackStateOptions,
    CallbackStateResolver, ConditionalContext, ConditionalKind, IdentityIds,
};
pub use config::{BuilderOptions, MAX_FIELD_DEPTH};
pub use descriptor::{SchemaDescriptor, SchemaRegistry, TypeDescriptor};
pub use error::{CallbackError, FormStateError};
pub use form::{
    prepare_form_state, Decorators, FormNode, FormStateBuilder, MemberErrorKind, ObjectFormNode,
    ObjectMember, RootFormStateOptions,
};
pub use item_type::{resolve_item_type, resolve_primitive_item_type};
pub use markers::{CurrentUser, FormNodePresence, ValidationLevel, ValidationMarker};
pub use path::{Path, PathSegment};
pub use reconcile::{Reconcile, Reconciler};
pub use schema::{
    ConditionalProperty, FieldGroupDefinition, FieldsetDefinition, ObjectField, SchemaType,
    SchemaTypeKind, SchemaTypeRef, TypeOptions,
};
pub use state_tree::{StateTree, StateTreeRef};
pub use value::Value;
