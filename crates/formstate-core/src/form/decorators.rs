//! Hooks wrapping each node-construction step of the builder.
//!
//! A decorator receives the step's props and the undecorated step as
//! `next`. It may observe, replace or post-process the result, or call
//! `next` with different props. Steps called from inside `next` go through
//! their own decorators again.

use std::fmt;
use std::sync::Arc;

use super::builder::{ArrayMemberProps, BuildResult, FieldMemberProps, InputProps};
use super::nodes::{
    ArrayOfObjectsFormNode, ArrayOfObjectsMember, ArrayOfPrimitivesFormNode,
    ArrayOfPrimitivesMember, ObjectFormNode, ObjectMember, PrimitiveFormNode,
};

/// Wraps an input-state step that takes [`InputProps`].
pub type InputDecorator<R> = Arc<
    dyn Fn(&InputProps<'_>, &dyn Fn(&InputProps<'_>) -> BuildResult<R>) -> BuildResult<R>
        + Send
        + Sync,
>;

/// Wraps the object input step. The `bool` is the empty-node check flag.
pub type ObjectInputDecorator = Arc<
    dyn Fn(
            &InputProps<'_>,
            bool,
            &dyn Fn(&InputProps<'_>, bool) -> BuildResult<Option<Arc<ObjectFormNode>>>,
        ) -> BuildResult<Option<Arc<ObjectFormNode>>>
        + Send
        + Sync,
>;

/// Wraps an array member step.
pub type MemberDecorator<R> = Arc<
    dyn Fn(
            &ArrayMemberProps<'_>,
            &dyn Fn(&ArrayMemberProps<'_>) -> BuildResult<R>,
        ) -> BuildResult<R>
        + Send
        + Sync,
>;

pub type FieldMemberDecorator = Arc<
    dyn Fn(
            &FieldMemberProps<'_>,
            &dyn Fn(&FieldMemberProps<'_>) -> BuildResult<Option<ObjectMember>>,
        ) -> BuildResult<Option<ObjectMember>>
        + Send
        + Sync,
>;

/// One optional decorator per construction step.
#[derive(Clone, Default)]
pub struct Decorators {
    pub field_member: Option<FieldMemberDecorator>,
    pub object_input: Option<ObjectInputDecorator>,
    pub array_of_objects_input: Option<InputDecorator<Option<Arc<ArrayOfObjectsFormNode>>>>,
    pub array_of_primitives_input: Option<InputDecorator<Option<Arc<ArrayOfPrimitivesFormNode>>>>,
    pub primitive_input: Option<InputDecorator<Arc<PrimitiveFormNode>>>,
    pub array_of_objects_member: Option<MemberDecorator<Option<ArrayOfObjectsMember>>>,
    pub array_of_primitives_member: Option<MemberDecorator<ArrayOfPrimitivesMember>>,
}

impl Decorators {
    pub fn is_empty(&self) -> bool {
        self.field_member.is_none()
            && self.object_input.is_none()
            && self.array_of_objects_input.is_none()
            && self.array_of_primitives_input.is_none()
            && self.primitive_input.is_none()
            && self.array_of_objects_member.is_none()
            && self.array_of_primitives_member.is_none()
    }
}

impl fmt::Debug for Decorators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorators")
            .field("field_member", &self.field_member.is_some())
            .field("object_input", &self.object_input.is_some())
            .field("array_of_objects_input", &self.array_of_objects_input.is_some())
            .field("array_of_primitives_input", &self.array_of_primitives_input.is_some())
            .field("primitive_input", &self.primitive_input.is_some())
            .field("array_of_objects_member", &self.array_of_objects_member.is_some())
            .field("array_of_primitives_member", &self.array_of_primitives_member.is_some())
            .finish()
    }
}
