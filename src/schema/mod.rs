//! Declarative field schema: tags, descriptors, and value shapes.
//!
//! A [`Schema`] is bound once and never changes for the lifetime of the form
//! built from it. Malformed descriptors are rejected when the schema is bound
//! rather than when a field is rendered.

mod core;
mod tag;
mod value;

pub use self::core::{
    ChoiceOption, Constraints, Direction, FieldDescriptor, FieldValidator, RenderHints, Schema,
    SchemaBuilder,
};
pub use tag::{FieldTag, ValueShape};
pub use value::FieldValue;
