//! Schema-constrained responses.

mod examples;
mod repair;
mod resolver;

pub use examples::{
    ExampleWriter, SCHEMA_EXAMPLE_NAMESPACE, SchemaExampleProvider, example_prompt,
};
pub use repair::{repair_json, strip_code_fence};
pub use resolver::{JsonFixer, StructuredResolver};
