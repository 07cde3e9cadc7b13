// Trellis - annotation-driven schema composition and validation
//
// Properties carry stacks of decorators; registering a class applies them and
// stores one schema per property. Validating an instance composes those
// schemas, inherited and nested ones included, into a single object schema.

// Re-export the validation layer
pub use trellis_validation::*;

// Re-export the schema algebra under its own name
pub use trellis_schema as schema;

// Re-export logging
pub use trellis_log as log;

// Re-export the derive macro
#[cfg(feature = "derive")]
pub use trellis_macros::SchemaClass;

// Prelude for common imports
pub mod prelude {
    pub use crate::decorators::*;
    pub use crate::{
        ClassDefinition,
        DefinitionError,
        Error,
        Kind,
        OptionsOverride,
        Presence,
        Schema,
        SchemaClass,
        SchemaRegistry,
        Validate,
        ValidationError,
        ValidationErrors,
        ValidationOptions,
        ValidationOutcome,
        When,
    };
}
