// Procedural macros for Trellis schema classes
// Field attributes play the role of stacked validation decorators

use proc_macro::TokenStream;

mod schema_class;
mod serde_attr;

/// Implements `trellis_validation::SchemaClass` from field attributes.
///
/// Each `#[schema(...)]` attribute lists decorator expressions top to bottom;
/// several attributes on one field stack in source order. The bottom-most
/// decorator runs first and must establish the base kind:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, SchemaClass)]
/// #[schema_class(extends = Entity)]
/// struct Invoice {
///     #[serde(flatten)]
///     entity: Entity,
///
///     #[schema(min(0))]
///     #[schema(required(), number_schema())]
///     total: f64,
/// }
/// ```
///
/// Property keys follow `#[serde(rename = "...")]` and the container's
/// `#[serde(rename_all = "...")]`. Fields without `#[schema]` attributes
/// declare no property; flattened and skipped fields are ignored.
#[proc_macro_derive(SchemaClass, attributes(schema, schema_class))]
pub fn derive_schema_class(input: TokenStream) -> TokenStream {
    schema_class::derive_impl(input)
}
