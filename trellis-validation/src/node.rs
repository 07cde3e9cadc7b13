// Accumulated schema for one property

use trellis_schema::{Kind, Schema, SchemaError};

/// The schema accumulated so far for one property.
///
/// Established with exactly one base kind; every refinement produces a new
/// node and records its name.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    schema: Schema,
    refinements: Vec<&'static str>,
}

impl SchemaNode {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            refinements: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn kind(&self) -> Kind {
        self.schema.kind()
    }

    /// Names of the refinements applied, oldest first.
    pub fn refinements(&self) -> &[&'static str] {
        &self.refinements
    }

    /// Apply one algebra operation, returning the refined node.
    pub fn refine<F>(&self, name: &'static str, operation: F) -> Result<SchemaNode, SchemaError>
    where
        F: FnOnce(&Schema) -> Result<Schema, SchemaError>,
    {
        let schema = operation(&self.schema)?;
        let mut refinements = self.refinements.clone();
        refinements.push(name);
        Ok(SchemaNode {
            schema,
            refinements,
        })
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }
}
