// Schema classes and their definition context

use crate::decorators::Decorator;
use crate::{ClassId, ClassSchemaMetadata, DefinitionError, SchemaNode, SchemaRegistry};
use trellis_log::trace;
use trellis_schema::{Schema, SchemaError};

/// A type whose properties carry validation decorators.
///
/// `define` is the class body: it runs once per registry, the first time the
/// class is registered or referenced. Usually generated with
/// `#[derive(SchemaClass)]`.
///
/// ```
/// use trellis_validation::{ClassDefinition, DefinitionError, SchemaClass};
/// use trellis_validation::decorators::*;
///
/// struct Product;
///
/// impl SchemaClass for Product {
///     fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
///         def
///             .property("sku", [required(), string_schema()])?
///             .property("price", [min(0), number_schema()])?;
///         Ok(())
///     }
/// }
/// ```
pub trait SchemaClass: 'static {
    fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError>;
}

/// A typed reference to a schema class, resolved by the registry.
#[derive(Debug, Clone, Copy)]
pub struct ClassRef {
    id: ClassId,
    define: fn(&mut ClassDefinition<'_>) -> Result<(), DefinitionError>,
}

impl ClassRef {
    pub fn of<T: SchemaClass>() -> Self {
        Self {
            id: ClassId::of::<T>(),
            define: T::define,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub(crate) fn run(&self, class: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
        (self.define)(class)
    }
}

/// Shorthand for [`ClassRef::of`].
pub fn class<T: SchemaClass>() -> ClassRef {
    ClassRef::of::<T>()
}

/// A nested schema given either literally or as a class whose accumulated
/// properties become an object schema.
#[derive(Debug, Clone)]
pub enum SchemaRef {
    Literal(Schema),
    Class(ClassRef),
}

impl From<Schema> for SchemaRef {
    fn from(schema: Schema) -> Self {
        SchemaRef::Literal(schema)
    }
}

impl From<ClassRef> for SchemaRef {
    fn from(class: ClassRef) -> Self {
        SchemaRef::Class(class)
    }
}

/// The class body under construction.
///
/// Decorators write into a private metadata copy that the registry commits
/// only after `define` returns `Ok`.
pub struct ClassDefinition<'r> {
    registry: &'r SchemaRegistry,
    metadata: ClassSchemaMetadata,
    /// Classes being defined on this call path, outermost first
    stack: Vec<ClassId>,
}

impl<'r> ClassDefinition<'r> {
    pub(crate) fn new(registry: &'r SchemaRegistry, class: ClassId, outer: &[ClassId]) -> Self {
        let mut stack = outer.to_vec();
        stack.push(class);
        Self {
            registry,
            metadata: ClassSchemaMetadata::new(class),
            stack,
        }
    }

    pub fn class(&self) -> ClassId {
        self.metadata.class()
    }

    /// Inherit every property of `P`, which is registered first if needed.
    pub fn extends<P: SchemaClass>(&mut self) -> Result<&mut Self, DefinitionError> {
        let parent = ClassRef::of::<P>();
        self.check_cycle(parent.id(), "<extends>")?;
        self.registry.define_class(parent, &self.stack)?;
        self.metadata.set_parent(parent.id());
        Ok(self)
    }

    /// Apply `decorators` to `key`, listed top to bottom as they would be
    /// stacked on a field. They run bottom to top: the last entry establishes
    /// the base kind, entries above it refine.
    pub fn property<I>(&mut self, key: &str, decorators: I) -> Result<&mut Self, DefinitionError>
    where
        I: IntoIterator<Item = Decorator>,
        I::IntoIter: DoubleEndedIterator,
    {
        for decorator in decorators.into_iter().rev() {
            self.decorate(key, decorator)?;
        }
        Ok(self)
    }

    /// Apply one decorator to `key`.
    pub fn decorate(&mut self, key: &str, decorator: Decorator) -> Result<&mut Self, DefinitionError> {
        trace!("{}.{}: applying {}", self.class(), key, decorator.name());
        decorator.apply(self, key)?;
        Ok(self)
    }

    /// The node accumulated so far for `key` on this class.
    pub fn schema(&self, key: &str) -> Option<&SchemaNode> {
        self.metadata.get_schema(key)
    }

    pub(crate) fn establish(&mut self, key: &str, schema: Schema) -> Result<(), DefinitionError> {
        if let Some(existing) = self.metadata.get_schema(key) {
            return Err(DefinitionError::constraint(
                self.class().name(),
                key,
                format!(
                    "a {} schema is already established; a property takes exactly one type decorator",
                    existing.kind()
                ),
            ));
        }
        self.metadata.set_schema(key, SchemaNode::new(schema));
        Ok(())
    }

    pub(crate) fn refine<F>(&mut self, key: &str, name: &'static str, operation: F) -> Result<(), DefinitionError>
    where
        F: FnOnce(&Schema) -> Result<Schema, SchemaError>,
    {
        let class = self.class().name();
        self.metadata.update_schema(key, |node| {
            node.refine(name, operation)
                .map_err(|e| DefinitionError::constraint(class, key, e.to_string()))
        })
    }

    /// Fail with `SchemaNotFound` unless `key` is established.
    pub(crate) fn require_established(&self, key: &str) -> Result<(), DefinitionError> {
        match self.metadata.get_schema(key) {
            Some(_) => Ok(()),
            None => Err(DefinitionError::schema_not_found(self.class().name(), key)),
        }
    }

    /// Turn a nested reference into a schema, defining referenced classes.
    pub(crate) fn resolve(&self, key: &str, reference: SchemaRef) -> Result<Schema, DefinitionError> {
        match reference {
            SchemaRef::Literal(schema) => Ok(schema),
            SchemaRef::Class(class) => {
                self.check_cycle(class.id(), key)?;
                self.registry.define_class(class, &self.stack)?;
                Ok(self.registry.composite_of(class.id())?.as_ref().clone())
            }
        }
    }

    /// The visible properties of `class` as `(key, schema)` pairs.
    pub(crate) fn resolve_keys(&self, key: &str, class: ClassRef) -> Result<Vec<(String, Schema)>, DefinitionError> {
        self.check_cycle(class.id(), key)?;
        self.registry.define_class(class, &self.stack)?;
        Ok(self
            .registry
            .visible_properties(class.id())
            .into_iter()
            .map(|p| (p.key, p.node.into_schema()))
            .collect())
    }

    fn check_cycle(&self, target: ClassId, key: &str) -> Result<(), DefinitionError> {
        if self.stack.contains(&target) {
            let path = self
                .stack
                .iter()
                .map(ClassId::name)
                .chain(std::iter::once(target.name()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DefinitionError::constraint(
                self.class().name(),
                key,
                format!("circular class reference {}", path),
            ));
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> ClassSchemaMetadata {
        self.metadata
    }
}
