// Per-class schema metadata

use crate::{DefinitionError, SchemaNode};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a schema class.
///
/// Compared by `TypeId`; the type name is kept for messages.
#[derive(Debug, Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// `my_app::models::User` -> `User`, leaving generic arguments alone.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// One established property.
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    pub key: String,
    pub node: SchemaNode,
}

/// Properties defined directly on one class, in first-definition order.
#[derive(Debug, Clone)]
pub struct ClassSchemaMetadata {
    class: ClassId,
    parent: Option<ClassId>,
    properties: Vec<PropertyMetadata>,
}

impl ClassSchemaMetadata {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            parent: None,
            properties: Vec::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: ClassId) {
        self.parent = Some(parent);
    }

    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The node on this class only.
    pub fn get_schema(&self, key: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.node)
    }

    /// Store `node` for `key`, replacing any existing node in place.
    pub fn set_schema(&mut self, key: &str, node: SchemaNode) {
        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(property) => property.node = node,
            None => self.properties.push(PropertyMetadata {
                key: key.to_string(),
                node,
            }),
        }
    }

    /// Replace the node for `key` with `update(node)`.
    ///
    /// Fails with [`DefinitionError::SchemaNotFound`] when `key` has no node.
    pub fn update_schema<F>(&mut self, key: &str, update: F) -> Result<(), DefinitionError>
    where
        F: FnOnce(&SchemaNode) -> Result<SchemaNode, DefinitionError>,
    {
        let class = self.class;
        let property = self
            .properties
            .iter_mut()
            .find(|p| p.key == key)
            .ok_or_else(|| DefinitionError::schema_not_found(class.name(), key))?;
        property.node = update(&property.node)?;
        Ok(())
    }
}

/// Metadata of every defined class, keyed by class identity.
#[derive(Debug, Default)]
pub struct MetadataStore {
    classes: HashMap<ClassId, ClassSchemaMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.classes.contains_key(&class)
    }

    pub fn get(&self, class: ClassId) -> Option<&ClassSchemaMetadata> {
        self.classes.get(&class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Add a fully defined class. An existing entry is kept.
    pub fn insert(&mut self, metadata: ClassSchemaMetadata) -> bool {
        let class = metadata.class();
        if self.classes.contains_key(&class) {
            return false;
        }
        self.classes.insert(class, metadata);
        true
    }

    pub fn get_schema(&self, class: ClassId, key: &str) -> Option<&SchemaNode> {
        self.get(class).and_then(|metadata| metadata.get_schema(key))
    }

    /// Classes from `class` up its parent chain, most derived first.
    pub fn chain(&self, class: ClassId) -> Vec<&ClassSchemaMetadata> {
        let mut chain = Vec::new();
        let mut next = Some(class);
        while let Some(id) = next {
            let Some(metadata) = self.get(id) else { break };
            if chain.iter().any(|m: &&ClassSchemaMetadata| m.class() == id) {
                break;
            }
            chain.push(metadata);
            next = metadata.parent();
        }
        chain
    }

    /// The node for `key` on `class` or the nearest ancestor defining it.
    pub fn resolve_schema(&self, class: ClassId, key: &str) -> Option<&SchemaNode> {
        self.chain(class)
            .into_iter()
            .find_map(|metadata| metadata.get_schema(key))
    }

    /// Every property visible on `class`, base classes first. A derived
    /// definition replaces the base node but keeps the base position.
    pub fn visible_properties(&self, class: ClassId) -> Vec<PropertyMetadata> {
        let mut visible: Vec<PropertyMetadata> = Vec::new();
        for metadata in self.chain(class).into_iter().rev() {
            for property in metadata.properties() {
                match visible.iter_mut().find(|p| p.key == property.key) {
                    Some(existing) => existing.node = property.node.clone(),
                    None => visible.push(property.clone()),
                }
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_schema::{Kind, Schema};

    struct Base;
    struct Derived;

    #[test]
    fn test_class_id_names() {
        assert_eq!(ClassId::of::<Base>().name(), "Base");
        assert_eq!(ClassId::of::<Base>(), ClassId::of::<Base>());
        assert_ne!(ClassId::of::<Base>(), ClassId::of::<Derived>());
        assert_eq!(short_type_name("a::b::Wrapper<c::D>"), "Wrapper<c::D>");
    }

    #[test]
    fn test_update_requires_existing_node() {
        let class = ClassId::of::<Base>();
        let mut metadata = ClassSchemaMetadata::new(class);
        let err = metadata
            .update_schema("age", |node| Ok(node.clone()))
            .unwrap_err();
        assert_eq!(err, DefinitionError::schema_not_found("Base", "age"));

        metadata.set_schema("age", SchemaNode::new(Schema::number()));
        metadata
            .update_schema("age", |node| {
                Ok(node.refine("integer", |s| s.integer()).unwrap())
            })
            .unwrap();

        let mut store = MetadataStore::new();
        store.insert(metadata);
        assert_eq!(store.get_schema(class, "age").unwrap().refinements(), &["integer"]);
    }

    #[test]
    fn test_chain_resolution() {
        let mut store = MetadataStore::new();
        let base = ClassId::of::<Base>();
        let derived = ClassId::of::<Derived>();

        let mut base_meta = ClassSchemaMetadata::new(base);
        base_meta.set_schema("id", SchemaNode::new(Schema::number()));
        base_meta.set_schema("name", SchemaNode::new(Schema::string()));
        store.insert(base_meta);

        let mut derived_meta = ClassSchemaMetadata::new(derived);
        derived_meta.set_parent(base);
        derived_meta.set_schema("name", SchemaNode::new(Schema::any()));
        derived_meta.set_schema("email", SchemaNode::new(Schema::string()));
        store.insert(derived_meta);

        assert_eq!(store.resolve_schema(derived, "id").unwrap().kind(), Kind::Number);
        assert_eq!(store.resolve_schema(derived, "name").unwrap().kind(), Kind::Any);
        assert!(store.get_schema(derived, "id").is_none());

        let visible = store.visible_properties(derived);
        let keys: Vec<&str> = visible.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "email"]);
        assert_eq!(visible[1].node.kind(), Kind::Any);
    }

    #[test]
    fn test_insert_keeps_first() {
        let mut store = MetadataStore::new();
        let class = ClassId::of::<Base>();
        assert!(store.insert(ClassSchemaMetadata::new(class)));
        assert!(!store.insert(ClassSchemaMetadata::new(class)));
        assert_eq!(store.len(), 1);
    }
}
