// Schema registry

use crate::class::{ClassDefinition, ClassRef, SchemaClass};
use crate::{
    config, ClassId, ClassSchemaMetadata, ConfigError, DefinitionError, Error, MetadataStore,
    PropertyMetadata, SchemaNode, ValidationError, ValidationErrors, ValidationOutcome,
};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use trellis_log::{debug, trace, warn};
use trellis_schema::{Schema, ValidationOptions};

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(|| {
    SchemaRegistry::from_env().unwrap_or_else(|e| {
        warn!("ignoring validation configuration: {}", e);
        SchemaRegistry::new()
    })
});

/// Defined classes and their composite schemas.
///
/// Each class is defined once, the first time it is registered, validated
/// or referenced from another class. After that its metadata is read-only
/// and validations only take read locks.
pub struct SchemaRegistry {
    store: RwLock<MetadataStore>,
    composites: RwLock<HashMap<ClassId, Arc<Schema>>>,
    options: ValidationOptions,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::with_options(ValidationOptions::default())
    }

    /// A registry validating with `options` unless a call overrides them.
    pub fn with_options(options: ValidationOptions) -> Self {
        trellis_log::init();
        debug!("Creating schema registry");
        Self {
            store: RwLock::new(MetadataStore::new()),
            composites: RwLock::new(HashMap::new()),
            options,
        }
    }

    /// A registry with options from `TRELLIS_VALIDATION_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_options(config::from_env()?))
    }

    /// The process-wide registry used by [`Validate`](crate::Validate) and
    /// the free validation functions.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Run `T`'s class body unless it already ran.
    pub fn register<T: SchemaClass>(&self) -> Result<(), DefinitionError> {
        self.define_class(ClassRef::of::<T>(), &[])
    }

    pub fn is_registered<T: SchemaClass>(&self) -> bool {
        self.contains(ClassId::of::<T>())
    }

    /// `T`'s own metadata (without inherited properties).
    pub fn metadata<T: SchemaClass>(&self) -> Result<ClassSchemaMetadata, DefinitionError> {
        self.register::<T>()?;
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        Ok(store
            .get(ClassId::of::<T>())
            .cloned()
            .unwrap_or_else(|| ClassSchemaMetadata::new(ClassId::of::<T>())))
    }

    /// The node for `key` on `T` or its nearest ancestor defining it.
    pub fn property_schema<T: SchemaClass>(&self, key: &str) -> Result<Option<SchemaNode>, DefinitionError> {
        self.register::<T>()?;
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        Ok(store.resolve_schema(ClassId::of::<T>(), key).cloned())
    }

    /// The object schema assembled from every property visible on `T`.
    pub fn composite<T: SchemaClass>(&self) -> Result<Arc<Schema>, DefinitionError> {
        self.register::<T>()?;
        self.composite_of(ClassId::of::<T>())
    }

    /// Validate with the registry options.
    pub fn validate<T>(&self, instance: &T) -> Result<ValidationOutcome<T>, DefinitionError>
    where
        T: SchemaClass + Serialize + DeserializeOwned,
    {
        self.validate_with(instance, &self.options)
    }

    /// Validate with explicit options.
    ///
    /// The instance is serialized, validated, and the validated value is
    /// deserialized into a new `T`. The instance itself is never changed.
    pub fn validate_with<T>(
        &self,
        instance: &T,
        options: &ValidationOptions,
    ) -> Result<ValidationOutcome<T>, DefinitionError>
    where
        T: SchemaClass + Serialize + DeserializeOwned,
    {
        let value = match serde_json::to_value(instance) {
            Ok(value) => value,
            Err(e) => {
                return Ok(ValidationOutcome::Invalid(single_error(
                    "any.serialize",
                    format!("\"value\" could not be serialized: {}", e),
                    None,
                )));
            }
        };
        self.validate_value_with(&value, options)
    }

    /// Validate a raw JSON payload as a `T`.
    pub fn validate_value<T>(&self, value: &Value) -> Result<ValidationOutcome<T>, DefinitionError>
    where
        T: SchemaClass + DeserializeOwned,
    {
        self.validate_value_with(value, &self.options)
    }

    pub fn validate_value_with<T>(
        &self,
        value: &Value,
        options: &ValidationOptions,
    ) -> Result<ValidationOutcome<T>, DefinitionError>
    where
        T: SchemaClass + DeserializeOwned,
    {
        let class = ClassId::of::<T>();
        let schema = self.composite::<T>()?;

        let validated = match trellis_schema::validate(value, &schema, options) {
            Ok(validated) => validated,
            Err(report) => {
                debug!("{} failed validation: {}", class, report);
                return Ok(ValidationOutcome::Invalid(report.into()));
            }
        };

        let validated = restore_missing(validated, value);
        match serde_json::from_value::<T>(validated) {
            Ok(instance) => {
                trace!("{} validated", class);
                return Ok(ValidationOutcome::Valid(instance));
            }
            Err(e) => debug!("{} validated copy could not be rebuilt, using input: {}", class, e),
        }

        match serde_json::from_value::<T>(value.clone()) {
            Ok(instance) => Ok(ValidationOutcome::Valid(instance)),
            Err(e) => Ok(ValidationOutcome::Invalid(single_error(
                "any.deserialize",
                format!("\"value\" could not be deserialized: {}", e),
                Some(value.clone()),
            ))),
        }
    }

    /// Validate and return the validated instance or every error.
    pub fn validate_or_err<T>(&self, instance: &T) -> Result<T, Error>
    where
        T: SchemaClass + Serialize + DeserializeOwned,
    {
        Ok(self.validate(instance)?.into_result()?)
    }

    pub fn is_valid<T>(&self, instance: &T) -> Result<bool, DefinitionError>
    where
        T: SchemaClass + Serialize + DeserializeOwned,
    {
        Ok(self.validate(instance)?.is_valid())
    }

    // ------------------------------------------------------------------
    // Internals shared with ClassDefinition
    // ------------------------------------------------------------------

    fn contains(&self, class: ClassId) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(class)
    }

    /// Define `class` in a private context and commit it on success.
    /// `outer` lists the classes whose definition led here.
    pub(crate) fn define_class(&self, class: ClassRef, outer: &[ClassId]) -> Result<(), DefinitionError> {
        let id = class.id();
        if self.contains(id) {
            return Ok(());
        }

        trace!("Defining schema class {}", id);
        let mut definition = ClassDefinition::new(self, id, outer);
        if let Err(e) = class.run(&mut definition) {
            debug!("Definition of {} failed: {}", id, e);
            return Err(e);
        }
        let metadata = definition.finish();
        let count = metadata.len();

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if store.insert(metadata) {
            debug!("Registered schema class {} with {} properties", id, count);
        }
        Ok(())
    }

    pub(crate) fn visible_properties(&self, class: ClassId) -> Vec<PropertyMetadata> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .visible_properties(class)
    }

    pub(crate) fn composite_of(&self, class: ClassId) -> Result<Arc<Schema>, DefinitionError> {
        if let Some(schema) = self
            .composites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&class)
        {
            return Ok(Arc::clone(schema));
        }

        let entries = self
            .visible_properties(class)
            .into_iter()
            .map(|p| (p.key, p.node.into_schema()));
        let schema = Schema::object()
            .keys(entries)
            .map_err(|e| DefinitionError::constraint(class.name(), "*", e.to_string()))?;

        trace!("Built composite schema for {}", class);
        let mut composites = self.composites.write().unwrap_or_else(PoisonError::into_inner);
        let schema = composites.entry(class).or_insert_with(|| Arc::new(schema));
        Ok(Arc::clone(schema))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Put back input members the validated copy dropped (stripped keys, values
/// `empty` turned absent) so the copy still deserializes into the class.
fn restore_missing(validated: Value, input: &Value) -> Value {
    match (validated, input) {
        (Value::Object(mut output), Value::Object(input)) => {
            for (key, original) in input {
                let restored = match output.remove(key) {
                    Some(current) => restore_missing(current, original),
                    None => original.clone(),
                };
                output.insert(key.clone(), restored);
            }
            Value::Object(output)
        }
        (Value::Array(output), Value::Array(input)) if output.len() == input.len() => Value::Array(
            output
                .into_iter()
                .zip(input)
                .map(|(current, original)| restore_missing(current, original))
                .collect(),
        ),
        (validated, _) => validated,
    }
}

fn single_error(kind: &str, message: String, value: Option<Value>) -> ValidationErrors {
    let mut error = ValidationError::new("", message).with_kind(kind);
    error.value = value;
    ValidationErrors::new(vec![error])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorators::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Account {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<f64>,
    }

    impl SchemaClass for Account {
        fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
            def.property("id", [required(), number_schema()])?;
            Ok(())
        }
    }

    struct Broken;

    impl SchemaClass for Broken {
        fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
            def
                .property("ok", [string_schema()])?
                .property("bad", [min(1)])?;
            Ok(())
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = SchemaRegistry::new();
        assert!(!registry.is_registered::<Account>());
        registry.register::<Account>().unwrap();
        registry.register::<Account>().unwrap();
        assert!(registry.is_registered::<Account>());
        assert_eq!(registry.metadata::<Account>().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_definition_leaves_no_state() {
        let registry = SchemaRegistry::new();
        let err = registry.register::<Broken>().unwrap_err();
        assert_eq!(err, DefinitionError::schema_not_found("Broken", "bad"));
        assert!(!registry.is_registered::<Broken>());
    }

    #[test]
    fn test_composite_is_cached() {
        let registry = SchemaRegistry::new();
        let first = registry.composite::<Account>().unwrap();
        let second = registry.composite::<Account>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_validate_registers_on_demand() {
        let registry = SchemaRegistry::new();
        let outcome = registry.validate(&Account { id: Some(3.0) }).unwrap();
        assert_eq!(outcome.into_result().unwrap(), Account { id: Some(3.0) });

        let outcome = registry.validate(&Account { id: None }).unwrap();
        let errors = outcome.errors().unwrap();
        assert_eq!(errors.errors[0].kind, "any.required");
        assert_eq!(errors.errors[0].path, "id");
    }

    #[test]
    fn test_validate_value_converts() {
        let registry = SchemaRegistry::new();
        let outcome = registry
            .validate_value::<Account>(&serde_json::json!({"id": "7"}))
            .unwrap();
        assert_eq!(outcome.into_result().unwrap(), Account { id: Some(7.0) });
    }

    #[test]
    fn test_rebuild_falls_back_to_input() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Labelled {
            code: String,
        }

        impl SchemaClass for Labelled {
            fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
                def.property("code", [min(1), number_schema()])?;
                Ok(())
            }
        }

        // "7" converts to 7, which no longer fits the String field
        let registry = SchemaRegistry::new();
        let labelled = Labelled { code: "7".into() };
        let outcome = registry.validate(&labelled).unwrap();
        assert_eq!(outcome, ValidationOutcome::Valid(Labelled { code: "7".into() }));
    }

    #[test]
    fn test_restore_missing() {
        let input = serde_json::json!({"a": 1, "b": {"c": "x", "d": 2}, "e": [{"f": 1}]});
        let validated = serde_json::json!({"b": {"d": 3}, "e": [{}]});
        assert_eq!(
            restore_missing(validated, &input),
            serde_json::json!({"a": 1, "b": {"c": "x", "d": 3}, "e": [{"f": 1}]})
        );
    }

    #[test]
    fn test_registry_options_apply() {
        let registry = SchemaRegistry::with_options(ValidationOptions::default().convert(false));
        let outcome = registry
            .validate_value::<Account>(&serde_json::json!({"id": "7"}))
            .unwrap();
        assert_eq!(outcome.errors().unwrap().errors[0].kind, "number.base");
    }
}
