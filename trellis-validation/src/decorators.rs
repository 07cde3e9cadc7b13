//! The decorator catalogue.
//!
//! Every function returns a [`Decorator`] for use with
//! [`ClassDefinition::property`](crate::ClassDefinition::property) or inside
//! `#[schema(...)]` attributes. Type decorators (`number_schema()`,
//! `string_schema()`, ...) establish a property's base kind; every other
//! decorator refines an established schema and fails with
//! `ValidationSchemaNotFound` when none exists yet.

use crate::class::{ClassDefinition, ClassRef, SchemaClass, SchemaRef};
use crate::DefinitionError;
use serde_json::Value;
use std::fmt;
use trellis_schema::{Kind, OptionsOverride, Presence, Schema, SchemaError, When};

pub use crate::class::class;

type Operation = Box<dyn FnOnce(&Schema) -> Result<Schema, SchemaError>>;

/// One annotation on a property.
pub struct Decorator {
    name: &'static str,
    action: Action,
}

enum Action {
    Establish(Kind),
    Refine(Operation),
    Keys(Vec<(String, SchemaRef)>),
    ClassKeys(ClassRef),
    Items(Vec<SchemaRef>),
    Alternatives(Vec<SchemaRef>),
}

impl Decorator {
    fn establish(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            action: Action::Establish(kind),
        }
    }

    fn refine<F>(name: &'static str, operation: F) -> Self
    where
        F: FnOnce(&Schema) -> Result<Schema, SchemaError> + 'static,
    {
        Self {
            name,
            action: Action::Refine(Box::new(operation)),
        }
    }

    /// Name of the decorator, e.g. `min` or `number_schema`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this decorator establishes a base kind.
    pub fn is_type_decorator(&self) -> bool {
        matches!(self.action, Action::Establish(_))
    }

    pub(crate) fn apply(self, class: &mut ClassDefinition<'_>, key: &str) -> Result<(), DefinitionError> {
        match self.action {
            Action::Establish(kind) => class.establish(key, Schema::of(kind)),
            Action::Refine(operation) => class.refine(key, self.name, operation),
            Action::Keys(entries) => {
                class.require_established(key)?;
                let resolved = entries
                    .into_iter()
                    .map(|(nested, reference)| {
                        class.resolve(key, reference).map(|schema| (nested, schema))
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?;
                class.refine(key, self.name, |s| s.keys(resolved))
            }
            Action::ClassKeys(target) => {
                class.require_established(key)?;
                let resolved = class.resolve_keys(key, target)?;
                class.refine(key, self.name, |s| s.keys(resolved))
            }
            Action::Items(references) => {
                class.require_established(key)?;
                let resolved = resolve_all(class, key, references)?;
                class.refine(key, self.name, |s| s.items(resolved))
            }
            Action::Alternatives(references) => {
                class.require_established(key)?;
                let resolved = resolve_all(class, key, references)?;
                class.refine(key, self.name, |s| s.try_schemas(resolved))
            }
        }
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator").field("name", &self.name).finish()
    }
}

fn resolve_all(
    class: &ClassDefinition<'_>,
    key: &str,
    references: Vec<SchemaRef>,
) -> Result<Vec<Schema>, DefinitionError> {
    references
        .into_iter()
        .map(|reference| class.resolve(key, reference))
        .collect()
}

fn values<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

// ----------------------------------------------------------------------
// Type decorators
// ----------------------------------------------------------------------

/// Accept any value.
pub fn any_schema() -> Decorator {
    Decorator::establish("any_schema", Kind::Any)
}

pub fn boolean_schema() -> Decorator {
    Decorator::establish("boolean_schema", Kind::Boolean)
}

pub fn number_schema() -> Decorator {
    Decorator::establish("number_schema", Kind::Number)
}

pub fn string_schema() -> Decorator {
    Decorator::establish("string_schema", Kind::String)
}

pub fn date_schema() -> Decorator {
    Decorator::establish("date_schema", Kind::Date)
}

/// Required above `keys(..)` or `class_keys::<T>()`.
pub fn object_schema() -> Decorator {
    Decorator::establish("object_schema", Kind::Object)
}

pub fn array_schema() -> Decorator {
    Decorator::establish("array_schema", Kind::Array)
}

pub fn alternatives_schema() -> Decorator {
    Decorator::establish("alternatives_schema", Kind::Alternatives)
}

// ----------------------------------------------------------------------
// Generic refinements
// ----------------------------------------------------------------------

pub fn allow<I, V>(allowed: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed = values(allowed);
    Decorator::refine("allow", move |s| Ok(s.allow(allowed)))
}

/// Accept only the listed values.
pub fn valid<I, V>(accepted: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let accepted = values(accepted);
    Decorator::refine("valid", move |s| Ok(s.valid(accepted)))
}

/// Alias of [`valid`].
pub fn equal<I, V>(accepted: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let accepted = values(accepted);
    Decorator::refine("equal", move |s| Ok(s.valid(accepted)))
}

pub fn invalid<I, V>(rejected: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let rejected = values(rejected);
    Decorator::refine("invalid", move |s| Ok(s.invalid(rejected)))
}

/// Alias of [`invalid`].
pub fn disallow<I, V>(rejected: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let rejected = values(rejected);
    Decorator::refine("disallow", move |s| Ok(s.invalid(rejected)))
}

pub fn default(value: impl Into<Value>) -> Decorator {
    let value = value.into();
    Decorator::refine("default", move |s| Ok(s.default(value)))
}

pub fn description(text: impl Into<String>) -> Decorator {
    let text = text.into();
    Decorator::refine("description", move |s| Ok(s.description(text)))
}

/// Treat values matching `schema` as absent.
pub fn empty(schema: Schema) -> Decorator {
    Decorator::refine("empty", move |s| Ok(s.empty(schema)))
}

pub fn example(value: impl Into<Value>) -> Decorator {
    let value = value.into();
    Decorator::refine("example", move |s| Ok(s.example(value)))
}

pub fn forbidden() -> Decorator {
    Decorator::refine("forbidden", |s| Ok(s.forbidden()))
}

pub fn label(label: impl Into<String>) -> Decorator {
    let label = label.into();
    Decorator::refine("label", move |s| Ok(s.label(label)))
}

pub fn meta(value: impl Into<Value>) -> Decorator {
    let value = value.into();
    Decorator::refine("meta", move |s| Ok(s.meta(value)))
}

pub fn notes<I, S>(notes: I) -> Decorator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let notes: Vec<String> = notes.into_iter().map(Into::into).collect();
    Decorator::refine("notes", move |s| Ok(s.notes(notes)))
}

pub fn optional() -> Decorator {
    Decorator::refine("optional", |s| Ok(s.optional()))
}

pub fn required() -> Decorator {
    Decorator::refine("required", |s| Ok(s.required()))
}

/// Alias of [`required`].
pub fn exist() -> Decorator {
    Decorator::refine("exist", |s| Ok(s.required()))
}

pub fn presence(presence: Presence) -> Decorator {
    Decorator::refine("presence", move |s| Ok(s.presence(presence)))
}

/// Override validation options for this property and its children.
pub fn options(options: OptionsOverride) -> Decorator {
    Decorator::refine("options", move |s| Ok(s.options(options)))
}

/// Return the unconverted input.
pub fn raw() -> Decorator {
    Decorator::refine("raw", |s| Ok(s.raw(true)))
}

/// Disable conversion.
pub fn strict() -> Decorator {
    Decorator::refine("strict", |s| Ok(s.strict(true)))
}

/// Drop the property from the validated value.
pub fn strip() -> Decorator {
    Decorator::refine("strip", |s| Ok(s.strip(true)))
}

pub fn tags<I, S>(tags: I) -> Decorator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
    Decorator::refine("tags", move |s| Ok(s.tags(tags)))
}

pub fn unit(unit: impl Into<String>) -> Decorator {
    let unit = unit.into();
    Decorator::refine("unit", move |s| Ok(s.unit(unit)))
}

/// Condition on a sibling property.
pub fn when(condition: When) -> Decorator {
    Decorator::refine("when", move |s| s.when(condition))
}

/// Merge `schema` into the property's schema.
pub fn concat(schema: Schema) -> Decorator {
    Decorator::refine("concat", move |s| s.concat(&schema))
}

/// Apply an arbitrary algebra operation.
pub fn operation<F>(name: &'static str, operation: F) -> Decorator
where
    F: FnOnce(&Schema) -> Result<Schema, SchemaError> + 'static,
{
    Decorator::refine(name, operation)
}

// ----------------------------------------------------------------------
// Kind-specific refinements
// ----------------------------------------------------------------------

/// Minimum value for numbers, minimum size for strings, arrays and objects.
pub fn min(limit: impl Into<f64>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("min", move |s| s.min(limit))
}

/// Maximum value for numbers, maximum size for strings, arrays and objects.
pub fn max(limit: impl Into<f64>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("max", move |s| s.max(limit))
}

/// Exact size of a string, array or object.
pub fn length(limit: impl Into<f64>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("length", move |s| s.length(limit))
}

pub fn greater(limit: impl Into<f64>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("greater", move |s| s.greater(limit))
}

pub fn less(limit: impl Into<f64>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("less", move |s| s.less(limit))
}

pub fn integer() -> Decorator {
    Decorator::refine("integer", |s| s.integer())
}

pub fn precision(places: u32) -> Decorator {
    Decorator::refine("precision", move |s| s.precision(places))
}

pub fn multiple(base: impl Into<f64>) -> Decorator {
    let base = base.into();
    Decorator::refine("multiple", move |s| s.multiple(base))
}

pub fn positive() -> Decorator {
    Decorator::refine("positive", |s| s.positive())
}

pub fn negative() -> Decorator {
    Decorator::refine("negative", |s| s.negative())
}

pub fn port() -> Decorator {
    Decorator::refine("port", |s| s.port())
}

pub fn pattern(regex: impl Into<String>) -> Decorator {
    let regex = regex.into();
    Decorator::refine("pattern", move |s| s.pattern(&regex))
}

/// Pattern reported by `name` in error messages.
pub fn pattern_named(regex: impl Into<String>, name: impl Into<String>) -> Decorator {
    let regex = regex.into();
    let name = name.into();
    Decorator::refine("pattern", move |s| s.pattern_named(&regex, &name))
}

/// Reject strings matching `regex`.
pub fn pattern_inverted(regex: impl Into<String>) -> Decorator {
    let regex = regex.into();
    Decorator::refine("pattern", move |s| s.pattern_inverted(&regex))
}

pub fn email() -> Decorator {
    Decorator::refine("email", |s| s.email())
}

pub fn uri() -> Decorator {
    Decorator::refine("uri", |s| s.uri())
}

pub fn guid() -> Decorator {
    Decorator::refine("guid", |s| s.guid())
}

pub fn alphanum() -> Decorator {
    Decorator::refine("alphanum", |s| s.alphanum())
}

pub fn token() -> Decorator {
    Decorator::refine("token", |s| s.token())
}

pub fn hex() -> Decorator {
    Decorator::refine("hex", |s| s.hex())
}

pub fn lowercase() -> Decorator {
    Decorator::refine("lowercase", |s| s.lowercase())
}

pub fn uppercase() -> Decorator {
    Decorator::refine("uppercase", |s| s.uppercase())
}

pub fn trim() -> Decorator {
    Decorator::refine("trim", |s| s.trim())
}

pub fn insensitive() -> Decorator {
    Decorator::refine("insensitive", |s| s.insensitive())
}

pub fn iso_date() -> Decorator {
    Decorator::refine("iso_date", |s| s.iso_date())
}

pub fn truthy<I, V>(truthy: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let truthy = values(truthy);
    Decorator::refine("truthy", move |s| s.truthy(truthy))
}

pub fn falsy<I, V>(falsy: I) -> Decorator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let falsy = values(falsy);
    Decorator::refine("falsy", move |s| s.falsy(falsy))
}

pub fn sensitive() -> Decorator {
    Decorator::refine("sensitive", |s| s.sensitive(true))
}

pub fn unique() -> Decorator {
    Decorator::refine("unique", |s| s.unique())
}

/// Allow (`true`) or reject (`false`) undeclared keys.
pub fn unknown(allow: bool) -> Decorator {
    Decorator::refine("unknown", move |s| s.unknown(allow))
}

/// Earliest accepted date, RFC 3339 or `YYYY-MM-DD`.
pub fn min_date(limit: impl Into<String>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("min_date", move |s| s.min_date(&limit))
}

/// Latest accepted date, RFC 3339 or `YYYY-MM-DD`.
pub fn max_date(limit: impl Into<String>) -> Decorator {
    let limit = limit.into();
    Decorator::refine("max_date", move |s| s.max_date(&limit))
}

// ----------------------------------------------------------------------
// Nested composition
// ----------------------------------------------------------------------

/// Declare nested keys. Class references compose that class's properties.
///
/// The property must already be established with `object_schema()`.
pub fn keys<I, K>(entries: I) -> Decorator
where
    I: IntoIterator<Item = (K, SchemaRef)>,
    K: Into<String>,
{
    let entries = entries.into_iter().map(|(k, r)| (k.into(), r)).collect();
    Decorator {
        name: "keys",
        action: Action::Keys(entries),
    }
}

/// Declare every property of `T` as nested keys.
pub fn class_keys<T: SchemaClass>() -> Decorator {
    Decorator {
        name: "keys",
        action: Action::ClassKeys(ClassRef::of::<T>()),
    }
}

/// Element schemas for an `array_schema()` property.
pub fn items<I>(references: I) -> Decorator
where
    I: IntoIterator<Item = SchemaRef>,
{
    Decorator {
        name: "items",
        action: Action::Items(references.into_iter().collect()),
    }
}

/// Candidate schemas for an `alternatives_schema()` property.
pub fn try_schemas<I>(references: I) -> Decorator
where
    I: IntoIterator<Item = SchemaRef>,
{
    Decorator {
        name: "try",
        action: Action::Alternatives(references.into_iter().collect()),
    }
}
