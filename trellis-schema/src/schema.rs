// The persistent schema value

use crate::rules::{parse_date, values_equal};
use crate::{Kind, OptionsOverride, Presence, Rule, SchemaError, ValidationOptions, ValidationReport};
use regex::Regex;
use serde_json::Value;

/// Documentation attached to a schema. Never affects validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub notes: Vec<String>,
    pub tags: Vec<String>,
    pub unit: Option<String>,
    pub meta: Vec<Value>,
}

/// A condition on a sibling value, resolved while validating the parent object.
///
/// ```
/// use trellis_schema::{Schema, When};
///
/// let card = Schema::string()
///     .when(When::reference("method").is(Schema::string().valid(["card"])).then(Schema::any().required()))
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct When {
    pub(crate) reference: String,
    pub(crate) is: Option<Schema>,
    pub(crate) then: Option<Schema>,
    pub(crate) otherwise: Option<Schema>,
}

impl When {
    /// Condition on the sibling at `reference` (dot separated for nested keys).
    ///
    /// Without `is`, the condition holds when the sibling is present and
    /// not one of `null`, `false`, `0` or `""`.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            is: None,
            then: None,
            otherwise: None,
        }
    }

    /// Schema the sibling must match. Required unless it sets a presence.
    pub fn is(mut self, schema: Schema) -> Self {
        let schema = if schema.presence.is_none() {
            schema.required()
        } else {
            schema
        };
        self.is = Some(schema);
        self
    }

    pub fn then(mut self, schema: Schema) -> Self {
        self.then = Some(schema);
        self
    }

    pub fn otherwise(mut self, schema: Schema) -> Self {
        self.otherwise = Some(schema);
        self
    }

    pub fn target(&self) -> &str {
        &self.reference
    }
}

/// An immutable validation schema.
///
/// Every operation returns a new schema and leaves the receiver untouched.
/// Operations a kind cannot carry return [`SchemaError`].
///
/// ```
/// use trellis_schema::{Schema, ValidationOptions};
/// use serde_json::json;
///
/// let age = Schema::number().integer().unwrap().min(18.0).unwrap().required();
/// assert!(age.validate(&json!(21), &ValidationOptions::default()).is_ok());
/// assert!(age.validate(&json!(12), &ValidationOptions::default()).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) kind: Kind,
    pub(crate) presence: Option<Presence>,
    pub(crate) label: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) allowed: Vec<Value>,
    pub(crate) only: bool,
    pub(crate) invalid: Vec<Value>,
    pub(crate) empty: Option<Box<Schema>>,
    pub(crate) strip: bool,
    pub(crate) raw: bool,
    pub(crate) preferences: Option<OptionsOverride>,
    pub(crate) annotations: Annotations,
    pub(crate) rules: Vec<Rule>,
    pub(crate) conditions: Vec<When>,
    pub(crate) keys: Option<Vec<(String, Schema)>>,
    pub(crate) unknown: Option<bool>,
    pub(crate) items: Vec<Schema>,
    pub(crate) matches: Vec<Schema>,
    pub(crate) truthy: Vec<Value>,
    pub(crate) falsy: Vec<Value>,
    pub(crate) sensitive: bool,
    pub(crate) insensitive: bool,
}

impl Schema {
    /// A bare schema of `kind` with no rules.
    pub fn of(kind: Kind) -> Self {
        Self {
            kind,
            presence: None,
            label: None,
            default: None,
            allowed: Vec::new(),
            only: false,
            invalid: Vec::new(),
            empty: None,
            strip: false,
            raw: false,
            preferences: None,
            annotations: Annotations::default(),
            rules: Vec::new(),
            conditions: Vec::new(),
            keys: None,
            unknown: None,
            items: Vec::new(),
            matches: Vec::new(),
            truthy: Vec::new(),
            falsy: Vec::new(),
            sensitive: false,
            insensitive: false,
        }
    }

    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    pub fn number() -> Self {
        Self::of(Kind::Number)
    }

    pub fn string() -> Self {
        Self::of(Kind::String)
    }

    pub fn date() -> Self {
        Self::of(Kind::Date)
    }

    pub fn object() -> Self {
        Self::of(Kind::Object)
    }

    pub fn array() -> Self {
        Self::of(Kind::Array)
    }

    pub fn alternatives() -> Self {
        Self::of(Kind::Alternatives)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Presence set on this schema; `None` defers to the validation options.
    pub fn get_presence(&self) -> Option<Presence> {
        self.presence
    }

    pub fn is_required(&self) -> bool {
        self.presence == Some(Presence::Required)
    }

    pub fn get_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn conditions(&self) -> &[When] {
        &self.conditions
    }

    pub fn allowed_values(&self) -> &[Value] {
        &self.allowed
    }

    pub fn invalid_values(&self) -> &[Value] {
        &self.invalid
    }

    /// Whether only the allowed values are accepted.
    pub fn is_only(&self) -> bool {
        self.only
    }

    pub fn is_strip(&self) -> bool {
        self.strip
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn preferences(&self) -> Option<&OptionsOverride> {
        self.preferences.as_ref()
    }

    /// Declared object keys in declaration order.
    pub fn key_schemas(&self) -> Option<&[(String, Schema)]> {
        self.keys.as_deref()
    }

    pub fn key_schema(&self, key: &str) -> Option<&Schema> {
        self.keys
            .as_ref()
            .and_then(|keys| keys.iter().find(|(k, _)| k == key).map(|(_, s)| s))
    }

    pub fn item_schemas(&self) -> &[Schema] {
        &self.items
    }

    pub fn alternative_schemas(&self) -> &[Schema] {
        &self.matches
    }

    pub(crate) fn allows_null(&self) -> bool {
        self.allowed.iter().any(Value::is_null)
    }

    /// Validate `value` against this schema.
    pub fn validate(
        &self,
        value: &Value,
        options: &ValidationOptions,
    ) -> Result<Value, ValidationReport> {
        crate::validate(value, self, options)
    }

    // ------------------------------------------------------------------
    // Generic operations
    // ------------------------------------------------------------------

    fn with(&self, change: impl FnOnce(&mut Schema)) -> Schema {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    fn require_kind(&self, rule: &'static str, kinds: &[Kind]) -> Result<(), SchemaError> {
        if kinds.contains(&self.kind) {
            Ok(())
        } else {
            Err(SchemaError::UnsupportedRule {
                rule,
                kind: self.kind,
            })
        }
    }

    /// Accept `values` in addition to whatever the kind accepts.
    pub fn allow<I, V>(&self, values: I) -> Schema
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.with(|s| {
            for value in values {
                s.invalid.retain(|v| !values_equal(v, &value, false));
                if !s.allowed.iter().any(|v| values_equal(v, &value, false)) {
                    s.allowed.push(value);
                }
            }
        })
    }

    /// Accept only `values` (plus any previously allowed ones).
    pub fn valid<I, V>(&self, values: I) -> Schema
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allow(values).with(|s| s.only = true)
    }

    /// Reject `values` even when the kind would accept them.
    pub fn invalid<I, V>(&self, values: I) -> Schema
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.with(|s| {
            for value in values {
                s.allowed.retain(|v| !values_equal(v, &value, false));
                if !s.invalid.iter().any(|v| values_equal(v, &value, false)) {
                    s.invalid.push(value);
                }
            }
        })
    }

    /// Value used when the input is absent and the schema is optional.
    pub fn default(&self, value: impl Into<Value>) -> Schema {
        let value = value.into();
        self.with(|s| s.default = Some(value))
    }

    /// Values matching `schema` are treated as absent.
    pub fn empty(&self, schema: Schema) -> Schema {
        self.with(|s| s.empty = Some(Box::new(schema)))
    }

    pub fn required(&self) -> Schema {
        self.presence(Presence::Required)
    }

    pub fn optional(&self) -> Schema {
        self.presence(Presence::Optional)
    }

    pub fn forbidden(&self) -> Schema {
        self.presence(Presence::Forbidden)
    }

    pub fn presence(&self, presence: Presence) -> Schema {
        self.with(|s| s.presence = Some(presence))
    }

    /// Name used in error messages instead of the path.
    pub fn label(&self, label: impl Into<String>) -> Schema {
        let label = label.into();
        self.with(|s| s.label = Some(label))
    }

    pub fn description(&self, description: impl Into<String>) -> Schema {
        let description = description.into();
        self.with(|s| s.annotations.description = Some(description))
    }

    pub fn example(&self, example: impl Into<Value>) -> Schema {
        let example = example.into();
        self.with(|s| s.annotations.examples.push(example))
    }

    pub fn meta(&self, meta: impl Into<Value>) -> Schema {
        let meta = meta.into();
        self.with(|s| s.annotations.meta.push(meta))
    }

    pub fn notes<I, S>(&self, notes: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let notes: Vec<String> = notes.into_iter().map(Into::into).collect();
        self.with(|s| s.annotations.notes.extend(notes))
    }

    pub fn tags<I, S>(&self, tags: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.with(|s| s.annotations.tags.extend(tags))
    }

    pub fn unit(&self, unit: impl Into<String>) -> Schema {
        let unit = unit.into();
        self.with(|s| s.annotations.unit = Some(unit))
    }

    /// Override validation options for this schema and its children.
    pub fn options(&self, options: OptionsOverride) -> Schema {
        self.with(|s| {
            s.preferences = Some(match &s.preferences {
                Some(existing) => existing.merge(&options),
                None => options,
            })
        })
    }

    /// Disable (or re-enable) conversion for this schema.
    pub fn strict(&self, enabled: bool) -> Schema {
        self.options(OptionsOverride::new().convert(!enabled))
    }

    /// Return the unconverted input on success.
    pub fn raw(&self, enabled: bool) -> Schema {
        self.with(|s| s.raw = enabled)
    }

    /// Remove the value from the validated output after it passes.
    pub fn strip(&self, enabled: bool) -> Schema {
        self.with(|s| s.strip = enabled)
    }

    /// Attach a sibling-dependent condition.
    ///
    /// The `then`/`otherwise` branches are concatenated onto this schema at
    /// validation time, so they must be kind-compatible with it.
    pub fn when(&self, condition: When) -> Result<Schema, SchemaError> {
        if condition.then.is_none() && condition.otherwise.is_none() {
            return Err(SchemaError::InvalidCondition {
                reference: condition.reference,
                reason: "one of 'then' or 'otherwise' is required".to_string(),
            });
        }
        for branch in [&condition.then, &condition.otherwise].into_iter().flatten() {
            self.concat(branch)?;
        }
        Ok(self.with(|s| s.conditions.push(condition)))
    }

    /// Merge `other` into this schema.
    ///
    /// Kinds must match unless one side is `any`. Settings from `other` win,
    /// lists are appended, and object keys present on both sides are
    /// concatenated recursively.
    pub fn concat(&self, other: &Schema) -> Result<Schema, SchemaError> {
        let kind = match (self.kind, other.kind) {
            (left, right) if left == right => left,
            (Kind::Any, right) => right,
            (left, Kind::Any) => left,
            (left, right) => return Err(SchemaError::KindMismatch { left, right }),
        };

        let mut merged = self.clone();
        merged.kind = kind;
        merged.presence = other.presence.or(self.presence);
        merged.label = other.label.clone().or_else(|| self.label.clone());
        merged.default = other.default.clone().or_else(|| self.default.clone());
        merged = merged.allow(other.allowed.iter().cloned());
        merged = merged.invalid(other.invalid.iter().cloned());
        merged.only = self.only || other.only;
        if let Some(empty) = &other.empty {
            merged.empty = Some(empty.clone());
        }
        merged.strip = self.strip || other.strip;
        merged.raw = self.raw || other.raw;
        if let Some(preferences) = &other.preferences {
            merged = merged.options(preferences.clone());
        }

        let annotations = &other.annotations;
        if annotations.description.is_some() {
            merged.annotations.description = annotations.description.clone();
        }
        if annotations.unit.is_some() {
            merged.annotations.unit = annotations.unit.clone();
        }
        merged.annotations.examples.extend(annotations.examples.iter().cloned());
        merged.annotations.notes.extend(annotations.notes.iter().cloned());
        merged.annotations.tags.extend(annotations.tags.iter().cloned());
        merged.annotations.meta.extend(annotations.meta.iter().cloned());

        merged.rules.extend(other.rules.iter().cloned());
        merged.conditions.extend(other.conditions.iter().cloned());

        if let Some(keys) = &other.keys {
            merged = merged.merge_keys(keys.iter().cloned(), true)?;
        }
        merged.unknown = other.unknown.or(self.unknown);
        merged.items.extend(other.items.iter().cloned());
        merged.matches.extend(other.matches.iter().cloned());
        merged.truthy.extend(other.truthy.iter().cloned());
        merged.falsy.extend(other.falsy.iter().cloned());
        merged.sensitive = self.sensitive || other.sensitive;
        merged.insensitive = self.insensitive || other.insensitive;

        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Append a rule the kind supports.
    pub fn rule(&self, rule: Rule) -> Result<Schema, SchemaError> {
        if !rule.supports(self.kind) {
            return Err(SchemaError::UnsupportedRule {
                rule: rule.name(),
                kind: self.kind,
            });
        }
        Ok(self.with(|s| s.rules.push(rule)))
    }

    fn bound(&self, rule: &'static str, limit: f64) -> Result<f64, SchemaError> {
        if !limit.is_finite() {
            return Err(SchemaError::InvalidLimit {
                rule,
                reason: format!("{} is not finite", limit),
            });
        }
        if self.kind.is_sized() && (limit < 0.0 || limit.fract() != 0.0) {
            return Err(SchemaError::InvalidLimit {
                rule,
                reason: format!("{} is not a non-negative integer", limit),
            });
        }
        Ok(limit)
    }

    /// Lower bound on the value (numbers) or size (strings, arrays, objects).
    pub fn min(&self, limit: f64) -> Result<Schema, SchemaError> {
        self.require_kind("min", &[Kind::Number, Kind::String, Kind::Array, Kind::Object])?;
        let limit = self.bound("min", limit)?;
        self.rule(Rule::Min(limit))
    }

    /// Upper bound on the value (numbers) or size (strings, arrays, objects).
    pub fn max(&self, limit: f64) -> Result<Schema, SchemaError> {
        self.require_kind("max", &[Kind::Number, Kind::String, Kind::Array, Kind::Object])?;
        let limit = self.bound("max", limit)?;
        self.rule(Rule::Max(limit))
    }

    /// Exact size of a string, array or object.
    pub fn length(&self, limit: f64) -> Result<Schema, SchemaError> {
        self.require_kind("length", &[Kind::String, Kind::Array, Kind::Object])?;
        let limit = self.bound("length", limit)?;
        self.rule(Rule::Length(limit))
    }

    pub fn greater(&self, limit: f64) -> Result<Schema, SchemaError> {
        let limit = self.bound("greater", limit)?;
        self.rule(Rule::Greater(limit))
    }

    pub fn less(&self, limit: f64) -> Result<Schema, SchemaError> {
        let limit = self.bound("less", limit)?;
        self.rule(Rule::Less(limit))
    }

    pub fn integer(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Integer)
    }

    /// At most `places` decimal places; values are rounded when converting.
    pub fn precision(&self, places: u32) -> Result<Schema, SchemaError> {
        self.rule(Rule::Precision(places))
    }

    pub fn multiple(&self, base: f64) -> Result<Schema, SchemaError> {
        if !base.is_finite() || base <= 0.0 {
            return Err(SchemaError::InvalidLimit {
                rule: "multiple",
                reason: format!("{} is not a positive number", base),
            });
        }
        self.rule(Rule::Multiple(base))
    }

    pub fn positive(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Positive)
    }

    pub fn negative(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Negative)
    }

    pub fn port(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Port)
    }

    fn compile_pattern(pattern: &str) -> Result<Regex, SchemaError> {
        Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn pattern(&self, pattern: &str) -> Result<Schema, SchemaError> {
        let regex = Self::compile_pattern(pattern)?;
        self.rule(Rule::Pattern {
            regex,
            name: None,
            invert: false,
        })
    }

    /// Pattern reported by `name` instead of its source in error messages.
    pub fn pattern_named(&self, pattern: &str, name: &str) -> Result<Schema, SchemaError> {
        let regex = Self::compile_pattern(pattern)?;
        self.rule(Rule::Pattern {
            regex,
            name: Some(name.to_string()),
            invert: false,
        })
    }

    /// Reject strings matching `pattern`.
    pub fn pattern_inverted(&self, pattern: &str) -> Result<Schema, SchemaError> {
        let regex = Self::compile_pattern(pattern)?;
        self.rule(Rule::Pattern {
            regex,
            name: None,
            invert: true,
        })
    }

    pub fn email(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Email)
    }

    pub fn uri(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Uri)
    }

    pub fn guid(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Guid)
    }

    pub fn alphanum(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Alphanum)
    }

    pub fn token(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Token)
    }

    pub fn hex(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Hex)
    }

    pub fn lowercase(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Lowercase)
    }

    pub fn uppercase(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Uppercase)
    }

    pub fn trim(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Trim)
    }

    pub fn iso_date(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::IsoDate)
    }

    /// Compare allowed/invalid strings case-insensitively.
    pub fn insensitive(&self) -> Result<Schema, SchemaError> {
        self.require_kind("insensitive", &[Kind::String])?;
        Ok(self.with(|s| s.insensitive = true))
    }

    /// Extra values converted to `true`.
    pub fn truthy<I, V>(&self, values: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.require_kind("truthy", &[Kind::Boolean])?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Ok(self.with(|s| s.truthy.extend(values)))
    }

    /// Extra values converted to `false`.
    pub fn falsy<I, V>(&self, values: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.require_kind("falsy", &[Kind::Boolean])?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Ok(self.with(|s| s.falsy.extend(values)))
    }

    /// Match `"true"`/`"false"` and truthy/falsy strings case-sensitively.
    pub fn sensitive(&self, enabled: bool) -> Result<Schema, SchemaError> {
        self.require_kind("sensitive", &[Kind::Boolean])?;
        Ok(self.with(|s| s.sensitive = enabled))
    }

    pub fn unique(&self) -> Result<Schema, SchemaError> {
        self.rule(Rule::Unique)
    }

    fn parse_limit_date(value: &str) -> Result<chrono::DateTime<chrono::Utc>, SchemaError> {
        parse_date(value).ok_or_else(|| SchemaError::InvalidDate {
            value: value.to_string(),
        })
    }

    pub fn min_date(&self, limit: &str) -> Result<Schema, SchemaError> {
        let limit = Self::parse_limit_date(limit)?;
        self.rule(Rule::DateMin(limit))
    }

    pub fn max_date(&self, limit: &str) -> Result<Schema, SchemaError> {
        let limit = Self::parse_limit_date(limit)?;
        self.rule(Rule::DateMax(limit))
    }

    // ------------------------------------------------------------------
    // Nesting
    // ------------------------------------------------------------------

    fn merge_keys<I>(&self, entries: I, concat_existing: bool) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = (String, Schema)>,
    {
        let mut next = self.clone();
        let keys = next.keys.get_or_insert_with(Vec::new);
        for (key, schema) in entries {
            match keys.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) if concat_existing => *existing = existing.concat(&schema)?,
                Some((_, existing)) => *existing = schema,
                None => keys.push((key, schema)),
            }
        }
        Ok(next)
    }

    /// Declare object keys. A key declared again replaces the earlier schema.
    pub fn keys<I, K>(&self, entries: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        self.require_kind("keys", &[Kind::Object])?;
        self.merge_keys(entries.into_iter().map(|(k, s)| (k.into(), s)), false)
    }

    /// Allow or forbid undeclared keys regardless of the validation options.
    pub fn unknown(&self, allow: bool) -> Result<Schema, SchemaError> {
        self.require_kind("unknown", &[Kind::Object])?;
        Ok(self.with(|s| s.unknown = Some(allow)))
    }

    /// Element schemas; each element must match at least one.
    pub fn items<I>(&self, schemas: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = Schema>,
    {
        self.require_kind("items", &[Kind::Array])?;
        let schemas: Vec<Schema> = schemas.into_iter().collect();
        Ok(self.with(|s| s.items.extend(schemas)))
    }

    /// Candidate schemas; the first one that matches wins.
    pub fn try_schemas<I>(&self, schemas: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = Schema>,
    {
        self.require_kind("try", &[Kind::Alternatives])?;
        let schemas: Vec<Schema> = schemas.into_iter().collect();
        Ok(self.with(|s| s.matches.extend(schemas)))
    }
}
