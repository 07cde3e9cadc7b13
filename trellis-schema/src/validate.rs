// Validation engine

use crate::convert::convert;
use crate::rules::{parse_date, values_equal};
use crate::{ErrorDetail, Kind, Path, Presence, Schema, ValidationOptions, ValidationReport};
use serde_json::{Map, Value};
use std::borrow::Cow;
use trellis_log::{trace, warn};

/// Validate `value` against `schema`.
///
/// Returns the validated value (converted, defaults filled, stripped keys
/// removed) or every failure found. With `abort_early` only the first.
///
/// ```
/// use trellis_schema::{validate, Schema, ValidationOptions};
/// use serde_json::json;
///
/// let schema = Schema::object()
///     .keys([("port", Schema::number().port().unwrap().default(8080))])
///     .unwrap();
/// let out = validate(&json!({}), &schema, &ValidationOptions::default()).unwrap();
/// assert_eq!(out, json!({"port": 8080}));
/// ```
pub fn validate(
    value: &Value,
    schema: &Schema,
    options: &ValidationOptions,
) -> Result<Value, ValidationReport> {
    let mut walker = Walker::default();
    let step = walker.walk(Some(value), schema, &Path::root(), None, options);

    if !walker.errors.is_empty() {
        trace!("validation failed with {} error(s)", walker.errors.len());
        return Err(ValidationReport::new(walker.errors));
    }

    match step {
        Step::Present(value) => Ok(value),
        _ => Ok(Value::Null),
    }
}

/// Outcome of walking one value.
enum Step {
    Present(Value),
    Absent,
    Stripped,
    Failed,
}

#[derive(Default)]
struct Walker {
    errors: Vec<ErrorDetail>,
    halted: bool,
}

impl Walker {
    /// Walk `value` in a throwaway walker that stops at the first error.
    /// `None` when the value does not match.
    fn attempt(
        value: Option<&Value>,
        schema: &Schema,
        path: &Path,
        parent: Option<&Map<String, Value>>,
        options: &ValidationOptions,
    ) -> Option<Step> {
        let options = options.clone().abort_early(true);
        let mut walker = Walker::default();
        let step = walker.walk(value, schema, path, parent, &options);
        if walker.errors.is_empty() { Some(step) } else { None }
    }

    fn probe(value: Option<&Value>, schema: &Schema, options: &ValidationOptions) -> bool {
        Self::attempt(value, schema, &Path::root(), None, options).is_some()
    }

    fn report(
        &mut self,
        label: &str,
        path: &Path,
        kind: String,
        message: &str,
        value: Option<Value>,
        options: &ValidationOptions,
    ) {
        self.errors.push(ErrorDetail {
            message: format!("\"{}\" {}", label, message),
            path: path.clone(),
            kind,
            value,
        });
        if options.abort_early {
            self.halted = true;
        }
    }

    fn walk(
        &mut self,
        value: Option<&Value>,
        schema: &Schema,
        path: &Path,
        parent: Option<&Map<String, Value>>,
        inherited: &ValidationOptions,
    ) -> Step {
        let options = match &schema.preferences {
            Some(preferences) => preferences.apply(inherited),
            None => inherited.clone(),
        };
        let schema = resolve_conditions(schema, parent, &options);
        let schema = schema.as_ref();

        let label = match &schema.label {
            Some(label) => label.clone(),
            None if path.is_root() => "value".to_string(),
            None => path.to_string(),
        };

        let value = match (value, &schema.empty) {
            (Some(v), Some(empty)) if Self::probe(Some(v), empty, &options) => None,
            (value, _) => value,
        };

        let presence = schema.presence.unwrap_or(options.presence);
        let input = match value {
            None => {
                if presence == Presence::Required {
                    self.report(&label, path, "any.required".into(), "is required", None, &options);
                    return Step::Failed;
                }
                return match &schema.default {
                    Some(default) if !options.no_defaults => Step::Present(default.clone()),
                    _ => Step::Absent,
                };
            }
            Some(v) => v,
        };
        if presence == Presence::Forbidden {
            self.report(
                &label,
                path,
                "any.unknown".into(),
                "is not allowed",
                Some(input.clone()),
                &options,
            );
            return Step::Failed;
        }

        let converted = if options.convert {
            convert(schema, input.clone())
        } else {
            input.clone()
        };

        let matches_list = |list: &[Value]| {
            list.iter().any(|candidate| {
                values_equal(candidate, input, schema.insensitive)
                    || values_equal(candidate, &converted, schema.insensitive)
            })
        };

        if matches_list(&schema.allowed) {
            return self.finish(schema, input, converted);
        }
        if schema.only {
            let listed = schema
                .allowed
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.report(
                &label,
                path,
                "any.only".into(),
                &format!("must be one of [{}]", listed),
                Some(input.clone()),
                &options,
            );
            return Step::Failed;
        }
        if matches_list(&schema.invalid) {
            self.report(
                &label,
                path,
                "any.invalid".into(),
                "contains an invalid value",
                Some(input.clone()),
                &options,
            );
            return Step::Failed;
        }

        if let Err((code, message)) = check_base(schema.kind, &converted) {
            self.report(
                &label,
                path,
                format!("{}.{}", schema.kind, code),
                message,
                Some(input.clone()),
                &options,
            );
            return Step::Failed;
        }

        let mut failed = false;
        let output = match schema.kind {
            Kind::Object => match self.walk_object(schema, converted, path, &options) {
                Some(output) => output,
                None => return Step::Failed,
            },
            Kind::Array => match self.walk_array(schema, converted, path, &options) {
                Some(output) => output,
                None => return Step::Failed,
            },
            Kind::Alternatives if !schema.matches.is_empty() => {
                return self.walk_alternatives(schema, input, &label, path, parent, &options);
            }
            _ => converted,
        };

        for rule in &schema.rules {
            if let Err(failure) = rule.check(schema.kind, &output) {
                self.report(
                    &label,
                    path,
                    format!("{}.{}", schema.kind, failure.code),
                    &failure.message,
                    Some(output.clone()),
                    &options,
                );
                failed = true;
                if self.halted {
                    break;
                }
            }
        }

        if failed {
            return Step::Failed;
        }
        self.finish(schema, input, output)
    }

    fn finish(&self, schema: &Schema, input: &Value, output: Value) -> Step {
        if schema.strip {
            Step::Stripped
        } else if schema.raw {
            Step::Present(input.clone())
        } else {
            Step::Present(output)
        }
    }

    /// `None` when a child failed.
    fn walk_object(
        &mut self,
        schema: &Schema,
        value: Value,
        path: &Path,
        options: &ValidationOptions,
    ) -> Option<Value> {
        let Value::Object(input) = value else {
            return Some(value);
        };
        let Some(keys) = &schema.keys else {
            return Some(Value::Object(input));
        };

        let mut output = Map::new();
        let mut failed = false;

        for (key, child) in keys {
            let raw = input.get(key);
            let child_value = match raw {
                Some(Value::Null) if options.null_as_absent && !child.allows_null() => None,
                other => other,
            };
            match self.walk(child_value, child, &path.key(key), Some(&input), options) {
                Step::Present(v) => {
                    output.insert(key.clone(), v);
                }
                Step::Absent => {
                    if raw.is_some_and(Value::is_null) {
                        output.insert(key.clone(), Value::Null);
                    }
                }
                Step::Stripped => trace!("stripped key '{}'", path.key(key)),
                Step::Failed => failed = true,
            }
            if self.halted {
                return None;
            }
        }

        let allow_unknown = schema.unknown.unwrap_or(options.allow_unknown);
        for (key, v) in &input {
            if keys.iter().any(|(declared, _)| declared == key) {
                continue;
            }
            if allow_unknown {
                output.insert(key.clone(), v.clone());
            } else if options.strip_unknown {
                trace!("stripped unknown key '{}'", path.key(key));
            } else {
                let child_path = path.key(key);
                self.report(
                    &child_path.to_string(),
                    &child_path,
                    "object.unknown".into(),
                    "is not allowed",
                    Some(v.clone()),
                    options,
                );
                failed = true;
                if self.halted {
                    return None;
                }
            }
        }

        if failed { None } else { Some(Value::Object(output)) }
    }

    /// `None` when an element failed.
    fn walk_array(
        &mut self,
        schema: &Schema,
        value: Value,
        path: &Path,
        options: &ValidationOptions,
    ) -> Option<Value> {
        let Value::Array(input) = value else {
            return Some(value);
        };
        if schema.items.is_empty() {
            return Some(Value::Array(input));
        }

        let mut output = Vec::with_capacity(input.len());
        let mut failed = false;

        for (index, item) in input.iter().enumerate() {
            let item_path = path.index(index);
            let step = if let [only] = schema.items.as_slice() {
                self.walk(Some(item), only, &item_path, None, options)
            } else {
                let found = schema
                    .items
                    .iter()
                    .find_map(|candidate| Self::attempt(Some(item), candidate, &item_path, None, options));
                match found {
                    Some(step) => step,
                    None => {
                        self.report(
                            &item_path.to_string(),
                            &item_path,
                            "array.includes".into(),
                            "does not match any of the allowed types",
                            Some(item.clone()),
                            options,
                        );
                        Step::Failed
                    }
                }
            };
            match step {
                Step::Present(v) => output.push(v),
                Step::Absent | Step::Stripped => {}
                Step::Failed => failed = true,
            }
            if self.halted {
                return None;
            }
        }

        if failed { None } else { Some(Value::Array(output)) }
    }

    fn walk_alternatives(
        &mut self,
        schema: &Schema,
        input: &Value,
        label: &str,
        path: &Path,
        parent: Option<&Map<String, Value>>,
        options: &ValidationOptions,
    ) -> Step {
        // A single branch reports its own errors
        let found = match schema.matches.as_slice() {
            [only] => match self.walk(Some(input), only, path, parent, options) {
                Step::Failed => return Step::Failed,
                step => Some(step),
            },
            matches => matches
                .iter()
                .find_map(|candidate| Self::attempt(Some(input), candidate, path, parent, options)),
        };
        match found {
            Some(Step::Present(output)) => self.finish(schema, input, output),
            Some(step) => step,
            None => {
                self.report(
                    label,
                    path,
                    "alternatives.match".into(),
                    "does not match any of the allowed types",
                    Some(input.clone()),
                    options,
                );
                Step::Failed
            }
        }
    }
}

/// Concatenate the branches of every condition whose sibling check resolves.
fn resolve_conditions<'a>(
    schema: &'a Schema,
    parent: Option<&Map<String, Value>>,
    options: &ValidationOptions,
) -> Cow<'a, Schema> {
    let mut resolved = Cow::Borrowed(schema);
    for condition in &schema.conditions {
        let sibling = parent.and_then(|parent| lookup(parent, &condition.reference));
        let holds = match &condition.is {
            Some(is) => Walker::probe(sibling, is, options),
            None => sibling.is_some_and(is_truthy),
        };
        let branch = if holds {
            condition.then.as_ref()
        } else {
            condition.otherwise.as_ref()
        };
        if let Some(branch) = branch {
            match resolved.concat(branch) {
                Ok(next) => resolved = Cow::Owned(next),
                Err(e) => warn!("skipping condition on '{}': {}", condition.reference, e),
            }
        }
    }
    resolved
}

fn lookup<'a>(parent: &'a Map<String, Value>, reference: &str) -> Option<&'a Value> {
    let mut parts = reference.split('.');
    let mut current = parent.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn check_base(kind: Kind, value: &Value) -> Result<(), (&'static str, &'static str)> {
    let base = |ok: bool, message| if ok { Ok(()) } else { Err(("base", message)) };
    match kind {
        Kind::Any | Kind::Alternatives => Ok(()),
        Kind::Boolean => base(value.is_boolean(), "must be a boolean"),
        Kind::Number => base(value.is_number(), "must be a number"),
        Kind::String => match value.as_str() {
            Some("") => Err(("empty", "is not allowed to be empty")),
            Some(_) => Ok(()),
            None => Err(("base", "must be a string")),
        },
        Kind::Date => base(
            value.as_str().and_then(parse_date).is_some(),
            "must be a valid date",
        ),
        Kind::Object => base(value.is_object(), "must be of type object"),
        Kind::Array => base(value.is_array(), "must be an array"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OptionsOverride, When};
    use serde_json::json;

    fn opts() -> ValidationOptions {
        ValidationOptions::default()
    }

    #[test]
    fn test_required_and_absent() {
        let schema = Schema::object()
            .keys([("name", Schema::string().required()), ("age", Schema::number())])
            .unwrap();
        let report = validate(&json!({}), &schema, &opts()).unwrap_err();
        assert_eq!(report.len(), 1);
        assert_eq!(report.details[0].kind, "any.required");
        assert_eq!(report.details[0].message, "\"name\" is required");
        assert_eq!(report.details[0].path.to_string(), "name");
    }

    #[test]
    fn test_collects_every_error_by_default() {
        let schema = Schema::object()
            .keys([
                ("a", Schema::number().min(10.0).unwrap()),
                ("b", Schema::string()),
            ])
            .unwrap();
        let report = validate(&json!({"a": 1, "b": 2}), &schema, &opts()).unwrap_err();
        assert_eq!(report.len(), 2);
        assert_eq!(report.details[0].kind, "number.min");
        assert_eq!(report.details[1].kind, "string.base");

        let report = validate(&json!({"a": 1, "b": 2}), &schema, &opts().abort_early(true))
            .unwrap_err();
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_conversion_is_reflected_in_output() {
        let schema = Schema::object().keys([("n", Schema::number())]).unwrap();
        assert_eq!(validate(&json!({"n": "12"}), &schema, &opts()).unwrap(), json!({"n": 12}));
        assert!(validate(&json!({"n": "12"}), &schema, &opts().convert(false)).is_err());
        assert!(validate(&json!({"n": "12"}), &schema.strict(true), &opts()).is_err());
    }

    #[test]
    fn test_null_member_counts_as_absent() {
        let schema = Schema::object().keys([("n", Schema::number())]).unwrap();
        assert_eq!(
            validate(&json!({"n": null}), &schema, &opts()).unwrap(),
            json!({"n": null})
        );
        let report = validate(&json!({"n": null}), &schema, &opts().null_as_absent(false))
            .unwrap_err();
        assert_eq!(report.details[0].kind, "number.base");

        let nullable = Schema::object()
            .keys([("n", Schema::number().allow([Value::Null]))])
            .unwrap();
        assert!(validate(&json!({"n": null}), &nullable, &opts().null_as_absent(false)).is_ok());
    }

    #[test]
    fn test_unknown_keys() {
        let schema = Schema::object().keys([("a", Schema::any())]).unwrap();
        let report = validate(&json!({"a": 1, "b": 2}), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "object.unknown");
        assert_eq!(report.details[0].message, "\"b\" is not allowed");

        let out = validate(&json!({"a": 1, "b": 2}), &schema, &opts().strip_unknown(true)).unwrap();
        assert_eq!(out, json!({"a": 1}));
        let out = validate(&json!({"a": 1, "b": 2}), &schema, &opts().allow_unknown(true)).unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
        let open = schema.unknown(true).unwrap();
        assert!(validate(&json!({"a": 1, "b": 2}), &open, &opts()).is_ok());
    }

    #[test]
    fn test_object_without_keys_accepts_anything() {
        assert!(validate(&json!({"x": [1]}), &Schema::object(), &opts()).is_ok());
        assert!(validate(&json!([1]), &Schema::object(), &opts()).is_err());
    }

    #[test]
    fn test_nested_paths() {
        let schema = Schema::object()
            .keys([(
                "lines",
                Schema::array()
                    .items([Schema::object()
                        .keys([("qty", Schema::number().min(1.0).unwrap())])
                        .unwrap()])
                    .unwrap(),
            )])
            .unwrap();
        let report = validate(&json!({"lines": [{"qty": 2}, {"qty": 0}]}), &schema, &opts())
            .unwrap_err();
        assert_eq!(report.details[0].path.to_string(), "lines[1].qty");
        assert_eq!(
            report.details[0].message,
            "\"lines[1].qty\" must be greater than or equal to 1"
        );
    }

    #[test]
    fn test_array_with_several_item_schemas() {
        let schema = Schema::array()
            .items([Schema::number(), Schema::boolean()])
            .unwrap();
        assert!(validate(&json!([1, true]), &schema, &opts()).is_ok());
        let report = validate(&json!([1, {}]), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "array.includes");
        assert_eq!(report.details[0].path.to_string(), "[1]");
    }

    #[test]
    fn test_alternatives() {
        let schema = Schema::alternatives()
            .try_schemas([Schema::number(), Schema::string().email().unwrap()])
            .unwrap();
        assert_eq!(validate(&json!("5"), &schema, &opts()).unwrap(), json!(5));
        assert!(validate(&json!("a@b.io"), &schema, &opts()).is_ok());
        let report = validate(&json!(true), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "alternatives.match");
    }

    #[test]
    fn test_alternatives_strip_and_raw_with_any_branch_count() {
        let one = Schema::alternatives().try_schemas([Schema::number()]).unwrap();
        let two = Schema::alternatives()
            .try_schemas([Schema::number(), Schema::string()])
            .unwrap();
        let schema = Schema::object()
            .keys([("a", one.strip(true)), ("b", two.strip(true))])
            .unwrap();
        assert_eq!(validate(&json!({"a": 1, "b": 2}), &schema, &opts()).unwrap(), json!({}));

        let schema = Schema::object().keys([("a", one.raw(true))]).unwrap();
        assert_eq!(validate(&json!({"a": "4"}), &schema, &opts()).unwrap(), json!({"a": "4"}));

        let report = validate(&json!({"a": "x"}), &Schema::object().keys([("a", one)]).unwrap(), &opts())
            .unwrap_err();
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].kind, "number.base");
    }

    #[test]
    fn test_allow_valid_invalid() {
        let schema = Schema::string().valid(["red", "green"]);
        assert!(validate(&json!("red"), &schema, &opts()).is_ok());
        let report = validate(&json!("blue"), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "any.only");

        let schema = Schema::string().invalid(["root"]);
        let report = validate(&json!("root"), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "any.invalid");

        assert!(validate(&json!(""), &Schema::string(), &opts()).is_err());
        assert!(validate(&json!(""), &Schema::string().allow([""]), &opts()).is_ok());
    }

    #[test]
    fn test_defaults_and_empty() {
        let schema = Schema::object()
            .keys([(
                "tier",
                Schema::string().empty(Schema::string().allow([""])).default("free"),
            )])
            .unwrap();
        assert_eq!(validate(&json!({}), &schema, &opts()).unwrap(), json!({"tier": "free"}));
        assert_eq!(
            validate(&json!({"tier": ""}), &schema, &opts()).unwrap(),
            json!({"tier": "free"})
        );
        assert_eq!(
            validate(&json!({}), &schema, &opts().no_defaults(true)).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_forbidden() {
        let schema = Schema::object()
            .keys([("secret", Schema::any().forbidden())])
            .unwrap();
        assert!(validate(&json!({}), &schema, &opts()).is_ok());
        let report = validate(&json!({"secret": 1}), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "any.unknown");
    }

    #[test]
    fn test_strip_and_raw() {
        let schema = Schema::object()
            .keys([
                ("password", Schema::string().strip(true)),
                ("count", Schema::number().raw(true)),
            ])
            .unwrap();
        let out = validate(&json!({"password": "x", "count": "3"}), &schema, &opts()).unwrap();
        assert_eq!(out, json!({"count": "3"}));
    }

    #[test]
    fn test_label_replaces_path() {
        let schema = Schema::object()
            .keys([("dob", Schema::date().label("Date of birth"))])
            .unwrap();
        let report = validate(&json!({"dob": "soon"}), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].message, "\"Date of birth\" must be a valid date");
    }

    #[test]
    fn test_when_condition() {
        let card = Schema::string()
            .when(
                When::reference("method")
                    .is(Schema::string().valid(["card"]))
                    .then(Schema::any().required())
                    .otherwise(Schema::any().forbidden()),
            )
            .unwrap();
        let schema = Schema::object()
            .keys([("method", Schema::string()), ("card", card)])
            .unwrap();

        assert!(validate(&json!({"method": "card", "card": "4242"}), &schema, &opts()).is_ok());
        let report = validate(&json!({"method": "card"}), &schema, &opts()).unwrap_err();
        assert_eq!(report.details[0].kind, "any.required");
        let report = validate(&json!({"method": "cash", "card": "4242"}), &schema, &opts())
            .unwrap_err();
        assert_eq!(report.details[0].kind, "any.unknown");
    }

    #[test]
    fn test_when_without_is_uses_truthiness() {
        let schema = Schema::object()
            .keys([
                ("gift", Schema::boolean()),
                (
                    "message",
                    Schema::string()
                        .when(When::reference("gift").then(Schema::any().required()))
                        .unwrap(),
                ),
            ])
            .unwrap();
        assert!(validate(&json!({"gift": false}), &schema, &opts()).is_ok());
        assert!(validate(&json!({"gift": true}), &schema, &opts()).is_err());
    }

    #[test]
    fn test_schema_options_override() {
        let schema = Schema::object()
            .keys([("a", Schema::any())])
            .unwrap()
            .options(OptionsOverride::new().allow_unknown(true));
        assert!(validate(&json!({"a": 1, "z": 0}), &schema, &opts()).is_ok());
    }

    #[test]
    fn test_presence_from_options() {
        let schema = Schema::object().keys([("a", Schema::number())]).unwrap();
        let required = opts().presence(Presence::Required);
        assert!(validate(&json!({}), &schema, &required).is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn test_nested_reference_lookup() {
        let parent = json!({"a": {"b": 1}});
        let parent = parent.as_object().unwrap();
        assert_eq!(lookup(parent, "a.b"), Some(&json!(1)));
        assert_eq!(lookup(parent, "a.c"), None);
    }
}
