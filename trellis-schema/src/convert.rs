// Value conversion ahead of type checks

use crate::rules::{number_value, values_equal};
use crate::{Kind, Schema};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Coerce `value` towards the schema's kind and apply rule normalizations.
///
/// Values that cannot be converted are returned unchanged so the type check
/// reports them.
pub(crate) fn convert(schema: &Schema, value: Value) -> Value {
    let value = match schema.kind {
        Kind::Number => to_number(value),
        Kind::Boolean => to_boolean(schema, value),
        Kind::Date => to_date(value),
        _ => value,
    };
    schema.rules.iter().fold(value, |value, rule| rule.convert(value))
}

fn to_number(value: Value) -> Value {
    match &value {
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && !s.trim().is_empty() => number_value(n),
            _ => value,
        },
        _ => value,
    }
}

fn to_boolean(schema: &Schema, value: Value) -> Value {
    let insensitive = !schema.sensitive;
    if schema.truthy.iter().any(|t| values_equal(t, &value, insensitive)) {
        return Value::Bool(true);
    }
    if schema.falsy.iter().any(|f| values_equal(f, &value, insensitive)) {
        return Value::Bool(false);
    }
    match &value {
        Value::String(s) if s == "true" || (insensitive && s.eq_ignore_ascii_case("true")) => {
            Value::Bool(true)
        }
        Value::String(s) if s == "false" || (insensitive && s.eq_ignore_ascii_case("false")) => {
            Value::Bool(false)
        }
        _ => value,
    }
}

fn to_date(value: Value) -> Value {
    let millis = match &value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    match millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings() {
        let schema = Schema::number();
        assert_eq!(convert(&schema, json!(" 42 ")), json!(42));
        assert_eq!(convert(&schema, json!("1.5")), json!(1.5));
        assert_eq!(convert(&schema, json!("abc")), json!("abc"));
        assert_eq!(convert(&schema, json!("")), json!(""));
    }

    #[test]
    fn test_booleans() {
        let schema = Schema::boolean();
        assert_eq!(convert(&schema, json!("TRUE")), json!(true));
        assert_eq!(convert(&schema, json!("false")), json!(false));
        assert_eq!(convert(&schema, json!("yes")), json!("yes"));

        let schema = Schema::boolean().truthy(["Y"]).unwrap().falsy([0]).unwrap();
        assert_eq!(convert(&schema, json!("y")), json!(true));
        assert_eq!(convert(&schema, json!(0)), json!(false));

        let schema = Schema::boolean().truthy(["Y"]).unwrap().sensitive(true).unwrap();
        assert_eq!(convert(&schema, json!("y")), json!("y"));
        assert_eq!(convert(&schema, json!("TRUE")), json!("TRUE"));
    }

    #[test]
    fn test_timestamps_become_dates() {
        let schema = Schema::date();
        assert_eq!(convert(&schema, json!(0)), json!("1970-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_rule_normalization() {
        let schema = Schema::string().trim().unwrap().lowercase().unwrap();
        assert_eq!(convert(&schema, json!("  MiXeD ")), json!("mixed"));
    }
}
