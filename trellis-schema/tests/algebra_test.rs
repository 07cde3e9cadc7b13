//! Integration tests for trellis-schema

use serde_json::json;
use trellis_schema::*;

fn options() -> ValidationOptions {
    ValidationOptions::default()
}

#[test]
fn test_composed_object_schema() {
    let address = Schema::object()
        .keys([
            ("street", Schema::string().required()),
            ("zip", Schema::string().pattern_named(r"^\d{5}$", "zip code").unwrap()),
        ])
        .unwrap();
    let user = Schema::object()
        .keys([
            ("name", Schema::string().min(2.0).unwrap().required()),
            ("address", address),
            ("tags", Schema::array().items([Schema::string()]).unwrap().unique().unwrap()),
        ])
        .unwrap();

    let ok = json!({
        "name": "Ada",
        "address": {"street": "Main St", "zip": "12345"},
        "tags": ["a", "b"],
    });
    assert_eq!(user.validate(&ok, &options()).unwrap(), ok);

    let bad = json!({
        "name": "A",
        "address": {"zip": "1"},
        "tags": ["a", "a"],
    });
    let report = user.validate(&bad, &options()).unwrap_err();
    let kinds: Vec<&str> = report.details.iter().map(|d| d.kind.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["string.min", "any.required", "string.pattern.name", "array.unique"]
    );
    assert_eq!(report.at("address.street").len(), 1);
    assert_eq!(report.at("address.zip")[0].message, "\"address.zip\" fails to match the zip code pattern");
}

#[test]
fn test_report_serializes_with_type_tags() {
    let schema = Schema::object()
        .keys([("n", Schema::number().max(3.0).unwrap())])
        .unwrap();
    let report = schema.validate(&json!({"n": 5}), &options()).unwrap_err();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({"details": [{
            "message": "\"n\" must be less than or equal to 3",
            "path": "n",
            "type": "number.max",
            "value": 5
        }]})
    );
    assert_eq!(report.to_string(), "\"n\" must be less than or equal to 3");
}

#[test]
fn test_concat_then_validate() {
    let base = Schema::object().keys([("id", Schema::number())]).unwrap();
    let extra = Schema::object()
        .keys([("id", Schema::any().required()), ("email", Schema::string().email().unwrap())])
        .unwrap();
    let merged = base.concat(&extra).unwrap();

    assert!(merged.validate(&json!({"id": 1, "email": "a@b.co"}), &options()).is_ok());
    let report = merged.validate(&json!({"email": "a@b.co"}), &options()).unwrap_err();
    assert_eq!(report.details[0].kind, "any.required");
}

#[test]
fn test_dates() {
    let schema = Schema::date().min_date("2020-01-01").unwrap();
    assert!(schema.validate(&json!("2021-03-04T05:06:07Z"), &options()).is_ok());
    let report = schema.validate(&json!("2019-12-31"), &options()).unwrap_err();
    assert_eq!(report.details[0].kind, "date.min");
    assert_eq!(
        schema.validate(&json!(1_600_000_000_000i64), &options()).unwrap(),
        json!("2020-09-13T12:26:40.000Z")
    );
    assert!(Schema::date().min_date("never").is_err());
}

#[test]
fn test_boolean_conversion_respects_strict() {
    let schema = Schema::boolean().truthy(["yes"]).unwrap();
    assert_eq!(schema.validate(&json!("YES"), &options()).unwrap(), json!(true));
    assert!(schema.strict(true).validate(&json!("yes"), &options()).is_err());
}

#[test]
fn test_insensitive_valid() {
    let schema = Schema::string().valid(["Admin"]).insensitive().unwrap();
    assert!(schema.validate(&json!("admin"), &options()).is_ok());
    assert!(Schema::string().valid(["Admin"]).validate(&json!("admin"), &options()).is_err());
}

#[test]
fn test_schemas_are_shareable() {
    let base = Schema::number();
    let a = base.min(1.0).unwrap();
    let b = base.max(1.0).unwrap();
    assert!(base.validate(&json!(100), &options()).is_ok());
    assert!(a.validate(&json!(100), &options()).is_ok());
    assert!(b.validate(&json!(100), &options()).is_err());
}
