// Kind-specific rules

use crate::Kind;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

static URI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/$.?#][^\s]*$").unwrap());

static GUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\{?[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\}?$").unwrap()
});

static ALPHANUM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

static HEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-fA-F0-9]+$").unwrap());

/// A single check beyond the base kind.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Lower bound: value for numbers, size for strings/arrays/objects
    Min(f64),
    /// Upper bound: value for numbers, size for strings/arrays/objects
    Max(f64),
    /// Exact size for strings/arrays/objects
    Length(f64),
    Greater(f64),
    Less(f64),
    Integer,
    Precision(u32),
    Multiple(f64),
    Positive,
    Negative,
    Port,
    Pattern {
        regex: Regex,
        name: Option<String>,
        invert: bool,
    },
    Email,
    Uri,
    Guid,
    Alphanum,
    Token,
    Hex,
    Lowercase,
    Uppercase,
    Trim,
    IsoDate,
    Unique,
    DateMin(DateTime<Utc>),
    DateMax(DateTime<Utc>),
}

/// A rule that did not hold.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleFailure {
    /// Error kind without the base kind prefix, e.g. `min` or `pattern.name`
    pub code: String,
    /// Message after the label
    pub message: String,
}

impl RuleFailure {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Rule {
    /// Rule name as used in error kinds and `SchemaError::UnsupportedRule`.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Length(_) => "length",
            Rule::Greater(_) => "greater",
            Rule::Less(_) => "less",
            Rule::Integer => "integer",
            Rule::Precision(_) => "precision",
            Rule::Multiple(_) => "multiple",
            Rule::Positive => "positive",
            Rule::Negative => "negative",
            Rule::Port => "port",
            Rule::Pattern { .. } => "pattern",
            Rule::Email => "email",
            Rule::Uri => "uri",
            Rule::Guid => "guid",
            Rule::Alphanum => "alphanum",
            Rule::Token => "token",
            Rule::Hex => "hex",
            Rule::Lowercase => "lowercase",
            Rule::Uppercase => "uppercase",
            Rule::Trim => "trim",
            Rule::IsoDate => "isoDate",
            Rule::Unique => "unique",
            Rule::DateMin(_) => "min",
            Rule::DateMax(_) => "max",
        }
    }

    /// Whether schemas of `kind` can carry this rule.
    pub fn supports(&self, kind: Kind) -> bool {
        match self {
            Rule::Min(_) | Rule::Max(_) => kind == Kind::Number || kind.is_sized(),
            Rule::Length(_) => kind.is_sized(),
            Rule::Greater(_)
            | Rule::Less(_)
            | Rule::Integer
            | Rule::Precision(_)
            | Rule::Multiple(_)
            | Rule::Positive
            | Rule::Negative
            | Rule::Port => kind == Kind::Number,
            Rule::Pattern { .. }
            | Rule::Email
            | Rule::Uri
            | Rule::Guid
            | Rule::Alphanum
            | Rule::Token
            | Rule::Hex
            | Rule::Lowercase
            | Rule::Uppercase
            | Rule::Trim
            | Rule::IsoDate => kind == Kind::String,
            Rule::Unique => kind == Kind::Array,
            Rule::DateMin(_) | Rule::DateMax(_) => kind == Kind::Date,
        }
    }

    /// Normalize a value ahead of checking, when conversion is enabled.
    pub(crate) fn convert(&self, value: Value) -> Value {
        match (self, value) {
            (Rule::Trim, Value::String(s)) => Value::String(s.trim().to_string()),
            (Rule::Lowercase, Value::String(s)) => Value::String(s.to_lowercase()),
            (Rule::Uppercase, Value::String(s)) => Value::String(s.to_uppercase()),
            (Rule::Precision(places), Value::Number(n)) => match n.as_f64() {
                Some(f) => number_value(round_to(f, *places)),
                None => Value::Number(n),
            },
            (_, value) => value,
        }
    }

    /// Check an already type-checked value of `kind`.
    pub(crate) fn check(&self, kind: Kind, value: &Value) -> Result<(), RuleFailure> {
        match self {
            Rule::Min(limit) => match size_or_number(kind, value) {
                Some(actual) if actual < *limit => Err(bound_failure(kind, "min", *limit)),
                _ => Ok(()),
            },
            Rule::Max(limit) => match size_or_number(kind, value) {
                Some(actual) if actual > *limit => Err(bound_failure(kind, "max", *limit)),
                _ => Ok(()),
            },
            Rule::Length(limit) => match size_or_number(kind, value) {
                Some(actual) if actual != *limit => Err(bound_failure(kind, "length", *limit)),
                _ => Ok(()),
            },
            Rule::Greater(limit) => number_check(value, |v| v > *limit, || {
                RuleFailure::new("greater", format!("must be greater than {}", limit))
            }),
            Rule::Less(limit) => number_check(value, |v| v < *limit, || {
                RuleFailure::new("less", format!("must be less than {}", limit))
            }),
            Rule::Integer => number_check(value, |v| v.is_finite() && v.fract() == 0.0, || {
                RuleFailure::new("integer", "must be an integer")
            }),
            Rule::Precision(places) => number_check(value, |v| decimal_places(v) <= *places, || {
                RuleFailure::new(
                    "precision",
                    format!("must have no more than {} decimal places", places),
                )
            }),
            Rule::Multiple(base) => number_check(value, |v| is_multiple(v, *base), || {
                RuleFailure::new("multiple", format!("must be a multiple of {}", base))
            }),
            Rule::Positive => number_check(value, |v| v > 0.0, || {
                RuleFailure::new("positive", "must be a positive number")
            }),
            Rule::Negative => number_check(value, |v| v < 0.0, || {
                RuleFailure::new("negative", "must be a negative number")
            }),
            Rule::Port => number_check(
                value,
                |v| v.fract() == 0.0 && (0.0..=65535.0).contains(&v),
                || RuleFailure::new("port", "must be a valid port"),
            ),
            Rule::Pattern {
                regex,
                name,
                invert,
            } => string_check(value, |s| regex.is_match(s) != *invert, || {
                let code = match (name.is_some(), *invert) {
                    (true, false) => "pattern.name",
                    (true, true) => "pattern.invert.name",
                    (false, false) => "pattern.base",
                    (false, true) => "pattern.invert.base",
                };
                let verb = if *invert { "matches the inverted" } else { "fails to match the" };
                let message = match name {
                    Some(name) => format!("{} {} pattern", verb, name),
                    None => format!("{} required pattern: {}", verb, regex.as_str()),
                };
                RuleFailure::new(code, message)
            }),
            Rule::Email => string_check(value, |s| EMAIL_REGEX.is_match(s), || {
                RuleFailure::new("email", "must be a valid email")
            }),
            Rule::Uri => string_check(value, |s| URI_REGEX.is_match(s), || {
                RuleFailure::new("uri", "must be a valid uri")
            }),
            Rule::Guid => string_check(value, |s| GUID_REGEX.is_match(s), || {
                RuleFailure::new("guid", "must be a valid GUID")
            }),
            Rule::Alphanum => string_check(value, |s| ALPHANUM_REGEX.is_match(s), || {
                RuleFailure::new("alphanum", "must only contain alpha-numeric characters")
            }),
            Rule::Token => string_check(value, |s| TOKEN_REGEX.is_match(s), || {
                RuleFailure::new(
                    "token",
                    "must only contain alpha-numeric and underscore characters",
                )
            }),
            Rule::Hex => string_check(value, |s| HEX_REGEX.is_match(s), || {
                RuleFailure::new("hex", "must only contain hexadecimal characters")
            }),
            Rule::Lowercase => string_check(value, |s| s == s.to_lowercase(), || {
                RuleFailure::new("lowercase", "must only contain lowercase characters")
            }),
            Rule::Uppercase => string_check(value, |s| s == s.to_uppercase(), || {
                RuleFailure::new("uppercase", "must only contain uppercase characters")
            }),
            Rule::Trim => string_check(value, |s| s == s.trim(), || {
                RuleFailure::new("trim", "must not have leading or trailing whitespace")
            }),
            Rule::IsoDate => string_check(value, |s| parse_date(s).is_some(), || {
                RuleFailure::new("isoDate", "must be in iso format")
            }),
            Rule::Unique => match value {
                Value::Array(items) => {
                    let duplicate = items.iter().enumerate().any(|(i, item)| {
                        items[..i].iter().any(|seen| values_equal(seen, item, false))
                    });
                    if duplicate {
                        Err(RuleFailure::new("unique", "contains a duplicate value"))
                    } else {
                        Ok(())
                    }
                }
                _ => Ok(()),
            },
            Rule::DateMin(limit) => date_check(value, |d| d >= *limit, || {
                RuleFailure::new(
                    "min",
                    format!("must be greater than or equal to \"{}\"", limit.to_rfc3339()),
                )
            }),
            Rule::DateMax(limit) => date_check(value, |d| d <= *limit, || {
                RuleFailure::new(
                    "max",
                    format!("must be less than or equal to \"{}\"", limit.to_rfc3339()),
                )
            }),
        }
    }
}

fn size_or_number(kind: Kind, value: &Value) -> Option<f64> {
    match (kind, value) {
        (Kind::Number, Value::Number(n)) => n.as_f64(),
        (Kind::String, Value::String(s)) => Some(s.chars().count() as f64),
        (Kind::Array, Value::Array(items)) => Some(items.len() as f64),
        (Kind::Object, Value::Object(map)) => Some(map.len() as f64),
        _ => None,
    }
}

fn bound_failure(kind: Kind, code: &str, limit: f64) -> RuleFailure {
    let message = match (kind, code) {
        (Kind::Number, "min") => format!("must be greater than or equal to {}", limit),
        (Kind::Number, _) => format!("must be less than or equal to {}", limit),
        (Kind::String, "min") => format!("length must be at least {} characters long", limit),
        (Kind::String, "max") => {
            format!("length must be less than or equal to {} characters long", limit)
        }
        (Kind::String, _) => format!("length must be {} characters long", limit),
        (Kind::Array, "min") => format!("must contain at least {} items", limit),
        (Kind::Array, "max") => format!("must contain less than or equal to {} items", limit),
        (Kind::Array, _) => format!("must contain {} items", limit),
        (_, "min") => format!("must have at least {} keys", limit),
        (_, "max") => format!("must have less than or equal to {} keys", limit),
        (_, _) => format!("must have {} keys", limit),
    };
    RuleFailure::new(code, message)
}

fn number_check<P, F>(value: &Value, predicate: P, failure: F) -> Result<(), RuleFailure>
where
    P: Fn(f64) -> bool,
    F: FnOnce() -> RuleFailure,
{
    match value.as_f64() {
        Some(v) if !predicate(v) => Err(failure()),
        _ => Ok(()),
    }
}

fn string_check<P, F>(value: &Value, predicate: P, failure: F) -> Result<(), RuleFailure>
where
    P: Fn(&str) -> bool,
    F: FnOnce() -> RuleFailure,
{
    match value.as_str() {
        Some(s) if !predicate(s) => Err(failure()),
        _ => Ok(()),
    }
}

fn date_check<P, F>(value: &Value, predicate: P, failure: F) -> Result<(), RuleFailure>
where
    P: Fn(DateTime<Utc>) -> bool,
    F: FnOnce() -> RuleFailure,
{
    match value.as_str().and_then(parse_date) {
        Some(date) if !predicate(date) => Err(failure()),
        _ => Ok(()),
    }
}

fn decimal_places(value: f64) -> u32 {
    let rendered = value.to_string();
    match rendered.split_once('.') {
        Some((_, fraction)) => fraction.len() as u32,
        None => 0,
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

fn is_multiple(value: f64, base: f64) -> bool {
    if base == 0.0 {
        return false;
    }
    let remainder = (value % base).abs();
    remainder < 1e-9 || (base.abs() - remainder).abs() < 1e-9
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
}

/// A JSON number, integral when `value` has no fractional part.
pub(crate) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Value equality where numbers compare numerically (`10 == 10.0`) and
/// strings optionally ignore case.
pub(crate) fn values_equal(left: &Value, right: &Value, insensitive: bool) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) if insensitive => a.to_lowercase() == b.to_lowercase(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| values_equal(x, y, insensitive))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| {
                    b.get(key).is_some_and(|y| values_equal(x, y, insensitive))
                })
        }
        _ => left == right,
    }
}
