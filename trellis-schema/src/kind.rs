// Base kinds

use std::fmt;

/// The fundamental value category a schema enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Accepts every value
    Any,
    Boolean,
    Number,
    String,
    /// RFC 3339 / ISO 8601 strings, or millisecond timestamps when converting
    Date,
    Object,
    Array,
    /// Matches the first of several candidate schemas
    Alternatives,
}

impl Kind {
    /// Name used as the prefix of error kinds, e.g. `number` in `number.min`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Date => "date",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Alternatives => "alternatives",
        }
    }

    /// Kinds whose `min`/`max`/`length` rules bound a size rather than a value.
    pub fn is_sized(&self) -> bool {
        matches!(self, Kind::String | Kind::Array | Kind::Object)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
