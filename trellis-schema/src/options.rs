// Validation options

use serde::{Deserialize, Serialize};

/// Whether a value must, may, or must not be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
}

/// Options for one `validate` call.
///
/// Deserializable with every field defaulted, so partial configuration
/// tables are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Stop at the first failed check instead of collecting all of them
    pub abort_early: bool,

    /// Convert values to the schema's kind where possible ("12" -> 12)
    pub convert: bool,

    /// Accept object keys no schema declares
    pub allow_unknown: bool,

    /// Remove undeclared object keys from the output instead of failing
    pub strip_unknown: bool,

    /// Presence applied to schemas that never set one
    pub presence: Presence,

    /// Do not fill in defaults for absent values
    pub no_defaults: bool,

    /// Treat `null` object members as absent unless the schema allows null.
    /// Serde writes `None` fields as `null`.
    pub null_as_absent: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            abort_early: false,
            convert: true,
            allow_unknown: false,
            strip_unknown: false,
            presence: Presence::Optional,
            no_defaults: false,
            null_as_absent: true,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort_early(mut self, enabled: bool) -> Self {
        self.abort_early = enabled;
        self
    }

    pub fn convert(mut self, enabled: bool) -> Self {
        self.convert = enabled;
        self
    }

    pub fn allow_unknown(mut self, enabled: bool) -> Self {
        self.allow_unknown = enabled;
        self
    }

    pub fn strip_unknown(mut self, enabled: bool) -> Self {
        self.strip_unknown = enabled;
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn no_defaults(mut self, enabled: bool) -> Self {
        self.no_defaults = enabled;
        self
    }

    pub fn null_as_absent(mut self, enabled: bool) -> Self {
        self.null_as_absent = enabled;
        self
    }
}

/// Per-schema option overrides, applied to the schema and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsOverride {
    pub abort_early: Option<bool>,
    pub convert: Option<bool>,
    pub allow_unknown: Option<bool>,
    pub strip_unknown: Option<bool>,
    pub presence: Option<Presence>,
    pub no_defaults: Option<bool>,
}

impl OptionsOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort_early(mut self, enabled: bool) -> Self {
        self.abort_early = Some(enabled);
        self
    }

    pub fn convert(mut self, enabled: bool) -> Self {
        self.convert = Some(enabled);
        self
    }

    pub fn allow_unknown(mut self, enabled: bool) -> Self {
        self.allow_unknown = Some(enabled);
        self
    }

    pub fn strip_unknown(mut self, enabled: bool) -> Self {
        self.strip_unknown = Some(enabled);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn no_defaults(mut self, enabled: bool) -> Self {
        self.no_defaults = Some(enabled);
        self
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge(&self, other: &OptionsOverride) -> OptionsOverride {
        OptionsOverride {
            abort_early: other.abort_early.or(self.abort_early),
            convert: other.convert.or(self.convert),
            allow_unknown: other.allow_unknown.or(self.allow_unknown),
            strip_unknown: other.strip_unknown.or(self.strip_unknown),
            presence: other.presence.or(self.presence),
            no_defaults: other.no_defaults.or(self.no_defaults),
        }
    }

    /// The effective options when this override applies below `base`.
    pub fn apply(&self, base: &ValidationOptions) -> ValidationOptions {
        ValidationOptions {
            abort_early: self.abort_early.unwrap_or(base.abort_early),
            convert: self.convert.unwrap_or(base.convert),
            allow_unknown: self.allow_unknown.unwrap_or(base.allow_unknown),
            strip_unknown: self.strip_unknown.unwrap_or(base.strip_unknown),
            presence: self.presence.unwrap_or(base.presence),
            no_defaults: self.no_defaults.unwrap_or(base.no_defaults),
            null_as_absent: base.null_as_absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_collect_all_errors() {
        let options = ValidationOptions::default();
        assert!(!options.abort_early);
        assert!(options.convert);
        assert!(!options.allow_unknown);
        assert_eq!(options.presence, Presence::Optional);
        assert!(options.null_as_absent);
    }

    #[test]
    fn test_override_apply_keeps_unset_fields() {
        let base = ValidationOptions::default().allow_unknown(true);
        let effective = OptionsOverride::new().convert(false).apply(&base);
        assert!(!effective.convert);
        assert!(effective.allow_unknown);
    }

    #[test]
    fn test_override_merge_prefers_later() {
        let first = OptionsOverride::new().convert(false).abort_early(true);
        let second = OptionsOverride::new().convert(true);
        let merged = first.merge(&second);
        assert_eq!(merged.convert, Some(true));
        assert_eq!(merged.abort_early, Some(true));
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{"abort_early": true, "presence": "required"}"#).unwrap();
        assert!(options.abort_early);
        assert_eq!(options.presence, Presence::Required);
        assert!(options.convert);
    }
}
