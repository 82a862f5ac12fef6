//! Configuration values and the recognized-options table.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classes::ClassSource;

/// Function overriding the process-wide default class source, keyed by
/// section name.
pub type SectionClassFn = Rc<dyn Fn(&str) -> Option<ClassSource>>;

/// A value stored in a config cascade scope.
///
/// Plain options (including opaque pass-throughs like `flavor`) are JSON
/// values. Class configuration carries per-section sources; `root_classes`
/// carries a function replacing the process-wide defaults.
#[derive(Clone)]
pub enum ConfigValue {
    Json(Value),
    Classes(BTreeMap<String, ClassSource>),
    RootClasses(SectionClassFn),
}

impl ConfigValue {
    pub fn json(value: impl Into<Value>) -> Self {
        ConfigValue::Json(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Json(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::Json(value) => value.as_u64(),
            _ => None,
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ConfigValue::Classes(map) => f.debug_tuple("Classes").field(map).finish(),
            ConfigValue::RootClasses(_) => f.write_str("RootClasses(..)"),
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::Json(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Json(Value::String(value.to_string()))
    }
}

/// Policy for when validation and error messages become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBehavior {
    /// Visible as soon as a run settles, regardless of interaction.
    Live,
    /// Visible once the value has changed from its initial value.
    Dirty,
    /// Visible once the input has reported a blur at least once.
    #[default]
    Blur,
}

impl DisplayBehavior {
    /// Parse from an option/prop string. Unknown strings resolve to None
    /// so the cascade can carry opaque values without breaking display.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "live" => Some(DisplayBehavior::Live),
            "dirty" => Some(DisplayBehavior::Dirty),
            "blur" => Some(DisplayBehavior::Blur),
            _ => None,
        }
    }
}

/// Recognized option keys and process-wide defaults.
///
/// Unknown keys are accepted and cascaded untouched; the cascade is
/// advisory infrastructure, not load-bearing for correctness.
pub mod options {
    use super::{ConfigValue, Value};

    /// Gates when externally supplied errors (and validation messages
    /// without a per-node override) become visible.
    pub const ERROR_BEHAVIOR: &str = "error_behavior";
    /// Opaque pass-through tag; no engine-internal effect beyond cascade
    /// propagation.
    pub const FLAVOR: &str = "flavor";
    /// Per-section class source overrides.
    pub const CLASSES: &str = "classes";
    /// Function replacing the process-wide default class source per section.
    pub const ROOT_CLASSES: &str = "root_classes";
    /// Debounce window in milliseconds of logical time.
    pub const DELAY: &str = "delay";

    /// Default debounce window.
    pub const DEFAULT_DELAY_MS: u64 = 20;

    /// Process-wide fallback for a key, used when no scope on the ancestor
    /// chain defines it.
    pub fn global_default(key: &str) -> Option<ConfigValue> {
        match key {
            ERROR_BEHAVIOR => Some(ConfigValue::Json(Value::String("blur".to_string()))),
            DELAY => Some(ConfigValue::Json(Value::from(DEFAULT_DELAY_MS))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_behavior_parse() {
        assert_eq!(DisplayBehavior::parse("live"), Some(DisplayBehavior::Live));
        assert_eq!(DisplayBehavior::parse("dirty"), Some(DisplayBehavior::Dirty));
        assert_eq!(DisplayBehavior::parse("blur"), Some(DisplayBehavior::Blur));
        assert_eq!(DisplayBehavior::parse("foobar"), None);
    }

    #[test]
    fn global_defaults() {
        assert_eq!(
            options::global_default(options::DELAY).and_then(|v| v.as_u64()),
            Some(20)
        );
        assert!(options::global_default(options::FLAVOR).is_none());
    }
}
