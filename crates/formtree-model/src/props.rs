//! Prop values.
//!
//! Every resolved prop on a node is one of a closed set of shapes. Using a
//! tagged union rather than open duck-typing keeps the prop pipeline's
//! dispatch explicit: hooks match on the variant they care about and pass
//! the record through otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::classes::{ClassSource, NodeSnapshot};

/// Function-of-node returning a string, used by props like
/// `validation_label` that may depend on live node state.
pub type NodeStrFn = Rc<dyn Fn(&NodeSnapshot) -> String>;

/// A resolved prop value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Structured payloads: validation tuples, message maps, error lists.
    Json(Value),
    /// A single class source, for `<section>_class` convenience props.
    Classes(ClassSource),
    /// Per-section class sources, for the structured `classes` prop.
    SectionClasses(BTreeMap<String, ClassSource>),
    /// A function of the node returning a string.
    NodeFn(NodeStrFn),
}

impl PropValue {
    pub fn text(value: impl Into<String>) -> Self {
        PropValue::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s.as_str()),
            PropValue::Json(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            PropValue::Json(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PropValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            PropValue::Json(value) => value.as_u64(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PropValue::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_classes(&self) -> Option<&ClassSource> {
        match self {
            PropValue::Classes(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_section_classes(&self) -> Option<&BTreeMap<String, ClassSource>> {
        match self {
            PropValue::SectionClasses(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Json(a), PropValue::Json(b)) => a == b,
            // Function and class sources never compare equal; a re-commit
            // of either always counts as a change.
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            PropValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            PropValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PropValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            PropValue::Classes(c) => f.debug_tuple("Classes").field(c).finish(),
            PropValue::SectionClasses(m) => f.debug_tuple("SectionClasses").field(m).finish(),
            PropValue::NodeFn(_) => f.write_str("NodeFn(..)"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Json(value)
    }
}

impl From<ClassSource> for PropValue {
    fn from(value: ClassSource) -> Self {
        PropValue::Classes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural_for_data_variants() {
        assert_eq!(PropValue::text("a"), PropValue::text("a"));
        assert_ne!(PropValue::text("a"), PropValue::text("b"));
        assert_eq!(
            PropValue::Json(Value::from(5)),
            PropValue::Json(Value::from(5))
        );
    }

    #[test]
    fn function_variants_never_equal() {
        let f = PropValue::NodeFn(Rc::new(|_| "x".to_string()));
        let g = PropValue::NodeFn(Rc::new(|_| "x".to_string()));
        assert_ne!(f, g);
    }
}
