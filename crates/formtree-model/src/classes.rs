//! Class sources and the class composition algorithm.
//!
//! A class source is one of three shapes: a whitespace-separated token
//! list, a map from class name to an include flag, or a function of the
//! node producing one of the former. Sources are combined in ascending
//! priority; a reserved `$reset` token at the head of a source discards
//! everything accumulated from lower-priority sources for that section.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::ids::{NodeId, NodeType};

/// Reserved token that, when first in a source, drops all classes
/// accumulated from strictly lower-priority sources.
pub const RESET_TOKEN: &str = "$reset";

/// Read-only view of a node handed to function-shaped sources.
///
/// Class functions may depend on mutable node state (the current value,
/// for instance), which is why function sources are re-evaluated on every
/// resolution and never memoized.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub value: Value,
}

/// Function-shaped class source.
pub type ClassFn = Rc<dyn Fn(&NodeSnapshot) -> ClassSource>;

/// One contribution to a section's class list.
#[derive(Clone)]
pub enum ClassSource {
    /// Whitespace-separated class tokens, e.g. `"outer wrapper"`.
    Tokens(String),
    /// Class name to include-flag; included iff the flag is true.
    FlagMap(BTreeMap<String, bool>),
    /// Evaluated fresh against the node on every resolution.
    Fn(ClassFn),
}

impl ClassSource {
    pub fn tokens(tokens: impl Into<String>) -> Self {
        ClassSource::Tokens(tokens.into())
    }

    pub fn flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        ClassSource::FlagMap(flags.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn func(f: impl Fn(&NodeSnapshot) -> ClassSource + 'static) -> Self {
        ClassSource::Fn(Rc::new(f))
    }

    /// Flatten this source to an ordered token list.
    ///
    /// Function sources are evaluated one level deep: they must return a
    /// token or flag-map shape, never another function.
    fn flatten(&self, node: &NodeSnapshot) -> Vec<String> {
        match self {
            ClassSource::Tokens(tokens) => tokens
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            ClassSource::FlagMap(flags) => flags
                .iter()
                .filter(|(_, include)| **include)
                .map(|(name, _)| name.clone())
                .collect(),
            ClassSource::Fn(f) => match f(node) {
                ClassSource::Fn(_) => Vec::new(),
                inner => inner.flatten(node),
            },
        }
    }
}

impl fmt::Debug for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSource::Tokens(tokens) => f.debug_tuple("Tokens").field(tokens).finish(),
            ClassSource::FlagMap(flags) => f.debug_tuple("FlagMap").field(flags).finish(),
            ClassSource::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Merge class sources in ascending priority into one class string.
///
/// Later sources append after earlier ones; duplicates collapse keeping
/// the first occurrence. A source whose first token is [`RESET_TOKEN`]
/// clears the accumulator before contributing its remaining tokens.
pub fn compose_classes<'a>(
    sources: impl IntoIterator<Item = &'a ClassSource>,
    node: &NodeSnapshot,
) -> String {
    let mut accumulated: Vec<String> = Vec::new();
    for source in sources {
        let tokens = source.flatten(node);
        let mut rest = tokens.as_slice();
        if tokens.first().map(String::as_str) == Some(RESET_TOKEN) {
            accumulated.clear();
            rest = &tokens[1..];
        }
        for token in rest {
            if token != RESET_TOKEN && !accumulated.iter().any(|t| t == token) {
                accumulated.push(token.clone());
            }
        }
    }
    accumulated.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> NodeSnapshot {
        NodeSnapshot {
            id: NodeId(1),
            name: "email".to_string(),
            node_type: NodeType::Input,
            value: Value::Null,
        }
    }

    #[test]
    fn tokens_accumulate_in_priority_order() {
        let sources = [
            ClassSource::tokens("formtree-outer"),
            ClassSource::tokens("foo-bar"),
        ];
        assert_eq!(compose_classes(&sources, &snapshot()), "formtree-outer foo-bar");
    }

    #[test]
    fn reset_discards_lower_priority_sources() {
        let sources = [
            ClassSource::tokens("formtree-outer"),
            ClassSource::tokens("foo-bar"),
            ClassSource::tokens("$reset custom"),
            ClassSource::tokens("prop-level"),
        ];
        assert_eq!(compose_classes(&sources, &snapshot()), "custom prop-level");
    }

    #[test]
    fn flag_map_includes_only_true() {
        let sources = [ClassSource::flags([("on", true), ("off", false)])];
        assert_eq!(compose_classes(&sources, &snapshot()), "on");
    }

    #[test]
    fn function_source_sees_node_state() {
        let sources = [ClassSource::func(|node| {
            ClassSource::Tokens(format!("is-{}", node.node_type.tag()))
        })];
        assert_eq!(compose_classes(&sources, &snapshot()), "is-input");
    }

    #[test]
    fn duplicates_keep_first_position() {
        let sources = [
            ClassSource::tokens("a b"),
            ClassSource::tokens("b c a"),
        ];
        assert_eq!(compose_classes(&sources, &snapshot()), "a b c");
    }

    #[test]
    fn compose_is_idempotent_for_fixed_inputs() {
        let sources = [
            ClassSource::tokens("x y"),
            ClassSource::flags([("z", true)]),
        ];
        let first = compose_classes(&sources, &snapshot());
        let second = compose_classes(&sources, &snapshot());
        assert_eq!(first, second);
    }
}
