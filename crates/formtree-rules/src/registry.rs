//! Rule registry.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use formtree_model::NodeType;

use crate::builtin;

/// What a chain run validates: the node's value plus identifying context.
///
/// The chain builds a [`RuleContext`] per rule from this, pairing it with
/// that rule's own positional arguments.
pub struct RuleTarget<'a> {
    pub value: &'a Value,
    pub node_name: &'a str,
    pub node_type: &'a NodeType,
}

impl<'a> RuleTarget<'a> {
    pub fn context(&self, args: &'a [String]) -> RuleContext<'a> {
        RuleContext {
            value: self.value,
            args,
            node_name: self.node_name,
            node_type: self.node_type,
        }
    }
}

/// Borrowed view a rule predicate runs against.
pub struct RuleContext<'a> {
    pub value: &'a Value,
    pub args: &'a [String],
    pub node_name: &'a str,
    pub node_type: &'a NodeType,
}

impl RuleContext<'_> {
    /// Whether the current value counts as empty for skip-on-empty rules.
    pub fn value_is_empty(&self) -> bool {
        match self.value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    /// The value rendered as a plain string for comparisons and messages.
    pub fn value_text(&self) -> String {
        match self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The value as a number, accepting numeric strings.
    pub fn value_number(&self) -> Option<f64> {
        match self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Outcome of a single rule check.
///
/// `Defer` suspends the chain for the owning node only; the engine parks
/// the run and resumes it when the deferred result arrives, discarding it
/// if a newer run has superseded the generation in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCheck {
    Pass,
    Fail,
    Defer,
}

impl From<bool> for RuleCheck {
    fn from(ok: bool) -> Self {
        if ok { RuleCheck::Pass } else { RuleCheck::Fail }
    }
}

/// Rule predicate signature.
pub type RuleFn = Rc<dyn Fn(&RuleContext<'_>) -> RuleCheck>;

/// A named, registered rule.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub check: RuleFn,
    /// Default message template; `{label}`, `{argN}` and `{value}`
    /// placeholders are interpolated at message time.
    pub template: String,
    /// Most rules pass vacuously on an empty value so that optional
    /// fields stay valid until filled; `required` opts out.
    pub skip_empty: bool,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        check: impl Fn(&RuleContext<'_>) -> RuleCheck + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Rc::new(check),
            template: template.into(),
            skip_empty: true,
        }
    }

    pub fn run_on_empty(mut self) -> Self {
        self.skip_empty = false;
        self
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("skip_empty", &self.skip_empty)
            .finish_non_exhaustive()
    }
}

/// Named rule lookup: built-ins plus caller additions.
///
/// Additions shadow built-ins by name, which is how a node's
/// `validation_rules` prop overrides a stock rule locally.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Rule>,
}

impl RuleRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in rules.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for rule in builtin::all() {
            registry.add(rule);
        }
        registry
    }

    pub fn add(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// A copy of this registry with `extra` layered on top.
    pub fn extended(&self, extra: impl IntoIterator<Item = Rule>) -> Self {
        let mut merged = self.clone();
        for rule in extra {
            merged.add(rule);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_required() {
        let registry = RuleRegistry::builtin();
        assert!(registry.contains("required"));
        assert!(registry.contains("length"));
        assert!(!registry.contains("no_such_rule"));
    }

    #[test]
    fn additions_shadow_builtins() {
        let registry = RuleRegistry::builtin();
        let extended = registry.extended([Rule::new("required", "custom", |_| RuleCheck::Pass)]);
        assert_eq!(extended.get("required").unwrap().template, "custom");
        // The base registry is untouched.
        assert_ne!(registry.get("required").unwrap().template, "custom");
    }
}
