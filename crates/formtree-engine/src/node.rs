//! Node state.

use std::collections::BTreeMap;

use serde_json::Value;

use formtree_model::{
    ConfigValue, MessageStore, NodeId, NodeSnapshot, NodeType, PropValue,
};
use formtree_rules::{Rule, ValidationChain};

use crate::pipeline::PropHook;
use crate::plugin::Plugin;

/// Lifecycle of a node's current validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationStatus {
    /// A run is scheduled (or the node has never run).
    #[default]
    Pending,
    /// A run is executing, possibly parked on a deferred rule.
    Validating,
    /// The latest run concluded.
    Settled,
}

/// Per-node validation bookkeeping.
#[derive(Debug, Default)]
pub struct ValidationState {
    pub status: ValidationStatus,
    /// Own validity from the latest settled run; `None` until first settle.
    pub valid: Option<bool>,
    /// The value has differed from its initial value at least once.
    pub dirty_seen: bool,
    /// A blur notification has been received at least once.
    pub blur_seen: bool,
    /// Monotonic run counter; completions carrying a stale generation are
    /// discarded, which is the whole supersession mechanism.
    pub generation: u64,
}

/// A single field/group/list instance in the form tree.
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub value: Value,
    pub(crate) initial_value: Value,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) props: BTreeMap<String, PropValue>,
    /// Own config scope; absent keys delegate to the nearest ancestor.
    pub(crate) config: BTreeMap<String, ConfigValue>,
    pub(crate) messages: MessageStore,
    pub(crate) hooks: Vec<PropHook>,
    pub(crate) local_rules: Vec<Rule>,
    /// Name of the plugin that called `define`, for the one-shot check.
    pub(crate) defined_by: Option<String>,
    pub(crate) schema: Option<Value>,
    pub(crate) allowed_props: Option<Vec<String>>,
    pub(crate) chain: ValidationChain,
    pub(crate) validation: ValidationState,
    /// Latest computed aggregate validity, for flip detection.
    pub(crate) aggregate_valid: Option<bool>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, node_type: NodeType, value: Value) -> Self {
        Self {
            id,
            name,
            node_type,
            initial_value: value.clone(),
            value,
            parent: None,
            children: Vec::new(),
            props: BTreeMap::new(),
            config: BTreeMap::new(),
            messages: MessageStore::new(),
            hooks: Vec::new(),
            local_rules: Vec::new(),
            defined_by: None,
            schema: None,
            allowed_props: None,
            chain: ValidationChain::default(),
            validation: ValidationState::default(),
            aggregate_valid: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn props(&self) -> &BTreeMap<String, PropValue> {
        &self.props
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn validation(&self) -> &ValidationState {
        &self.validation
    }

    pub(crate) fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            name: self.name.clone(),
            node_type: self.node_type.clone(),
            value: self.value.clone(),
        }
    }
}

/// Request to create a node.
#[derive(Default)]
pub struct CreateNode {
    pub name: Option<String>,
    pub node_type: NodeType,
    pub parent: Option<NodeId>,
    pub value: Value,
    pub props: Vec<(String, PropValue)>,
    pub config: Vec<(String, ConfigValue)>,
    /// Applied after the engine-level plugins, in order.
    pub plugins: Vec<Plugin>,
    /// Per-node rule additions, shadowing built-ins by name.
    pub rules: Vec<Rule>,
}

impl CreateNode {
    pub fn input() -> Self {
        Self {
            node_type: NodeType::Input,
            ..Self::default()
        }
    }

    pub fn group() -> Self {
        Self {
            node_type: NodeType::Group,
            ..Self::default()
        }
    }

    pub fn list() -> Self {
        Self {
            node_type: NodeType::List,
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn under(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.push((key.into(), value.into()));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}
