//! Plugin and feature application.
//!
//! Plugins are tree-scoped extension functions applied to every node at
//! creation; features are the same capability scoped to a node type and
//! installed by a plugin's `define` call. A plugin may define the node's
//! type exactly once; the define is all-or-nothing. Returning
//! [`PluginSignal::Halt`] stops subsequent plugins for that node while
//! keeping effects already applied.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use formtree_model::{NodeType, PropValue};

use crate::error::{EngineError, Result};
use crate::node::Node;
use crate::pipeline::PropHook;

/// Explicit three-way outcome of a plugin application (no truthiness).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginSignal {
    Continue,
    /// Stop propagation of this node's creation to later plugins.
    Halt,
}

/// Shared signature for plugin `run`, `library`, and feature functions.
pub type PluginFn = Rc<dyn Fn(&mut PluginContext<'_>) -> Result<PluginSignal>>;

/// A type-scoped extension installed through `define`.
#[derive(Clone)]
pub struct Feature {
    pub name: String,
    pub run: PluginFn,
}

impl Feature {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&mut PluginContext<'_>) -> Result<PluginSignal> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Rc::new(run),
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A tree-scoped extension applied at node creation.
///
/// Library-style plugins additionally expose a `library` function, tried
/// before any `run` so a concrete type is resolved before type-scoped
/// features become applicable.
#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub library: Option<PluginFn>,
    pub run: PluginFn,
}

impl Plugin {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&mut PluginContext<'_>) -> Result<PluginSignal> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            library: None,
            run: Rc::new(run),
        }
    }

    pub fn with_library(
        mut self,
        library: impl Fn(&mut PluginContext<'_>) -> Result<PluginSignal> + 'static,
    ) -> Self {
        self.library = Some(Rc::new(library));
        self
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("library", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

/// One-shot descriptor installed by `define`.
#[derive(Debug, Clone, Default)]
pub struct NodeDefinition {
    pub node_type: NodeType,
    pub schema: Option<Value>,
    /// Declared-prop whitelist; empty means no whitelist.
    pub allowed_props: Vec<String>,
    /// Ordered, type-scoped features run right after the defining plugin.
    pub features: Vec<Feature>,
}

impl NodeDefinition {
    pub fn of_type(node_type: NodeType) -> Self {
        Self {
            node_type,
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn allow_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_props = props.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }
}

/// Capability surface handed to plugin/feature functions.
///
/// Prop writes are staged rather than applied: they run through the prop
/// pipeline after plugin application completes, so plugin-supplied
/// defaults still pass every hook (including hooks a later plugin adds).
pub struct PluginContext<'a> {
    pub(crate) plugin_name: &'a str,
    pub(crate) node: &'a mut Node,
    pub(crate) staged_props: &'a mut Vec<(String, PropValue)>,
    pub(crate) pending_features: &'a mut Vec<Feature>,
}

impl PluginContext<'_> {
    /// Read access to the node as it currently stands.
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Install the node's type, schema, prop whitelist and feature list.
    ///
    /// One-shot per node: a second call fails and leaves the node exactly
    /// as the first call configured it.
    pub fn define(&mut self, definition: NodeDefinition) -> Result<()> {
        if let Some(by) = &self.node.defined_by {
            return Err(EngineError::AlreadyDefined(by.clone()));
        }
        let NodeDefinition {
            node_type,
            schema,
            allowed_props,
            features,
        } = definition;
        self.node.node_type = node_type;
        self.node.schema = schema;
        self.node.allowed_props = if allowed_props.is_empty() {
            None
        } else {
            Some(allowed_props)
        };
        self.node.defined_by = Some(self.plugin_name.to_string());
        self.pending_features.extend(features);
        Ok(())
    }

    /// Whether a `define` has already happened (by this or a prior plugin).
    pub fn is_defined(&self) -> bool {
        self.node.defined_by.is_some()
    }

    /// Append a hook to the node's prop pipeline. Order is registration
    /// order across all plugins and features, stable for the node's life.
    pub fn add_prop_hook(&mut self, hook: PropHook) {
        self.node.hooks.push(hook);
    }

    /// Stage a prop assignment to run through the pipeline after plugin
    /// application. Caller-supplied props are applied afterwards and so
    /// override staged defaults.
    pub fn stage_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.staged_props.push((key.into(), value.into()));
    }
}
