//! The form engine: aggregate root over the node tree.

mod cascade;
mod classes;
mod plugins;
mod props;
mod validation;

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use formtree_model::{ClassSource, NodeId};
use formtree_rules::{RuleFailure, RuleRegistry};

use crate::error::{EngineError, Result};
use crate::event::{EngineEvent, EventKind, Listener, SubscriptionId};
use crate::node::{CreateNode, Node, ValidationStatus};
use crate::plugin::Plugin;
use crate::scheduler::{DeferredHandle, Scheduler};

/// A validation run parked on a deferred rule.
#[derive(Debug)]
pub(crate) struct PendingRun {
    pub node: NodeId,
    pub generation: u64,
    pub position: usize,
    pub failures: Vec<RuleFailure>,
}

/// Owns the node tree, the plugin list, the rule registry, the scheduler
/// and the event subscriptions. All operations are synchronous; logical
/// time only moves through [`FormEngine::advance`].
pub struct FormEngine {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    name_counter: u64,
    pub(crate) rules: RuleRegistry,
    plugins: Vec<Plugin>,
    pub(crate) default_classes: BTreeMap<String, ClassSource>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    pub(crate) scheduler: Scheduler,
    pub(crate) pending: BTreeMap<DeferredHandle, PendingRun>,
    next_handle: u64,
}

impl Default for FormEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormEngine {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            name_counter: 0,
            rules: RuleRegistry::builtin(),
            plugins: Vec::new(),
            default_classes: default_section_classes(),
            listeners: Vec::new(),
            next_subscription: 0,
            scheduler: Scheduler::new(),
            pending: BTreeMap::new(),
            next_handle: 0,
        }
    }

    /// Register a tree-scoped plugin, applied to every subsequently
    /// created node in registration order.
    pub fn register_plugin(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    /// Add a process-wide validation rule (shadows built-ins by name).
    pub fn register_rule(&mut self, rule: formtree_rules::Rule) {
        self.rules.add(rule);
    }

    /// Replace the process-wide default class source for a section.
    pub fn set_default_classes(&mut self, section: impl Into<String>, source: ClassSource) {
        self.default_classes.insert(section.into(), source);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl Fn(&EngineEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(sid, _)| *sid != id);
    }

    pub(crate) fn emit(&self, node: NodeId, kind: EventKind) {
        let event = EngineEvent { node, kind };
        let listeners: Vec<Listener> = self
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(EngineError::UnknownNode(id))
    }

    pub(crate) fn require_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(EngineError::UnknownNode(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a node: insert → `Created` event (before config/props
    /// resolve) → plugins → props through the pipeline → validation →
    /// `ChildAdded` on the parent.
    pub fn create_node(&mut self, spec: CreateNode) -> Result<NodeId> {
        if let Some(parent) = spec.parent {
            self.require(parent)?;
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        let name = spec.name.unwrap_or_else(|| {
            self.name_counter += 1;
            format!("{}_{}", spec.node_type.tag(), self.name_counter)
        });

        let mut node = Node::new(id, name, spec.node_type, spec.value);
        node.parent = spec.parent;
        node.config = spec.config.into_iter().collect();
        node.local_rules = spec.rules;
        self.nodes.insert(id, node);
        if let Some(parent) = spec.parent {
            self.require_mut(parent)?.children.push(id);
        }

        // Fired before config/props resolve so external code can capture
        // a reference to the node.
        self.emit(id, EventKind::Created);

        let staged = self.apply_plugins(id, spec.plugins);
        for (key, value) in staged.into_iter().chain(spec.props) {
            if let Err(error) = self.set_prop(id, &key, value) {
                // A bad prop (an unknown validation rule, say) aborts the
                // create. `ChildAdded` has not fired yet, so the rollback
                // must not announce a removal either.
                self.discard_subtree(id);
                return Err(error);
            }
        }

        // A node with no validation spec settles vacuously valid.
        self.settle_if_unvalidated(id);

        if let Some(parent) = spec.parent {
            self.emit(parent, EventKind::ChildAdded(id));
            self.mark_ancestors_validity(id);
        }
        Ok(id)
    }

    /// Destroy a node and its subtree. Messages are discarded; ancestors
    /// are marked for aggregate recomputation.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.require(id)?;
        let parent = self.nodes[&id].parent;
        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| *child != id);
        }

        for doomed in self.collect_subtree(id) {
            self.scheduler.cancel(doomed);
            self.pending.retain(|_, run| run.node != doomed);
            self.nodes.remove(&doomed);
            debug!(node = %doomed, "node destroyed");
        }

        if let Some(parent) = parent {
            self.emit(parent, EventKind::ChildRemoved(id));
            self.mark_ancestors_validity(parent);
            self.scheduler.mark_validity(parent);
        }
        Ok(())
    }

    /// Tear a subtree out without emitting structural events, for
    /// rolling back a create that never announced itself.
    fn discard_subtree(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get(&id).and_then(|node| node.parent)
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| *child != id);
        }
        for doomed in self.collect_subtree(id) {
            self.scheduler.cancel(doomed);
            self.pending.retain(|_, run| run.node != doomed);
            self.nodes.remove(&doomed);
        }
    }

    /// Re-parent a subtree. The move re-resolves cascaded configuration
    /// for every moved node and dirties validity in both ancestor chains.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        self.require(id)?;
        self.require(new_parent)?;
        if id == new_parent || self.collect_subtree(id).contains(&new_parent) {
            return Err(EngineError::CyclicMove {
                node: id,
                target: new_parent,
            });
        }

        let old_parent = self.nodes[&id].parent;
        if let Some(old) = old_parent {
            if let Some(old_node) = self.nodes.get_mut(&old) {
                old_node.children.retain(|child| *child != id);
            }
            self.emit(old, EventKind::ChildRemoved(id));
            self.mark_ancestors_validity(old);
            self.scheduler.mark_validity(old);
        }

        self.require_mut(id)?.parent = Some(new_parent);
        self.require_mut(new_parent)?.children.push(id);
        self.emit(new_parent, EventKind::ChildAdded(id));

        // Cascade resolution is lazy, but cascade-dependent state must be
        // refreshed for the moved subtree.
        for moved in self.collect_subtree(id) {
            self.refresh_visibility(moved);
            self.emit(moved, EventKind::Prop { name: "classes".to_string() });
        }
        self.mark_ancestors_validity(id);
        self.scheduler.mark_validity(id);
        Ok(())
    }

    /// The subtree rooted at `id`, parents before children.
    pub(crate) fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                ordered.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        ordered
    }

    pub(crate) fn mark_ancestors_validity(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(&node_id) else { break };
            if node.node_type.is_composite() {
                self.scheduler.mark_validity(node_id);
            }
            current = node.parent;
        }
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Current logical time in milliseconds.
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Advance logical time: fire due debounce timers in deadline order,
    /// then recompute aggregate validity once for every dirtied node.
    pub fn advance(&mut self, ms: u64) {
        self.scheduler.advance_by(ms);
        for due in self.scheduler.take_due() {
            if self.nodes.contains_key(&due) {
                self.run_validation_now(due);
            }
        }
        self.flush_validity();
    }

    /// Advance until no debounce timer remains. Parked deferred runs are
    /// not waited on; they resolve through
    /// [`FormEngine::resolve_deferred`].
    pub fn run_until_idle(&mut self) {
        while let Some(deadline) = self.scheduler.next_deadline() {
            let step = deadline.saturating_sub(self.scheduler.now());
            self.advance(step);
        }
        self.flush_validity();
    }

    pub(crate) fn allocate_handle(&mut self) -> DeferredHandle {
        let handle = DeferredHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    pub(crate) fn settle_if_unvalidated(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else { return };
        if node.chain.is_empty() && node.validation.status != ValidationStatus::Settled {
            node.validation.status = ValidationStatus::Settled;
            node.validation.valid = Some(true);
        }
    }

    pub(crate) fn plugin_list(&self) -> Vec<Plugin> {
        self.plugins.clone()
    }
}

/// Stock per-section class defaults, overridable through the
/// `root_classes` cascade option or [`FormEngine::set_default_classes`].
fn default_section_classes() -> BTreeMap<String, ClassSource> {
    ["outer", "wrapper", "inner", "input", "label", "help", "message"]
        .into_iter()
        .map(|section| {
            (
                section.to_string(),
                ClassSource::tokens(format!("formtree-{section}")),
            )
        })
        .collect()
}

/// Props every node accepts regardless of a plugin-declared whitelist.
pub(crate) fn is_universal_prop(key: &str) -> bool {
    matches!(
        key,
        "value"
            | "label"
            | "help"
            | "delay"
            | "errors"
            | "classes"
            | "validation"
            | "validation_label"
            | "validation_visibility"
            | "validation_messages"
    ) || key.ends_with("_class")
}
