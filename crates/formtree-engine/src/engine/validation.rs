//! The validation driver: value changes, debounce, deferred rules,
//! display behavior, message production and aggregate validity.

use serde_json::Value;
use tracing::debug;

use formtree_model::{
    DisplayBehavior, Message, MessageKind, NodeId, PropValue, options,
};
use formtree_rules::{ChainOutcome, RuleTarget, StepResult, render_message};

use crate::error::{EngineError, Result};
use crate::event::EventKind;
use crate::node::ValidationStatus;
use crate::scheduler::DeferredHandle;

use super::{FormEngine, PendingRun};

impl FormEngine {
    // ------------------------------------------------------------------
    // Entry points from the rendering layer
    // ------------------------------------------------------------------

    /// Commit a new value and schedule validation after the debounce
    /// window. Successive calls within the window collapse into a single
    /// run on the latest value; the last call wins regardless of how
    /// slowly earlier runs would have resolved.
    pub fn set_value(&mut self, id: NodeId, value: Value, debounce: Option<u64>) -> Result<()> {
        let node = self.require_mut(id)?;
        node.value = value;
        if node.value != node.initial_value {
            node.validation.dirty_seen = true;
        }
        self.emit(id, EventKind::Prop { name: "value".to_string() });
        self.refresh_visibility(id);

        let node = self.require(id)?;
        if node.chain.is_empty() {
            self.settle_if_unvalidated(id);
            return Ok(());
        }

        let delay = debounce.unwrap_or_else(|| self.effective_delay(id));
        if delay == 0 {
            self.run_validation_now(id);
        } else {
            self.require_mut(id)?.validation.status = ValidationStatus::Pending;
            self.scheduler.schedule(id, delay);
        }
        Ok(())
    }

    /// The input reported a loss of focus; `blur`-gated messages become
    /// eligible for display from now on.
    pub fn notify_blur(&mut self, id: NodeId) -> Result<()> {
        self.require_mut(id)?.validation.blur_seen = true;
        self.refresh_visibility(id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Running chains
    // ------------------------------------------------------------------

    /// Execute the node's chain right now, superseding any in-flight run.
    pub(crate) fn run_validation_now(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else { return };
        node.validation.generation += 1;
        node.validation.status = ValidationStatus::Validating;
        let generation = node.validation.generation;

        let chain = node.chain.clone();
        let value = node.value.clone();
        let name = node.name.clone();
        let node_type = node.node_type.clone();
        let target = RuleTarget {
            value: &value,
            node_name: &name,
            node_type: &node_type,
        };
        match chain.execute(&target) {
            StepResult::Done(outcome) => self.finish_run(id, generation, outcome),
            StepResult::Suspended { position, failures } => {
                self.park_run(id, generation, position, failures);
            }
        }
    }

    /// Deliver the result of a deferred rule check.
    ///
    /// If a newer run superseded the one that parked this handle, the
    /// completion is discarded: last submission wins, never a slower,
    /// earlier run.
    pub fn resolve_deferred(&mut self, handle: DeferredHandle, passed: bool) -> Result<()> {
        let run = self
            .pending
            .remove(&handle)
            .ok_or(EngineError::UnknownHandle(handle))?;
        // Removing a node purges its parked runs, so the node is live.
        let node = self.require(run.node)?;
        if node.validation.generation != run.generation {
            debug!(node = %run.node, "stale deferred result discarded");
            return Ok(());
        }

        let chain = node.chain.clone();
        let value = node.value.clone();
        let name = node.name.clone();
        let node_type = node.node_type.clone();
        let target = RuleTarget {
            value: &value,
            node_name: &name,
            node_type: &node_type,
        };
        match chain.resume(run.position, passed, run.failures, &target) {
            StepResult::Done(outcome) => self.finish_run(run.node, run.generation, outcome),
            StepResult::Suspended { position, failures } => {
                self.park_run(run.node, run.generation, position, failures);
            }
        }
        Ok(())
    }

    /// The handle of the node's currently parked run, if any.
    pub fn pending_deferred(&self, id: NodeId) -> Option<DeferredHandle> {
        let generation = self.nodes.get(&id)?.validation.generation;
        self.pending
            .iter()
            .find(|(_, run)| run.node == id && run.generation == generation)
            .map(|(handle, _)| *handle)
    }

    fn park_run(
        &mut self,
        id: NodeId,
        generation: u64,
        position: usize,
        failures: Vec<formtree_rules::RuleFailure>,
    ) {
        let handle = self.allocate_handle();
        self.pending.insert(
            handle,
            PendingRun {
                node: id,
                generation,
                position,
                failures,
            },
        );
    }

    /// Commit a concluded run: own validity, messages, visibility, and
    /// aggregate dirtying.
    fn finish_run(&mut self, id: NodeId, generation: u64, outcome: ChainOutcome) {
        let Some(node) = self.nodes.get(&id) else { return };
        if node.validation.generation != generation {
            debug!(node = %id, "stale run completion discarded");
            return;
        }

        let label = self.resolve_label(id);
        let value_text = value_text(&node.value);
        // The run settles below, so only the behavior gate applies here.
        let visible = self.behavior_gate_open(id, self.display_behavior(id));
        let overrides = node
            .props
            .get("validation_messages")
            .and_then(PropValue::as_json)
            .cloned();

        // Render one message per failure, keyed by rule name.
        let mut new_messages = Vec::new();
        for failure in &outcome.failures {
            let template = overrides
                .as_ref()
                .and_then(|map| map.get(&failure.name))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    node.chain
                        .rules()
                        .iter()
                        .find(|bound| bound.expr.name == failure.name)
                        .map(|bound| bound.rule.template.clone())
                })
                .unwrap_or_else(|| "{label} is invalid.".to_string());
            let text = render_message(&template, &label, &failure.args, &value_text);
            new_messages.push(
                Message::new(MessageKind::Validation, failure.name.clone(), text).visible(visible),
            );
        }

        let Some(node) = self.nodes.get_mut(&id) else { return };
        node.validation.status = ValidationStatus::Settled;
        node.validation.valid = Some(outcome.valid());

        let stale: Vec<String> = node
            .messages
            .of_kind(MessageKind::Validation)
            .filter(|m| !new_messages.iter().any(|n| n.key == m.key))
            .map(|m| m.key.clone())
            .collect();
        let mut removed = Vec::new();
        for key in stale {
            if node.messages.remove(MessageKind::Validation, &key).is_some() {
                removed.push(key);
            }
        }
        let mut events = Vec::new();
        for message in new_messages {
            match node.messages.set(message.clone()) {
                formtree_model::SetOutcome::Added => {
                    events.push(EventKind::MessageAdded(message));
                }
                formtree_model::SetOutcome::Replaced => {
                    events.push(EventKind::MessageUpdated(message));
                }
                formtree_model::SetOutcome::Unchanged => {}
            }
        }

        for key in removed {
            self.emit(id, EventKind::MessageRemoved { kind: MessageKind::Validation, key });
        }
        for kind in events {
            self.emit(id, kind);
        }

        self.mark_ancestors_validity(id);
    }

    /// A prop feeding message rendering changed (label, overrides). If
    /// the node has a settled run, repeat it so texts pick up the new
    /// inputs; pending or in-flight runs will render with them anyway.
    pub(crate) fn rerender_validation_messages(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else { return };
        if !node.chain.is_empty() && node.validation.status == ValidationStatus::Settled {
            self.run_validation_now(id);
        }
    }

    // ------------------------------------------------------------------
    // Display behavior
    // ------------------------------------------------------------------

    /// The display behavior governing this node's validation messages:
    /// `validation_visibility` prop, else the cascaded `error_behavior`
    /// option, else blur.
    pub fn display_behavior(&self, id: NodeId) -> DisplayBehavior {
        let from_prop = self
            .nodes
            .get(&id)
            .and_then(|node| node.props.get("validation_visibility"))
            .and_then(PropValue::as_str)
            .and_then(DisplayBehavior::parse);
        from_prop
            .or_else(|| {
                self.resolve_option(id, options::ERROR_BEHAVIOR)
                    .and_then(|v| v.as_str().and_then(DisplayBehavior::parse))
            })
            .unwrap_or_default()
    }

    /// Whether validation messages may be shown right now (requires a
    /// settled run in addition to the behavior gate).
    fn validation_gate_open(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else { return false };
        node.validation.status == ValidationStatus::Settled
            && self.behavior_gate_open(id, self.display_behavior(id))
    }

    /// Whether externally supplied errors may be shown right now. An
    /// `error_behavior` of `live` shows them immediately; anything else
    /// gates them like validation messages (without the settled-run
    /// requirement, since no run produced them).
    pub(crate) fn external_errors_visible(&self, id: NodeId) -> bool {
        let behavior = self
            .resolve_option(id, options::ERROR_BEHAVIOR)
            .and_then(|v| v.as_str().and_then(DisplayBehavior::parse))
            .unwrap_or_default();
        self.behavior_gate_open(id, behavior)
    }

    fn behavior_gate_open(&self, id: NodeId, behavior: DisplayBehavior) -> bool {
        let Some(node) = self.nodes.get(&id) else { return false };
        match behavior {
            DisplayBehavior::Live => true,
            DisplayBehavior::Dirty => node.validation.dirty_seen,
            DisplayBehavior::Blur => node.validation.blur_seen,
        }
    }

    /// Recompute message visibility after a gate input changed (value
    /// dirtied, blur seen, behavior reconfigured).
    pub(crate) fn refresh_visibility(&mut self, id: NodeId) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        let validation_visible = self.validation_gate_open(id);
        let errors_visible = self.external_errors_visible(id);

        let Some(node) = self.nodes.get_mut(&id) else { return };
        let mut flipped = node
            .messages
            .set_visibility(|m| m.kind == MessageKind::Validation, validation_visible);
        flipped.extend(
            node.messages
                .set_visibility(|m| m.kind == MessageKind::Error, errors_visible),
        );
        for message in flipped {
            self.emit(id, EventKind::MessageUpdated(message));
        }
    }

    // ------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------

    /// Label used in rendered messages: explicit `validation_label`
    /// (string or function-of-node) > `label` prop > prettified name.
    fn resolve_label(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(&id) else { return String::new() };
        match node.props.get("validation_label") {
            Some(PropValue::Text(label)) => return label.clone(),
            Some(PropValue::NodeFn(f)) => return f(&node.snapshot()),
            _ => {}
        }
        if let Some(PropValue::Text(label)) = node.props.get("label") {
            return label.clone();
        }
        prettify_name(&node.name)
    }

    // ------------------------------------------------------------------
    // Aggregate validity
    // ------------------------------------------------------------------

    /// Logical AND of the node's own settled validity and every
    /// descendant's. Unsettled nodes count as not-yet-valid, so a group
    /// only becomes valid once every descendant settles valid.
    pub fn is_valid(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else { return false };
        node.validation.valid == Some(true)
            && node.children.iter().all(|child| self.is_valid(*child))
    }

    /// One aggregate recomputation per scheduling tick, regardless of how
    /// many descendants changed within it. Emits `Validity` when a
    /// composite node's aggregate flips.
    pub(crate) fn flush_validity(&mut self) {
        let dirty = self.scheduler.take_validity_dirty();
        for id in dirty {
            if !self.nodes.contains_key(&id) {
                continue;
            }
            let aggregate = self.is_valid(id);
            let Some(node) = self.nodes.get_mut(&id) else { continue };
            if node.aggregate_valid != Some(aggregate) {
                node.aggregate_valid = Some(aggregate);
                self.emit(id, EventKind::Validity { valid: aggregate });
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Derive a human label from a node name: separators become spaces and
/// the first letter is capitalized (`email_address` → `Email address`).
fn prettify_name(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::prettify_name;

    #[test]
    fn prettify_names() {
        assert_eq!(prettify_name("email"), "Email");
        assert_eq!(prettify_name("email_address"), "Email address");
        assert_eq!(prettify_name("first-name"), "First name");
    }
}
