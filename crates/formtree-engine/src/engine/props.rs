//! Prop assignment and post-commit side effects.

use tracing::debug;

use formtree_model::{Message, MessageKind, NodeId, PropValue};
use formtree_rules::{ValidationSpec, parse_validation};

use crate::error::Result;
use crate::event::EventKind;
use crate::pipeline::{PropRecord, run_hooks};

use super::{FormEngine, is_universal_prop};

impl FormEngine {
    /// Push a prop assignment through the node's hook chain and commit
    /// the (possibly transformed) result to the prop map.
    ///
    /// A hook that does not call its continuation swallows the
    /// assignment: nothing commits and no event fires. Props outside a
    /// plugin-declared whitelist are ignored with a debug log; the
    /// whitelist is advisory configuration, not a hard failure.
    pub fn set_prop(&mut self, id: NodeId, key: &str, value: impl Into<PropValue>) -> Result<()> {
        let node = self.require(id)?;
        if let Some(allowed) = &node.allowed_props
            && !is_universal_prop(key)
            && !allowed.iter().any(|p| p == key)
        {
            debug!(node = %id, prop = key, "prop not in declared whitelist, ignored");
            return Ok(());
        }

        let hooks = node.hooks.clone();
        let record = PropRecord::new(key, value.into());
        let Some(record) = run_hooks(&hooks, record) else {
            debug!(node = %id, prop = key, "prop assignment swallowed by hook");
            return Ok(());
        };

        let node = self.require_mut(id)?;
        let changed = node.props.get(&record.prop) != Some(&record.value);
        let committed_key = record.prop.clone();
        node.props.insert(record.prop, record.value);

        if changed {
            self.emit(id, EventKind::Prop { name: committed_key.clone() });
            self.after_prop_commit(id, &committed_key)?;
        }
        Ok(())
    }

    /// Dependent recomputation after a prop commit.
    fn after_prop_commit(&mut self, id: NodeId, key: &str) -> Result<()> {
        match key {
            "validation" => self.rebind_validation(id)?,
            // Message text inputs: regenerate settled messages in place.
            "label" | "validation_label" | "validation_messages" => {
                self.rerender_validation_messages(id);
            }
            "validation_visibility" => self.refresh_visibility(id),
            "errors" => self.sync_external_errors(id),
            // Class props resolve on demand; the Prop event already told
            // the renderer to re-pull.
            _ => {}
        }
        Ok(())
    }

    /// Set the externally supplied error list for a node.
    ///
    /// Convenience over the `errors` prop: duplicates collapse because
    /// each error is keyed by its own text.
    pub fn set_errors(&mut self, id: NodeId, errors: Vec<String>) -> Result<()> {
        let value = serde_json::Value::Array(
            errors.into_iter().map(serde_json::Value::String).collect(),
        );
        self.set_prop(id, "errors", PropValue::Json(value))
    }

    /// Reconcile the `errors` prop against Error-kind messages: stale
    /// entries are removed (emitting `message-removed` for exactly those),
    /// new distinct texts are added once each.
    fn sync_external_errors(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else { return };

        let desired: Vec<String> = match node.props.get("errors") {
            Some(PropValue::Json(serde_json::Value::Array(entries))) => entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect(),
            Some(PropValue::Text(text)) => vec![text.clone()],
            _ => Vec::new(),
        };
        let visible = self.external_errors_visible(id);

        let stale: Vec<String> = node
            .messages
            .of_kind(MessageKind::Error)
            .filter(|m| !desired.iter().any(|text| *text == m.key))
            .map(|m| m.key.clone())
            .collect();

        let Some(node) = self.nodes.get_mut(&id) else { return };
        let mut removed = Vec::new();
        for key in stale {
            if node.messages.remove(MessageKind::Error, &key).is_some() {
                removed.push(key);
            }
        }
        let mut added = Vec::new();
        for text in desired {
            let message = Message::new(MessageKind::Error, text.clone(), text).visible(visible);
            if node.messages.set(message.clone()) == formtree_model::SetOutcome::Added {
                added.push(message);
            }
        }

        for key in removed {
            self.emit(id, EventKind::MessageRemoved { kind: MessageKind::Error, key });
        }
        for message in added {
            self.emit(id, EventKind::MessageAdded(message));
        }
    }

    /// Add a per-node rule after creation, shadowing registry rules by
    /// name, and re-bind the node's chain against the extended registry.
    ///
    /// The counterpart of [`crate::node::CreateNode::with_rule`] for
    /// nodes that already exist.
    pub fn add_node_rule(&mut self, id: NodeId, rule: formtree_rules::Rule) -> Result<()> {
        self.require_mut(id)?.local_rules.push(rule);
        self.rebind_validation(id)
    }

    /// Parse and bind the node's validation spec, then run immediately
    /// (initial validation is synchronous; only value changes debounce).
    fn rebind_validation(&mut self, id: NodeId) -> Result<()> {
        let node = self.require(id)?;
        let spec = match node.props.get("validation") {
            Some(PropValue::Text(text)) => Some(ValidationSpec::Text(text.clone())),
            Some(PropValue::Json(value)) => Some(ValidationSpec::Structured(value.clone())),
            _ => None,
        };
        let exprs = match spec {
            Some(spec) => parse_validation(&spec)?,
            None => Vec::new(),
        };
        let registry = self.rules.extended(node.local_rules.iter().cloned());
        let chain = formtree_rules::ValidationChain::bind(exprs, &registry)?;

        let node = self.require_mut(id)?;
        node.chain = chain;
        if node.chain.is_empty() {
            // Dropping the spec clears any prior validation messages.
            let removed = node.messages.clear_kind(MessageKind::Validation);
            node.validation.valid = Some(true);
            node.validation.status = crate::node::ValidationStatus::Settled;
            for message in removed {
                self.emit(
                    id,
                    EventKind::MessageRemoved { kind: MessageKind::Validation, key: message.key },
                );
            }
            self.mark_ancestors_validity(id);
        } else {
            self.run_validation_now(id);
        }
        Ok(())
    }
}
