//! Hierarchical configuration cascade.
//!
//! Every node either defines its own scope entry for a key or delegates
//! to the nearest ancestor that does, falling back to the process-wide
//! default table. Resolution is lazy (computed on read, never snapshotted
//! at creation), so a node created before an ancestor override still sees
//! the override once it is written. Writes walk the subtree to notify
//! descendants of possible staleness; nodes that shadow the key are
//! skipped along with their subtrees.

use tracing::debug;

use formtree_model::{ConfigValue, NodeId, options};

use crate::error::Result;
use crate::event::EventKind;

use super::FormEngine;

impl FormEngine {
    /// Store `value` in the node's own scope and re-resolve the key for
    /// every descendant that does not itself shadow it.
    pub fn set_option(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Result<()> {
        let key = key.into();
        self.require_mut(id)?.config.insert(key.clone(), value.into());

        let affected = self.unshadowed_subtree(id, &key);
        self.option_changed(&affected, &key);
        Ok(())
    }

    /// Resolve `key` by walking self, then ancestors, then the global
    /// default table. Unknown keys simply resolve to `None`; the cascade
    /// is advisory and accepts keys it does not recognize.
    pub fn resolve_option(&self, id: NodeId, key: &str) -> Option<ConfigValue> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if let Some(value) = node.config.get(key) {
                return Some(value.clone());
            }
            current = node.parent;
        }
        options::global_default(key)
    }

    /// The effective debounce window for a node: `delay` prop, then the
    /// cascaded `delay` option, then the process default.
    pub(crate) fn effective_delay(&self, id: NodeId) -> u64 {
        let node = match self.nodes.get(&id) {
            Some(node) => node,
            None => return options::DEFAULT_DELAY_MS,
        };
        if let Some(delay) = node.props.get("delay").and_then(|p| p.as_u64()) {
            return delay;
        }
        self.resolve_option(id, options::DELAY)
            .and_then(|v| v.as_u64())
            .unwrap_or(options::DEFAULT_DELAY_MS)
    }

    /// Subtree rooted at `id` minus descendants (and their subtrees) that
    /// shadow `key`. The write site itself is always included.
    fn unshadowed_subtree(&self, id: NodeId, key: &str) -> Vec<NodeId> {
        let mut affected = vec![id];
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else { continue };
            if node.config.contains_key(key) {
                continue;
            }
            affected.push(current);
            stack.extend(node.children.iter().copied());
        }
        affected
    }

    /// Post-write side effects for recognized keys. Unrecognized keys
    /// cascade untouched (accept-and-ignore).
    fn option_changed(&mut self, affected: &[NodeId], key: &str) {
        match key {
            options::ERROR_BEHAVIOR => {
                for id in affected {
                    self.refresh_visibility(*id);
                }
            }
            options::CLASSES | options::ROOT_CLASSES => {
                // Class strings are resolved on demand; the event tells
                // the renderer to re-pull them.
                for id in affected {
                    self.emit(*id, EventKind::Prop { name: "classes".to_string() });
                }
            }
            options::DELAY | options::FLAVOR => {}
            other => {
                debug!(option = other, "unrecognized config option cascaded as-is");
            }
        }
        for id in affected {
            self.emit(*id, EventKind::Prop { name: format!("config:{key}") });
        }
    }
}
