//! Plugin and feature application at node creation.

use tracing::warn;

use formtree_model::{NodeId, PropValue};

use crate::plugin::{Feature, Plugin, PluginContext, PluginSignal};

use super::FormEngine;

impl FormEngine {
    /// Apply engine-registered plugins followed by per-create plugins.
    ///
    /// Library functions run first, in registration order, until one of
    /// them defines a concrete type — type must be known before
    /// type-scoped features are applicable. Then every plugin's `run`
    /// executes in order; `Halt` stops subsequent plugins while keeping
    /// effects already applied, and an error leaves the node without that
    /// plugin's remaining effects (its features included) without
    /// corrupting siblings or aborting the tree.
    ///
    /// Returns the props plugins staged, to be pushed through the prop
    /// pipeline by the caller.
    pub(crate) fn apply_plugins(
        &mut self,
        id: NodeId,
        extra: Vec<Plugin>,
    ) -> Vec<(String, PropValue)> {
        let mut plugins = self.plugin_list();
        plugins.extend(extra);
        let mut staged: Vec<(String, PropValue)> = Vec::new();

        // Library pass: resolve a concrete type first.
        for plugin in &plugins {
            let Some(library) = &plugin.library else { continue };
            let mut features = Vec::new();
            let outcome = {
                let Some(node) = self.nodes.get_mut(&id) else { return staged };
                let mut ctx = PluginContext {
                    plugin_name: &plugin.name,
                    node,
                    staged_props: &mut staged,
                    pending_features: &mut features,
                };
                library(&mut ctx)
            };
            match outcome {
                Ok(_) => self.run_features(id, &plugin.name, features, &mut staged),
                Err(error) => {
                    warn!(node = %id, plugin = %plugin.name, %error, "library function failed");
                }
            }
            let defined = self
                .nodes
                .get(&id)
                .is_some_and(|node| node.defined_by.is_some());
            if defined {
                break;
            }
        }

        // Run pass: every plugin, registration order, halt-aware.
        for plugin in &plugins {
            let mut features = Vec::new();
            let outcome = {
                let Some(node) = self.nodes.get_mut(&id) else { return staged };
                let mut ctx = PluginContext {
                    plugin_name: &plugin.name,
                    node,
                    staged_props: &mut staged,
                    pending_features: &mut features,
                };
                (plugin.run)(&mut ctx)
            };
            match outcome {
                Ok(signal) => {
                    self.run_features(id, &plugin.name, features, &mut staged);
                    if signal == PluginSignal::Halt {
                        break;
                    }
                }
                Err(error) => {
                    // The node keeps what the plugin applied before the
                    // failure but loses its features; later plugins still
                    // run because the plugin never signalled Halt.
                    warn!(node = %id, plugin = %plugin.name, %error, "plugin failed");
                }
            }
        }

        staged
    }

    /// Run the features a `define` installed, immediately after the
    /// defining plugin. A feature's `Halt` stops the remaining features
    /// of that definition only; a feature error skips the rest the same
    /// way, with a warning.
    fn run_features(
        &mut self,
        id: NodeId,
        plugin_name: &str,
        features: Vec<Feature>,
        staged: &mut Vec<(String, PropValue)>,
    ) {
        for feature in features {
            let mut nested = Vec::new();
            let outcome = {
                let Some(node) = self.nodes.get_mut(&id) else { return };
                let mut ctx = PluginContext {
                    plugin_name,
                    node,
                    staged_props: staged,
                    pending_features: &mut nested,
                };
                (feature.run)(&mut ctx)
            };
            match outcome {
                Ok(PluginSignal::Continue) => {}
                Ok(PluginSignal::Halt) => break,
                Err(error) => {
                    warn!(node = %id, feature = %feature.name, %error, "feature failed");
                    break;
                }
            }
            // Features cannot define, so nested feature lists are only
            // possible through a second define, which errors; drop them.
            debug_assert!(nested.is_empty());
        }
    }
}
