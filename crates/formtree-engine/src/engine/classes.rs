//! Render-ready class resolution.

use formtree_model::{ClassSource, ConfigValue, NodeId, PropValue, compose_classes, options};

use crate::error::Result;

use super::FormEngine;

impl FormEngine {
    /// Resolve the class string for a named section of a node.
    ///
    /// Sources combine in ascending priority: process-wide defaults
    /// (overridable by the `root_classes` cascade option), the cascade
    /// `classes` option, the node's structured `classes` prop, then the
    /// section's convenience `<section>_class` prop. Function sources are
    /// evaluated fresh on every call; nothing here is cached, so the
    /// result is idempotent for unchanged inputs by construction.
    pub fn resolve_classes(&self, id: NodeId, section: &str) -> Result<String> {
        let node = self.require(id)?;
        let snapshot = node.snapshot();
        let mut sources: Vec<ClassSource> = Vec::new();

        match self.resolve_option(id, options::ROOT_CLASSES) {
            Some(ConfigValue::RootClasses(root)) => {
                if let Some(source) = root(section) {
                    sources.push(source);
                }
            }
            _ => {
                if let Some(source) = self.default_classes.get(section) {
                    sources.push(source.clone());
                }
            }
        }

        if let Some(ConfigValue::Classes(map)) = self.resolve_option(id, options::CLASSES)
            && let Some(source) = map.get(section)
        {
            sources.push(source.clone());
        }

        if let Some(map) = node.props.get("classes").and_then(PropValue::as_section_classes)
            && let Some(source) = map.get(section)
        {
            sources.push(source.clone());
        }

        let convenience_key = format!("{section}_class");
        match node.props.get(&convenience_key) {
            Some(PropValue::Classes(source)) => sources.push(source.clone()),
            Some(PropValue::Text(tokens)) => sources.push(ClassSource::tokens(tokens.clone())),
            _ => {}
        }

        Ok(compose_classes(&sources, &snapshot))
    }
}
