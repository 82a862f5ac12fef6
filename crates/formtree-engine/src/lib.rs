//! formtree-engine: a headless form engine.
//!
//! A tree of stateful nodes (fields, groups, lists) carrying
//! configuration, validation, class composition and extensibility logic,
//! independent of how it is painted to a screen. The engine's contract is
//! the state it computes; rendering is an external collaborator consuming
//! the change events in [`event`].
//!
//! The four load-bearing mechanisms:
//! - hierarchical configuration cascading with per-node override and
//!   re-cascade on structural change;
//! - an ordered, interceptable pipeline resolving every prop assignment;
//! - a validation engine with pluggable rule chains, debounced and
//!   supersedable execution, display-behavior gating, and tree-wide
//!   aggregate validity;
//! - a plugin/feature registration protocol that can redefine a node's
//!   type, inject hooks and short-circuit later plugins.
//!
//! Scheduling is single-threaded cooperative: logical time only advances
//! through [`FormEngine::advance`], which makes debounce and supersession
//! fully deterministic under test.

pub mod engine;
pub mod error;
pub mod event;
pub mod node;
pub mod pipeline;
pub mod plugin;
pub mod scheduler;

pub use engine::FormEngine;
pub use error::{EngineError, Result};
pub use event::{EngineEvent, EventKind, SubscriptionId};
pub use node::{CreateNode, Node, ValidationState, ValidationStatus};
pub use pipeline::{Next, PropHook, PropRecord};
pub use plugin::{Feature, NodeDefinition, Plugin, PluginContext, PluginFn, PluginSignal};
pub use scheduler::DeferredHandle;

// The model and rules crates are part of the public surface.
pub use formtree_model as model;
pub use formtree_rules as rules;
