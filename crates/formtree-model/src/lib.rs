//! Core data types for the formtree engine.
//!
//! This crate holds the leaf types shared across the workspace: node
//! identities and type tags, prop and config values, the message store,
//! class sources and the pure class composition algorithm, and the
//! recognized-options table. It has no knowledge of the node tree itself;
//! everything here is engine-agnostic and synchronous.

pub mod classes;
pub mod config;
pub mod error;
pub mod ids;
pub mod message;
pub mod props;

pub use classes::{ClassFn, ClassSource, NodeSnapshot, RESET_TOKEN, compose_classes};
pub use config::{ConfigValue, DisplayBehavior, SectionClassFn, options};
pub use error::{ModelError, Result};
pub use ids::{NodeId, NodeType};
pub use message::{Message, MessageKind, MessageStore, SetOutcome};
pub use props::{NodeStrFn, PropValue};
