use formtree_model::NodeId;
use formtree_rules::RuleError;
use thiserror::Error;

use crate::scheduler::DeferredHandle;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("node type already defined by plugin `{0}`")]
    AlreadyDefined(String),
    #[error("cannot move {node} under its own descendant {target}")]
    CyclicMove { node: NodeId, target: NodeId },
    #[error("unknown deferred validation handle: {0:?}")]
    UnknownHandle(DeferredHandle),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("plugin `{plugin}` failed: {reason}")]
    Plugin { plugin: String, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
