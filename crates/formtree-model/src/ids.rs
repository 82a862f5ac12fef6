//! Node identity and type tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-unique identifier for a node in the form tree.
///
/// Ids are allocated monotonically by the engine and never reused, so a
/// stale id held by external code can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The kind of a node in the form tree.
///
/// `Input` nodes carry a scalar value. `Group` and `List` nodes own
/// children and participate in aggregate validity. Plugins may introduce
/// their own type tags through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Input,
    Group,
    List,
    Custom(String),
}

impl NodeType {
    /// Whether this node kind aggregates descendant validity.
    pub fn is_composite(&self) -> bool {
        matches!(self, NodeType::Group | NodeType::List | NodeType::Custom(_))
    }

    /// Short tag used in auto-generated names and log output.
    pub fn tag(&self) -> &str {
        match self {
            NodeType::Input => "input",
            NodeType::Group => "group",
            NodeType::List => "list",
            NodeType::Custom(name) => name.as_str(),
        }
    }
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Input
    }
}
