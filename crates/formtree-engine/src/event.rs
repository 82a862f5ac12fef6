//! Change events exposed to the rendering layer.
//!
//! Events carry enough data to re-render incrementally: the renderer
//! upserts messages by (kind, key) and tree structure by child id. The
//! `Created` event fires synchronously as soon as the node object exists,
//! before config and props are resolved, so external code can capture a
//! reference; everything else fires after the triggering mutation commits.

use std::rc::Rc;

use formtree_model::{Message, MessageKind, NodeId};

/// Handle returned by [`crate::FormEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Fired exactly once per node, before config/props resolve.
    Created,
    /// A prop committed through the pipeline, or a cascaded option
    /// changed for this node (carrying the option key).
    Prop { name: String },
    MessageAdded(Message),
    /// An existing message changed in place (text or visibility).
    MessageUpdated(Message),
    MessageRemoved { kind: MessageKind, key: String },
    ChildAdded(NodeId),
    ChildRemoved(NodeId),
    /// A composite node's aggregate validity flipped.
    Validity { valid: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub node: NodeId,
    pub kind: EventKind,
}

pub type Listener = Rc<dyn Fn(&EngineEvent)>;
