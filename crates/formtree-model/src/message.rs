//! Per-node message store.
//!
//! Messages are the single user-facing channel for validation results and
//! externally supplied errors. The store deduplicates by (kind, key):
//! inserting a message whose kind and key already exist replaces the old
//! entry in place, keeping its position. Identical text under distinct keys
//! is deliberately not collapsed; external errors key by their text, which
//! is what makes repeated identical error strings render once.

use serde::{Deserialize, Serialize};

/// Message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Externally supplied error (e.g. server-side validation).
    Error,
    /// Produced by a failing validation rule.
    Validation,
    Success,
    Info,
}

/// A single keyed message attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning store for this kind; used for dedup.
    pub key: String,
    pub kind: MessageKind,
    /// Driven by the display-behavior state machine, not by the store.
    pub visible: bool,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            visible: false,
            text: text.into(),
        }
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Result of a [`MessageStore::set`] call, so callers can emit change
/// events only when something actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Added,
    Replaced,
    Unchanged,
}

/// Ordered, deduplicated collection of messages for one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the message with the same (kind, key).
    ///
    /// Replacement keeps the original position so repeated updates do not
    /// reorder sibling messages.
    pub fn set(&mut self, message: Message) -> SetOutcome {
        match self
            .messages
            .iter_mut()
            .find(|m| m.kind == message.kind && m.key == message.key)
        {
            Some(existing) => {
                if *existing == message {
                    SetOutcome::Unchanged
                } else {
                    *existing = message;
                    SetOutcome::Replaced
                }
            }
            None => {
                self.messages.push(message);
                SetOutcome::Added
            }
        }
    }

    /// Remove the message with the given kind and key, if present.
    pub fn remove(&mut self, kind: MessageKind, key: &str) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .position(|m| m.kind == kind && m.key == key)?;
        Some(self.messages.remove(index))
    }

    /// Remove every message of the given kind, returning the removed set.
    pub fn clear_kind(&mut self, kind: MessageKind) -> Vec<Message> {
        let (removed, kept) = self
            .messages
            .drain(..)
            .partition(|m| m.kind == kind);
        self.messages = kept;
        removed
    }

    /// Set visibility on every message matching the filter, returning
    /// clones of the messages that actually flipped so callers can emit
    /// incremental change events.
    pub fn set_visibility(
        &mut self,
        filter: impl Fn(&Message) -> bool,
        visible: bool,
    ) -> Vec<Message> {
        let mut flipped = Vec::new();
        for message in &mut self.messages {
            if filter(message) && message.visible != visible {
                message.visible = visible;
                flipped.push(message.clone());
            }
        }
        flipped
    }

    pub fn get(&self, kind: MessageKind, key: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.kind == kind && m.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.visible)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
