//! Cosmetic side effects triggered by specific node ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CARRIER: &str = "Futura LTE";

/// A cosmetic change fired when a node is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Show a notification banner.
    Notify { text: String },
    /// Replace the carrier name in the status bar.
    SetCarrier { name: String },
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::Notify { .. } => "notify",
            SideEffect::SetCarrier { .. } => "set_carrier",
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            SideEffect::Notify { text } => text,
            SideEffect::SetCarrier { name } => name,
        }
    }
}

/// Simulated phone status owned by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub carrier: String,
    pub notification: Option<String>,
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self {
            carrier: DEFAULT_CARRIER.to_owned(),
            notification: None,
        }
    }
}

impl StatusFlags {
    pub fn apply(&mut self, effect: &SideEffect) {
        match effect {
            SideEffect::Notify { text } => self.notification = Some(text.clone()),
            SideEffect::SetCarrier { name } => self.carrier = name.clone(),
        }
    }

    /// The carrier no longer reads as the default one.
    pub fn taken_over(&self) -> bool {
        self.carrier != DEFAULT_CARRIER
    }
}

/// Declarative node-id -> effects table, consulted once per processed node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectTable {
    entries: BTreeMap<String, Vec<SideEffect>>,
}

impl EffectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node_id: impl Into<String>, effect: SideEffect) -> Self {
        self.entries.entry(node_id.into()).or_default().push(effect);
        self
    }

    pub fn for_node(&self, node_id: &str) -> &[SideEffect] {
        self.entries
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
