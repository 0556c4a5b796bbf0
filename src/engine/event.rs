use serde::Serialize;

use crate::effects::SideEffect;
use crate::story::node::{Author, ChoiceOption};

/// Outbound events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A chat bubble was appended to the transcript.
    MessageEmitted { author: Author, text: String },
    /// The antagonist started or stopped "typing".
    TypingStateChanged { active: bool },
    /// The runner stopped at a decision point.
    ChoicesPresented {
        node_id: String,
        options: Vec<ChoiceOption>,
    },
    SideEffectFired { node_id: String, effect: SideEffect },
    /// A path was loaded and reading starts at `cursor`.
    PathLoaded { path: String, cursor: usize },
    /// The current path ran out with no choice pending.
    Finished { node_id: Option<String> },
    /// An internal error stopped the run. No further messages follow.
    Stalled { reason: String },
    SessionReset,
}
