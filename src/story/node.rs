use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Who a chat bubble belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// The scripted persona on the other end of the chat.
    Antagonist,
    /// The player.
    User,
    /// Out-of-story notices (e.g. "Restarting simulation…").
    System,
}

impl Author {
    /// Only the antagonist shows a typing indicator while its delay runs.
    pub fn shows_typing(self) -> bool {
        matches!(self, Author::Antagonist)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::Antagonist => write!(f, "antagonist"),
            Author::User => write!(f, "user"),
            Author::System => write!(f, "system"),
        }
    }
}

/// One selectable answer at a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Unique within its node (e.g. "play", "nope").
    pub id: String,
    /// Text on the button, and the bubble the player "sends" when picked.
    pub label: String,
    // Descriptive only. Navigation goes through the routing table.
    pub next: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            next: next.into(),
        }
    }
}

/// A single node in the dialogue graph.
///
/// JSON shape is untagged: a node with `choices` is a decision point,
/// anything with `author` and `text` is a chat bubble. A decision point may
/// carry `"author": "user"` but no other author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// A decision point. Always authored by the user and emits no text itself.
    Choice { choices: Vec<ChoiceOption> },
    /// One chat bubble, shown after `delay_ms` of "typing".
    Message {
        author: Author,
        text: String,
        #[serde(default)]
        delay_ms: u64,
    },
}

/// Wire form accepted for [`Node`] before the shape is checked.
#[derive(Deserialize)]
struct RawNode {
    author: Option<Author>,
    text: Option<String>,
    #[serde(default)]
    delay_ms: u64,
    choices: Option<Vec<ChoiceOption>>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        match raw {
            RawNode {
                choices: Some(choices),
                author,
                ..
            } => match author {
                None | Some(Author::User) => Ok(Node::Choice { choices }),
                Some(other) => Err(format!(
                    "choice node must be authored by user, not {other}"
                )),
            },
            RawNode {
                author: Some(author),
                text: Some(text),
                delay_ms,
                ..
            } => Ok(Node::Message {
                author,
                text,
                delay_ms,
            }),
            _ => Err("node needs either `choices` or both `author` and `text`".to_owned()),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNode::deserialize(deserializer)?;
        Node::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl Node {
    pub fn message(author: Author, text: impl Into<String>, delay_ms: u64) -> Self {
        Node::Message {
            author,
            text: text.into(),
            delay_ms,
        }
    }

    pub fn choice(choices: Vec<ChoiceOption>) -> Self {
        Node::Choice { choices }
    }

    pub fn author(&self) -> Author {
        match self {
            Node::Choice { .. } => Author::User,
            Node::Message { author, .. } => *author,
        }
    }

    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            Node::Choice { choices } => Some(choices),
            Node::Message { .. } => None,
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Node::Choice { .. })
    }
}
