//! Session state for one playthrough and its pure transitions.
//!
//! Nothing here sleeps or emits; the async runner in `engine.rs` decides
//! when to call each transition.

use serde::Serialize;

use crate::effects::StatusFlags;
use crate::error::{EngineError, EngineResult};
use crate::routing::Resolution;
use crate::story::graph::StoryGraph;
use crate::story::node::{Author, ChoiceOption, Node};

/// Where the script runner is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    AwaitingChoice,
    /// A selection was accepted and is being processed.
    Selecting,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChoice {
    pub node_id: String,
    pub options: Vec<ChoiceOption>,
}

/// One emitted chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub author: Author,
    pub text: String,
}

/// What sits under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Message {
        node_id: String,
        author: Author,
        text: String,
        delay_ms: u64,
    },
    Choice {
        node_id: String,
        options: Vec<ChoiceOption>,
    },
    /// Cursor ran past the end. `last` is the final node of the path.
    End { last: Option<String> },
}

/// An accepted selection, captured before any suspending work starts.
#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub node_id: String,
    pub option: ChoiceOption,
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    phase: Phase,
    path: String,
    cursor: usize,
    pending: Option<PendingChoice>,
    transcript: Vec<Line>,
    flags: StatusFlags,
    choices_made: usize,
    typing: bool,
    /// Bumped whenever the active run is superseded. Loops carrying an older
    /// epoch stop before emitting anything else.
    #[serde(skip)]
    epoch: u64,
}

impl Session {
    pub fn new(start_path: &str) -> Self {
        Self {
            phase: Phase::Idle,
            path: start_path.to_owned(),
            cursor: 0,
            pending: None,
            transcript: Vec::new(),
            flags: StatusFlags::default(),
            choices_made: 0,
            typing: false,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pending(&self) -> Option<&PendingChoice> {
        self.pending.as_ref()
    }

    pub fn transcript(&self) -> &[Line] {
        &self.transcript
    }

    pub fn flags(&self) -> &StatusFlags {
        &self.flags
    }

    pub fn choices_made(&self) -> usize {
        self.choices_made
    }

    pub fn typing(&self) -> bool {
        self.typing
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn flags_mut(&mut self) -> &mut StatusFlags {
        &mut self.flags
    }

    /// Discard the playthrough and point back at `start_path`, cursor 0.
    pub(crate) fn reset(&mut self, start_path: &str) {
        let epoch = self.epoch + 1;
        *self = Session::new(start_path);
        self.epoch = epoch;
    }

    /// Make `path` active at `cursor` and supersede any older run.
    pub(crate) fn load(&mut self, graph: &StoryGraph, path: &str, cursor: usize) -> EngineResult<u64> {
        graph.get_path(path)?;
        self.path = path.to_owned();
        self.cursor = cursor;
        self.pending = None;
        self.phase = Phase::Running;
        self.epoch += 1;
        Ok(self.epoch)
    }

    /// `start` is refused while a run or a selection is in flight.
    pub(crate) fn ensure_can_start(&self) -> EngineResult<()> {
        match self.phase {
            Phase::Running => Err(EngineError::Reentrant("run")),
            Phase::Selecting => Err(EngineError::Reentrant("selection")),
            Phase::Idle | Phase::AwaitingChoice | Phase::Finished => Ok(()),
        }
    }

    pub(crate) fn step(&self, graph: &StoryGraph) -> EngineResult<Step> {
        let seq = graph.get_path(&self.path)?;
        let Some(node_id) = seq.get(self.cursor) else {
            return Ok(Step::End {
                last: seq.last().cloned(),
            });
        };
        let step = match graph.get_node(node_id)? {
            Node::Message {
                author,
                text,
                delay_ms,
            } => Step::Message {
                node_id: node_id.clone(),
                author: *author,
                text: text.clone(),
                delay_ms: *delay_ms,
            },
            Node::Choice { choices } if choices.is_empty() => {
                return Err(EngineError::EmptyChoice(node_id.clone()));
            }
            Node::Choice { choices } => Step::Choice {
                node_id: node_id.clone(),
                options: choices.clone(),
            },
        };
        Ok(step)
    }

    pub(crate) fn set_typing(&mut self, active: bool) {
        self.typing = active;
    }

    pub(crate) fn record(&mut self, author: Author, text: &str) {
        self.transcript.push(Line {
            author,
            text: text.to_owned(),
        });
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Park on a choice node. The cursor stays on it.
    pub(crate) fn present(&mut self, node_id: &str, options: Vec<ChoiceOption>) {
        self.pending = Some(PendingChoice {
            node_id: node_id.to_owned(),
            options,
        });
        self.phase = Phase::AwaitingChoice;
    }

    /// Accept `option_id` against the pending choice and lock out further
    /// selections until the transition completes.
    pub(crate) fn begin_selection(&mut self, option_id: &str) -> EngineResult<Selection> {
        match self.phase {
            Phase::Selecting => return Err(EngineError::Reentrant("selection")),
            Phase::Running => return Err(EngineError::Reentrant("run")),
            Phase::Idle | Phase::Finished => return Err(EngineError::NoPendingChoice),
            Phase::AwaitingChoice => {}
        }
        let pending = self.pending.as_ref().ok_or(EngineError::NoPendingChoice)?;
        let option = pending
            .options
            .iter()
            .find(|o| o.id == option_id)
            .cloned()
            .ok_or_else(|| EngineError::InvalidSelection {
                option: option_id.to_owned(),
            })?;
        let node_id = pending.node_id.clone();

        self.pending = None;
        self.phase = Phase::Selecting;
        Ok(Selection {
            node_id,
            option,
            epoch: self.epoch,
        })
    }

    /// Finish a selection: count it and move the cursor per `resolution`.
    pub(crate) fn complete_selection(
        &mut self,
        graph: &StoryGraph,
        resolution: &Resolution,
    ) -> EngineResult<u64> {
        self.choices_made += 1;
        match resolution {
            Resolution::Switch { path, cursor } => self.load(graph, path, *cursor),
            Resolution::Fallthrough => {
                self.cursor += 1;
                self.phase = Phase::Running;
                Ok(self.epoch)
            }
        }
    }

    pub(crate) fn finish(&mut self) {
        self.phase = Phase::Finished;
    }

    /// Stop in place after an internal error.
    pub(crate) fn stall(&mut self) {
        self.pending = None;
        self.typing = false;
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::scenario::omniscye_story;

    fn at_c0() -> (StoryGraph, Session) {
        let graph = omniscye_story().graph;
        let mut session = Session::new("intro");
        session.load(&graph, "intro", 3).unwrap();
        match session.step(&graph).unwrap() {
            Step::Choice { node_id, options } => session.present(&node_id, options),
            other => panic!("expected c0, got {other:?}"),
        }
        (graph, session)
    }

    #[test]
    fn test_step_reads_node_under_cursor() {
        let graph = omniscye_story().graph;
        let mut session = Session::new("intro");
        session.load(&graph, "intro", 0).unwrap();
        match session.step(&graph).unwrap() {
            Step::Message {
                node_id, delay_ms, ..
            } => {
                assert_eq!(node_id, "start");
                assert_eq!(delay_ms, 500);
            }
            other => panic!("expected message, got {other:?}"),
        }

        session.load(&graph, "bad2", 2).unwrap();
        assert_eq!(
            session.step(&graph).unwrap(),
            Step::End {
                last: Some("endbad2".to_owned())
            }
        );
    }

    #[test]
    fn test_step_rejects_empty_choice() {
        let mut graph = omniscye_story().graph;
        graph.nodes.insert("c0".to_owned(), Node::choice(Vec::new()));
        let mut session = Session::new("intro");
        session.load(&graph, "intro", 3).unwrap();

        let err = session.step(&graph).unwrap_err();

        assert!(matches!(err, EngineError::EmptyChoice(id) if id == "c0"));
    }

    #[test]
    fn test_load_unknown_path_leaves_state_alone() {
        let graph = omniscye_story().graph;
        let mut session = Session::new("intro");
        let err = session.load(&graph, "nowhere", 0).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.epoch(), 0);
    }

    #[test]
    fn test_selection_locks_out_second_selection() {
        let (_, mut session) = at_c0();
        let sel = session.begin_selection("play").unwrap();
        assert_eq!(sel.node_id, "c0");
        assert_eq!(sel.option.label, "Play along");
        assert_eq!(session.phase(), Phase::Selecting);
        assert!(session.pending().is_none());

        let again = session.begin_selection("play").unwrap_err();
        assert!(again.is_reentrant());
    }

    #[test]
    fn test_selection_rejects_unknown_option() {
        let (_, mut session) = at_c0();
        let err = session.begin_selection("code").unwrap_err();
        assert!(matches!(err, EngineError::InvalidSelection { option } if option == "code"));
        assert_eq!(session.phase(), Phase::AwaitingChoice);
        assert!(session.pending().is_some());
    }

    #[test]
    fn test_selection_without_pending_choice() {
        let mut session = Session::new("intro");
        assert!(matches!(
            session.begin_selection("play"),
            Err(EngineError::NoPendingChoice)
        ));
    }

    #[test]
    fn test_fallthrough_keeps_epoch_and_path() {
        let (graph, mut session) = at_c0();
        let sel = session.begin_selection("nope").unwrap();
        let epoch = session
            .complete_selection(&graph, &Resolution::Fallthrough)
            .unwrap();
        assert_eq!(epoch, sel.epoch);
        assert_eq!(session.path(), "intro");
        assert_eq!(session.cursor(), 4);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.choices_made(), 1);
    }

    #[test]
    fn test_reset_supersedes_and_clears() {
        let (_, mut session) = at_c0();
        session.record(Author::Antagonist, "hey");
        let before = session.epoch();

        session.reset("intro");

        assert!(session.epoch() > before);
        assert!(session.transcript().is_empty());
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.path(), "intro");
        assert_eq!(session.phase(), Phase::Idle);
    }
}
