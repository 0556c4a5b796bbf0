//! Graph Validator: startup consistency check over a story.
//!
//! Validation is advisory by default. Dangling references found here would
//! otherwise only surface as `NotFound` once the runner walks into them.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::story::Story;

/// Whether validation errors stop the engine from loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Log every error and keep going.
    #[default]
    WarnOnly,
    /// Refuse to load a story with any error.
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `paths[path][index]` names a node that does not exist.
    MissingNodeInPath {
        path: String,
        index: usize,
        node: String,
    },
    /// `nodes[node].choices[index].next` names a node that does not exist.
    MissingNodeInChoice {
        node: String,
        index: usize,
        next: String,
    },
    /// Two options of one choice node share an id; only the first is reachable.
    DuplicateOptionId { node: String, option: String },
    EmptyChoice { node: String },
    EmptyPath { path: String },
    MissingStartPath { path: String },
    /// A routing row is keyed on a node that is missing or not a choice.
    MissingRouteNode { node: String, option: String },
    /// A routing row targets a path that does not exist.
    MissingRoutePath {
        node: String,
        option: String,
        path: String,
    },
    MissingEffectNode { node: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingNodeInPath { path, index, node } => {
                write!(f, "paths.{path}[{index}] -> \"{node}\" not found")
            }
            ValidationError::MissingNodeInChoice { node, index, next } => {
                write!(f, "nodes.{node}.choices[{index}] next -> \"{next}\" missing")
            }
            ValidationError::DuplicateOptionId { node, option } => {
                write!(f, "nodes.{node}.choices has duplicate option id \"{option}\"")
            }
            ValidationError::EmptyChoice { node } => {
                write!(f, "nodes.{node}.choices is empty")
            }
            ValidationError::EmptyPath { path } => write!(f, "paths.{path} is empty"),
            ValidationError::MissingStartPath { path } => {
                write!(f, "start path \"{path}\" not found")
            }
            ValidationError::MissingRouteNode { node, option } => {
                write!(f, "route {node}/{option}: \"{node}\" is not a choice node")
            }
            ValidationError::MissingRoutePath { node, option, path } => {
                write!(f, "route {node}/{option} -> path \"{path}\" not found")
            }
            ValidationError::MissingEffectNode { node } => {
                write!(f, "side effect keyed on unknown node \"{node}\"")
            }
        }
    }
}

/// Collect every consistency error in `story`. Pure; never fails.
pub fn validate(story: &Story) -> Vec<ValidationError> {
    let graph = &story.graph;
    let mut errors = Vec::new();

    for (name, seq) in &graph.paths {
        if seq.is_empty() {
            errors.push(ValidationError::EmptyPath { path: name.clone() });
        }
        for (index, id) in seq.iter().enumerate() {
            if !graph.has_node(id) {
                errors.push(ValidationError::MissingNodeInPath {
                    path: name.clone(),
                    index,
                    node: id.clone(),
                });
            }
        }
    }

    for (id, node) in &graph.nodes {
        let Some(options) = node.options() else {
            continue;
        };
        if options.is_empty() {
            errors.push(ValidationError::EmptyChoice { node: id.clone() });
        }
        let mut seen = BTreeSet::new();
        for (index, option) in options.iter().enumerate() {
            if !seen.insert(option.id.as_str()) {
                errors.push(ValidationError::DuplicateOptionId {
                    node: id.clone(),
                    option: option.id.clone(),
                });
            }
            if !graph.has_node(&option.next) {
                errors.push(ValidationError::MissingNodeInChoice {
                    node: id.clone(),
                    index,
                    next: option.next.clone(),
                });
            }
        }
    }

    if !graph.has_path(&story.start_path) {
        errors.push(ValidationError::MissingStartPath {
            path: story.start_path.clone(),
        });
    }

    for route in story.routes.routes() {
        let is_choice = graph.nodes.get(&route.node).is_some_and(|n| n.is_choice());
        if !is_choice {
            errors.push(ValidationError::MissingRouteNode {
                node: route.node.clone(),
                option: route.option.clone(),
            });
        }
        if !graph.has_path(&route.path) {
            errors.push(ValidationError::MissingRoutePath {
                node: route.node,
                option: route.option,
                path: route.path,
            });
        }
    }

    for id in story.effects.node_ids() {
        if !graph.has_node(id) {
            errors.push(ValidationError::MissingEffectNode { node: id.to_owned() });
        }
    }

    errors
}

/// Run [`validate`], report to the log, and apply `mode`.
///
/// Returns the (possibly empty) error list in warn-only mode so callers can
/// still surface it.
pub fn check(story: &Story, mode: ValidationMode) -> EngineResult<Vec<ValidationError>> {
    let errors = validate(story);
    if errors.is_empty() {
        info!("Story self-check passed");
        return Ok(errors);
    }

    warn!("Story self-check found {} problem(s)", errors.len());
    for e in &errors {
        warn!("  {e}");
    }

    match mode {
        ValidationMode::WarnOnly => Ok(errors),
        ValidationMode::FailFast => Err(EngineError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::SideEffect;
    use crate::routing::Route;
    use crate::story::node::{Author, ChoiceOption, Node};
    use crate::story::scenario::omniscye_story;

    #[test]
    fn test_builtin_story_is_closed() {
        let story = omniscye_story();
        assert_eq!(validate(&story), Vec::<ValidationError>::new());

        // Every path entry and every option.next resolves.
        for seq in story.graph.paths.values() {
            for id in seq {
                assert!(story.graph.get_node(id).is_ok(), "{id}");
            }
        }
        for node in story.graph.nodes.values() {
            for option in node.options().unwrap_or_default() {
                assert!(story.graph.get_node(&option.next).is_ok(), "{}", option.next);
            }
        }
    }

    #[test]
    fn test_reports_missing_node_in_path() {
        let mut story = omniscye_story();
        story
            .graph
            .paths
            .get_mut("mid")
            .unwrap()
            .push("omni99".to_owned());

        let errors = validate(&story);
        assert_eq!(
            errors,
            vec![ValidationError::MissingNodeInPath {
                path: "mid".to_owned(),
                index: 3,
                node: "omni99".to_owned(),
            }]
        );
    }

    #[test]
    fn test_reports_missing_node_in_choice() {
        let mut story = omniscye_story();
        story.graph.nodes.insert(
            "cBroken".to_owned(),
            Node::choice(vec![
                ChoiceOption::new("ok", "Fine", "start"),
                ChoiceOption::new("bad", "Nowhere", "void"),
            ]),
        );

        let errors = validate(&story);
        assert_eq!(
            errors,
            vec![ValidationError::MissingNodeInChoice {
                node: "cBroken".to_owned(),
                index: 1,
                next: "void".to_owned(),
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "nodes.cBroken.choices[1] next -> \"void\" missing"
        );
    }

    #[test]
    fn test_reports_duplicate_option_id() {
        let mut story = omniscye_story();
        story.graph.nodes.insert(
            "c0".to_owned(),
            Node::choice(vec![
                ChoiceOption::new("play", "Play along", "omni1"),
                ChoiceOption::new("play", "Play harder", "omni2"),
            ]),
        );

        let errors = validate(&story);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateOptionId {
                node: "c0".to_owned(),
                option: "play".to_owned(),
            }]
        );
        assert!(matches!(
            check(&story, ValidationMode::FailFast),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_reports_empty_choice() {
        let mut story = omniscye_story();
        story.graph.nodes.insert("c0".to_owned(), Node::choice(Vec::new()));

        let errors = validate(&story);
        assert_eq!(
            errors,
            vec![ValidationError::EmptyChoice {
                node: "c0".to_owned()
            }]
        );
        assert_eq!(errors[0].to_string(), "nodes.c0.choices is empty");
        assert!(check(&story, ValidationMode::FailFast).is_err());
    }

    #[test]
    fn test_reports_table_problems() {
        let mut story = omniscye_story();
        story.graph.paths.insert("hollow".to_owned(), Vec::new());
        story.start_path = "prologue".to_owned();
        story.routes.insert(Route::new("omni1", "x", "b1"));
        story.routes.insert(Route::new("c0", "y", "limbo"));
        story.effects = story
            .effects
            .clone()
            .with("ghost", SideEffect::Notify { text: "boo".into() });

        let errors = validate(&story);
        assert!(errors.contains(&ValidationError::EmptyPath {
            path: "hollow".to_owned()
        }));
        assert!(errors.contains(&ValidationError::MissingStartPath {
            path: "prologue".to_owned()
        }));
        assert!(errors.contains(&ValidationError::MissingRouteNode {
            node: "omni1".to_owned(),
            option: "x".to_owned()
        }));
        assert!(errors.contains(&ValidationError::MissingRoutePath {
            node: "c0".to_owned(),
            option: "y".to_owned(),
            path: "limbo".to_owned()
        }));
        assert!(errors.contains(&ValidationError::MissingEffectNode {
            node: "ghost".to_owned()
        }));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_warn_only_keeps_going() {
        let mut story = omniscye_story();
        story.graph.nodes.remove("omni4");

        let errors = check(&story, ValidationMode::WarnOnly).unwrap();
        // omni4 sits in both b1 and mid.
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_fail_fast_rejects() {
        let mut story = omniscye_story();
        story
            .graph
            .nodes
            .insert("a2".to_owned(), Node::message(Author::Antagonist, "x", 0));
        assert!(check(&story, ValidationMode::FailFast).unwrap().is_empty());

        story.graph.nodes.remove("a2");
        match check(&story, ValidationMode::FailFast) {
            Err(EngineError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
