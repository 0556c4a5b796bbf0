use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::story::node::Node;

/// The Node Store and Path Table: node-id -> Node, path name -> node ids.
///
/// Built once at load time and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryGraph {
    pub nodes: BTreeMap<String, Node>,
    pub paths: BTreeMap<String, Vec<String>>,
}

impl StoryGraph {
    pub fn new(nodes: BTreeMap<String, Node>, paths: BTreeMap<String, Vec<String>>) -> Self {
        Self { nodes, paths }
    }

    pub fn get_node(&self, id: &str) -> EngineResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| EngineError::NodeNotFound(id.to_owned()))
    }

    pub fn get_path(&self, name: &str) -> EngineResult<&[String]> {
        self.paths
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::PathNotFound(name.to_owned()))
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_path(&self, name: &str) -> bool {
        self.paths.contains_key(name)
    }

    /// Position of `node_id` inside path `name`, if the path contains it.
    pub fn position_in_path(&self, name: &str, node_id: &str) -> Option<usize> {
        self.paths
            .get(name)
            .and_then(|seq| seq.iter().position(|id| id == node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::node::{Author, ChoiceOption};

    fn small_graph() -> StoryGraph {
        let mut nodes = BTreeMap::new();
        nodes.insert("hi".to_owned(), Node::message(Author::Antagonist, "hi", 10));
        nodes.insert(
            "pick".to_owned(),
            Node::choice(vec![ChoiceOption::new("a", "A", "hi")]),
        );
        let mut paths = BTreeMap::new();
        paths.insert("main".to_owned(), vec!["hi".to_owned(), "pick".to_owned()]);
        StoryGraph::new(nodes, paths)
    }

    #[test]
    fn test_get_node_and_path() {
        let graph = small_graph();
        assert!(graph.get_node("pick").unwrap().is_choice());
        assert_eq!(graph.get_path("main").unwrap(), ["hi", "pick"]);
        assert!(graph.has_node("hi"));
        assert!(graph.has_path("main"));
    }

    #[test]
    fn test_missing_lookups_are_not_found() {
        let graph = small_graph();
        assert!(matches!(
            graph.get_node("ghost"),
            Err(EngineError::NodeNotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            graph.get_path("nowhere"),
            Err(EngineError::PathNotFound(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn test_position_in_path() {
        let graph = small_graph();
        assert_eq!(graph.position_in_path("main", "pick"), Some(1));
        assert_eq!(graph.position_in_path("main", "ghost"), None);
        assert_eq!(graph.position_in_path("nowhere", "hi"), None);
    }
}
