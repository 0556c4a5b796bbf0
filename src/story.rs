pub mod graph;
pub mod node;
pub mod scenario;

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::effects::EffectTable;
use crate::error::EngineResult;
use crate::routing::{Route, RoutingTable};
use crate::story::graph::StoryGraph;
use crate::story::node::Node;

/// Everything the engine needs to play one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub graph: StoryGraph,
    pub routes: RoutingTable,
    pub effects: EffectTable,
    /// Path loaded on start and after every reset.
    pub start_path: String,
}

/// On-disk shape of a story document.
#[derive(Debug, Serialize, Deserialize)]
struct StoryDocument {
    nodes: BTreeMap<String, Node>,
    paths: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    effects: EffectTable,
    #[serde(default = "default_start_path")]
    start_path: String,
}

fn default_start_path() -> String {
    "intro".to_owned()
}

impl From<StoryDocument> for Story {
    fn from(doc: StoryDocument) -> Self {
        Story {
            graph: StoryGraph::new(doc.nodes, doc.paths),
            routes: RoutingTable::from_routes(doc.routes),
            effects: doc.effects,
            start_path: doc.start_path,
        }
    }
}

impl Story {
    /// Parse a story from JSON. Does not validate; see [`crate::validate`].
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let doc: StoryDocument = serde_json::from_str(raw)?;
        Ok(doc.into())
    }

    pub fn from_reader(reader: impl Read) -> EngineResult<Self> {
        let doc: StoryDocument = serde_json::from_reader(reader)?;
        Ok(doc.into())
    }

    pub fn to_json(&self) -> EngineResult<String> {
        let doc = StoryDocument {
            nodes: self.graph.nodes.clone(),
            paths: self.graph.paths.clone(),
            routes: self.routes.routes().collect(),
            effects: self.effects.clone(),
            start_path: self.start_path.clone(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}
