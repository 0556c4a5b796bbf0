//! Choice Resolver: (choice node, option) -> next path.
//!
//! Routing is an explicit table. An option's `next` field never takes part
//! in navigation; a pair without a row falls through to the next cursor
//! position on the current path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::story::graph::StoryGraph;

/// One authored routing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub node: String,
    pub option: String,
    pub path: String,
}

impl Route {
    pub fn new(node: impl Into<String>, option: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            option: option.into(),
            path: path.into(),
        }
    }
}

/// What the runner should do after a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Load `path` and start reading at `cursor`.
    Switch { path: String, cursor: usize },
    /// No routing row: stay on the current path, cursor + 1.
    Fallthrough,
}

/// Where the cursor lands when a route targets a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Always cursor 0.
    Restart,
    /// If the target path contains the choice node being answered, continue
    /// right after it instead of replaying the segment leading up to it.
    #[default]
    ResumeAfterChoice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    rows: BTreeMap<(String, String), String>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut table = Self::new();
        for route in routes {
            table.insert(route);
        }
        table
    }

    /// Later rows for the same (node, option) replace earlier ones.
    pub fn insert(&mut self, route: Route) {
        self.rows.insert((route.node, route.option), route.path);
    }

    /// Explicit table lookup only.
    pub fn lookup(&self, node_id: &str, option_id: &str) -> Option<&str> {
        self.rows
            .get(&(node_id.to_owned(), option_id.to_owned()))
            .map(String::as_str)
    }

    /// Two-tier resolution: explicit row first, fallthrough second.
    pub fn resolve(
        &self,
        graph: &StoryGraph,
        node_id: &str,
        option_id: &str,
        policy: ReentryPolicy,
    ) -> Resolution {
        let Some(path) = self.lookup(node_id, option_id) else {
            return Resolution::Fallthrough;
        };
        let cursor = match policy {
            ReentryPolicy::Restart => 0,
            ReentryPolicy::ResumeAfterChoice => graph
                .position_in_path(path, node_id)
                .map_or(0, |pos| pos + 1),
        };
        Resolution::Switch {
            path: path.to_owned(),
            cursor,
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = Route> + '_ {
        self.rows
            .iter()
            .map(|((node, option), path)| Route::new(node.clone(), option.clone(), path.clone()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::scenario::omniscye_story;

    fn switch(path: &str, cursor: usize) -> Resolution {
        Resolution::Switch {
            path: path.to_owned(),
            cursor,
        }
    }

    #[test]
    fn test_opening_choice_routes() {
        let story = omniscye_story();
        let r = |opt| story.routes.resolve(&story.graph, "c0", opt, ReentryPolicy::default());
        assert_eq!(r("play"), switch("b1", 0));
        assert_eq!(r("nope"), switch("mid", 0));
        assert_eq!(r("panic"), switch("b1", 0));
    }

    #[test]
    fn test_full_table_targets() {
        let story = omniscye_story();
        let expected = [
            ("c0", "play", "b1"),
            ("c0", "nope", "mid"),
            ("c0", "panic", "b1"),
            ("c1", "code", "b1"),
            ("c1", "stall", "safeBranch1"),
            ("c1", "deflect", "safeBranch2"),
            ("c2", "install", "bad2"),
            ("c2", "inspect", "towardGood"),
            ("c2", "reject", "towardGood"),
            ("c3", "allow", "bad3"),
            ("c3", "sandbox", "toHaunt"),
            ("c3", "deny", "toHaunt"),
            ("cHaunt", "fakecam", "goodFinal"),
            ("cHaunt", "lights", "neutralFinal"),
            ("cHaunt", "refuse", "secretFinal"),
        ];
        for (node, option, path) in expected {
            assert_eq!(story.routes.lookup(node, option), Some(path), "{node}/{option}");
        }
        assert_eq!(story.routes.len(), expected.len());
    }

    #[test]
    fn test_code_resumes_after_c1_in_b1() {
        let story = omniscye_story();
        let resumed = story
            .routes
            .resolve(&story.graph, "c1", "code", ReentryPolicy::ResumeAfterChoice);
        assert_eq!(resumed, switch("b1", 3));

        let restarted = story
            .routes
            .resolve(&story.graph, "c1", "code", ReentryPolicy::Restart);
        assert_eq!(restarted, switch("b1", 0));
    }

    #[test]
    fn test_unrouted_pair_falls_through() {
        let story = omniscye_story();
        let r = story
            .routes
            .resolve(&story.graph, "c0", "shrug", ReentryPolicy::default());
        assert_eq!(r, Resolution::Fallthrough);
        let r = story
            .routes
            .resolve(&story.graph, "cX", "play", ReentryPolicy::default());
        assert_eq!(r, Resolution::Fallthrough);
    }

    #[test]
    fn test_later_row_wins() {
        let table = RoutingTable::from_routes([
            Route::new("n", "o", "first"),
            Route::new("n", "o", "second"),
        ]);
        assert_eq!(table.lookup("n", "o"), Some("second"));
        assert_eq!(table.len(), 1);
    }
}
